//! Port trait definitions (Hexagonal Architecture)
//!
//! - Clock: wall-clock source, injectable for deterministic cooldown tests
//! - BreakerEventSink: outbound breaker transitions for the presentation layer

pub mod clock;
pub mod event_sink;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event_sink::{BreakerEventSink, NullEventSink, RecordingEventSink};
