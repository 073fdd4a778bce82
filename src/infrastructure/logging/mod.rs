//! Logging infrastructure
//!
//! Structured logging with tracing:
//! - JSON or pretty console output on stderr
//! - Optional JSON log files with daily/hourly/no rotation
//! - `RUST_LOG` overrides of the configured level

pub mod logger;

pub use logger::LoggerImpl;
