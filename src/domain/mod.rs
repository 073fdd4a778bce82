//! Domain layer for the load governor
//!
//! Value objects, the governor's error type, and the ports through which it
//! reaches the clock and the presentation layer.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{GovernorError, GovernorResult};
