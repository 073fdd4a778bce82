//! CLI command implementations.

pub mod audit;
pub mod evaluate;
pub mod profiles;
