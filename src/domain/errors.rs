//! Domain errors for the load governor.

use thiserror::Error;

use super::models::session::SessionId;

/// Errors surfaced to callers of the governor.
///
/// Only lifecycle misuse and invalid construction inputs are errors. Missing
/// weight profiles and malformed feature vectors are recovered in place and
/// reported through the verdict instead.
#[derive(Debug, Error)]
pub enum GovernorError {
    #[error("Session not found: {0} (evaluate called after end_phase?)")]
    SessionNotFound(SessionId),

    #[error("Invalid capacity: {0}. Must be between 5 and 9")]
    InvalidCapacity(u8),

    #[error("Invalid weight profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("Flow reading contained no factors")]
    EmptyFlowReading,
}

pub type GovernorResult<T> = Result<T, GovernorError>;
