//! Error taxonomy for classroom operations.
//!
//! Every operation reports failure synchronously through [`ClassroomError`].
//! A failed operation leaves the session exactly as it found it.

use crate::state::StoreError;

/// Result type alias for classroom operations.
pub type ClassroomResult<T> = Result<T, ClassroomError>;

/// Errors surfaced by the classroom service and its state machines.
#[derive(Debug, thiserror::Error)]
pub enum ClassroomError {
    /// Unknown session, participant or pair id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Operation attempted outside the phase it belongs to.
    #[error("{operation} is not allowed in phase {actual} (expected {expected})")]
    InvalidPhase {
        operation: &'static str,
        expected: String,
        actual: String,
    },

    /// Vote or response value outside the option set for that phase or mechanism.
    #[error("invalid choice '{value}' (allowed: {allowed})")]
    InvalidChoice { value: String, allowed: String },

    /// Phase advance attempted from a terminal phase.
    #[error("invalid transition from {from}: {reason}")]
    InvalidTransition { from: String, reason: String },

    /// Pair operation attempted while the pair is in the wrong negotiation state.
    #[error("pair {pair_id} is {actual}, expected {expected}")]
    InvalidState {
        pair_id: String,
        expected: String,
        actual: String,
    },

    /// Non-positive price, missing field, or a participant acting out of turn.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backing store could not serve the request.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ClassroomError {
    pub fn session_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "session",
            id: id.to_string(),
        }
    }

    pub fn participant_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "participant",
            id: id.to_string(),
        }
    }

    pub fn pair_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "pair",
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code, used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidPhase { .. } => "INVALID_PHASE",
            Self::InvalidChoice { .. } => "INVALID_CHOICE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ClassroomError::session_not_found("s1").code(), "NOT_FOUND");
        assert_eq!(
            ClassroomError::Validation("price must be positive".into()).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            ClassroomError::from(StoreError::LockPoisoned).code(),
            "STORE_ERROR"
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = ClassroomError::pair_not_found("pair-9");
        assert_eq!(err.to_string(), "pair not found: pair-9");
    }
}
