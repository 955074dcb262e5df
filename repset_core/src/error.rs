//! Error types for the repset_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for repset_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Input rejected before any state was touched
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Caller broke an operation's contract
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Session runner operation not allowed in the current phase
    #[error("Cannot {action} while session is {phase}")]
    InvalidTransition { action: &'static str, phase: String },

    /// Workout could not be found for a session
    #[error("Workout not found: {0}")]
    WorkoutNotFound(String),

    /// Workout exists but has nothing to run
    #[error("Workout {0} has no exercises")]
    EmptyWorkout(Uuid),

    /// Template not found (or not owned by the requester)
    #[error("Template {0} not found")]
    TemplateNotFound(Uuid),

    /// The external store rejected a write
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller can simply retry the same request.
    ///
    /// Only persistence failures qualify; local state is left intact so
    /// nothing has to be re-entered.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        if self.is_recoverable() {
            "Your workout could not be saved. Please try again.".to_string()
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_errors_are_recoverable() {
        let err = Error::Persistence("disk full".into());
        assert!(err.is_recoverable());
        assert!(err.user_message().contains("try again"));
        assert!(!err.user_message().contains("disk full"));
    }

    #[test]
    fn test_io_errors_keep_specific_message() {
        let err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "config.toml missing",
        ));
        assert!(!err.is_recoverable());
        assert!(err.user_message().contains("config.toml missing"));
        assert!(!err.user_message().contains("try again"));
    }

    #[test]
    fn test_validation_errors_keep_specific_message() {
        let err = Error::Validation("template name must not be empty".into());
        assert!(!err.is_recoverable());
        assert!(err.user_message().contains("template name must not be empty"));
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = Error::InvalidTransition {
            action: "complete a set",
            phase: "resting".into(),
        };
        assert_eq!(err.to_string(), "Cannot complete a set while session is resting");
    }
}
