//! Error types for the deckhand planning engine.
//!
//! Configuration problems are detected while loading and validating the
//! declarative input. Planning problems are conflicts that only show up once
//! configuration is combined with contributed facts, and they always abort
//! the build.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for deckhand.
#[derive(Debug, Error)]
pub enum DeckhandError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// The two ways enabled ports can collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortConflict {
    /// Two enabled ports share a name.
    Name(String),
    /// Two enabled ports share a container port number.
    Number(u16),
}

/// Planning errors. All of them are fatal for the current build.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Two enabled contributed ports share a name or a port number.
    #[error("Duplicate port: {0}")]
    DuplicatePort(PortConflict),

    /// More than one effective service account resolved for a target.
    #[error("More than one effective service account ({count}) found for application '{application}' on target '{target}'")]
    AmbiguousServiceAccount {
        /// Application name.
        application: String,
        /// Deployment target.
        target: String,
        /// Number of candidates found.
        count: usize,
    },

    /// No effective service account resolved for a target.
    #[error("No effective service account found for application '{application}' on target '{target}'")]
    NoServiceAccount {
        /// Application name.
        application: String,
        /// Deployment target.
        target: String,
    },

    /// A configured role binding has no role to reference.
    #[error("No role has been set in role binding '{binding}'")]
    MissingRoleReference {
        /// Name of the offending role binding.
        binding: String,
    },

    /// A configured cluster role binding declares no subjects.
    #[error("No subjects have been set in cluster role binding '{binding}'")]
    MissingSubjects {
        /// Name of the offending cluster role binding.
        binding: String,
    },
}

/// Result type alias for deckhand operations.
pub type Result<T> = std::result::Result<T, DeckhandError>;

impl DeckhandError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is a conflict detected while planning.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Plan(_))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl std::fmt::Display for PortConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(
                f,
                "all ports must have unique names - {name} has been used multiple times"
            ),
            Self::Number(port) => write!(
                f,
                "all ports must be unique - {port} has been used multiple times"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_errors_are_conflicts() {
        let err = DeckhandError::from(PlanError::MissingSubjects {
            binding: String::from("crb"),
        });
        assert!(err.is_conflict());
        assert!(!DeckhandError::internal("boom").is_conflict());
    }

    #[test]
    fn test_port_conflict_message() {
        let err = PlanError::DuplicatePort(PortConflict::Number(8080));
        assert!(err.to_string().contains("8080"));

        let err = PlanError::DuplicatePort(PortConflict::Name(String::from("http")));
        assert!(err.to_string().contains("http has been used multiple times"));
    }
}
