//! Error types for the visit agenda
//!
//! Validation errors carry a user-facing message and are raised before any
//! mutation happens. Malformed records and date descriptors never surface
//! here: the reconciler and the schedule key absorb them.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} does not hold a list of visits")]
    Corrupt { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Unknown checklist stage: {0}")]
    UnknownStage(String),

    #[error("Invalid priority: {0} (expected one of High, Medium, Low or empty)")]
    InvalidPriority(String),

    #[error("Incorrect password.")]
    Unauthorized,

    #[error("No users configured. Run `user add` first.")]
    NoUsers,
}

impl AgendaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AgendaError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        AgendaError::Json {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by user input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AgendaError::Validation(_)
                | AgendaError::NotFound { .. }
                | AgendaError::UnknownStage(_)
                | AgendaError::InvalidPriority(_)
                | AgendaError::Unauthorized
                | AgendaError::NoUsers
        )
    }
}

pub type Result<T> = std::result::Result<T, AgendaError>;
