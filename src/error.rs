//! Error types for the compute resource environment.
//!
//! Errors fall into two fatal families. Configuration errors abort actor
//! construction; protocol and state violations abort message processing and
//! indicate a bug in the upstream ticket source.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use uuid::Uuid;

use crate::models::TicketState;

/// Which of the two configured directories an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryRole {
    Build,
    Work,
}

impl fmt::Display for DirectoryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "Build directory"),
            Self::Work => write!(f, "Working directory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CreError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("{role} {reason}: {path}")]
    InvalidDirectory {
        role: DirectoryRole,
        path: String,
        reason: String,
    },
    #[error("Number of threads must at least be 1. It was {0}.")]
    InvalidThreadCount(usize),
    #[error("Failed to create central repository at {path}: {reason}")]
    RepositoryCreationFailed { path: String, reason: String },
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("Ticket {ticket_id}: Trying to evaluate ticket that is not ready (state: {state}).")]
    TicketNotReady { ticket_id: Uuid, state: TicketState },
    #[error("Ticket {ticket_id}: Trying to evaluate ticket that has already been evaluated.")]
    TicketAlreadyEvaluated { ticket_id: Uuid },
    #[error("Actor {actor} has been shut down and no longer accepts tickets")]
    ActorShutDown { actor: String },
    #[error("Mailbox closed: {0}")]
    MailboxClosed(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

impl CreError {
    pub fn missing_directory(role: DirectoryRole, path: &Path) -> Self {
        Self::InvalidDirectory {
            role,
            path: path.display().to_string(),
            reason: "does not exist".to_string(),
        }
    }

    pub fn not_a_directory(role: DirectoryRole, path: &Path) -> Self {
        Self::InvalidDirectory {
            role,
            path: path.display().to_string(),
            reason: "expected to be a directory".to_string(),
        }
    }

    pub fn empty_directory_path(role: DirectoryRole) -> Self {
        Self::InvalidDirectory {
            role,
            path: String::new(),
            reason: "must not be empty".to_string(),
        }
    }

    /// True for errors raised while constructing an actor
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError(_)
                | Self::InvalidDirectory { .. }
                | Self::InvalidThreadCount(_)
                | Self::RepositoryCreationFailed { .. }
        )
    }

    /// True for malformed ready messages: wrong sender or wrong ticket state
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation(_)
                | Self::TicketNotReady { .. }
                | Self::TicketAlreadyEvaluated { .. }
        )
    }
}

impl From<::config::ConfigError> for CreError {
    fn from(error: ::config::ConfigError) -> Self {
        CreError::ConfigurationError(error.to_string())
    }
}

impl From<serde_json::Error> for CreError {
    fn from(error: serde_json::Error) -> Self {
        CreError::ExecutionError(format!("JSON serialization error: {error}"))
    }
}

pub type CreResult<T> = anyhow::Result<T, CreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_directory_error_messages() {
        let path = PathBuf::from("/does/not/exist");
        let err = CreError::missing_directory(DirectoryRole::Build, &path);
        assert_eq!(
            err.to_string(),
            "Build directory does not exist: /does/not/exist"
        );

        let err = CreError::not_a_directory(DirectoryRole::Work, &path);
        assert_eq!(
            err.to_string(),
            "Working directory expected to be a directory: /does/not/exist"
        );
    }

    #[test]
    fn test_thread_count_message() {
        assert_eq!(
            CreError::InvalidThreadCount(0).to_string(),
            "Number of threads must at least be 1. It was 0."
        );
    }

    #[test]
    fn test_error_classification() {
        let config_errors = [
            CreError::ConfigurationError("bad".to_string()),
            CreError::InvalidThreadCount(0),
            CreError::empty_directory_path(DirectoryRole::Build),
            CreError::RepositoryCreationFailed {
                path: "/b/repo".to_string(),
                reason: "read-only".to_string(),
            },
        ];
        for err in &config_errors {
            assert!(err.is_configuration_error(), "{err}");
            assert!(!err.is_protocol_violation(), "{err}");
        }

        let ticket_id = Uuid::new_v4();
        let violations = [
            CreError::ProtocolViolation("Ticket source actor expected".to_string()),
            CreError::TicketNotReady {
                ticket_id,
                state: TicketState::Pending,
            },
            CreError::TicketAlreadyEvaluated { ticket_id },
        ];
        for err in &violations {
            assert!(err.is_protocol_violation(), "{err}");
            assert!(!err.is_configuration_error(), "{err}");
        }

        let shut_down = CreError::ActorShutDown {
            actor: "LocalCreActor".to_string(),
        };
        assert!(!shut_down.is_configuration_error());
        assert!(!shut_down.is_protocol_violation());
    }

    #[test]
    fn test_ticket_state_errors_name_the_ticket() {
        let ticket_id = Uuid::new_v4();
        let err = CreError::TicketAlreadyEvaluated { ticket_id };
        assert!(err.to_string().contains(&ticket_id.to_string()));
        assert!(err.to_string().contains("already been evaluated"));
    }
}
