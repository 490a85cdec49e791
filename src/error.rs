//! Error type shared by the service layer, the CLI and the TUI.
//!
//! Errors fall in two families: validation errors, which the user fixes in
//! place and retries, and operation errors raised while reading or writing
//! the workspace. Neither is retried automatically.

use std::io;

/// Errors surfaced to the user as `Error: <message>`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("dependency {predecessor} -> {successor} would create a cycle")]
    DependencyCycle { predecessor: u64, successor: u64 },
    #[error("cannot change {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
    #[error("move rejected: {}", .0.join("; "))]
    InvalidDrag(Vec<String>),
    #[error("storage error: {0}")]
    Io(#[from] io::Error),
    #[error("workspace format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Convenience for a single validation message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::Validation(vec![msg.into()])
    }

    /// True for errors the user can correct and resubmit.
    pub fn is_validation(&self) -> bool {
        !matches!(self, AppError::Io(_) | AppError::Json(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_joined() {
        let err = AppError::Validation(vec!["title is required".into(), "progress must be 0-100".into()]);
        assert_eq!(err.to_string(), "title is required; progress must be 0-100");
        assert!(err.is_validation());
    }

    #[test]
    fn io_errors_are_operation_errors() {
        let err: AppError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(!err.is_validation());
        assert!(err.to_string().starts_with("storage error"));
    }

    #[test]
    fn not_found_names_entity() {
        let err = AppError::NotFound { entity: "task", id: 7 };
        assert_eq!(err.to_string(), "task 7 not found");
    }
}
