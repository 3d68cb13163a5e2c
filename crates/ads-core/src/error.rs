use thiserror::Error;

use crate::validation::ValidationErrors;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("Session expired or missing, please sign in again")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("All declarations must be confirmed before saving")]
    DeclarationsIncomplete,
    #[error("Report {0} has been sent and can no longer be modified")]
    ReportLocked(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Document rendering failed: {0}")]
    Render(String),
}

/// Coarse error families driving how a failure is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Field-scoped, shown inline, never as a notification.
    Validation,
    /// Forces logout.
    Auth,
    /// Redirects to the owning list with a notification.
    NotFound,
    /// Transient notification, operation abandoned.
    Backend,
}

impl CoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::Validation(_) | CoreError::DeclarationsIncomplete => ErrorClass::Validation,
            CoreError::Unauthorized => ErrorClass::Auth,
            CoreError::NotFound(_) => ErrorClass::NotFound,
            CoreError::Network(_)
            | CoreError::Api { .. }
            | CoreError::Decode(_)
            | CoreError::ReportLocked(_)
            | CoreError::InvalidOperation(_)
            | CoreError::Render(_) => ErrorClass::Backend,
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        CoreError::Api {
            status,
            message: message.into(),
        }
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            CoreError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(value: serde_json::Error) -> Self {
        CoreError::Decode(value.to_string())
    }
}
