use ads_config::ConfigError;
use ads_core::{CoreError, ErrorClass};
use thiserror::Error;

/// Failures surfaced by the application layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Local configuration and file failures are reported like backend ones.
    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::Core(err) => err.class(),
            AppError::Config(_) | AppError::Io(_) => ErrorClass::Backend,
        }
    }
}
