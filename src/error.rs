//! Application-wide error types.

use thiserror::Error;

use crate::process::StartupError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("startup error: {0}")]
    Startup(#[from] StartupError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
