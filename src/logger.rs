//! Logging initialisation via tracing-subscriber.
//!
//! The configured `log_level` is an `EnvFilter` directive string: a bare
//! level (`"info"`) or per-target directives (`"warn,svcnode=debug"`).
//! `RUST_LOG`, when set and valid, overrides it.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Parse `directives` into an [`EnvFilter`].
///
/// Config loading runs this up front so a bad level fails as a config error
/// before anything is started.
pub fn parse_directives(directives: &str) -> Result<EnvFilter, AppError> {
    if directives.trim().is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    EnvFilter::try_new(directives)
        .map_err(|e| AppError::Logger(format!("invalid log level '{directives}': {e}")))
}

/// Install the global subscriber, writing to stderr.
pub fn init(directives: &str) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_directives(directives)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}
