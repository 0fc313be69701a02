//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the configuration. All of them are fatal at
/// startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The expanded text is not valid YAML for [`AppConfig`](super::AppConfig).
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// `${NAME}` without a default refers to an unset variable.
    #[error("line {line}: environment variable '{name}' is not set and has no default")]
    UndefinedVariable { name: String, line: usize },

    /// A value is out of range or inconsistent.
    #[error("config validation error: {0}")]
    ValidationError(String),
}
