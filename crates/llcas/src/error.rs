use std::path::PathBuf;

use thiserror::Error;

use llcas_types::CasError;

/// Errors from loading or validating a [`crate::CasConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read configuration from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for CasError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Read { .. } => CasError::store(err.to_string()),
            ConfigError::Parse(_) | ConfigError::Invalid(_) => CasError::invalid_argument(err.to_string()),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
