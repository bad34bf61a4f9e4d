use llcas_types::CasError;

/// Errors from building an executor.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The executor configuration is unusable.
    #[error("invalid executor configuration: {0}")]
    InvalidConfig(String),

    /// The runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<ExecError> for CasError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::InvalidConfig(_) => CasError::invalid_argument(err.to_string()),
            ExecError::Runtime(_) => CasError::store(err.to_string()),
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
