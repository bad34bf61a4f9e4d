use crate::error::CasError;

/// Numeric status of a lookup, matching the plugin header's codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LookupStatus {
    Success = 0,
    NotFound = 1,
    Error = 2,
}

/// Outcome of resolving a digest, handle, or action key.
///
/// `NotFound` is a normal outcome, not a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupResult<T> {
    Found(T),
    NotFound,
    Error(CasError),
}

impl<T> LookupResult<T> {
    pub fn status(&self) -> LookupStatus {
        match self {
            Self::Found(_) => LookupStatus::Success,
            Self::NotFound => LookupStatus::NotFound,
            Self::Error(_) => LookupStatus::Error,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// The payload, if found.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    /// The error, if the lookup failed.
    pub fn error(&self) -> Option<&CasError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LookupResult<U> {
        match self {
            Self::Found(value) => LookupResult::Found(f(value)),
            Self::NotFound => LookupResult::NotFound,
            Self::Error(err) => LookupResult::Error(err),
        }
    }

    /// Convert into the `Result<Option<T>>` shape used by store traits.
    pub fn into_result(self) -> Result<Option<T>, CasError> {
        match self {
            Self::Found(value) => Ok(Some(value)),
            Self::NotFound => Ok(None),
            Self::Error(err) => Err(err),
        }
    }
}

impl<T, E: Into<CasError>> From<Result<Option<T>, E>> for LookupResult<T> {
    fn from(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(Some(value)) => Self::Found(value),
            Ok(None) => Self::NotFound,
            Err(err) => Self::Error(err.into()),
        }
    }
}
