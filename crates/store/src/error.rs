use thiserror::Error;

use shopdesk_core::DomainError;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository failure.
///
/// `Storage` covers infrastructure problems (connection, row decoding); the
/// other variants are deterministic outcomes of the request itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl RepoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<DomainError> for RepoError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => RepoError::Validation(msg),
            DomainError::NotFound => RepoError::NotFound("record"),
            DomainError::Conflict(msg) => RepoError::Conflict(msg),
        }
    }
}
