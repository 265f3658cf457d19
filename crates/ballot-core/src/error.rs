use ballot_storage::StoreError;
use thiserror::Error;

/// Errors returned by the membership and approval services.
///
/// Everything except [`CoreError::Storage`] is an expected outcome of a
/// well-formed call against the current state.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Coarse classification for mapping onto an outer API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    InvalidState,
    InvalidArgument,
    Storage,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::InvalidState(_) => ErrorKind::InvalidState,
            CoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CoreError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Only infrastructure failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Storage(_))
    }

    /// Map a store error for an operation on `entity`.
    ///
    /// `AlreadyExists` is a uniqueness conflict. A store `Conflict` means the
    /// row left the expected state between the read and the conditional write.
    pub(crate) fn store(entity: &'static str) -> impl FnOnce(StoreError) -> CoreError {
        move |e| match e {
            StoreError::NotFound => CoreError::NotFound(entity.to_string()),
            StoreError::AlreadyExists => CoreError::Conflict(format!("{entity} already exists")),
            StoreError::Conflict => {
                CoreError::InvalidState(format!("{entity} was modified concurrently"))
            }
            StoreError::Backend(msg) => CoreError::Storage(msg),
        }
    }
}
