//! Errors returned by the child chain engine.

use plasma_db::errors::{Conflict, DbError};
use plasma_primitives::errors::EncodingError;
use plasma_root_chain::errors::RootChainError;
use thiserror::Error;

use crate::validator::InvalidReason;

/// Errors that can occur while operating the child chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A submitted transaction or secret was rejected.
    #[error("invalid transaction: {0}")]
    Validation(#[from] InvalidReason),

    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write collides with existing state.
    #[error("conflict: {0}")]
    Conflict(#[from] Conflict),

    /// Storage, the root chain or an invariant of the engine failed.
    #[error("internal: {0}")]
    Internal(String),
}

impl From<DbError> for ChainError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Storage(e) => Self::Internal(format!("storage: {e}")),
            DbError::Conflict(conflict) => Self::Conflict(conflict),
            DbError::NotFound(missing) => Self::NotFound(missing.to_string()),
        }
    }
}

impl From<RootChainError> for ChainError {
    fn from(err: RootChainError) -> Self {
        Self::Internal(format!("root chain: {err}"))
    }
}

impl From<EncodingError> for ChainError {
    fn from(err: EncodingError) -> Self {
        Self::Internal(format!("encoding: {err}"))
    }
}

/// Result of a child chain operation.
pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use plasma_db::errors::Missing;

    use super::*;

    #[test]
    fn storage_errors_keep_their_kind() {
        let err: ChainError = DbError::Conflict(Conflict::BlockExists(1000)).into();
        assert!(matches!(err, ChainError::Conflict(Conflict::BlockExists(1000))));

        let err: ChainError = DbError::NotFound(Missing::Coin(4)).into();
        assert_eq!(err.to_string(), "not found: coin state for slot 4");
    }

    #[test]
    fn invalid_reason_is_the_message() {
        let err = ChainError::from(InvalidReason::OwnerMismatch);
        assert_eq!(err.to_string(), "invalid transaction: owner does not match");
    }
}
