//! Errors returned by every storage backend.

use alloy_primitives::B256;
use plasma_primitives::types::{BlockNumber, Slot};
use thiserror::Error;

use crate::persistent::errors::StorageError;

/// A write that would violate a uniqueness invariant of the child chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    /// A block with this number already exists.
    #[error("block {0} already exists")]
    BlockExists(BlockNumber),

    /// A transaction with this hash already exists.
    #[error("transaction {0} already exists")]
    TransactionExists(B256),

    /// The slot already has a history on the child chain.
    #[error("slot {0} was already deposited")]
    SlotExists(Slot),

    /// The transaction was already included in a block.
    #[error("transaction {0} was already mined")]
    AlreadyMined(B256),
}

/// An entry that an update expected to exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Missing {
    /// No transaction with this hash.
    #[error("transaction {0}")]
    Transaction(B256),

    /// No coin state for this slot.
    #[error("coin state for slot {0}")]
    Coin(Slot),

    /// No mined swap with this hash.
    #[error("mined swap {0}")]
    MinedSwap(B256),
}

/// Errors that can occur when interacting with the storage layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// The backend failed to execute the operation.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// The write would violate a uniqueness invariant.
    #[error("conflict: {0}")]
    Conflict(#[from] Conflict),

    /// The write refers to an entry that does not exist.
    #[error("not found: {0}")]
    NotFound(#[from] Missing),
}

/// Result of a storage operation.
pub type DbResult<T> = Result<T, DbError>;
