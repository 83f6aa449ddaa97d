//! This module contains the models for the database tables.
//!
//! These models rely on some common types in [`super::types`] module.

use alloy_primitives::Bytes;
use plasma_primitives::{
    block::Block,
    coin::CoinState,
    transaction::{SwapTerms, Transaction},
};

use super::{
    errors::StorageError,
    types::{from_db_int, DbAddress, DbCoinStatus, DbHash, DbSlot},
};

/// The model for a child chain transaction.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct TransactionRow {
    /// The hex-serialized transaction hash stored as `TEXT`.
    pub(super) hash: DbHash,

    pub(super) slot: DbSlot,

    pub(super) owner: DbAddress,

    pub(super) recipient: DbAddress,

    pub(super) block_spent: i64,

    /// `NULL` while the transaction is pending.
    pub(super) mined_block: Option<i64>,

    pub(super) mined_timestamp: Option<i64>,

    /// The raw signature stored as `BLOB`.
    pub(super) signature: Vec<u8>,

    /// The slot on the other side of the swap, `NULL` for plain transfers.
    pub(super) swapping_slot: Option<DbSlot>,

    pub(super) hash_secret: Option<DbHash>,

    pub(super) secret: Option<DbHash>,

    pub(super) invalidated: bool,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StorageError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let swap = match (row.swapping_slot, row.hash_secret) {
            (Some(swapping_slot), Some(hash_secret)) => Some(SwapTerms {
                swapping_slot: *swapping_slot,
                hash_secret: *hash_secret,
                secret: row.secret.map(|secret| *secret),
                invalidated: row.invalidated,
            }),
            (None, None) => None,
            _ => {
                return Err(StorageError::InvalidData(format!(
                    "transaction {} has incomplete swap terms",
                    *row.hash
                )))
            }
        };

        Ok(Self {
            hash: *row.hash,
            slot: *row.slot,
            owner: *row.owner,
            recipient: *row.recipient,
            block_spent: from_db_int(row.block_spent)?,
            mined_block: row.mined_block.map(from_db_int).transpose()?,
            mined_timestamp: row.mined_timestamp.map(from_db_int).transpose()?,
            signature: Bytes::from(row.signature),
            swap,
        })
    }
}

/// The model for a block header; its transactions live in `block_transactions`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct BlockRow {
    pub(super) block_number: i64,

    /// The hex-serialized merkle root stored as `TEXT`.
    pub(super) root_hash: DbHash,

    pub(super) timestamp: i64,
}

impl BlockRow {
    /// Assembles the block from its header and the ordered hashes of its transactions.
    pub(super) fn into_block(self, transactions: Vec<DbHash>) -> Result<Block, StorageError> {
        Ok(Block {
            block_number: from_db_int(self.block_number)?,
            root_hash: *self.root_hash,
            timestamp: from_db_int(self.timestamp)?,
            transactions: transactions.into_iter().map(|hash| *hash).collect(),
        })
    }
}

/// The model for the operator's view of a coin.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct CoinStateRow {
    pub(super) slot: DbSlot,

    pub(super) state: DbCoinStatus,

    pub(super) owner: DbAddress,
}

impl From<CoinStateRow> for CoinState {
    fn from(row: CoinStateRow) -> Self {
        Self {
            slot: *row.slot,
            state: *row.state,
            owner: *row.owner,
        }
    }
}
