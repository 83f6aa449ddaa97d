//! Repository of child chain transactions.

use alloy_primitives::B256;
use async_trait::async_trait;
use plasma_primitives::{
    transaction::Transaction,
    types::{BlockNumber, Slot},
};

use crate::errors::DbResult;

/// Access to the transaction history of every slot, mined and pending.
///
/// Queries that return several transactions return them in the order they were inserted, unless
/// stated otherwise. The per-slot history queries skip invalidated swaps since those no longer move
/// the coin; [`transactions_in_block`](Self::transactions_in_block) still returns them.
#[async_trait]
pub trait TransactionDb {
    /// Gets, if present, the transaction with the given hash.
    async fn get_transaction(&self, hash: B256) -> DbResult<Option<Transaction>>;

    /// Inserts a new pending transaction.
    ///
    /// Fails with a conflict if a transaction with the same hash exists.
    async fn insert_transaction(&self, tx: &Transaction) -> DbResult<()>;

    /// Permanently removes a pending transaction. Removing an unknown hash is a no-op.
    async fn delete_transaction(&self, hash: B256) -> DbResult<()>;

    /// Gets all the transactions that have not been mined yet.
    async fn pending_transactions(&self) -> DbResult<Vec<Transaction>>;

    /// Whether the slot has any transaction at all, mined or pending.
    async fn has_transactions(&self, slot: Slot) -> DbResult<bool>;

    /// Gets, if present, the transaction of the slot that was mined in the highest block.
    async fn last_mined_transaction(&self, slot: Slot) -> DbResult<Option<Transaction>>;

    /// Gets, if present, the transaction of the slot that was mined in the given block.
    async fn mined_transaction_in_block(
        &self,
        slot: Slot,
        block_number: BlockNumber,
    ) -> DbResult<Option<Transaction>>;

    /// Gets the mined transactions of the slot that spend the given block, ordered by the block
    /// they were mined in.
    async fn mined_transactions_spending(
        &self,
        slot: Slot,
        block_spent: BlockNumber,
    ) -> DbResult<Vec<Transaction>>;

    /// Gets, if present, the most recently mined transaction of the slot whose `block_spent` is at
    /// most `block_number`.
    async fn last_mined_transaction_spending_at_most(
        &self,
        slot: Slot,
        block_number: BlockNumber,
    ) -> DbResult<Option<Transaction>>;

    /// Gets the transactions included in the given block.
    async fn transactions_in_block(&self, block_number: BlockNumber) -> DbResult<Vec<Transaction>>;

    /// Records the revealed secret of a swap transaction.
    async fn set_swap_secret(&self, hash: B256, secret: B256) -> DbResult<()>;
}
