//! Writes that span several repositories and must be applied atomically.

use async_trait::async_trait;
use plasma_primitives::{block::Block, coin::CoinState, transaction::Transaction};

use crate::{blocks::BlockDb, coins::CoinDb, errors::DbResult, transactions::TransactionDb};

/// The complete storage interface required by the operator.
#[async_trait]
pub trait ChainDb: TransactionDb + BlockDb + CoinDb + Send + Sync {
    /// Records a root chain deposit: the coin, its synthetic deposit transaction and the block that
    /// includes it.
    ///
    /// The transaction is stored as mined in `block`. Nothing is written if the block number is
    /// taken or if the slot already has a coin or any transaction.
    async fn insert_deposit(&self, coin: CoinState, tx: &Transaction, block: &Block)
        -> DbResult<()>;

    /// Commits a mined block.
    ///
    /// Every transaction in `mined` must be pending; each one is marked as mined in `block` at
    /// `block.timestamp`, and the coin it transfers is handed to its recipient (and put in the
    /// swapping state if it is a swap). Nothing is written if the block number is taken or if any
    /// transaction was already mined.
    async fn commit_block(&self, block: &Block, mined: &[Transaction]) -> DbResult<()>;

    /// Calls off mined swaps.
    ///
    /// Each transaction is flagged as invalidated and its coin goes back to the swap's owner in the
    /// deposited state. Nothing is written if any of the transactions is unknown or is not a mined
    /// swap.
    async fn invalidate_swaps(&self, swaps: &[Transaction]) -> DbResult<()>;
}
