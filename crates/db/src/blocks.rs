//! Repository of child chain blocks.

use async_trait::async_trait;
use plasma_primitives::{block::Block, types::BlockNumber};

use crate::errors::DbResult;

/// Read access to the committed blocks.
///
/// Blocks are only ever written through [`ChainDb`](crate::chain::ChainDb) since their creation
/// must be atomic with the update of the transactions they include.
#[async_trait]
pub trait BlockDb {
    /// Gets, if present, the block with the given number.
    async fn get_block(&self, block_number: BlockNumber) -> DbResult<Option<Block>>;

    /// Gets, if any, the block with the highest number.
    async fn latest_block(&self) -> DbResult<Option<Block>>;
}
