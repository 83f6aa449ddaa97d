//! The child chain block.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::{
    constants::BLOCK_INTERVAL,
    types::{BlockNumber, Timestamp},
};

/// A committed batch of transactions.
///
/// Blocks are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block number; strictly increasing across mined blocks.
    pub block_number: BlockNumber,

    /// Root of the sparse merkle tree over the included transactions.
    pub root_hash: B256,

    /// When the block was created.
    pub timestamp: Timestamp,

    /// Hashes of the included transactions, in insertion order.
    pub transactions: Vec<B256>,
}

/// Computes the number of the block that follows `previous` in a mining round.
///
/// This is always the next multiple of [`BLOCK_INTERVAL`], no matter how many deposit blocks were
/// created since the last mined block. Returns [`None`] once the block numbers are exhausted.
pub const fn next_block_number(previous: Option<BlockNumber>) -> Option<BlockNumber> {
    match previous {
        None => Some(BLOCK_INTERVAL),
        Some(previous) => (previous - (previous % BLOCK_INTERVAL)).checked_add(BLOCK_INTERVAL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_block_is_interval() {
        assert_eq!(next_block_number(None), Some(1000));
    }

    #[test]
    fn next_block_skips_deposits() {
        assert_eq!(next_block_number(Some(1000)), Some(2000));
        assert_eq!(next_block_number(Some(1001)), Some(2000));
        assert_eq!(next_block_number(Some(1999)), Some(2000));
        assert_eq!(next_block_number(Some(5)), Some(1000));
    }

    #[test]
    fn block_numbers_run_out() {
        assert_eq!(next_block_number(Some(u64::MAX - 1)), None);
        assert_eq!(next_block_number(Some(u64::MAX)), None);

        let last = u64::MAX - u64::MAX % BLOCK_INTERVAL;
        assert_eq!(next_block_number(Some(last - 1)), Some(last));
    }
}
