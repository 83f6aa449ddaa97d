//! The interface the operator needs from the root chain.

use alloy::primitives::B256;
use async_trait::async_trait;
use plasma_primitives::{
    exit::{ChallengeData, ExitInfo},
    types::{BlockNumber, Slot},
};

use crate::errors::RootChainResult;

/// Write and read access to the root chain contract.
///
/// Every write returns the hash of the root chain transaction once it has been included.
#[async_trait]
pub trait RootChainClient: Send + Sync {
    /// Anchors the root of a child chain block.
    async fn submit_block(&self, block_number: BlockNumber, root: B256) -> RootChainResult<B256>;

    /// Challenges an exit with a transaction that spends the exiting one.
    async fn challenge_after(&self, challenge: &ChallengeData) -> RootChainResult<B256>;

    /// Challenges an exit with a transaction that spends its parent before the exit block.
    async fn challenge_between(&self, challenge: &ChallengeData) -> RootChainResult<B256>;

    /// Challenges an exit with an earlier transaction of the coin's history.
    async fn challenge_before(&self, challenge: &ChallengeData) -> RootChainResult<B256>;

    /// Reads the exit currently recorded for a coin.
    async fn get_exit(&self, slot: Slot) -> RootChainResult<ExitInfo>;
}
