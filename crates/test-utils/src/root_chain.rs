//! An in-process root chain.

use std::collections::HashMap;

use alloy_primitives::{keccak256, B256};
use async_trait::async_trait;
use plasma_primitives::{
    exit::{ChallengeData, ExitInfo},
    types::{BlockNumber, Slot},
};
use plasma_root_chain::{
    client::RootChainClient,
    errors::{RootChainError, RootChainResult},
};
use tokio::sync::Mutex;

/// A call received by the [`MockRootChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootChainCall {
    /// `submitBlock`.
    SubmitBlock(BlockNumber, B256),

    /// `challengeAfter`.
    ChallengeAfter(ChallengeData),

    /// `challengeBetween`.
    ChallengeBetween(ChallengeData),

    /// `challengeBefore`.
    ChallengeBefore(ChallengeData),
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<RootChainCall>,
    exits: HashMap<Slot, ExitInfo>,
    reject_writes: bool,
}

/// A [`RootChainClient`] that accepts every write and records it.
#[derive(Debug, Default)]
pub struct MockRootChain {
    state: Mutex<State>,
}

impl MockRootChain {
    /// Creates a root chain with no exits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an exit to be returned by [`RootChainClient::get_exit`].
    pub async fn set_exit(&self, slot: Slot, exit: ExitInfo) {
        self.state.lock().await.exits.insert(slot, exit);
    }

    /// Makes every subsequent write fail.
    pub async fn reject_writes(&self) {
        self.state.lock().await.reject_writes = true;
    }

    /// All the writes received so far, in order.
    pub async fn calls(&self) -> Vec<RootChainCall> {
        self.state.lock().await.calls.clone()
    }

    async fn record(&self, call: RootChainCall) -> RootChainResult<B256> {
        let mut state = self.state.lock().await;
        if state.reject_writes {
            return Err(RootChainError::Reverted(B256::ZERO));
        }

        let tx_hash = keccak256((state.calls.len() as u64).to_be_bytes());
        state.calls.push(call);

        Ok(tx_hash)
    }
}

#[async_trait]
impl RootChainClient for MockRootChain {
    async fn submit_block(&self, block_number: BlockNumber, root: B256) -> RootChainResult<B256> {
        self.record(RootChainCall::SubmitBlock(block_number, root))
            .await
    }

    async fn challenge_after(&self, challenge: &ChallengeData) -> RootChainResult<B256> {
        self.record(RootChainCall::ChallengeAfter(challenge.clone()))
            .await
    }

    async fn challenge_between(&self, challenge: &ChallengeData) -> RootChainResult<B256> {
        self.record(RootChainCall::ChallengeBetween(challenge.clone()))
            .await
    }

    async fn challenge_before(&self, challenge: &ChallengeData) -> RootChainResult<B256> {
        self.record(RootChainCall::ChallengeBefore(challenge.clone()))
            .await
    }

    async fn get_exit(&self, slot: Slot) -> RootChainResult<ExitInfo> {
        self.state
            .lock()
            .await
            .exits
            .get(&slot)
            .copied()
            .ok_or_else(|| RootChainError::Decode(format!("no exit for slot {slot}")))
    }
}
