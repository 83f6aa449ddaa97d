//! Traits for the RPC server.

use alloy_primitives::{Bytes, B256};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use plasma_primitives::{
    block::Block,
    coin::CoinState,
    exit::{ChallengeData, ExitData},
    types::{BlockNumber, Slot},
};

use crate::types::{RpcRevealStatus, RpcTransactionRequest};

/// RPCs related to information about the operator itself.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "plasma"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "plasma"))]
pub trait PlasmaControlApi {
    /// Get the uptime for the operator in seconds assuming the clock is strictly monotonically
    /// increasing.
    #[method(name = "uptime")]
    async fn get_uptime(&self) -> RpcResult<u64>;
}

/// RPCs that drive and query the child chain.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "plasma"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "plasma"))]
pub trait PlasmaChainApi {
    /// Submit a signed transaction, returning its hash once it is pending.
    #[method(name = "submitTransaction")]
    async fn submit_transaction(&self, tx: RpcTransactionRequest) -> RpcResult<B256>;

    /// Reveal the secret of the swap that last moved a coin.
    #[method(name = "revealSecret")]
    async fn reveal_secret(&self, slot: Slot, secret: B256) -> RpcResult<RpcRevealStatus>;

    /// Call off the unfinished swap that last moved a coin, handing both coins back.
    #[method(name = "invalidateSwap")]
    async fn invalidate_swap(&self, slot: Slot) -> RpcResult<()>;

    /// Run a mining round now instead of waiting for the next scheduled one.
    #[method(name = "mineBlock")]
    async fn mine_block(&self) -> RpcResult<Block>;

    /// Get a block by number.
    #[method(name = "block")]
    async fn get_block(&self, block_number: BlockNumber) -> RpcResult<Block>;

    /// Get the merkle proof of a coin's entry (or absence) in a block.
    #[method(name = "proof")]
    async fn get_proof(&self, slot: Slot, block_number: BlockNumber) -> RpcResult<Bytes>;

    /// Get the merkle proof of a coin's swap secret in the secret tree of a block.
    #[method(name = "secretProof")]
    async fn get_secret_proof(&self, slot: Slot, block_number: BlockNumber) -> RpcResult<Bytes>;

    /// Get the operator's view of a coin, if it was ever deposited.
    #[method(name = "coinState")]
    async fn get_coin_state(&self, slot: Slot) -> RpcResult<Option<CoinState>>;
}

/// RPCs that serve the data consumed by the root chain's exit game.
///
/// These make it possible for coin owners and watchers to exit and to challenge without trusting
/// the operator to do it for them.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "plasma"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "plasma"))]
pub trait PlasmaExitApi {
    /// Get everything needed to exit a coin from its current owner.
    #[method(name = "exitData")]
    async fn get_exit_data(&self, slot: Slot) -> RpcResult<ExitData>;

    /// Get a transaction that spends the exiting one.
    #[method(name = "challengeAfterData")]
    async fn get_challenge_after_data(
        &self,
        slot: Slot,
        exit_block: BlockNumber,
    ) -> RpcResult<ChallengeData>;

    /// Get a transaction that spends the exit's parent before the exit block.
    #[method(name = "challengeBetweenData")]
    async fn get_challenge_between_data(
        &self,
        slot: Slot,
        prev_block: BlockNumber,
        exit_block: BlockNumber,
    ) -> RpcResult<ChallengeData>;

    /// Get an earlier transaction of the coin's history.
    #[method(name = "challengeBeforeData")]
    async fn get_challenge_before_data(
        &self,
        slot: Slot,
        parent_block: BlockNumber,
    ) -> RpcResult<ChallengeData>;
}
