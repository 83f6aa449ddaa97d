//! Types for the RPC server.

use alloy_primitives::{Address, Bytes, B256};
use plasma_primitives::{
    transaction::{SwapTerms, Transaction},
    types::{BlockNumber, Slot},
};
use serde::{Deserialize, Serialize};

/// The terms a swap transaction commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcSwapTerms {
    /// The slot received in exchange.
    pub swapping_slot: Slot,

    /// The hash lock of the swap.
    pub hash_secret: B256,
}

/// A signed transaction as submitted by a coin owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcTransactionRequest {
    /// The hash the owner signed.
    pub hash: B256,

    /// The coin.
    pub slot: Slot,

    /// The current owner.
    pub owner: Address,

    /// The new owner.
    pub recipient: Address,

    /// The block the coin was last transferred in.
    pub block_spent: BlockNumber,

    /// The owner's signature over `hash`.
    pub signature: Bytes,

    /// Present for one side of an atomic swap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<RpcSwapTerms>,
}

impl From<RpcTransactionRequest> for Transaction {
    fn from(request: RpcTransactionRequest) -> Self {
        Self {
            hash: request.hash,
            slot: request.slot,
            owner: request.owner,
            recipient: request.recipient,
            block_spent: request.block_spent,
            mined_block: None,
            mined_timestamp: None,
            signature: request.signature,
            swap: request.swap.map(|terms| SwapTerms {
                swapping_slot: terms.swapping_slot,
                hash_secret: terms.hash_secret,
                secret: None,
                invalidated: false,
            }),
        }
    }
}

/// Outcome of revealing a swap secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcRevealStatus {
    /// The secret was recorded; the other side has not revealed yet.
    Recorded,

    /// Both secrets are known and both coins can be transferred again.
    Completed,
}
