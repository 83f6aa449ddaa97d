//! Data exchanged with the root chain's exit game.

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

use crate::types::{BlockNumber, Slot};

/// Everything a coin owner needs to start an exit on the root chain.
///
/// An exit of a freshly deposited coin has no parent and leaves the `prev_*` fields empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitData {
    /// The exiting coin.
    pub slot: Slot,

    /// Encoding of the transaction spent by the exiting one.
    pub prev_tx_bytes: Option<Bytes>,

    /// Encoding of the exiting transaction.
    pub exiting_tx_bytes: Bytes,

    /// Proof of `prev_tx_bytes` in `prev_block`.
    pub prev_tx_inclusion_proof: Option<Bytes>,

    /// Proof of `exiting_tx_bytes` in `exiting_block`.
    pub exiting_tx_inclusion_proof: Bytes,

    /// Signature of the exiting transaction.
    pub signature: Bytes,

    /// The block the parent transaction was mined in.
    pub prev_block: Option<BlockNumber>,

    /// The block the exiting transaction was mined in.
    pub exiting_block: BlockNumber,
}

impl ExitData {
    /// Whether the exit starts from a deposit, i.e., has no parent transaction.
    pub const fn is_deposit_exit(&self) -> bool {
        self.prev_block.is_none()
    }
}

/// The arguments of a `challengeAfter`, `challengeBetween` or `challengeBefore` root chain call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeData {
    /// The challenged coin.
    pub slot: Slot,

    /// Encoding of the challenging transaction.
    pub tx_bytes: Bytes,

    /// Proof of `tx_bytes` in `block_number`.
    pub proof: Bytes,

    /// Signature of the challenging transaction.
    pub signature: Bytes,

    /// The block the challenging transaction was mined in.
    pub block_number: BlockNumber,
}

/// The state of an exit as tracked by the root chain contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitState {
    /// No exit was started for the coin.
    NotExiting,

    /// An exit is in its challenge period.
    Exiting,

    /// An exit was challenged and awaits a response.
    Challenged,

    /// The exit was withdrawn back to the owner.
    Finalized,
}

impl From<u8> for ExitState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Exiting,
            2 => Self::Challenged,
            3 => Self::Finalized,
            _ => Self::NotExiting,
        }
    }
}

/// An exit as reported by the root chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    /// Who started the exit.
    pub owner: Address,

    /// The block of the parent of the exiting transaction.
    pub prev_block: BlockNumber,

    /// The block of the exiting transaction.
    pub exit_block: BlockNumber,

    /// Progress of the exit.
    pub state: ExitState,
}
