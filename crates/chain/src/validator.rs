//! Chain of custody checks performed before a transaction is accepted or mined.

use std::sync::Arc;

use async_trait::async_trait;
use plasma_db::chain::ChainDb;
use plasma_primitives::{coin::CoinStatus, signature::recover_signer, transaction::Transaction};
use thiserror::Error;
use tracing::trace;

use crate::errors::ChainResult;

/// Why a transaction cannot be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidReason {
    /// The slot has no mined history on the child chain.
    #[error("slot not in side chain")]
    SlotNotInSideChain,

    /// The transaction does not spend the block the coin was last transferred in.
    #[error("blockSpent is invalid")]
    InvalidBlockSpent,

    /// The hash does not commit to the transaction's contents.
    #[error("hash invalid")]
    InvalidHash,

    /// The sender is not the coin's last recipient.
    #[error("owner does not match")]
    OwnerMismatch,

    /// The signature is malformed or was not produced by the sender.
    #[error("invalid signature")]
    InvalidSignature,

    /// The coin is exiting or locked in a swap.
    #[error("coin state is not DEPOSITED")]
    CoinNotDeposited,

    /// The coin offered in exchange has no mined history.
    #[error("swapping slot not in side chain")]
    SwappingSlotNotInSideChain,

    /// The recipient does not own the coin offered in exchange.
    #[error("swap recipient does not own the swapping slot")]
    SwapOwnerMismatch,

    /// The coin offered in exchange is exiting or locked in another swap.
    #[error("swapping slot coin state is not DEPOSITED")]
    SwappingCoinNotDeposited,

    /// A secret was revealed for a coin whose last transaction is not a swap.
    #[error("transaction is not a swap")]
    NotASwap,

    /// The revealed secret does not open the swap's hash lock.
    #[error("secret does not match the hash lock")]
    InvalidSecret,

    /// The swap already completed or one of its coins is exiting.
    #[error("swap is not in progress")]
    SwapNotInProgress,
}

/// The verdict on a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// The transaction may be mined.
    Valid,

    /// The transaction must be rejected.
    Invalid(InvalidReason),
}

impl Validity {
    /// Whether the transaction may be mined.
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl From<InvalidReason> for Validity {
    fn from(reason: InvalidReason) -> Self {
        Self::Invalid(reason)
    }
}

/// Decides whether a transaction may be mined.
///
/// An `Err` means validity could not be determined (e.g., storage is unavailable) and says nothing
/// about the transaction itself.
#[async_trait]
pub trait TransactionValidator: Send + Sync {
    /// Validates `tx` against the current state of the child chain without modifying it.
    async fn validate(&self, tx: &Transaction) -> ChainResult<Validity>;
}

/// Validates transactions by walking the chain of custody recorded in the database.
#[derive(Debug)]
pub struct CustodyValidator<Db> {
    db: Arc<Db>,
}

impl<Db> CustodyValidator<Db> {
    /// Creates a validator that reads from `db`.
    pub const fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

impl<Db: ChainDb> CustodyValidator<Db> {
    async fn check(&self, tx: &Transaction) -> ChainResult<Result<(), InvalidReason>> {
        let Some(last) = self.db.last_mined_transaction(tx.slot).await? else {
            return Ok(Err(InvalidReason::SlotNotInSideChain));
        };

        if last.mined_block != Some(tx.block_spent) {
            return Ok(Err(InvalidReason::InvalidBlockSpent));
        }

        if tx.expected_hash() != Some(tx.hash) {
            return Ok(Err(InvalidReason::InvalidHash));
        }

        if last.recipient != tx.owner {
            return Ok(Err(InvalidReason::OwnerMismatch));
        }

        match recover_signer(&tx.hash, &tx.signature) {
            Ok(signer) if signer == tx.owner => {}
            _ => return Ok(Err(InvalidReason::InvalidSignature)),
        }

        let transferable = self
            .db
            .get_coin_state(tx.slot)
            .await?
            .is_some_and(|coin| coin.state == CoinStatus::Deposited);
        if !transferable {
            return Ok(Err(InvalidReason::CoinNotDeposited));
        }

        let Some(swapping_slot) = tx.swapping_slot() else {
            return Ok(Ok(()));
        };

        let Some(counter) = self.db.last_mined_transaction(swapping_slot).await? else {
            return Ok(Err(InvalidReason::SwappingSlotNotInSideChain));
        };

        if counter.recipient != tx.recipient {
            return Ok(Err(InvalidReason::SwapOwnerMismatch));
        }

        let counter_transferable = self
            .db
            .get_coin_state(swapping_slot)
            .await?
            .is_some_and(|coin| coin.state == CoinStatus::Deposited);
        if !counter_transferable {
            return Ok(Err(InvalidReason::SwappingCoinNotDeposited));
        }

        Ok(Ok(()))
    }
}

#[async_trait]
impl<Db: ChainDb> TransactionValidator for CustodyValidator<Db> {
    async fn validate(&self, tx: &Transaction) -> ChainResult<Validity> {
        let validity = match self.check(tx).await? {
            Ok(()) => Validity::Valid,
            Err(reason) => {
                trace!(slot = tx.slot, hash = %tx.hash, %reason, "transaction rejected");
                Validity::Invalid(reason)
            }
        };

        Ok(validity)
    }
}
