//! Data for the root chain's exit game, and the operator's side of it.

use std::{fmt, sync::Arc};

use plasma_db::chain::ChainDb;
use plasma_primitives::{
    coin::CoinStatus,
    exit::{ChallengeData, ExitData, ExitInfo},
    transaction::Transaction,
    types::{BlockNumber, Slot},
};
use plasma_root_chain::client::RootChainClient;
use tracing::{debug, info};

use crate::{
    errors::{ChainError, ChainResult},
    proofs::{block_proof, challenge_data, encode_mined},
};

/// The kind of challenge used against an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Challenge {
    /// The exiting transaction was spent.
    After,

    /// The parent of the exiting transaction was spent before the exit block.
    Between,

    /// The exit does not match the coin's history.
    Before,
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::After => "after",
            Self::Between => "between",
            Self::Before => "before",
        };

        f.write_str(name)
    }
}

/// Turns `NotFound` into [`None`], leaving every other error alone.
fn found<T>(result: ChainResult<T>) -> ChainResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ChainError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Produces exit and challenge data from the operator's record of the child chain.
#[derive(Debug)]
pub struct ExitEngine<Db> {
    db: Arc<Db>,
}

impl<Db: ChainDb> ExitEngine<Db> {
    /// Creates an engine that reads from `db`.
    pub const fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// Exit data for the current owner of the coin.
    pub async fn exit_data(&self, slot: Slot) -> ChainResult<ExitData> {
        let last = self
            .db
            .last_mined_transaction(slot)
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("mined transaction for slot {slot}")))?;

        self.generate_exit_data(slot, &last).await
    }

    /// Exit data for a mined transaction of the coin.
    ///
    /// A deposit has no parent, so its exit leaves the `prev_*` fields empty.
    pub async fn generate_exit_data(&self, slot: Slot, tx: &Transaction) -> ChainResult<ExitData> {
        let exiting_block = tx.mined_block.ok_or_else(|| {
            ChainError::NotFound(format!("transaction {} is not mined", tx.hash))
        })?;

        let exiting_tx_bytes = encode_mined(self.db.as_ref(), tx).await?;
        let exiting_tx_inclusion_proof = block_proof(self.db.as_ref(), slot, exiting_block).await?;

        if tx.is_deposit() {
            return Ok(ExitData {
                slot,
                prev_tx_bytes: None,
                exiting_tx_bytes,
                prev_tx_inclusion_proof: None,
                exiting_tx_inclusion_proof,
                signature: tx.signature.clone(),
                prev_block: None,
                exiting_block,
            });
        }

        let prev_block = tx.block_spent;
        let prev = self
            .db
            .mined_transaction_in_block(slot, prev_block)
            .await?
            .ok_or_else(|| {
                ChainError::NotFound(format!(
                    "parent of {} in block {prev_block}",
                    tx.hash
                ))
            })?;

        Ok(ExitData {
            slot,
            prev_tx_bytes: Some(encode_mined(self.db.as_ref(), &prev).await?),
            exiting_tx_bytes,
            prev_tx_inclusion_proof: Some(block_proof(self.db.as_ref(), slot, prev_block).await?),
            exiting_tx_inclusion_proof,
            signature: tx.signature.clone(),
            prev_block: Some(prev_block),
            exiting_block,
        })
    }

    /// A mined transaction that spends the exiting one.
    pub async fn challenge_after_data(
        &self,
        slot: Slot,
        exit_block: BlockNumber,
    ) -> ChainResult<ChallengeData> {
        let spending = self
            .db
            .mined_transactions_spending(slot, exit_block)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ChainError::NotFound(format!(
                    "transaction of slot {slot} spending block {exit_block}"
                ))
            })?;

        challenge_data(self.db.as_ref(), &spending).await
    }

    /// A mined transaction that spends the exit's parent strictly before the exit block.
    pub async fn challenge_between_data(
        &self,
        slot: Slot,
        prev_block: BlockNumber,
        exit_block: BlockNumber,
    ) -> ChainResult<ChallengeData> {
        let spending = self
            .db
            .mined_transactions_spending(slot, prev_block)
            .await?
            .into_iter()
            .find(|tx| tx.mined_block.is_some_and(|mined| mined < exit_block))
            .ok_or_else(|| {
                ChainError::NotFound(format!(
                    "transaction of slot {slot} spending block {prev_block} before block {exit_block}"
                ))
            })?;

        challenge_data(self.db.as_ref(), &spending).await
    }

    /// The most recently mined transaction of the coin that spends at most `parent_block`.
    pub async fn challenge_before_data(
        &self,
        slot: Slot,
        parent_block: BlockNumber,
    ) -> ChainResult<ChallengeData> {
        let earlier = self
            .db
            .last_mined_transaction_spending_at_most(slot, parent_block)
            .await?
            .ok_or_else(|| {
                ChainError::NotFound(format!(
                    "transaction of slot {slot} spending at most block {parent_block}"
                ))
            })?;

        challenge_data(self.db.as_ref(), &earlier).await
    }

    /// Whether the operator mined the exiting transaction on top of the claimed parent.
    async fn matches_history(&self, slot: Slot, exit: &ExitInfo) -> ChainResult<bool> {
        let exiting = self
            .db
            .mined_transaction_in_block(slot, exit.exit_block)
            .await?;

        Ok(exiting.is_some_and(|tx| tx.recipient == exit.owner && tx.block_spent == exit.prev_block))
    }

    /// Challenges the exit started for the coin, if the operator's history allows it.
    ///
    /// Challenges are attempted in the order after, between, before and the first one found is
    /// submitted. The coin goes back to `DEPOSITED` once the challenge is accepted. Returns the
    /// submitted challenge, or [`None`] if the exit could not be disputed.
    pub async fn dispute_exit(
        &self,
        slot: Slot,
        root_chain: &dyn RootChainClient,
    ) -> ChainResult<Option<Challenge>> {
        let exit = root_chain.get_exit(slot).await?;
        debug!(%slot, exit_block = exit.exit_block, prev_block = exit.prev_block, "disputing exit");

        let challenge = if let Some(data) =
            found(self.challenge_after_data(slot, exit.exit_block).await)?
        {
            root_chain.challenge_after(&data).await?;
            Challenge::After
        } else if let Some(data) = found(
            self.challenge_between_data(slot, exit.prev_block, exit.exit_block)
                .await,
        )? {
            root_chain.challenge_between(&data).await?;
            Challenge::Between
        } else if self.matches_history(slot, &exit).await? {
            debug!(%slot, "exit matches history, nothing to challenge");
            return Ok(None);
        } else if let Some(data) = found(self.challenge_before_data(slot, exit.prev_block).await)? {
            root_chain.challenge_before(&data).await?;
            Challenge::Before
        } else {
            debug!(%slot, "no transaction to challenge the exit with");
            return Ok(None);
        };

        self.db.set_coin_status(slot, CoinStatus::Deposited).await?;
        info!(%slot, %challenge, "challenged exit");

        Ok(Some(challenge))
    }
}
