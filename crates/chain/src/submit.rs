//! Intake of transactions and swap secrets from coin owners.

use std::sync::Arc;

use alloy_primitives::B256;
use plasma_db::chain::ChainDb;
use plasma_primitives::{coin::CoinStatus, transaction::Transaction, types::Slot};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    errors::{ChainError, ChainResult},
    validator::{InvalidReason, TransactionValidator, Validity},
};

/// Accepts transactions into the pending pool and records revealed swap secrets.
pub struct Submitter<Db> {
    db: Arc<Db>,

    validator: Arc<dyn TransactionValidator>,

    /// Serializes secret reveals and invalidations so a swap cannot complete and be called off at
    /// the same time.
    swaps: Mutex<()>,
}

impl<Db> std::fmt::Debug for Submitter<Db> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submitter").finish_non_exhaustive()
    }
}

impl<Db: ChainDb> Submitter<Db> {
    /// Creates a new submitter.
    pub fn new(db: Arc<Db>, validator: Arc<dyn TransactionValidator>) -> Self {
        Self {
            db,
            validator,
            swaps: Mutex::new(()),
        }
    }

    /// Validates `tx` and stores it as pending.
    ///
    /// Nothing is stored if the transaction is invalid.
    pub async fn submit_transaction(&self, tx: Transaction) -> ChainResult<B256> {
        if let Validity::Invalid(reason) = self.validator.validate(&tx).await? {
            return Err(reason.into());
        }

        let tx = Transaction {
            mined_block: None,
            mined_timestamp: None,
            ..tx
        };
        self.db.insert_transaction(&tx).await?;
        info!(slot = tx.slot, hash = %tx.hash, "accepted transaction");

        Ok(tx.hash)
    }

    /// Records the secret of the swap that last moved the coin.
    ///
    /// Once both sides of the swap have revealed their secret, both coins can be transferred again.
    /// Returns whether that happened with this reveal.
    pub async fn reveal_secret(&self, slot: Slot, secret: B256) -> ChainResult<bool> {
        let _guard = self.swaps.lock().await;

        let swap = self
            .db
            .last_mined_transaction(slot)
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("mined transaction for slot {slot}")))?;

        let (Some(swapping_slot), Some(mined_block)) = (swap.swapping_slot(), swap.mined_block)
        else {
            return Err(InvalidReason::NotASwap.into());
        };

        if !swap.opens_hash_lock(&secret) {
            return Err(InvalidReason::InvalidSecret.into());
        }

        self.db.set_swap_secret(swap.hash, secret).await?;
        info!(%slot, hash = %swap.hash, "revealed swap secret");

        let counter_revealed = self
            .db
            .mined_transaction_in_block(swapping_slot, mined_block)
            .await?
            .is_some_and(|counter| counter.secret().is_some());
        if !counter_revealed {
            return Ok(false);
        }

        self.db.set_coin_status(slot, CoinStatus::Deposited).await?;
        self.db
            .set_coin_status(swapping_slot, CoinStatus::Deposited)
            .await?;
        info!(%slot, %swapping_slot, "swap completed");

        Ok(true)
    }

    /// Calls off the swap that last moved the coin, as long as it has not completed.
    ///
    /// Both sides of the swap are invalidated and both coins go back to their previous owners, who
    /// can transfer them again by spending the blocks the swaps spent.
    pub async fn invalidate_swap(&self, slot: Slot) -> ChainResult<()> {
        let _guard = self.swaps.lock().await;

        let swap = self
            .db
            .last_mined_transaction(slot)
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("mined transaction for slot {slot}")))?;

        let (Some(swapping_slot), Some(mined_block)) = (swap.swapping_slot(), swap.mined_block)
        else {
            return Err(InvalidReason::NotASwap.into());
        };

        let counter = self
            .db
            .mined_transaction_in_block(swapping_slot, mined_block)
            .await?
            .filter(|counter| counter.swapping_slot() == Some(slot))
            .ok_or_else(|| {
                ChainError::Internal(format!(
                    "swap on slot {slot} has no counterpart in block {mined_block}"
                ))
            })?;

        for side in [slot, swapping_slot] {
            let status = self.db.get_coin_state(side).await?.map(|coin| coin.state);
            if status != Some(CoinStatus::Swapping) {
                return Err(InvalidReason::SwapNotInProgress.into());
            }
        }

        self.db.invalidate_swaps(&[swap, counter]).await?;
        info!(%slot, %swapping_slot, block_number = mined_block, "swap invalidated");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use plasma_db::{coins::CoinDb, inmemory::InMemoryDb, transactions::TransactionDb};
    use plasma_primitives::constants::SMT_DEPTH;
    use plasma_smt::{verify, SparseMerkleTree};
    use plasma_test_utils::prelude::*;

    use super::*;
    use crate::{producer::BlockProducer, validator::CustodyValidator};

    fn setup() -> (Arc<InMemoryDb>, BlockProducer<InMemoryDb>, Submitter<InMemoryDb>) {
        let db = Arc::new(InMemoryDb::new());
        let validator: Arc<dyn TransactionValidator> = Arc::new(CustodyValidator::new(db.clone()));

        (
            db.clone(),
            BlockProducer::new(db.clone(), validator.clone(), None),
            Submitter::new(db, validator),
        )
    }

    #[tokio::test]
    async fn invalid_transactions_are_not_stored() {
        let (db, producer, submitter) = setup();
        let [alice, bob] = Account::many();
        producer.deposit_block(1, 1, alice.address()).await.unwrap();

        let stolen = signed_transfer(1, &bob, &bob, 1);
        let err = submitter.submit_transaction(stolen.clone()).await;
        assert!(matches!(
            err,
            Err(ChainError::Validation(InvalidReason::OwnerMismatch))
        ));
        assert!(db.get_transaction(stolen.hash).await.unwrap().is_none());

        let transfer = signed_transfer(1, &alice, &bob, 1);
        let hash = submitter.submit_transaction(transfer.clone()).await.unwrap();
        assert_eq!(hash, transfer.hash);
        assert_eq!(db.pending_transactions().await.unwrap(), vec![transfer]);
    }

    #[tokio::test]
    async fn swap_completes_once_both_secrets_are_revealed() {
        let (db, producer, submitter) = setup();
        let [alice, bob] = Account::many();
        producer.deposit_block(1, 1, alice.address()).await.unwrap();
        producer.deposit_block(2, 2, bob.address()).await.unwrap();

        let (alice_secret, bob_secret) = (secret(1), secret(2));
        submitter
            .submit_transaction(signed_swap(1, &alice, &bob, 1, 2, &alice_secret))
            .await
            .unwrap();
        submitter
            .submit_transaction(signed_swap(2, &bob, &alice, 2, 1, &bob_secret))
            .await
            .unwrap();
        let block = producer.mine_block().await.unwrap();

        assert!(matches!(
            submitter.reveal_secret(1, bob_secret).await,
            Err(ChainError::Validation(InvalidReason::InvalidSecret))
        ));

        assert!(!submitter.reveal_secret(1, alice_secret).await.unwrap());
        assert_eq!(
            db.get_coin_state(1).await.unwrap().map(|coin| coin.state),
            Some(CoinStatus::Swapping)
        );

        assert!(submitter.reveal_secret(2, bob_secret).await.unwrap());
        for slot in [1, 2] {
            assert_eq!(
                db.get_coin_state(slot).await.unwrap().map(|coin| coin.state),
                Some(CoinStatus::Deposited)
            );
        }

        let secrets = SparseMerkleTree::with_leaves(BTreeMap::from([
            (1, alice_secret),
            (2, bob_secret),
        ]));
        let proof = producer.get_secret_proof(1, block.block_number).await.unwrap();
        assert!(verify(SMT_DEPTH, &secrets.root(), &proof, 1, &alice_secret));
    }

    #[tokio::test]
    async fn invalidated_swap_releases_both_coins() {
        let (db, producer, submitter) = setup();
        let [alice, bob, carol] = Account::many();
        producer.deposit_block(1, 1, alice.address()).await.unwrap();
        producer.deposit_block(2, 2, bob.address()).await.unwrap();

        let (alice_secret, bob_secret) = (secret(1), secret(2));
        submitter
            .submit_transaction(signed_swap(1, &alice, &bob, 1, 2, &alice_secret))
            .await
            .unwrap();
        submitter
            .submit_transaction(signed_swap(2, &bob, &alice, 2, 1, &bob_secret))
            .await
            .unwrap();
        producer.mine_block().await.unwrap();

        // bob keeps his secret, so alice calls the swap off
        assert!(!submitter.reveal_secret(1, alice_secret).await.unwrap());
        submitter.invalidate_swap(1).await.unwrap();

        for (slot, owner) in [(1, alice.address()), (2, bob.address())] {
            let coin = db.get_coin_state(slot).await.unwrap().unwrap();
            assert_eq!(coin.owner, owner, "slot {slot} goes back to its previous owner");
            assert_eq!(coin.state, CoinStatus::Deposited);
        }

        assert!(matches!(
            submitter.reveal_secret(2, bob_secret).await,
            Err(ChainError::Validation(InvalidReason::NotASwap))
        ));
        assert!(matches!(
            submitter.invalidate_swap(1).await,
            Err(ChainError::Validation(InvalidReason::NotASwap))
        ));

        // the swapped-to owner no longer holds the coin
        assert!(matches!(
            submitter
                .submit_transaction(signed_transfer(1, &bob, &carol, 1000))
                .await,
            Err(ChainError::Validation(_))
        ));
        submitter
            .submit_transaction(signed_transfer(1, &alice, &carol, 1))
            .await
            .unwrap();
        let block = producer.mine_block().await.unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(
            db.get_coin_state(1).await.unwrap().map(|coin| coin.owner),
            Some(carol.address())
        );
    }

    #[tokio::test]
    async fn completed_swaps_cannot_be_invalidated() {
        let (_, producer, submitter) = setup();
        let [alice, bob] = Account::many();
        producer.deposit_block(1, 1, alice.address()).await.unwrap();
        producer.deposit_block(2, 2, bob.address()).await.unwrap();

        let (alice_secret, bob_secret) = (secret(1), secret(2));
        submitter
            .submit_transaction(signed_swap(1, &alice, &bob, 1, 2, &alice_secret))
            .await
            .unwrap();
        submitter
            .submit_transaction(signed_swap(2, &bob, &alice, 2, 1, &bob_secret))
            .await
            .unwrap();
        producer.mine_block().await.unwrap();
        submitter.reveal_secret(1, alice_secret).await.unwrap();
        submitter.reveal_secret(2, bob_secret).await.unwrap();

        assert!(matches!(
            submitter.invalidate_swap(2).await,
            Err(ChainError::Validation(InvalidReason::SwapNotInProgress))
        ));
    }

    #[tokio::test]
    async fn only_swaps_have_secrets() {
        let (_, producer, submitter) = setup();
        let [alice] = Account::many();
        producer.deposit_block(1, 1, alice.address()).await.unwrap();

        assert!(matches!(
            submitter.reveal_secret(1, secret(1)).await,
            Err(ChainError::Validation(InvalidReason::NotASwap))
        ));
        assert!(matches!(
            submitter.reveal_secret(2, secret(1)).await,
            Err(ChainError::NotFound(_))
        ));
    }
}
