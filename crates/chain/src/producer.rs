//! Block production: mining rounds, deposit blocks and inclusion proofs.

use std::{collections::BTreeMap, sync::Arc};

use alloy_primitives::{Address, Bytes};
use plasma_db::chain::ChainDb;
use plasma_primitives::{
    block::{next_block_number, Block},
    coin::CoinState,
    transaction::Transaction,
    types::{BlockNumber, Slot, Timestamp},
};
use plasma_root_chain::client::RootChainClient;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    errors::{ChainError, ChainResult},
    proofs::{block_proof, block_transactions, secret_tree, transaction_tree},
    validator::{TransactionValidator, Validity},
};

fn now() -> Timestamp {
    to_timestamp(chrono::Utc::now().timestamp())
}

/// Clamps a clock reading from before the unix epoch to `0`.
fn to_timestamp(secs: i64) -> Timestamp {
    Timestamp::try_from(secs).unwrap_or_else(|_| {
        warn!(%secs, "system clock is set before the unix epoch, timestamping with 0");
        0
    })
}

/// Whether a winning transaction can be mined alongside the other winners of the round.
///
/// A swap only goes in together with the swap it is paired with.
fn is_paired(tx: &Transaction, winners: &BTreeMap<Slot, (usize, Transaction)>) -> bool {
    match tx.swapping_slot() {
        None => true,
        Some(swapping_slot) => winners
            .get(&swapping_slot)
            .is_some_and(|(_, counter)| counter.swapping_slot() == Some(tx.slot)),
    }
}

/// Creates the blocks of the child chain.
///
/// Mining rounds and deposits are serialized so that block numbers are assigned and persisted one
/// at a time.
pub struct BlockProducer<Db> {
    db: Arc<Db>,

    validator: Arc<dyn TransactionValidator>,

    /// [`None`] in chain-less mode, where blocks are never submitted.
    root_chain: Option<Arc<dyn RootChainClient>>,

    mining: Mutex<()>,
}

impl<Db> std::fmt::Debug for BlockProducer<Db> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockProducer")
            .field("chainless", &self.root_chain.is_none())
            .finish_non_exhaustive()
    }
}

impl<Db: ChainDb> BlockProducer<Db> {
    /// Creates a new producer.
    pub fn new(
        db: Arc<Db>,
        validator: Arc<dyn TransactionValidator>,
        root_chain: Option<Arc<dyn RootChainClient>>,
    ) -> Self {
        Self {
            db,
            validator,
            root_chain,
            mining: Mutex::new(()),
        }
    }

    /// Runs a mining round.
    ///
    /// Pending transactions are grouped by slot in the order they were submitted. The first valid
    /// transaction of each group wins the slot; invalid transactions met on the way are deleted and
    /// the ones after the winner stay pending. Swaps whose counterpart did not win are left pending
    /// for a later round.
    ///
    /// The block is committed before it is submitted to the root chain, and is only returned once
    /// the submission went through (or was skipped in chain-less mode).
    pub async fn mine_block(&self) -> ChainResult<Block> {
        let _round = self.mining.lock().await;

        let previous = self.db.latest_block().await?.map(|block| block.block_number);
        let block_number = next_block_number(previous).ok_or_else(|| {
            ChainError::Internal(format!("no block number left after block {previous:?}"))
        })?;
        let pending = self.db.pending_transactions().await?;

        let mut candidates: BTreeMap<Slot, Vec<(usize, Transaction)>> = BTreeMap::new();
        for (position, tx) in pending.into_iter().enumerate() {
            candidates.entry(tx.slot).or_default().push((position, tx));
        }

        let mut winners: BTreeMap<Slot, (usize, Transaction)> = BTreeMap::new();
        for (slot, group) in candidates {
            for (position, tx) in group {
                match self.validator.validate(&tx).await? {
                    Validity::Valid => {
                        // keyed by slot: at most one winner per slot
                        winners.insert(slot, (position, tx));
                        break;
                    }
                    Validity::Invalid(reason) => {
                        debug!(%slot, hash = %tx.hash, %reason, "dropping invalid transaction");
                        self.db.delete_transaction(tx.hash).await?;
                    }
                }
            }
        }

        let unpaired: Vec<Slot> = winners
            .iter()
            .filter(|(_, (_, tx))| !is_paired(tx, &winners))
            .map(|(slot, _)| *slot)
            .collect();
        for slot in unpaired {
            debug!(%slot, "holding back swap without counterpart");
            winners.remove(&slot);
        }

        let mut mined: Vec<(usize, Transaction)> = winners.into_values().collect();
        mined.sort_by_key(|(position, _)| *position);
        let mined: Vec<Transaction> = mined.into_iter().map(|(_, tx)| tx).collect();

        let block = Block {
            block_number,
            root_hash: transaction_tree(&mined).root(),
            timestamp: now(),
            transactions: mined.iter().map(|tx| tx.hash).collect(),
        };

        self.db.commit_block(&block, &mined).await?;
        info!(
            block_number = block.block_number,
            root = %block.root_hash,
            num_txs = mined.len(),
            "mined block"
        );

        match &self.root_chain {
            Some(root_chain) => {
                let tx_hash = root_chain
                    .submit_block(block.block_number, block.root_hash)
                    .await
                    .inspect_err(|e| {
                        warn!(block_number = block.block_number, %e, "could not submit block");
                    })?;
                info!(block_number = block.block_number, %tx_hash, "submitted block");
            }
            None => debug!(
                block_number = block.block_number,
                "chain-less mode, not submitting block"
            ),
        }

        Ok(block)
    }

    /// Materializes a root chain deposit as its own block.
    ///
    /// The root chain dictates the block number. Fails with a conflict if the number is taken or if
    /// the slot already has a history.
    pub async fn deposit_block(
        &self,
        slot: Slot,
        block_number: BlockNumber,
        owner: Address,
    ) -> ChainResult<Block> {
        let _round = self.mining.lock().await;

        let tx = Transaction::deposit(slot, owner);
        let block = Block {
            block_number,
            root_hash: transaction_tree([&tx]).root(),
            timestamp: now(),
            transactions: vec![tx.hash],
        };

        self.db
            .insert_deposit(CoinState::deposited(slot, owner), &tx, &block)
            .await?;
        info!(%slot, block_number, %owner, "created deposit block");

        Ok(block)
    }

    /// Gets the block with the given number.
    pub async fn block(&self, block_number: BlockNumber) -> ChainResult<Block> {
        self.db
            .get_block(block_number)
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("block {block_number}")))
    }

    /// Proof of inclusion of the slot's transaction in the block, or of its absence.
    pub async fn get_proof(&self, slot: Slot, block_number: BlockNumber) -> ChainResult<Bytes> {
        block_proof(self.db.as_ref(), slot, block_number).await
    }

    /// Proof of the secret revealed for the slot's swap in the block, against the tree of every
    /// secret revealed for that block.
    pub async fn get_secret_proof(
        &self,
        slot: Slot,
        block_number: BlockNumber,
    ) -> ChainResult<Bytes> {
        let txs = block_transactions(self.db.as_ref(), block_number).await?;

        Ok(secret_tree(&txs).create_merkle_proof(slot).to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use plasma_db::{
        blocks::BlockDb, coins::CoinDb, errors::Conflict, inmemory::InMemoryDb,
        transactions::TransactionDb,
    };
    use plasma_primitives::{coin::CoinStatus, constants::SMT_DEPTH};
    use plasma_smt::{default_nodes, verify, verify_non_inclusion};
    use plasma_test_utils::prelude::*;

    use super::*;
    use crate::validator::CustodyValidator;

    fn producer(db: &Arc<InMemoryDb>) -> BlockProducer<InMemoryDb> {
        let validator = Arc::new(CustodyValidator::new(db.clone()));
        BlockProducer::new(db.clone(), validator, None)
    }

    #[tokio::test]
    async fn block_numbers_follow_the_interval() {
        let db = Arc::new(InMemoryDb::new());
        let producer = producer(&db);

        let first = producer.mine_block().await.unwrap();
        assert_eq!(first.block_number, 1000);
        assert_eq!(first.root_hash, default_nodes(SMT_DEPTH)[SMT_DEPTH]);
        assert!(first.transactions.is_empty());

        let [alice] = Account::many();
        producer.deposit_block(1, 1001, alice.address()).await.unwrap();
        producer.deposit_block(2, 1002, alice.address()).await.unwrap();

        let second = producer.mine_block().await.unwrap();
        assert_eq!(second.block_number, 2000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_rounds_get_distinct_numbers() {
        let db = Arc::new(InMemoryDb::new());
        let producer = producer(&db);
        let [alice, bob] = Account::many();
        producer.deposit_block(1, 1, alice.address()).await.unwrap();
        db.insert_transaction(&signed_transfer(1, &alice, &bob, 1))
            .await
            .unwrap();

        let (first, second) = tokio::join!(producer.mine_block(), producer.mine_block());
        let (first, second) = (first.unwrap(), second.unwrap());

        let mut numbers = [first.block_number, second.block_number];
        numbers.sort_unstable();
        assert_eq!(numbers, [1000, 2000]);
        assert_eq!(
            first.transactions.len() + second.transactions.len(),
            1,
            "the transfer is mined exactly once"
        );
    }

    #[tokio::test]
    async fn exhausted_block_numbers_fail_the_round() {
        let db = Arc::new(InMemoryDb::new());
        let producer = producer(&db);
        let [alice, bob] = Account::many();
        producer
            .deposit_block(1, u64::MAX - 1, alice.address())
            .await
            .unwrap();
        let transfer = signed_transfer(1, &alice, &bob, u64::MAX - 1);
        db.insert_transaction(&transfer).await.unwrap();

        assert!(matches!(
            producer.mine_block().await,
            Err(ChainError::Internal(_))
        ));
        assert_eq!(
            db.latest_block().await.unwrap().map(|block| block.block_number),
            Some(u64::MAX - 1)
        );
        assert_eq!(
            db.pending_transactions().await.unwrap(),
            vec![transfer],
            "a failed round leaves the pool untouched"
        );
    }

    #[test]
    fn pre_epoch_clock_reads_as_zero() {
        assert_eq!(to_timestamp(-5), 0);
        assert_eq!(to_timestamp(1_700_000_000), 1_700_000_000);
    }

    #[tokio::test]
    async fn deposit_conflicts() {
        let db = Arc::new(InMemoryDb::new());
        let producer = producer(&db);
        let [alice, bob] = Account::many();

        let block = producer.deposit_block(1, 1, alice.address()).await.unwrap();
        assert_eq!(block.transactions, vec![Transaction::deposit(1, alice.address()).hash]);
        assert_eq!(
            db.get_coin_state(1).await.unwrap(),
            Some(CoinState::deposited(1, alice.address()))
        );

        assert!(matches!(
            producer.deposit_block(2, 1, bob.address()).await,
            Err(ChainError::Conflict(Conflict::BlockExists(1)))
        ));
        assert!(matches!(
            producer.deposit_block(1, 2, bob.address()).await,
            Err(ChainError::Conflict(Conflict::SlotExists(1)))
        ));
    }

    #[tokio::test]
    async fn deposit_transfer_and_stale_respend() {
        let db = Arc::new(InMemoryDb::new());
        let producer = producer(&db);
        let [alice, bob, carol] = Account::many();

        producer.deposit_block(1, 1, alice.address()).await.unwrap();

        let transfer = signed_transfer(1, &alice, &bob, 1);
        db.insert_transaction(&transfer).await.unwrap();
        let block = producer.mine_block().await.unwrap();
        assert_eq!(block.transactions, vec![transfer.hash]);
        assert_eq!(
            db.get_coin_state(1).await.unwrap().map(|coin| coin.owner),
            Some(bob.address())
        );

        let proof = producer.get_proof(1, 1000).await.unwrap();
        assert!(verify(SMT_DEPTH, &block.root_hash, &proof, 1, &transfer.hash));

        let proof = producer.get_proof(2, 1000).await.unwrap();
        assert!(verify_non_inclusion(SMT_DEPTH, &block.root_hash, &proof, 2));

        // alice spends the deposit again
        let respend = signed_transfer(1, &alice, &carol, 1);
        db.insert_transaction(&respend).await.unwrap();
        let block = producer.mine_block().await.unwrap();
        assert!(block.transactions.is_empty());
        assert!(
            db.get_transaction(respend.hash).await.unwrap().is_none(),
            "invalid transactions are deleted by the round"
        );
    }

    #[tokio::test]
    async fn first_valid_transaction_wins_the_slot() {
        let db = Arc::new(InMemoryDb::new());
        let producer = producer(&db);
        let [alice, bob, carol, mallory] = Account::many();

        producer.deposit_block(1, 1, alice.address()).await.unwrap();

        let stolen = signed_transfer(1, &mallory, &mallory, 1);
        let to_bob = signed_transfer(1, &alice, &bob, 1);
        let to_carol = signed_transfer(1, &alice, &carol, 1);
        for tx in [&stolen, &to_bob, &to_carol] {
            db.insert_transaction(tx).await.unwrap();
        }

        let block = producer.mine_block().await.unwrap();
        assert_eq!(block.transactions, vec![to_bob.hash]);
        assert!(db.get_transaction(stolen.hash).await.unwrap().is_none());

        let pending: Vec<_> = db
            .pending_transactions()
            .await
            .unwrap()
            .into_iter()
            .map(|tx| tx.hash)
            .collect();
        assert_eq!(pending, vec![to_carol.hash]);
    }

    #[tokio::test]
    async fn swaps_are_mined_in_pairs() {
        let db = Arc::new(InMemoryDb::new());
        let producer = producer(&db);
        let [alice, bob] = Account::many();

        producer.deposit_block(1, 1, alice.address()).await.unwrap();
        producer.deposit_block(2, 2, bob.address()).await.unwrap();

        let alice_side = signed_swap(1, &alice, &bob, 1, 2, &secret(1));
        db.insert_transaction(&alice_side).await.unwrap();

        let block = producer.mine_block().await.unwrap();
        assert!(block.transactions.is_empty());
        assert_eq!(db.pending_transactions().await.unwrap().len(), 1);

        let bob_side = signed_swap(2, &bob, &alice, 2, 1, &secret(2));
        db.insert_transaction(&bob_side).await.unwrap();

        let block = producer.mine_block().await.unwrap();
        assert_eq!(block.transactions, vec![alice_side.hash, bob_side.hash]);
        for slot in [1, 2] {
            assert_eq!(
                db.get_coin_state(slot).await.unwrap().map(|coin| coin.state),
                Some(CoinStatus::Swapping)
            );
        }
    }

    #[tokio::test]
    async fn submits_to_the_root_chain() {
        let db = Arc::new(InMemoryDb::new());
        let root_chain = Arc::new(MockRootChain::new());
        let validator = Arc::new(CustodyValidator::new(db.clone()));
        let client: Arc<dyn RootChainClient> = root_chain.clone();
        let producer = BlockProducer::new(db.clone(), validator, Some(client));

        let block = producer.mine_block().await.unwrap();
        assert_eq!(
            root_chain.calls().await,
            vec![RootChainCall::SubmitBlock(1000, block.root_hash)]
        );

        root_chain.reject_writes().await;
        assert!(matches!(
            producer.mine_block().await,
            Err(ChainError::Internal(_))
        ));
        assert!(
            db.get_block(2000).await.unwrap().is_some(),
            "the block is committed before it is submitted"
        );
    }

    #[tokio::test]
    async fn missing_block_has_no_proof() {
        let db = Arc::new(InMemoryDb::new());
        let producer = producer(&db);

        assert!(matches!(
            producer.get_proof(1, 1000).await,
            Err(ChainError::NotFound(_))
        ));
        assert!(matches!(
            producer.block(1000).await,
            Err(ChainError::NotFound(_))
        ));
    }
}
