//! In-memory implementation of the storage layer.
//!
//! All the repositories share a single lock so that the atomic operations of
//! [`ChainDb`](crate::chain::ChainDb) are trivially atomic.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use alloy_primitives::B256;
use async_trait::async_trait;
use plasma_primitives::{
    block::Block,
    coin::{CoinState, CoinStatus},
    transaction::Transaction,
    types::{BlockNumber, Slot},
};
use tokio::sync::RwLock;

use crate::{
    blocks::BlockDb,
    chain::ChainDb,
    coins::CoinDb,
    errors::{Conflict, DbResult, Missing},
    transactions::TransactionDb,
};

#[derive(Debug, Default)]
struct State {
    /// Transactions keyed by insertion sequence number.
    transactions: BTreeMap<u64, Transaction>,

    /// Maps transaction hashes to their sequence number.
    by_hash: HashMap<B256, u64>,

    next_seq: u64,

    blocks: BTreeMap<BlockNumber, Block>,

    coins: HashMap<Slot, CoinState>,
}

impl State {
    fn insert(&mut self, tx: Transaction) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.by_hash.insert(tx.hash, seq);
        self.transactions.insert(seq, tx);
    }

    fn get(&self, hash: &B256) -> Option<&Transaction> {
        self.by_hash
            .get(hash)
            .and_then(|seq| self.transactions.get(seq))
    }

    /// The mined history of the slot, leaving out invalidated swaps.
    fn mined_for_slot(&self, slot: Slot) -> impl Iterator<Item = &Transaction> {
        self.transactions.values().filter(move |tx| {
            tx.slot == slot && tx.mined_block.is_some() && !tx.is_invalidated()
        })
    }
}

/// In-memory database for the whole child chain.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDb {
    state: Arc<RwLock<State>>,
}

impl InMemoryDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionDb for InMemoryDb {
    async fn get_transaction(&self, hash: B256) -> DbResult<Option<Transaction>> {
        Ok(self.state.read().await.get(&hash).cloned())
    }

    async fn insert_transaction(&self, tx: &Transaction) -> DbResult<()> {
        let mut state = self.state.write().await;

        if state.by_hash.contains_key(&tx.hash) {
            return Err(Conflict::TransactionExists(tx.hash).into());
        }

        state.insert(tx.clone());

        Ok(())
    }

    async fn delete_transaction(&self, hash: B256) -> DbResult<()> {
        let mut state = self.state.write().await;

        if let Some(seq) = state.by_hash.remove(&hash) {
            state.transactions.remove(&seq);
        }

        Ok(())
    }

    async fn pending_transactions(&self) -> DbResult<Vec<Transaction>> {
        Ok(self
            .state
            .read()
            .await
            .transactions
            .values()
            .filter(|tx| tx.is_pending())
            .cloned()
            .collect())
    }

    async fn has_transactions(&self, slot: Slot) -> DbResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .transactions
            .values()
            .any(|tx| tx.slot == slot))
    }

    async fn last_mined_transaction(&self, slot: Slot) -> DbResult<Option<Transaction>> {
        Ok(self
            .state
            .read()
            .await
            .mined_for_slot(slot)
            .max_by_key(|tx| tx.mined_block)
            .cloned())
    }

    async fn mined_transaction_in_block(
        &self,
        slot: Slot,
        block_number: BlockNumber,
    ) -> DbResult<Option<Transaction>> {
        Ok(self
            .state
            .read()
            .await
            .mined_for_slot(slot)
            .find(|tx| tx.mined_block == Some(block_number))
            .cloned())
    }

    async fn mined_transactions_spending(
        &self,
        slot: Slot,
        block_spent: BlockNumber,
    ) -> DbResult<Vec<Transaction>> {
        let mut txs: Vec<Transaction> = self
            .state
            .read()
            .await
            .mined_for_slot(slot)
            .filter(|tx| tx.block_spent == block_spent)
            .cloned()
            .collect();
        txs.sort_by_key(|tx| tx.mined_block);

        Ok(txs)
    }

    async fn last_mined_transaction_spending_at_most(
        &self,
        slot: Slot,
        block_number: BlockNumber,
    ) -> DbResult<Option<Transaction>> {
        Ok(self
            .state
            .read()
            .await
            .mined_for_slot(slot)
            .filter(|tx| tx.block_spent <= block_number)
            .max_by_key(|tx| tx.mined_block)
            .cloned())
    }

    async fn transactions_in_block(&self, block_number: BlockNumber) -> DbResult<Vec<Transaction>> {
        let state = self.state.read().await;

        let Some(block) = state.blocks.get(&block_number) else {
            return Ok(Vec::new());
        };

        Ok(block
            .transactions
            .iter()
            .filter_map(|hash| state.get(hash).cloned())
            .collect())
    }

    async fn set_swap_secret(&self, hash: B256, secret: B256) -> DbResult<()> {
        let mut state = self.state.write().await;

        let seq = state
            .by_hash
            .get(&hash)
            .copied()
            .ok_or(Missing::Transaction(hash))?;
        let tx = state
            .transactions
            .get_mut(&seq)
            .ok_or(Missing::Transaction(hash))?;

        if let Some(terms) = tx.swap.as_mut() {
            terms.secret = Some(secret);
        }

        Ok(())
    }
}

#[async_trait]
impl BlockDb for InMemoryDb {
    async fn get_block(&self, block_number: BlockNumber) -> DbResult<Option<Block>> {
        Ok(self.state.read().await.blocks.get(&block_number).cloned())
    }

    async fn latest_block(&self) -> DbResult<Option<Block>> {
        Ok(self
            .state
            .read()
            .await
            .blocks
            .last_key_value()
            .map(|(_, block)| block.clone()))
    }
}

#[async_trait]
impl CoinDb for InMemoryDb {
    async fn get_coin_state(&self, slot: Slot) -> DbResult<Option<CoinState>> {
        Ok(self.state.read().await.coins.get(&slot).copied())
    }

    async fn put_coin_state(&self, coin: CoinState) -> DbResult<()> {
        self.state.write().await.coins.insert(coin.slot, coin);

        Ok(())
    }

    async fn set_coin_status(&self, slot: Slot, status: CoinStatus) -> DbResult<()> {
        let mut state = self.state.write().await;
        let coin = state.coins.get_mut(&slot).ok_or(Missing::Coin(slot))?;
        coin.state = status;

        Ok(())
    }
}

#[async_trait]
impl ChainDb for InMemoryDb {
    async fn insert_deposit(
        &self,
        coin: CoinState,
        tx: &Transaction,
        block: &Block,
    ) -> DbResult<()> {
        let mut state = self.state.write().await;

        if state.blocks.contains_key(&block.block_number) {
            return Err(Conflict::BlockExists(block.block_number).into());
        }

        if state.coins.contains_key(&coin.slot)
            || state.transactions.values().any(|other| other.slot == tx.slot)
        {
            return Err(Conflict::SlotExists(coin.slot).into());
        }

        if state.by_hash.contains_key(&tx.hash) {
            return Err(Conflict::TransactionExists(tx.hash).into());
        }

        let mut tx = tx.clone();
        tx.mined_block = Some(block.block_number);
        tx.mined_timestamp = Some(block.timestamp);

        state.coins.insert(coin.slot, coin);
        state.insert(tx);
        state.blocks.insert(block.block_number, block.clone());

        Ok(())
    }

    async fn commit_block(&self, block: &Block, mined: &[Transaction]) -> DbResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if state.blocks.contains_key(&block.block_number) {
            return Err(Conflict::BlockExists(block.block_number).into());
        }

        // validate everything before mutating so that a failure leaves no partial writes
        let mut seqs = Vec::with_capacity(mined.len());
        for tx in mined {
            let seq = *state
                .by_hash
                .get(&tx.hash)
                .ok_or(Missing::Transaction(tx.hash))?;
            if state.transactions.get(&seq).is_some_and(|tx| !tx.is_pending()) {
                return Err(Conflict::AlreadyMined(tx.hash).into());
            }
            if !state.coins.contains_key(&tx.slot) {
                return Err(Missing::Coin(tx.slot).into());
            }
            seqs.push(seq);
        }

        for seq in seqs {
            let Some(tx) = state.transactions.get_mut(&seq) else {
                continue;
            };
            tx.mined_block = Some(block.block_number);
            tx.mined_timestamp = Some(block.timestamp);

            let (slot, recipient, is_swap) = (tx.slot, tx.recipient, tx.is_swap());
            if let Some(coin) = state.coins.get_mut(&slot) {
                coin.owner = recipient;
                if is_swap {
                    coin.state = CoinStatus::Swapping;
                }
            }
        }

        state.blocks.insert(block.block_number, block.clone());

        Ok(())
    }

    async fn invalidate_swaps(&self, swaps: &[Transaction]) -> DbResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let mut seqs = Vec::with_capacity(swaps.len());
        for swap in swaps {
            let seq = *state
                .by_hash
                .get(&swap.hash)
                .ok_or(Missing::Transaction(swap.hash))?;
            let is_mined_swap = state
                .transactions
                .get(&seq)
                .is_some_and(|tx| tx.is_swap() && !tx.is_pending());
            if !is_mined_swap {
                return Err(Missing::MinedSwap(swap.hash).into());
            }
            if !state.coins.contains_key(&swap.slot) {
                return Err(Missing::Coin(swap.slot).into());
            }
            seqs.push(seq);
        }

        for seq in seqs {
            let Some(tx) = state.transactions.get_mut(&seq) else {
                continue;
            };
            if let Some(terms) = tx.swap.as_mut() {
                terms.invalidated = true;
            }

            let (slot, owner) = (tx.slot, tx.owner);
            if let Some(coin) = state.coins.get_mut(&slot) {
                coin.owner = owner;
                coin.state = CoinStatus::Deposited;
            }
        }

        Ok(())
    }
}
