//! Merkle proofs and root chain encodings of mined transactions.

use std::collections::BTreeMap;

use alloy_primitives::Bytes;
use plasma_db::chain::ChainDb;
use plasma_primitives::{
    constants::SMT_DEPTH,
    encoding::encode_transaction,
    exit::ChallengeData,
    transaction::Transaction,
    types::{BlockNumber, Slot},
};
use plasma_smt::SparseMerkleTree;

use crate::errors::{ChainError, ChainResult};

/// The tree committed by a block, keyed by slot with transaction hashes as leaves.
pub(crate) fn transaction_tree<'a>(
    txs: impl IntoIterator<Item = &'a Transaction>,
) -> SparseMerkleTree {
    let leaves: BTreeMap<Slot, _> = txs.into_iter().map(|tx| (tx.slot, tx.hash)).collect();

    SparseMerkleTree::new(SMT_DEPTH, leaves)
}

/// The tree of the swap secrets revealed so far for a block.
pub(crate) fn secret_tree<'a>(txs: impl IntoIterator<Item = &'a Transaction>) -> SparseMerkleTree {
    let leaves: BTreeMap<Slot, _> = txs
        .into_iter()
        .filter_map(|tx| tx.secret().map(|secret| (tx.slot, secret)))
        .collect();

    SparseMerkleTree::new(SMT_DEPTH, leaves)
}

fn mined_block(tx: &Transaction) -> ChainResult<BlockNumber> {
    tx.mined_block
        .ok_or_else(|| ChainError::Internal(format!("transaction {} is not mined", tx.hash)))
}

/// Loads the transactions of an existing block.
pub(crate) async fn block_transactions<Db: ChainDb>(
    db: &Db,
    block_number: BlockNumber,
) -> ChainResult<Vec<Transaction>> {
    if db.get_block(block_number).await?.is_none() {
        return Err(ChainError::NotFound(format!("block {block_number}")));
    }

    Ok(db.transactions_in_block(block_number).await?)
}

/// Proof of the slot's entry, or of its absence, in the block's transaction tree.
pub(crate) async fn block_proof<Db: ChainDb>(
    db: &Db,
    slot: Slot,
    block_number: BlockNumber,
) -> ChainResult<Bytes> {
    let txs = block_transactions(db, block_number).await?;

    Ok(transaction_tree(&txs).create_merkle_proof(slot).to_bytes())
}

/// Encodes a mined transaction the way the root chain decodes it.
///
/// A swap is encoded together with its counterpart from the same block.
pub(crate) async fn encode_mined<Db: ChainDb>(db: &Db, tx: &Transaction) -> ChainResult<Bytes> {
    let counterpart = match tx.swapping_slot() {
        Some(swapping_slot) => {
            db.mined_transaction_in_block(swapping_slot, mined_block(tx)?)
                .await?
        }
        None => None,
    };

    Ok(encode_transaction(tx, counterpart.as_ref())?)
}

/// Everything needed to point the root chain at a mined transaction.
pub(crate) async fn challenge_data<Db: ChainDb>(
    db: &Db,
    tx: &Transaction,
) -> ChainResult<ChallengeData> {
    let block_number = mined_block(tx)?;

    Ok(ChallengeData {
        slot: tx.slot,
        tx_bytes: encode_mined(db, tx).await?,
        proof: block_proof(db, tx.slot, block_number).await?,
        signature: tx.signature.clone(),
        block_number,
    })
}
