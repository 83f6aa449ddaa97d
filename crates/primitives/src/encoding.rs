//! Byte encodings of transactions as they are submitted to the root chain.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::RlpEncodable;

use crate::{
    constants::EMPTY_SECRET, errors::EncodingError, hashing::TransferPreimage,
    transaction::Transaction,
};

/// Both sides of an atomic swap, laid out the way the root chain decodes them.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable)]
struct SwapEnvelope {
    slot: B256,
    block_spent: B256,
    secret: Bytes,
    recipient: Address,
    counter_slot: B256,
    counter_block_spent: B256,
    counter_secret: Bytes,
    counter_recipient: Address,
    counter_signature: Bytes,
}

fn word(value: u64) -> B256 {
    B256::from(U256::from(value))
}

fn secret_or_empty(tx: &Transaction) -> Bytes {
    tx.secret()
        .map(|secret| Bytes::copy_from_slice(secret.as_slice()))
        .unwrap_or(EMPTY_SECRET)
}

/// Encodes a plain transfer (or deposit) as `rlp([slot, block_spent, recipient])`.
///
/// This is the preimage of the transfer hash.
pub fn encode_transfer(tx: &Transaction) -> Bytes {
    alloy_rlp::encode(TransferPreimage::new(tx.slot, tx.block_spent, tx.recipient)).into()
}

/// Encodes one side of an atomic swap together with its counterpart.
///
/// The counterpart is the transaction on the swapped slot that was mined in the same block.
pub fn encode_swap(tx: &Transaction, counterpart: &Transaction) -> Result<Bytes, EncodingError> {
    if tx.swapping_slot() != Some(counterpart.slot) || counterpart.swapping_slot() != Some(tx.slot)
    {
        return Err(EncodingError::CounterpartMismatch {
            slot: tx.slot,
            counterpart: counterpart.slot,
        });
    }

    let envelope = SwapEnvelope {
        slot: word(tx.slot),
        block_spent: word(tx.block_spent),
        secret: secret_or_empty(tx),
        recipient: tx.recipient,
        counter_slot: word(counterpart.slot),
        counter_block_spent: word(counterpart.block_spent),
        counter_secret: secret_or_empty(counterpart),
        counter_recipient: counterpart.recipient,
        counter_signature: counterpart.signature.clone(),
    };

    Ok(alloy_rlp::encode(envelope).into())
}

/// Encodes any transaction for submission to the root chain.
///
/// Swaps require their counterpart; plain transfers ignore it.
pub fn encode_transaction(
    tx: &Transaction,
    counterpart: Option<&Transaction>,
) -> Result<Bytes, EncodingError> {
    if !tx.is_swap() {
        return Ok(encode_transfer(tx));
    }

    let counterpart = counterpart.ok_or(EncodingError::MissingCounterpart(tx.slot))?;
    encode_swap(tx, counterpart)
}
