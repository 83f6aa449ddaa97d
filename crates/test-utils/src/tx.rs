//! Builders for signed child chain transactions.

use alloy_primitives::{keccak256, Bytes, B256};
use plasma_primitives::{
    transaction::Transaction,
    types::{BlockNumber, Slot},
};

use crate::accounts::Account;

/// A transfer of `slot` from `owner` to `recipient` signed by `owner`.
pub fn signed_transfer(
    slot: Slot,
    owner: &Account,
    recipient: &Account,
    block_spent: BlockNumber,
) -> Transaction {
    let tx = Transaction::transfer(slot, owner.address(), recipient.address(), block_spent);
    let signature = owner.sign(&tx.hash);

    tx.with_signature(signature)
}

/// A transfer signed by someone other than `owner`.
pub fn forged_transfer(
    slot: Slot,
    owner: &Account,
    forger: &Account,
    recipient: &Account,
    block_spent: BlockNumber,
) -> Transaction {
    let tx = Transaction::transfer(slot, owner.address(), recipient.address(), block_spent);
    let signature = forger.sign(&tx.hash);

    tx.with_signature(signature)
}

/// One side of an atomic swap locked by `keccak256(secret)` and signed by `owner`.
pub fn signed_swap(
    slot: Slot,
    owner: &Account,
    recipient: &Account,
    block_spent: BlockNumber,
    swapping_slot: Slot,
    secret: &B256,
) -> Transaction {
    let tx = Transaction::swap(
        slot,
        owner.address(),
        recipient.address(),
        block_spent,
        swapping_slot,
        keccak256(secret),
    )
    .expect("a swap must not spend a deposit block");
    let signature = owner.sign(&tx.hash);

    tx.with_signature(signature)
}

/// A deterministic swap secret.
pub fn secret(seed: u8) -> B256 {
    B256::repeat_byte(seed)
}

/// A signature with a valid length that does not recover to anyone in particular.
pub fn garbage_signature() -> Bytes {
    Bytes::from(vec![0x11; 65])
}
