//! The child chain transaction.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::{
    constants::NULL_ADDRESS,
    hashing::{deposit_hash, secret_hash, swap_hash, transfer_hash},
    types::{BlockNumber, Slot, Timestamp},
};

/// The terms of one side of an atomic swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTerms {
    /// The slot that is traded in exchange for this transaction's slot.
    pub swapping_slot: Slot,

    /// `keccak256(secret)`, committed to by the transaction hash.
    pub hash_secret: B256,

    /// The preimage of `hash_secret`, once revealed.
    pub secret: Option<B256>,

    /// Whether the swap was called off before both secrets were revealed.
    pub invalidated: bool,
}

/// A transfer of ownership of a single coin.
///
/// Transactions are identified by their [`hash`](Self::hash), which doubles as the leaf value
/// committed in the block's sparse merkle tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Content hash of the canonical encoding.
    pub hash: B256,

    /// The coin being transferred.
    pub slot: Slot,

    /// The current owner of the coin, i.e., the signer.
    pub owner: Address,

    /// The new owner of the coin.
    pub recipient: Address,

    /// The block in which the transaction being spent was mined (`0` for deposits).
    pub block_spent: BlockNumber,

    /// The block this transaction was mined in, if any.
    pub mined_block: Option<BlockNumber>,

    /// When this transaction was mined, if ever.
    pub mined_timestamp: Option<Timestamp>,

    /// Recoverable ECDSA signature by `owner` over `hash`.
    pub signature: Bytes,

    /// Present iff this transaction is one side of an atomic swap.
    pub swap: Option<SwapTerms>,
}

impl Transaction {
    /// Creates a plain, unsigned transfer with its canonical hash.
    pub fn transfer(
        slot: Slot,
        owner: Address,
        recipient: Address,
        block_spent: BlockNumber,
    ) -> Self {
        Self {
            hash: transfer_hash(slot, block_spent, recipient),
            slot,
            owner,
            recipient,
            block_spent,
            mined_block: None,
            mined_timestamp: None,
            signature: Bytes::new(),
            swap: None,
        }
    }

    /// Creates the synthetic transaction that materializes a root chain deposit.
    pub fn deposit(slot: Slot, owner: Address) -> Self {
        Self {
            hash: deposit_hash(slot),
            slot,
            owner: NULL_ADDRESS,
            recipient: owner,
            block_spent: 0,
            mined_block: None,
            mined_timestamp: None,
            signature: Bytes::new(),
            swap: None,
        }
    }

    /// Creates one unsigned side of an atomic swap.
    ///
    /// Returns [`None`] for deposits since those cannot be swapped.
    pub fn swap(
        slot: Slot,
        owner: Address,
        recipient: Address,
        block_spent: BlockNumber,
        swapping_slot: Slot,
        hash_secret: B256,
    ) -> Option<Self> {
        let hash = swap_hash(slot, block_spent, hash_secret, recipient, swapping_slot)?;

        Some(Self {
            hash,
            slot,
            owner,
            recipient,
            block_spent,
            mined_block: None,
            mined_timestamp: None,
            signature: Bytes::new(),
            swap: Some(SwapTerms {
                swapping_slot,
                hash_secret,
                secret: None,
                invalidated: false,
            }),
        })
    }

    /// Attaches a signature.
    pub fn with_signature(self, signature: impl Into<Bytes>) -> Self {
        Self {
            signature: signature.into(),
            ..self
        }
    }

    /// Whether this transaction materializes a deposit.
    pub const fn is_deposit(&self) -> bool {
        self.block_spent == 0
    }

    /// Whether this transaction is one side of an atomic swap.
    pub const fn is_swap(&self) -> bool {
        self.swap.is_some()
    }

    /// Whether this transaction is still waiting to be mined.
    pub const fn is_pending(&self) -> bool {
        self.mined_block.is_none()
    }

    /// The slot this transaction is swapped against, if it is a swap.
    pub fn swapping_slot(&self) -> Option<Slot> {
        self.swap.as_ref().map(|terms| terms.swapping_slot)
    }

    /// The revealed swap secret, if any.
    pub fn secret(&self) -> Option<B256> {
        self.swap.as_ref().and_then(|terms| terms.secret)
    }

    /// Whether this is a swap that was called off before it completed.
    ///
    /// Invalidated swaps stay in the block they were mined in but no longer move the coin.
    pub fn is_invalidated(&self) -> bool {
        self.swap.as_ref().is_some_and(|terms| terms.invalidated)
    }

    /// Recomputes the hash this transaction must carry given its contents.
    ///
    /// Returns [`None`] when no valid hash exists i.e., for a swap that spends a deposit.
    pub fn expected_hash(&self) -> Option<B256> {
        match &self.swap {
            Some(terms) => swap_hash(
                self.slot,
                self.block_spent,
                terms.hash_secret,
                self.recipient,
                terms.swapping_slot,
            ),
            None if self.is_deposit() => Some(deposit_hash(self.slot)),
            None => Some(transfer_hash(self.slot, self.block_spent, self.recipient)),
        }
    }

    /// Whether `secret` opens this swap's hash lock.
    pub fn opens_hash_lock(&self, secret: &B256) -> bool {
        self.swap
            .as_ref()
            .is_some_and(|terms| secret_hash(secret) == terms.hash_secret)
    }
}
