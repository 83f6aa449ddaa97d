//! Hash functions that identify transactions on the child chain.
//!
//! The root chain recomputes these hashes when it checks exits and challenges, so the preimages
//! must be reproduced byte for byte.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_rlp::RlpEncodable;

use crate::types::{BlockNumber, Slot};

/// The RLP list `[slot, block_spent, recipient]` that is hashed and submitted for plain transfers.
///
/// Integers are RLP encoded as minimal big-endian byte strings, which is the same encoding the
/// contract uses for its `uint256` fields.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable)]
pub(crate) struct TransferPreimage {
    pub(crate) slot: U256,
    pub(crate) block_spent: U256,
    pub(crate) recipient: Address,
}

impl TransferPreimage {
    pub(crate) fn new(slot: Slot, block_spent: BlockNumber, recipient: Address) -> Self {
        Self {
            slot: U256::from(slot),
            block_spent: U256::from(block_spent),
            recipient,
        }
    }
}

/// Hash of a deposit transaction: `keccak256(slot)` with the slot as 8 big-endian bytes.
pub fn deposit_hash(slot: Slot) -> B256 {
    keccak256(slot.to_be_bytes())
}

/// Hash of a transfer: `keccak256(rlp([slot, block_spent, recipient]))`.
pub fn transfer_hash(slot: Slot, block_spent: BlockNumber, recipient: Address) -> B256 {
    keccak256(alloy_rlp::encode(TransferPreimage::new(
        slot,
        block_spent,
        recipient,
    )))
}

/// Hash of one side of an atomic swap.
///
/// The preimage is the tight packing `slot (8) ‖ block_spent (32) ‖ hash_secret (32) ‖
/// recipient (20) ‖ swapping_slot (8)`.
///
/// Deposits cannot be swapped so this returns [`None`] when `block_spent` is zero.
pub fn swap_hash(
    slot: Slot,
    block_spent: BlockNumber,
    hash_secret: B256,
    recipient: Address,
    swapping_slot: Slot,
) -> Option<B256> {
    if block_spent == 0 {
        return None;
    }

    let mut preimage = Vec::with_capacity(8 + 32 + 32 + 20 + 8);
    preimage.extend_from_slice(&slot.to_be_bytes());
    preimage.extend_from_slice(&U256::from(block_spent).to_be_bytes::<32>());
    preimage.extend_from_slice(hash_secret.as_slice());
    preimage.extend_from_slice(recipient.as_slice());
    preimage.extend_from_slice(&swapping_slot.to_be_bytes());

    Some(keccak256(preimage))
}

/// Hash of a swap secret, which is what a swap transaction commits to in `hash_secret`.
pub fn secret_hash(secret: &B256) -> B256 {
    keccak256(secret)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, hex};

    use super::*;

    #[test]
    fn deposit_hash_uses_eight_byte_slot() {
        let slot = 0x0102_0304_0506_0708;
        assert_eq!(
            deposit_hash(slot),
            keccak256(hex!("0102030405060708")),
            "deposit hash must hash the big-endian slot"
        );
    }

    #[test]
    fn transfer_preimage_is_rlp_list() {
        let recipient = address!("00000000000000000000000000000000000000aa");
        let encoded = alloy_rlp::encode(TransferPreimage::new(1, 1000, recipient));

        // list header, 0x01, 0x8203e8 (1000), 0x94 ‖ 20 bytes
        let mut expected = vec![0xc0 + 1 + 3 + 21, 0x01, 0x82, 0x03, 0xe8, 0x94];
        expected.extend_from_slice(recipient.as_slice());
        assert_eq!(encoded, expected);

        assert_eq!(transfer_hash(1, 1000, recipient), keccak256(&expected));
    }

    #[test]
    fn swap_hash_rejects_deposits() {
        let recipient = Address::repeat_byte(0x11);
        assert!(swap_hash(1, 0, B256::ZERO, recipient, 2).is_none());
        assert!(swap_hash(1, 1000, B256::ZERO, recipient, 2).is_some());
    }

    #[test]
    fn swap_hash_commits_to_every_field() {
        let recipient = Address::repeat_byte(0x11);
        let secret = B256::repeat_byte(0x22);
        let base = swap_hash(1, 1000, secret, recipient, 2);

        assert_ne!(base, swap_hash(3, 1000, secret, recipient, 2));
        assert_ne!(base, swap_hash(1, 2000, secret, recipient, 2));
        assert_ne!(base, swap_hash(1, 1000, B256::ZERO, recipient, 2));
        assert_ne!(base, swap_hash(1, 1000, secret, Address::ZERO, 2));
        assert_ne!(base, swap_hash(1, 1000, secret, recipient, 4));
    }
}
