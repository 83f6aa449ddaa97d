//! The compact proof format and its verification.

use alloy_primitives::{Bytes, B256};
use plasma_primitives::{constants::PROOF_BITMASK_SIZE, types::Slot};

use crate::defaults::{default_nodes, hash_pair, DEFAULT_LEAF};

/// A compact merkle proof.
///
/// On the wire this is an 8-byte big-endian bitmask followed by 32 bytes for every set bit. Bit
/// `i` is set iff the sibling at level `i` (level `0` being the leaves) is not the default node;
/// siblings are ordered from the leaf level upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    bitmask: u64,
    siblings: Vec<B256>,
}

impl Proof {
    pub(crate) fn new(bitmask: u64, siblings: Vec<B256>) -> Self {
        debug_assert_eq!(bitmask.count_ones() as usize, siblings.len());

        Self { bitmask, siblings }
    }

    /// The bitmask of non-default levels.
    pub const fn bitmask(&self) -> u64 {
        self.bitmask
    }

    /// The non-default siblings, from the leaf level upward.
    pub fn siblings(&self) -> &[B256] {
        &self.siblings
    }

    /// Serializes the proof into its wire format.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = Vec::with_capacity(PROOF_BITMASK_SIZE + 32 * self.siblings.len());
        buf.extend_from_slice(&self.bitmask.to_be_bytes());
        for sibling in &self.siblings {
            buf.extend_from_slice(sibling.as_slice());
        }

        buf.into()
    }

    /// Parses a proof from its wire format.
    ///
    /// Returns [`None`] if the length is inconsistent with the bitmask.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < PROOF_BITMASK_SIZE {
            return None;
        }

        let (head, body) = bytes.split_at(PROOF_BITMASK_SIZE);
        let bitmask = u64::from_be_bytes(head.try_into().ok()?);

        if body.len() != 32 * bitmask.count_ones() as usize {
            return None;
        }

        let siblings = body.chunks_exact(32).map(B256::from_slice).collect();

        Some(Self { bitmask, siblings })
    }

    /// Recomputes the root implied by this proof for `leaf` stored under `slot`.
    ///
    /// Returns [`None`] if the proof is inconsistent with `depth` or if `depth` exceeds what the
    /// 64-bit bitmask can describe.
    pub fn compute_root(&self, depth: usize, slot: Slot, leaf: B256) -> Option<B256> {
        if depth > u64::BITS as usize || (depth < 64 && self.bitmask >> depth != 0) {
            return None;
        }

        let defaults = default_nodes(depth);
        let mut siblings = self.siblings.iter();
        let mut node = leaf;
        let mut index = slot;

        for (level, default) in defaults.iter().enumerate().take(depth) {
            let sibling = if self.bitmask >> level & 1 == 1 {
                siblings.next()?
            } else {
                default
            };

            node = if index % 2 == 0 {
                hash_pair(&node, sibling)
            } else {
                hash_pair(sibling, &node)
            };
            index /= 2;
        }

        Some(node)
    }
}

/// Verifies that `leaf` is stored under `slot` in the tree of the given depth committed by `root`.
///
/// Malformed proofs do not verify.
pub fn verify(depth: usize, root: &B256, proof: &[u8], slot: Slot, leaf: &B256) -> bool {
    Proof::from_bytes(proof)
        .and_then(|proof| proof.compute_root(depth, slot, *leaf))
        .is_some_and(|computed| computed == *root)
}

/// Verifies that nothing is stored under `slot` in the tree committed by `root`.
pub fn verify_non_inclusion(depth: usize, root: &B256, proof: &[u8], slot: Slot) -> bool {
    verify(depth, root, proof, slot, &DEFAULT_LEAF)
}
