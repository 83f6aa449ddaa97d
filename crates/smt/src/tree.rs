//! Construction of the tree and generation of proofs.

use std::collections::BTreeMap;

use alloy_primitives::B256;
use plasma_primitives::{constants::SMT_DEPTH, types::Slot};

use crate::{
    defaults::{default_nodes, hash_pair},
    proof::Proof,
};

/// A fixed-depth sparse merkle tree keyed by slot.
///
/// All the non-default nodes are computed eagerly on construction so that generating a proof is a
/// walk over precomputed levels.
#[derive(Debug, Clone)]
pub struct SparseMerkleTree {
    depth: usize,

    /// `levels[0]` holds the leaves and `levels[depth]` holds the root under key `0`.
    levels: Vec<BTreeMap<u64, B256>>,

    default_nodes: Vec<B256>,
}

impl SparseMerkleTree {
    /// Builds a tree of the given depth over the given leaves.
    ///
    /// # Panics
    ///
    /// If `depth` exceeds 64 or a key does not fit in `depth` bits.
    pub fn new(depth: usize, leaves: BTreeMap<Slot, B256>) -> Self {
        assert!(depth <= 64, "depth must not exceed 64, got {depth}");
        if depth < 64 {
            assert!(
                leaves.keys().all(|slot| slot >> depth == 0),
                "leaf keys must fit in {depth} bits"
            );
        }

        let default_nodes = default_nodes(depth);
        let mut levels = Vec::with_capacity(depth + 1);
        levels.push(leaves);

        for level in 0..depth {
            let current = &levels[level];
            let default = &default_nodes[level];
            let mut next = BTreeMap::new();

            for (&key, value) in current {
                let sibling = key ^ 1;

                if key % 2 == 0 {
                    let right = current.get(&sibling).unwrap_or(default);
                    next.insert(key / 2, hash_pair(value, right));
                } else if !current.contains_key(&sibling) {
                    next.insert(key / 2, hash_pair(default, value));
                }
                // an odd key with a present sibling was combined when the sibling was visited
            }

            levels.push(next);
        }

        Self {
            depth,
            levels,
            default_nodes,
        }
    }

    /// Builds a child chain tree, i.e., one with depth [`SMT_DEPTH`].
    pub fn with_leaves(leaves: BTreeMap<Slot, B256>) -> Self {
        Self::new(SMT_DEPTH, leaves)
    }

    /// The depth of the tree.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// The root commitment.
    ///
    /// For an empty tree this is the default node at `depth`.
    pub fn root(&self) -> B256 {
        self.levels[self.depth]
            .get(&0)
            .copied()
            .unwrap_or(self.default_nodes[self.depth])
    }

    /// The leaf stored under `slot`, if any.
    pub fn leaf(&self, slot: Slot) -> Option<B256> {
        self.levels[0].get(&slot).copied()
    }

    /// The number of present leaves.
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Creates the compact proof for `slot`.
    ///
    /// The same call produces an inclusion proof for a present slot and a non-inclusion proof for
    /// an absent one.
    pub fn create_merkle_proof(&self, slot: Slot) -> Proof {
        let mut bitmask = 0u64;
        let mut siblings = Vec::new();
        let mut index = slot;

        for level in 0..self.depth {
            if let Some(sibling) = self.levels[level].get(&(index ^ 1)) {
                bitmask |= 1 << level;
                siblings.push(*sibling);
            }

            index /= 2;
        }

        Proof::new(bitmask, siblings)
    }
}
