//! Default nodes of empty subtrees.

use std::sync::LazyLock;

use alloy_primitives::{keccak256, B256};
use plasma_primitives::constants::SMT_DEPTH;

/// Value of an absent leaf: `keccak256(uint256(0))`.
pub static DEFAULT_LEAF: LazyLock<B256> = LazyLock::new(|| keccak256(B256::ZERO));

static CHILD_CHAIN_DEFAULTS: LazyLock<Vec<B256>> =
    LazyLock::new(|| compute_default_nodes(SMT_DEPTH));

/// Hashes two sibling nodes into their parent.
pub(crate) fn hash_pair(left: &B256, right: &B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());

    keccak256(buf)
}

fn compute_default_nodes(depth: usize) -> Vec<B256> {
    let mut nodes = Vec::with_capacity(depth + 1);
    nodes.push(*DEFAULT_LEAF);

    for level in 0..depth {
        let below = nodes[level];
        nodes.push(hash_pair(&below, &below));
    }

    nodes
}

/// Returns the default node for every level `0..=depth`.
///
/// Entry `0` is the default leaf and entry `depth` is the root of an empty tree.
pub fn default_nodes(depth: usize) -> Vec<B256> {
    if depth == SMT_DEPTH {
        return CHILD_CHAIN_DEFAULTS.clone();
    }

    compute_default_nodes(depth)
}
