//! Sparse merkle tree used to commit the transactions of a child chain block.
//!
//! The tree has a fixed depth (64 on the child chain) and is keyed by coin slot. Absent subtrees
//! are represented by precomputed default nodes, so only the paths of present leaves are ever
//! materialized and proofs only carry the siblings that differ from the default.

mod defaults;
mod proof;
mod tree;

pub use defaults::{default_nodes, DEFAULT_LEAF};
pub use proof::{verify, verify_non_inclusion, Proof};
pub use tree::SparseMerkleTree;
