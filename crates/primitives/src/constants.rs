//! Constants that are integral to the child chain protocol.
//!
//! These values are shared with the root chain contract; changing any of them would make the
//! operator produce blocks and proofs that the root chain cannot verify.

use alloy_primitives::{Address, Bytes};

/// The distance between two consecutive non-deposit blocks.
///
/// Every mined block number is a positive multiple of this value. Deposit blocks are numbered by
/// the root chain and fall in between.
pub const BLOCK_INTERVAL: u64 = 1000;

/// The depth of the sparse merkle tree used to commit the transactions in a block.
pub const SMT_DEPTH: usize = 64;

/// The size in bytes of the bitmask that prefixes every merkle proof.
pub const PROOF_BITMASK_SIZE: usize = 8;

/// The `owner` of every deposit transaction.
pub const NULL_ADDRESS: Address = Address::ZERO;

/// The placeholder that stands in for an unrevealed secret in atomic swap encodings.
pub const EMPTY_SECRET: Bytes = Bytes::from_static(&[0]);
