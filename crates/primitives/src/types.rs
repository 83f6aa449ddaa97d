//! Scalar identifiers used throughout the child chain.

/// Identifier of a coin tracked by the child chain.
///
/// The root chain stores slots as `uint64` and the sparse merkle tree has a depth of 64, so every
/// slot fits in a [`u64`].
pub type Slot = u64;

/// Number of a child chain block.
pub type BlockNumber = u64;

/// Seconds since the unix epoch.
pub type Timestamp = u64;
