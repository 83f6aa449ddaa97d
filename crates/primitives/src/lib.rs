//! This crate contains the data model of the plasma child chain along with the pure functions that
//! define its wire formats (transaction hashes, RLP encodings, signature recovery).
//!
//! It lies at the bottom of the crate-hierarchy in this workspace i.e., it does not depend on any
//! other crate in this workspace.

pub mod block;
pub mod coin;
pub mod constants;
pub mod encoding;
pub mod errors;
pub mod exit;
pub mod hashing;
pub mod signature;
pub mod transaction;
pub mod types;

pub mod prelude {
    //! Re-exports of the most commonly used items in this crate.

    pub use crate::{
        block::Block,
        coin::{CoinState, CoinStatus},
        constants::*,
        exit::{ChallengeData, ExitData, ExitInfo, ExitState},
        transaction::{SwapTerms, Transaction},
        types::*,
    };
}
