//! This crate provides test-utilities shared by the crates of this workspace.
//!
//! It contains signing accounts, builders for signed child chain transactions and an in-process
//! root chain that records every call made to it.

pub mod accounts;
pub mod root_chain;
pub mod tx;

pub mod prelude {
    //! Re-exports of everything a test usually needs.

    pub use crate::{
        accounts::Account,
        root_chain::{MockRootChain, RootChainCall},
        tx::*,
    };
}
