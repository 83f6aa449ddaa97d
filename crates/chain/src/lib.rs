//! The operator's child chain engine.
//!
//! [`CustodyValidator`](validator::CustodyValidator) decides whether a transaction may be mined,
//! [`BlockProducer`](producer::BlockProducer) turns pending transactions and root chain deposits
//! into blocks, [`ExitEngine`](exits::ExitEngine) produces the data consumed by the root chain's
//! exit game and [`EventHandler`](events::EventHandler) reacts to what happens on the root chain.
//!
//! Every component is generic over the [`ChainDb`](plasma_db::chain::ChainDb) it persists to.

pub mod errors;
pub mod events;
pub mod exits;
pub mod producer;
mod proofs;
pub mod submit;
pub mod validator;
