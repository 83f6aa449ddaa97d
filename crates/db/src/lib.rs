//! Storage layer of the plasma operator.
//!
//! The data model is split across the [`TransactionDb`](transactions::TransactionDb),
//! [`BlockDb`](blocks::BlockDb) and [`CoinDb`](coins::CoinDb) repositories. Operations that must
//! touch several of them atomically live in [`ChainDb`](chain::ChainDb).
//!
//! Two backends are provided: an in-memory one used in tests and in chain-less mode, and a
//! persistent one backed by SQLite.

pub mod blocks;
pub mod chain;
pub mod coins;
pub mod errors;
pub mod inmemory;
pub mod persistent;
pub mod transactions;

#[cfg(test)]
mod test_suite;
