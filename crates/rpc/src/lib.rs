//! Provides the JSON-RPC interface of the plasma operator.
//!
//! The interface is split into a control group, a group that drives the child chain and a group
//! that serves the data needed to take part in the root chain's exit game.

pub mod traits;
pub mod types;
