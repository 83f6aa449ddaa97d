//! Client side of the root chain contract that anchors the child chain.
//!
//! The [`RootChainClient`](client::RootChainClient) trait is what the rest of the workspace
//! depends on; [`AlloyRootChain`](alloy_client::AlloyRootChain) implements it on top of an
//! Ethereum JSON-RPC endpoint and [`EventWatcher`](watcher::EventWatcher) turns the contract's
//! logs into [`RootChainEvent`](events::RootChainEvent)s.

pub mod alloy_client;
pub mod client;
pub mod config;
pub mod contract;
pub mod errors;
pub mod events;
pub mod watcher;
