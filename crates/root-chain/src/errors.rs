//! Errors returned by the root chain client.

use alloy::{
    contract, primitives::B256, providers::PendingTransactionError, transports::TransportError,
};
use thiserror::Error;

/// Errors that can occur when talking to the root chain.
#[derive(Debug, Error)]
pub enum RootChainError {
    /// The client could not be built from its configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The JSON-RPC transport failed.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// A contract call could not be built or was rejected.
    #[error("contract: {0}")]
    Contract(#[from] contract::Error),

    /// A submitted transaction could not be tracked to inclusion.
    #[error("pending transaction: {0}")]
    Pending(#[from] PendingTransactionError),

    /// A submitted transaction was included but reverted.
    #[error("transaction {0} reverted")]
    Reverted(B256),

    /// A log or return value did not match the contract interface.
    #[error("decode: {0}")]
    Decode(String),
}

/// Result of a root chain operation.
pub type RootChainResult<T> = Result<T, RootChainError>;
