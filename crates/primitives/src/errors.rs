//! Errors that arise while decoding primitive values.

use thiserror::Error;

/// Error produced when a string does not name a known coin state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown coin state: {0}")]
pub struct ParseCoinStatusError(pub String);

/// Errors produced while assembling the encoding of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// A swap transaction needs its counterpart to be encoded.
    #[error("missing counterpart for swap on slot {0}")]
    MissingCounterpart(u64),

    /// The counterpart does not point back at the swap being encoded.
    #[error("transaction on slot {counterpart} is not the counterpart of slot {slot}")]
    CounterpartMismatch {
        /// Slot of the swap being encoded.
        slot: u64,

        /// Slot of the transaction offered as counterpart.
        counterpart: u64,
    },
}
