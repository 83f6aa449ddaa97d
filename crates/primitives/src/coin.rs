//! The operator's cache of who currently owns each coin.

use std::{fmt, str::FromStr};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{errors::ParseCoinStatusError, types::Slot};

/// The lifecycle state of a coin on the child chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoinStatus {
    /// The coin can be transferred.
    Deposited,

    /// An exit was started on the root chain.
    Exiting,

    /// The coin was swapped and the swap secrets are not yet revealed.
    Swapping,
}

impl CoinStatus {
    /// The canonical upper-case name of the state.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CoinStatus::Deposited => "DEPOSITED",
            CoinStatus::Exiting => "EXITING",
            CoinStatus::Swapping => "SWAPPING",
        }
    }
}

impl fmt::Display for CoinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoinStatus {
    type Err = ParseCoinStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSITED" => Ok(Self::Deposited),
            "EXITING" => Ok(Self::Exiting),
            "SWAPPING" => Ok(Self::Swapping),
            other => Err(ParseCoinStatusError(other.to_string())),
        }
    }
}

/// The authoritative current owner of a coin, independent of the transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinState {
    /// The coin.
    pub slot: Slot,

    /// Where the coin is in its lifecycle.
    pub state: CoinStatus,

    /// The current owner.
    pub owner: Address,
}

impl CoinState {
    /// A freshly deposited coin.
    pub const fn deposited(slot: Slot, owner: Address) -> Self {
        Self {
            slot,
            state: CoinStatus::Deposited,
            owner,
        }
    }

    /// Whether the coin can be transferred.
    pub fn is_transferable(&self) -> bool {
        self.state == CoinStatus::Deposited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for status in [
            CoinStatus::Deposited,
            CoinStatus::Exiting,
            CoinStatus::Swapping,
        ] {
            assert_eq!(status.to_string().parse::<CoinStatus>(), Ok(status));
        }

        assert!("deposited".parse::<CoinStatus>().is_err());
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&CoinStatus::Exiting).unwrap();
        assert_eq!(json, "\"EXITING\"");
    }
}
