//! Configuration of the root chain client.

use std::time::Duration;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default period between two log polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How to reach the root chain contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootChainConfig {
    /// The JSON-RPC endpoint of a root chain node.
    pub rpc_url: Url,

    /// Address of the deployed root chain contract.
    pub contract_address: Address,

    /// Hex-encoded private key of the operator account that signs every write.
    pub operator_key: String,

    /// Period between two log polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// The first root chain block scanned for events.
    #[serde(default)]
    pub start_block: u64,
}

const fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_optional_fields() {
        let config = r#"
            rpc_url = "http://localhost:8545"
            contract_address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
            operator_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        "#;

        let config: RootChainConfig = toml::from_str(config).expect("must parse");

        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.start_block, 0);
        assert_eq!(config.rpc_url.as_str(), "http://localhost:8545/");
    }
}
