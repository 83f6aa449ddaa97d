use std::{path::PathBuf, time::Duration};

use plasma_db::persistent::config::DbConfig;
use plasma_root_chain::config::RootChainConfig;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MINING_INTERVAL;

/// The configuration values that dictate the behavior of the operator node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The directory to store all the data in.
    pub datadir: PathBuf,

    /// The RPC server addr for the operator node.
    pub rpc_addr: String,

    /// The period between two scheduled mining rounds.
    #[serde(default = "default_mining_interval")]
    pub mining_interval: Duration,

    /// Whether to run without a root chain.
    ///
    /// In chain-less mode blocks are never submitted, no events are received and exits are never
    /// disputed. This is only meant for local development.
    #[serde(default)]
    pub chainless: bool,

    /// How to reach the root chain contract; required unless running chain-less.
    pub root_chain: Option<RootChainConfig>,

    /// The configuration for the sqlite3 database.
    #[serde(default)]
    pub db: DbConfig,

    /// The number of worker threads of the runtime.
    ///
    /// Default is [`DEFAULT_THREAD_COUNT`](crate::constants::DEFAULT_THREAD_COUNT).
    pub num_threads: Option<u8>,
}

const fn default_mining_interval() -> Duration {
    DEFAULT_MINING_INTERVAL
}
