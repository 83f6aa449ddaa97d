//! The operator node of a plasma cash child chain.
//!
//! It mines the blocks of the child chain, anchors them on the root chain and defends the coins it
//! tracks against invalid exits.

use std::{fs, path::Path, process};

use clap::Parser;
use config::Config;
use constants::DEFAULT_THREAD_COUNT;
use plasma_common::logging::{self, LoggerConfig};
use serde::de::DeserializeOwned;
use tokio::runtime;
use tracing::{debug, error, info, trace};

mod args;
mod config;
mod operator;
mod rpc_server;

mod constants;

fn main() {
    if let Err(e) = logging::init(LoggerConfig::from_env("plasma-operator")) {
        eprintln!("could not initialize logging: {e}");
    }

    let cli = args::Cli::parse();

    let mut config = parse_toml::<Config>(cli.config);
    config.chainless |= cli.chainless;
    info!(chainless = %config.chainless, rpc_addr = %config.rpc_addr, "starting operator");

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .enable_all()
        .build()
        .expect("must be able to create runtime");

    if let Err(e) = runtime.block_on(operator::bootstrap(config)) {
        error!(?e, "operator crashed");
        process::exit(1);
    }

    info!("operator shutdown complete");
}

/// Reads and parses a TOML file from the given path into the given type `T`.
///
/// # Panics
///
/// 1. If the file is not readable.
/// 2. If the contents of the file cannot be deserialized into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> T
where
    T: std::fmt::Debug + DeserializeOwned,
{
    fs::read_to_string(path)
        .map(|p| {
            trace!(?p, "read file");

            let parsed = toml::from_str::<T>(&p).unwrap_or_else(|e| {
                panic!("failed to parse TOML file: {e:?}");
            });
            debug!(?parsed, "parsed TOML file");

            parsed
        })
        .unwrap_or_else(|e| {
            panic!("failed to read TOML file: {e}");
        })
}
