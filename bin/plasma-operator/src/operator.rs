//! Wires the child chain engine to its storage, the root chain and the RPC server.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use plasma_chain::{
    events::EventHandler,
    exits::ExitEngine,
    producer::BlockProducer,
    submit::Submitter,
    validator::{CustodyValidator, TransactionValidator},
};
use plasma_db::{
    chain::ChainDb,
    persistent::sqlite::{SqliteDb, MIGRATOR},
};
use plasma_root_chain::{
    alloy_client::AlloyRootChain, client::RootChainClient, watcher::EventWatcher,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tokio::{
    signal, spawn,
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};
use tracing::{error, info, warn};

use crate::{
    config::Config,
    constants::{DB_NAME, EVENT_CHANNEL_CAPACITY},
    rpc_server::{start_rpc, OperatorRpc},
};

/// Starts every task of the operator and runs until a shutdown signal is received.
pub(crate) async fn bootstrap(config: Config) -> anyhow::Result<()> {
    let db = Arc::new(init_database_handle(&config).await?);

    let (root_chain, watcher) = if config.chainless {
        warn!("running chain-less, blocks will not be submitted and exits will not be disputed");
        (None, None)
    } else {
        let root_chain_config = config
            .root_chain
            .as_ref()
            .context("root chain configuration is required unless running chain-less")?;

        let client = AlloyRootChain::connect(root_chain_config)
            .context("could not build root chain client")?;
        let watcher = EventWatcher::new(client.provider().clone(), root_chain_config);
        let client: Arc<dyn RootChainClient> = Arc::new(client);

        (Some(client), Some(watcher))
    };

    let validator: Arc<dyn TransactionValidator> = Arc::new(CustodyValidator::new(db.clone()));
    let producer = Arc::new(BlockProducer::new(
        db.clone(),
        validator.clone(),
        root_chain.clone(),
    ));
    let submitter = Arc::new(Submitter::new(db.clone(), validator));
    let exits = Arc::new(ExitEngine::new(db.clone()));

    if let Some(watcher) = watcher {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handler = EventHandler::new(db.clone(), producer.clone(), exits.clone(), root_chain);

        spawn(watcher.run(events_tx));
        spawn(handler.run(events_rx));
    }

    spawn(mine_periodically(producer.clone(), config.mining_interval));

    let rpc_addr = config.rpc_addr.clone();
    let rpc_impl = OperatorRpc::new(db, producer, submitter, exits);
    let rpc_task = spawn(async move {
        if let Err(e) = start_rpc(&rpc_impl, rpc_addr.as_str()).await {
            error!(?e, "RPC server failed");
        }
    });

    signal::ctrl_c()
        .await
        .context("could not listen for shutdown signal")?;
    info!("received shutdown signal");

    rpc_task.abort();

    Ok(())
}

/// Runs a mining round every `period`, logging failed rounds.
async fn mine_periodically<Db: ChainDb + 'static>(
    producer: Arc<BlockProducer<Db>>,
    period: Duration,
) {
    info!(?period, "scheduling mining rounds");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if let Err(e) = producer.mine_block().await {
            error!(%e, "mining round failed");
        }
    }
}

async fn init_database_handle(config: &Config) -> anyhow::Result<SqliteDb> {
    let db_path = create_db_path(&config.datadir, DB_NAME)?;

    let connect_options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await
        .with_context(|| format!("could not open database at {}", db_path.display()))?;

    info!(action = "running migrations", %DB_NAME);
    MIGRATOR
        .run(&pool)
        .await
        .context("could not run migrations")?;

    Ok(SqliteDb::with_config(pool, config.db.clone()))
}

fn create_db_path(datadir: impl AsRef<Path>, db_name: &str) -> anyhow::Result<PathBuf> {
    let datadir = datadir.as_ref();

    if !datadir.exists() {
        fs::create_dir_all(datadir)
            .with_context(|| format!("could not create datadir at {}", datadir.display()))?;
    }

    Ok(datadir.join(db_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_creates_datadir() {
        let root = tempfile::tempdir().unwrap();
        let datadir = root.path().join("nested");

        let path = create_db_path(&datadir, DB_NAME).unwrap();
        assert!(datadir.is_dir());
        assert_eq!(path, datadir.join(DB_NAME));
        assert!(!path.exists(), "the database file is created by sqlite");
    }
}
