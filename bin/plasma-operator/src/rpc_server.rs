//! Bootstraps an RPC server for the operator.

use std::sync::Arc;

use alloy_primitives::{Bytes, B256};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonrpsee::{
    core::RpcResult,
    types::{ErrorCode, ErrorObjectOwned},
    RpcModule,
};
use plasma_chain::{
    errors::ChainError, exits::ExitEngine, producer::BlockProducer, submit::Submitter,
};
use plasma_db::chain::ChainDb;
use plasma_primitives::{
    block::Block,
    coin::CoinState,
    exit::{ChallengeData, ExitData},
    types::{BlockNumber, Slot},
};
use plasma_rpc::{
    traits::{PlasmaChainApiServer, PlasmaControlApiServer, PlasmaExitApiServer},
    types::{RpcRevealStatus, RpcTransactionRequest},
};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::constants::{CONFLICT_ERROR_CODE, NOT_FOUND_ERROR_CODE};

/// Starts an RPC server for the operator and serves requests until it is stopped.
pub(crate) async fn start_rpc<T>(rpc_impl: &T, rpc_addr: &str) -> anyhow::Result<()>
where
    T: PlasmaControlApiServer + PlasmaChainApiServer + PlasmaExitApiServer + Clone + Sync + Send,
{
    let mut rpc_module = RpcModule::new(rpc_impl.clone());

    let control_api = PlasmaControlApiServer::into_rpc(rpc_impl.clone());
    let chain_api = PlasmaChainApiServer::into_rpc(rpc_impl.clone());
    let exit_api = PlasmaExitApiServer::into_rpc(rpc_impl.clone());

    rpc_module.merge(control_api).context("merge control api")?;
    rpc_module.merge(chain_api).context("merge chain api")?;
    rpc_module.merge(exit_api).context("merge exit api")?;

    info!(%rpc_addr, "starting operator rpc server");
    let rpc_server = jsonrpsee::server::ServerBuilder::new()
        .build(&rpc_addr)
        .await
        .context("build operator rpc server")?;

    let rpc_handle = rpc_server.start(rpc_module);

    // `_stop_tx` keeps the server alive for as long as this future is.
    let (_stop_tx, stop_rx): (oneshot::Sender<bool>, oneshot::Receiver<bool>) = oneshot::channel();
    debug!("operator rpc server started");

    let _ = stop_rx.await;
    info!("stopping rpc server");

    if rpc_handle.stop().is_err() {
        warn!("rpc server already stopped");
    }

    Ok(())
}

/// RPC server for the operator node.
///
/// Holds handles to the components of the child chain engine.
pub(crate) struct OperatorRpc<Db> {
    /// Node start time.
    start_time: DateTime<Utc>,

    /// Database handle.
    db: Arc<Db>,

    producer: Arc<BlockProducer<Db>>,

    submitter: Arc<Submitter<Db>>,

    exits: Arc<ExitEngine<Db>>,
}

impl<Db> Clone for OperatorRpc<Db> {
    fn clone(&self) -> Self {
        Self {
            start_time: self.start_time,
            db: self.db.clone(),
            producer: self.producer.clone(),
            submitter: self.submitter.clone(),
            exits: self.exits.clone(),
        }
    }
}

impl<Db> OperatorRpc<Db> {
    /// Creates a new instance of [`OperatorRpc`].
    pub(crate) fn new(
        db: Arc<Db>,
        producer: Arc<BlockProducer<Db>>,
        submitter: Arc<Submitter<Db>>,
        exits: Arc<ExitEngine<Db>>,
    ) -> Self {
        Self {
            start_time: Utc::now(),
            db,
            producer,
            submitter,
            exits,
        }
    }
}

#[async_trait]
impl<Db: ChainDb + 'static> PlasmaControlApiServer for OperatorRpc<Db> {
    async fn get_uptime(&self) -> RpcResult<u64> {
        let current_time = Utc::now().timestamp();
        let start_time = self.start_time.timestamp();

        // The user might care about their system time being incorrect.
        if current_time <= start_time {
            return Err(rpc_error(
                ErrorCode::InternalError.code(),
                "system time may be inaccurate", // `start_time` may have been incorrect too
                current_time.saturating_sub(start_time),
            ));
        }

        Ok(current_time.abs_diff(start_time))
    }
}

#[async_trait]
impl<Db: ChainDb + 'static> PlasmaChainApiServer for OperatorRpc<Db> {
    async fn submit_transaction(&self, tx: RpcTransactionRequest) -> RpcResult<B256> {
        self.submitter
            .submit_transaction(tx.into())
            .await
            .map_err(to_rpc_error)
    }

    async fn reveal_secret(&self, slot: Slot, secret: B256) -> RpcResult<RpcRevealStatus> {
        let completed = self
            .submitter
            .reveal_secret(slot, secret)
            .await
            .map_err(to_rpc_error)?;

        Ok(if completed {
            RpcRevealStatus::Completed
        } else {
            RpcRevealStatus::Recorded
        })
    }

    async fn invalidate_swap(&self, slot: Slot) -> RpcResult<()> {
        self.submitter
            .invalidate_swap(slot)
            .await
            .map_err(to_rpc_error)
    }

    async fn mine_block(&self) -> RpcResult<Block> {
        self.producer.mine_block().await.map_err(to_rpc_error)
    }

    async fn get_block(&self, block_number: BlockNumber) -> RpcResult<Block> {
        self.producer
            .block(block_number)
            .await
            .map_err(to_rpc_error)
    }

    async fn get_proof(&self, slot: Slot, block_number: BlockNumber) -> RpcResult<Bytes> {
        self.producer
            .get_proof(slot, block_number)
            .await
            .map_err(to_rpc_error)
    }

    async fn get_secret_proof(&self, slot: Slot, block_number: BlockNumber) -> RpcResult<Bytes> {
        self.producer
            .get_secret_proof(slot, block_number)
            .await
            .map_err(to_rpc_error)
    }

    async fn get_coin_state(&self, slot: Slot) -> RpcResult<Option<CoinState>> {
        self.db
            .get_coin_state(slot)
            .await
            .map_err(|e| to_rpc_error(e.into()))
    }
}

#[async_trait]
impl<Db: ChainDb + 'static> PlasmaExitApiServer for OperatorRpc<Db> {
    async fn get_exit_data(&self, slot: Slot) -> RpcResult<ExitData> {
        self.exits.exit_data(slot).await.map_err(to_rpc_error)
    }

    async fn get_challenge_after_data(
        &self,
        slot: Slot,
        exit_block: BlockNumber,
    ) -> RpcResult<ChallengeData> {
        self.exits
            .challenge_after_data(slot, exit_block)
            .await
            .map_err(to_rpc_error)
    }

    async fn get_challenge_between_data(
        &self,
        slot: Slot,
        prev_block: BlockNumber,
        exit_block: BlockNumber,
    ) -> RpcResult<ChallengeData> {
        self.exits
            .challenge_between_data(slot, prev_block, exit_block)
            .await
            .map_err(to_rpc_error)
    }

    async fn get_challenge_before_data(
        &self,
        slot: Slot,
        parent_block: BlockNumber,
    ) -> RpcResult<ChallengeData> {
        self.exits
            .challenge_before_data(slot, parent_block)
            .await
            .map_err(to_rpc_error)
    }
}

/// Maps an engine error to the JSON-RPC error returned to the caller.
fn to_rpc_error(err: ChainError) -> ErrorObjectOwned {
    match err {
        ChainError::Validation(reason) => rpc_error(
            ErrorCode::InvalidParams.code(),
            "invalid transaction",
            reason.to_string(),
        ),
        ChainError::NotFound(what) => rpc_error(NOT_FOUND_ERROR_CODE, "not found", what),
        ChainError::Conflict(conflict) => {
            rpc_error(CONFLICT_ERROR_CODE, "conflict", conflict.to_string())
        }
        ChainError::Internal(e) => {
            error!(%e, "internal error while serving request");
            rpc_error(ErrorCode::InternalError.code(), "internal error", e)
        }
    }
}

/// Returns an [`ErrorObjectOwned`] with the given code, message, and data.
fn rpc_error<T: serde::Serialize>(code: i32, message: &str, data: T) -> ErrorObjectOwned {
    ErrorObjectOwned::owned::<_>(code, message, Some(data))
}

#[cfg(test)]
mod tests {
    use plasma_chain::validator::InvalidReason;
    use plasma_db::errors::Conflict;

    use super::*;

    #[test]
    fn errors_map_to_codes() {
        let err = to_rpc_error(InvalidReason::OwnerMismatch.into());
        assert_eq!(err.code(), ErrorCode::InvalidParams.code());
        assert_eq!(err.data().map(|d| d.get()), Some("\"owner does not match\""));

        let err = to_rpc_error(ChainError::NotFound("block 1000".to_string()));
        assert_eq!(err.code(), NOT_FOUND_ERROR_CODE);

        let err = to_rpc_error(Conflict::BlockExists(1000).into());
        assert_eq!(err.code(), CONFLICT_ERROR_CODE);

        let err = to_rpc_error(ChainError::Internal("boom".to_string()));
        assert_eq!(err.code(), ErrorCode::InternalError.code());
    }
}
