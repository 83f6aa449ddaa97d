//! [`RootChainClient`] over an Ethereum JSON-RPC endpoint.

use std::str::FromStr;

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{B256, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use plasma_primitives::{
    exit::{ChallengeData, ExitInfo, ExitState},
    types::{BlockNumber, Slot},
};
use tracing::{debug, info};

use crate::{
    client::RootChainClient,
    config::RootChainConfig,
    contract::RootChain,
    errors::{RootChainError, RootChainResult},
    events::to_block_number,
};

/// Signs and sends contract calls with the operator key through an HTTP provider.
#[derive(Debug, Clone)]
pub struct AlloyRootChain {
    contract: RootChain::RootChainInstance<DynProvider>,
}

impl AlloyRootChain {
    /// Builds the client described by `config`.
    ///
    /// No request is made until the first call.
    pub fn connect(config: &RootChainConfig) -> RootChainResult<Self> {
        let signer = PrivateKeySigner::from_str(&config.operator_key)
            .map_err(|e| RootChainError::Config(format!("operator key: {e}")))?;

        info!(
            operator = %signer.address(),
            contract = %config.contract_address,
            rpc = %config.rpc_url,
            "connecting to root chain"
        );

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::new(signer))
            .connect_http(config.rpc_url.clone())
            .erased();

        Ok(Self {
            contract: RootChain::new(config.contract_address, provider),
        })
    }

    /// The provider used for every call, shared with the [`EventWatcher`](crate::watcher::EventWatcher).
    pub fn provider(&self) -> &DynProvider {
        self.contract.provider()
    }

    async fn confirm(pending: PendingTransactionBuilder<Ethereum>) -> RootChainResult<B256> {
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, "waiting for root chain transaction");

        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            return Err(RootChainError::Reverted(tx_hash));
        }

        Ok(tx_hash)
    }
}

#[async_trait]
impl RootChainClient for AlloyRootChain {
    async fn submit_block(&self, block_number: BlockNumber, root: B256) -> RootChainResult<B256> {
        let pending = self
            .contract
            .submitBlock(U256::from(block_number), root)
            .send()
            .await?;

        let tx_hash = Self::confirm(pending).await?;
        info!(%block_number, %root, %tx_hash, "submitted block to root chain");

        Ok(tx_hash)
    }

    async fn challenge_after(&self, challenge: &ChallengeData) -> RootChainResult<B256> {
        let pending = self
            .contract
            .challengeAfter(
                challenge.slot,
                challenge.tx_bytes.clone(),
                challenge.proof.clone(),
                challenge.signature.clone(),
                U256::from(challenge.block_number),
            )
            .send()
            .await?;

        let tx_hash = Self::confirm(pending).await?;
        info!(slot = %challenge.slot, %tx_hash, "challenged exit after");

        Ok(tx_hash)
    }

    async fn challenge_between(&self, challenge: &ChallengeData) -> RootChainResult<B256> {
        let pending = self
            .contract
            .challengeBetween(
                challenge.slot,
                challenge.tx_bytes.clone(),
                challenge.proof.clone(),
                challenge.signature.clone(),
                U256::from(challenge.block_number),
            )
            .send()
            .await?;

        let tx_hash = Self::confirm(pending).await?;
        info!(slot = %challenge.slot, %tx_hash, "challenged exit between");

        Ok(tx_hash)
    }

    async fn challenge_before(&self, challenge: &ChallengeData) -> RootChainResult<B256> {
        let pending = self
            .contract
            .challengeBefore(
                challenge.slot,
                challenge.tx_bytes.clone(),
                challenge.proof.clone(),
                U256::from(challenge.block_number),
            )
            .send()
            .await?;

        let tx_hash = Self::confirm(pending).await?;
        info!(slot = %challenge.slot, %tx_hash, "challenged exit before");

        Ok(tx_hash)
    }

    async fn get_exit(&self, slot: Slot) -> RootChainResult<ExitInfo> {
        let exit = self.contract.getExit(slot).call().await?;

        Ok(ExitInfo {
            owner: exit.owner,
            prev_block: to_block_number(exit.prevBlock)?,
            exit_block: to_block_number(exit.exitBlock)?,
            state: ExitState::from(exit.state),
        })
    }
}
