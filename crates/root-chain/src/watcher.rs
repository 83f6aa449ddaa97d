//! Polls the root chain for contract logs and forwards them as [`RootChainEvent`]s.

use std::time::Duration;

use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider},
    rpc::types::Filter,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    config::RootChainConfig,
    errors::RootChainResult,
    events::RootChainEvent,
};

/// Scans consecutive root chain block ranges for logs of the contract.
///
/// Events are delivered in log order. A failed poll is retried from the same block on the next
/// tick so that no range is skipped.
#[derive(Debug)]
pub struct EventWatcher {
    provider: DynProvider,

    contract: Address,

    next_block: u64,

    poll_interval: Duration,
}

impl EventWatcher {
    /// Creates a watcher that starts scanning at the configured block.
    pub fn new(provider: DynProvider, config: &RootChainConfig) -> Self {
        Self {
            provider,
            contract: config.contract_address,
            next_block: config.start_block,
            poll_interval: config.poll_interval,
        }
    }

    /// The next root chain block to scan.
    pub const fn next_block(&self) -> u64 {
        self.next_block
    }

    /// Fetches and decodes the logs between the last scanned block and the current head.
    pub async fn poll(&mut self) -> RootChainResult<Vec<RootChainEvent>> {
        let head = self.provider.get_block_number().await?;
        if head < self.next_block {
            return Ok(Vec::new());
        }

        let filter = Filter::new()
            .address(self.contract)
            .from_block(self.next_block)
            .to_block(head);
        let logs = self.provider.get_logs(&filter).await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            match RootChainEvent::from_log(log) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => warn!(?log.transaction_hash, %e, "skipping undecodable root chain log"),
            }
        }

        debug!(from = %self.next_block, to = %head, num_events = %events.len(), "scanned root chain");
        self.next_block = head + 1;

        Ok(events)
    }

    /// Polls forever, sending every event to `events`.
    ///
    /// Returns once the receiving side is dropped.
    pub async fn run(mut self, events: mpsc::Sender<RootChainEvent>) {
        info!(contract = %self.contract, from = %self.next_block, "watching root chain events");

        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;

            let batch = match self.poll().await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(%e, from = %self.next_block, "could not poll root chain, retrying");
                    continue;
                }
            };

            for event in batch {
                if events.send(event).await.is_err() {
                    info!("event receiver dropped, stopping root chain watcher");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{self, U256, U64},
        providers::ProviderBuilder,
        rpc::types::Log,
        sol_types::SolEvent,
        transports::mock::Asserter,
    };

    use super::*;
    use crate::contract::RootChain;

    fn watcher(asserter: &Asserter, start_block: u64) -> EventWatcher {
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter.clone())
            .erased();
        let config = RootChainConfig {
            rpc_url: "http://localhost:8545".parse().unwrap(),
            contract_address: Address::repeat_byte(0xcc),
            operator_key: String::new(),
            poll_interval: Duration::from_millis(10),
            start_block,
        };

        EventWatcher::new(provider, &config)
    }

    #[tokio::test]
    async fn poll_decodes_logs_and_advances() {
        let asserter = Asserter::new();
        let mut watcher = watcher(&asserter, 5);

        let deposit = RootChain::Deposit {
            slot: 3,
            blockNumber: U256::from(1),
            from: Address::repeat_byte(1),
        };
        let log = Log {
            inner: primitives::Log {
                address: Address::repeat_byte(0xcc),
                data: deposit.encode_log_data(),
            },
            ..Default::default()
        };

        asserter.push_success(&U64::from(10));
        asserter.push_success(&vec![log]);

        let events = watcher.poll().await.expect("must poll");
        assert_eq!(
            events,
            vec![RootChainEvent::Deposit {
                slot: 3,
                block_number: 1,
                from: Address::repeat_byte(1),
            }]
        );
        assert_eq!(watcher.next_block(), 11);
    }

    #[tokio::test]
    async fn poll_waits_for_new_blocks() {
        let asserter = Asserter::new();
        let mut watcher = watcher(&asserter, 20);

        asserter.push_success(&U64::from(19));

        assert!(watcher.poll().await.unwrap().is_empty());
        assert_eq!(watcher.next_block(), 20);
    }
}
