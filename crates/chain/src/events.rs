//! Reactions to root chain events.

use std::sync::Arc;

use alloy_primitives::Address;
use plasma_db::chain::ChainDb;
use plasma_primitives::{
    coin::CoinStatus,
    types::{BlockNumber, Slot},
};
use plasma_root_chain::{client::RootChainClient, events::RootChainEvent};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::{errors::ChainResult, exits::ExitEngine, producer::BlockProducer};

/// Applies root chain events to the child chain.
pub struct EventHandler<Db> {
    db: Arc<Db>,

    producer: Arc<BlockProducer<Db>>,

    exits: Arc<ExitEngine<Db>>,

    /// Where challenges are sent; exits go unchallenged without it.
    root_chain: Option<Arc<dyn RootChainClient>>,
}

impl<Db> std::fmt::Debug for EventHandler<Db> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandler")
            .field("chainless", &self.root_chain.is_none())
            .finish_non_exhaustive()
    }
}

impl<Db: ChainDb> EventHandler<Db> {
    /// Creates a new handler.
    pub fn new(
        db: Arc<Db>,
        producer: Arc<BlockProducer<Db>>,
        exits: Arc<ExitEngine<Db>>,
        root_chain: Option<Arc<dyn RootChainClient>>,
    ) -> Self {
        Self {
            db,
            producer,
            exits,
            root_chain,
        }
    }

    /// Dispatches an event to its handler.
    pub async fn handle(&self, event: RootChainEvent) -> ChainResult<()> {
        match event {
            RootChainEvent::Deposit {
                slot,
                block_number,
                from,
            } => self.on_deposit(slot, block_number, from).await,
            RootChainEvent::StartedExit { slot, owner } => self.on_started_exit(slot, owner).await,
            RootChainEvent::CoinReset { slot, owner } => self.on_coin_reset(slot, owner).await,
            RootChainEvent::FinalizedExit { slot, owner } => {
                info!(%slot, %owner, "exit finalized");
                Ok(())
            }
            RootChainEvent::ChallengedExit { slot } => {
                info!(%slot, "exit challenged");
                Ok(())
            }
            RootChainEvent::RespondedExitChallenge { slot } => {
                info!(%slot, "exit challenge answered");
                Ok(())
            }
        }
    }

    /// Creates the deposit block dictated by the root chain.
    pub async fn on_deposit(
        &self,
        slot: Slot,
        block_number: BlockNumber,
        owner: Address,
    ) -> ChainResult<()> {
        self.producer
            .deposit_block(slot, block_number, owner)
            .await?;

        Ok(())
    }

    /// Freezes the coin and challenges the exit if the operator's history contradicts it.
    pub async fn on_started_exit(&self, slot: Slot, owner: Address) -> ChainResult<()> {
        self.db.set_coin_status(slot, CoinStatus::Exiting).await?;
        info!(%slot, %owner, "exit started");

        let Some(root_chain) = &self.root_chain else {
            warn!(%slot, "chain-less mode, not disputing exit");
            return Ok(());
        };

        self.exits.dispute_exit(slot, root_chain.as_ref()).await?;

        Ok(())
    }

    /// Makes the coin transferable again after its exit was cancelled.
    pub async fn on_coin_reset(&self, slot: Slot, owner: Address) -> ChainResult<()> {
        self.db.set_coin_status(slot, CoinStatus::Deposited).await?;
        info!(%slot, %owner, "coin reset");

        Ok(())
    }

    /// Handles events until the sending side is dropped.
    ///
    /// A failing event is logged and skipped.
    pub async fn run(self, mut events: mpsc::Receiver<RootChainEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(event).await {
                error!(?event, %e, "could not handle root chain event");
            }
        }

        info!("root chain event stream closed");
    }
}

#[cfg(test)]
mod tests {
    use plasma_db::{coins::CoinDb, inmemory::InMemoryDb, transactions::TransactionDb};
    use plasma_primitives::exit::{ExitInfo, ExitState};
    use plasma_test_utils::prelude::*;

    use super::*;
    use crate::validator::CustodyValidator;

    struct Harness {
        db: Arc<InMemoryDb>,
        root_chain: Arc<MockRootChain>,
        handler: EventHandler<InMemoryDb>,
    }

    fn harness(chainless: bool) -> Harness {
        let db = Arc::new(InMemoryDb::new());
        let root_chain = Arc::new(MockRootChain::new());
        let client: Option<Arc<dyn RootChainClient>> =
            (!chainless).then(|| root_chain.clone() as Arc<dyn RootChainClient>);

        let validator = Arc::new(CustodyValidator::new(db.clone()));
        let producer = Arc::new(BlockProducer::new(
            db.clone(),
            validator,
            client.clone(),
        ));
        let exits = Arc::new(ExitEngine::new(db.clone()));

        Harness {
            handler: EventHandler::new(db.clone(), producer, exits, client),
            db,
            root_chain,
        }
    }

    #[tokio::test]
    async fn deposit_event_creates_the_coin() {
        let h = harness(true);
        let [alice] = Account::many();

        h.handler
            .handle(RootChainEvent::Deposit {
                slot: 3,
                block_number: 7,
                from: alice.address(),
            })
            .await
            .unwrap();

        let coin = h.db.get_coin_state(3).await.unwrap().unwrap();
        assert_eq!(coin.owner, alice.address());
        assert_eq!(coin.state, CoinStatus::Deposited);
        assert!(h.db.has_transactions(3).await.unwrap());
    }

    #[tokio::test]
    async fn exit_lifecycle() {
        let h = harness(false);
        let [alice] = Account::many();
        h.handler.on_deposit(1, 1, alice.address()).await.unwrap();

        h.root_chain
            .set_exit(
                1,
                ExitInfo {
                    owner: alice.address(),
                    prev_block: 0,
                    exit_block: 1,
                    state: ExitState::Exiting,
                },
            )
            .await;

        h.handler
            .handle(RootChainEvent::StartedExit {
                slot: 1,
                owner: alice.address(),
            })
            .await
            .unwrap();
        assert_eq!(
            h.db.get_coin_state(1).await.unwrap().map(|coin| coin.state),
            Some(CoinStatus::Exiting),
            "an honest exit freezes the coin"
        );
        assert!(h.root_chain.calls().await.is_empty());

        h.handler
            .handle(RootChainEvent::CoinReset {
                slot: 1,
                owner: alice.address(),
            })
            .await
            .unwrap();
        assert_eq!(
            h.db.get_coin_state(1).await.unwrap().map(|coin| coin.state),
            Some(CoinStatus::Deposited)
        );
    }

    #[tokio::test]
    async fn run_skips_failing_events() {
        let h = harness(true);
        let [alice] = Account::many();
        let (tx, rx) = mpsc::channel(4);

        let db = h.db.clone();
        let task = tokio::spawn(h.handler.run(rx));

        // unknown coin
        tx.send(RootChainEvent::CoinReset {
            slot: 9,
            owner: alice.address(),
        })
        .await
        .unwrap();
        tx.send(RootChainEvent::Deposit {
            slot: 1,
            block_number: 1,
            from: alice.address(),
        })
        .await
        .unwrap();
        drop(tx);

        task.await.unwrap();
        assert!(db.get_coin_state(1).await.unwrap().is_some());
    }
}
