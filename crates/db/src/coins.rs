//! Repository of coin states.

use async_trait::async_trait;
use plasma_primitives::{
    coin::{CoinState, CoinStatus},
    types::Slot,
};

use crate::errors::DbResult;

/// Access to the operator's cache of coin ownership.
#[async_trait]
pub trait CoinDb {
    /// Gets, if present, the state of the coin in the given slot.
    async fn get_coin_state(&self, slot: Slot) -> DbResult<Option<CoinState>>;

    /// Inserts or overwrites the state of a coin.
    async fn put_coin_state(&self, coin: CoinState) -> DbResult<()>;

    /// Updates the lifecycle state of an existing coin.
    ///
    /// Fails with not found if the coin is unknown.
    async fn set_coin_status(&self, slot: Slot, status: CoinStatus) -> DbResult<()>;
}
