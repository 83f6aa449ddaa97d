//! SQLite implementation of the persistent storage layer.

use std::future::Future;

use alloy_primitives::B256;
use async_trait::async_trait;
use plasma_primitives::{
    block::Block,
    coin::{CoinState, CoinStatus},
    transaction::Transaction,
    types::{BlockNumber, Slot},
};
use sqlx::{migrate::Migrator, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use super::{
    config::DbConfig,
    errors::StorageError,
    models::{BlockRow, CoinStateRow, TransactionRow},
    types::{to_db_int, DbAddress, DbCoinStatus, DbHash, DbSlot},
};
use crate::{
    blocks::BlockDb,
    chain::ChainDb,
    coins::CoinDb,
    errors::{Conflict, DbError, DbResult, Missing},
    transactions::TransactionDb,
};

/// The schema migrations, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Prefixes the given clauses with the projection of [`TransactionRow`].
macro_rules! select_transactions {
    ($($rest:literal),+) => {
        concat!(
            "SELECT hash, slot, owner, recipient, block_spent, mined_block, mined_timestamp, ",
            "signature, swapping_slot, hash_secret, secret, invalidated ",
            $($rest),+
        )
    };
}

/// SQLite result codes that signal contention rather than a failed statement.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        _ => false,
    }
}

/// Block numbers beyond the `INTEGER` range compare above every stored block.
fn clamp_block_number(block_number: BlockNumber) -> i64 {
    i64::try_from(block_number).unwrap_or(i64::MAX)
}

fn into_transactions(rows: Vec<TransactionRow>) -> DbResult<Vec<Transaction>> {
    Ok(rows
        .into_iter()
        .map(Transaction::try_from)
        .collect::<Result<_, _>>()?)
}

async fn transaction_exists(conn: &mut SqliteConnection, hash: B256) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE hash = $1")
        .bind(DbHash::from(hash))
        .fetch_one(conn)
        .await
        .map_err(StorageError::from)?;

    Ok(count > 0)
}

async fn block_exists(conn: &mut SqliteConnection, block_number: BlockNumber) -> DbResult<bool> {
    let Ok(block_number) = i64::try_from(block_number) else {
        return Ok(false);
    };

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks WHERE block_number = $1")
        .bind(block_number)
        .fetch_one(conn)
        .await
        .map_err(StorageError::from)?;

    Ok(count > 0)
}

async fn coin_exists(conn: &mut SqliteConnection, slot: Slot) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coin_states WHERE slot = $1")
        .bind(DbSlot::from(slot))
        .fetch_one(conn)
        .await
        .map_err(StorageError::from)?;

    Ok(count > 0)
}

async fn insert_transaction_row(conn: &mut SqliteConnection, tx: &Transaction) -> DbResult<()> {
    let swap = tx.swap.as_ref();

    sqlx::query(
        "INSERT INTO transactions
            (hash, slot, owner, recipient, block_spent, mined_block, mined_timestamp, signature,
             swapping_slot, hash_secret, secret, invalidated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(DbHash::from(tx.hash))
    .bind(DbSlot::from(tx.slot))
    .bind(DbAddress::from(tx.owner))
    .bind(DbAddress::from(tx.recipient))
    .bind(to_db_int(tx.block_spent)?)
    .bind(tx.mined_block.map(to_db_int).transpose()?)
    .bind(tx.mined_timestamp.map(to_db_int).transpose()?)
    .bind(tx.signature.to_vec())
    .bind(swap.map(|terms| DbSlot::from(terms.swapping_slot)))
    .bind(swap.map(|terms| DbHash::from(terms.hash_secret)))
    .bind(swap.and_then(|terms| terms.secret).map(DbHash::from))
    .bind(swap.is_some_and(|terms| terms.invalidated))
    .execute(conn)
    .await
    .map_err(StorageError::from)?;

    Ok(())
}

async fn insert_block_rows(conn: &mut SqliteConnection, block: &Block) -> DbResult<()> {
    let block_number = to_db_int(block.block_number)?;

    sqlx::query("INSERT INTO blocks (block_number, root_hash, timestamp) VALUES ($1, $2, $3)")
        .bind(block_number)
        .bind(DbHash::from(block.root_hash))
        .bind(to_db_int(block.timestamp)?)
        .execute(&mut *conn)
        .await
        .map_err(StorageError::from)?;

    for (position, hash) in block.transactions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO block_transactions (block_number, position, tx_hash)
                VALUES ($1, $2, $3)",
        )
        .bind(block_number)
        .bind(position as i64)
        .bind(DbHash::from(*hash))
        .execute(&mut *conn)
        .await
        .map_err(StorageError::from)?;
    }

    Ok(())
}

async fn load_block(conn: &mut SqliteConnection, header: BlockRow) -> DbResult<Block> {
    let transactions: Vec<DbHash> = sqlx::query_scalar(
        "SELECT tx_hash FROM block_transactions WHERE block_number = $1 ORDER BY position",
    )
    .bind(header.block_number)
    .fetch_all(conn)
    .await
    .map_err(StorageError::from)?;

    Ok(header.into_block(transactions)?)
}

/// A [`ChainDb`] backed by a SQLite connection pool.
///
/// Writes that span several tables run inside a single SQLite transaction and are retried
/// according to the [`DbConfig`] when the database is busy.
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pool: SqlitePool,

    config: DbConfig,
}

impl SqliteDb {
    /// Creates a new handle over an already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_config(pool, DbConfig::default())
    }

    /// Creates a new handle with a custom retry policy.
    pub fn with_config(pool: SqlitePool, config: DbConfig) -> Self {
        Self { pool, config }
    }

    async fn with_retries<T, F, Fut>(&self, operation: &str, f: F) -> DbResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match f().await {
                Err(DbError::Storage(StorageError::Driver(err)))
                    if is_transient(&err) && attempt < self.config.max_retry_count() =>
                {
                    attempt += 1;
                    warn!(%operation, %attempt, %err, "database is busy, retrying");

                    tokio::time::sleep(self.config.backoff_period()).await;
                }
                result => return result,
            }
        }
    }

    async fn try_insert_deposit(
        &self,
        coin: CoinState,
        tx: &Transaction,
        block: &Block,
    ) -> DbResult<()> {
        let mut db_tx = self.pool.begin().await.map_err(StorageError::from)?;

        if block_exists(&mut *db_tx, block.block_number).await? {
            return Err(Conflict::BlockExists(block.block_number).into());
        }

        let slot_used: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE slot = $1")
                .bind(DbSlot::from(tx.slot))
                .fetch_one(&mut *db_tx)
                .await
                .map_err(StorageError::from)?;
        if slot_used > 0 || coin_exists(&mut *db_tx, coin.slot).await? {
            return Err(Conflict::SlotExists(coin.slot).into());
        }

        if transaction_exists(&mut *db_tx, tx.hash).await? {
            return Err(Conflict::TransactionExists(tx.hash).into());
        }

        let mut tx = tx.clone();
        tx.mined_block = Some(block.block_number);
        tx.mined_timestamp = Some(block.timestamp);

        sqlx::query("INSERT INTO coin_states (slot, state, owner) VALUES ($1, $2, $3)")
            .bind(DbSlot::from(coin.slot))
            .bind(DbCoinStatus::from(coin.state))
            .bind(DbAddress::from(coin.owner))
            .execute(&mut *db_tx)
            .await
            .map_err(StorageError::from)?;
        insert_transaction_row(&mut *db_tx, &tx).await?;
        insert_block_rows(&mut *db_tx, block).await?;

        db_tx.commit().await.map_err(StorageError::from)?;

        debug!(slot = %coin.slot, block = %block.block_number, "stored deposit");

        Ok(())
    }

    async fn try_commit_block(&self, block: &Block, mined: &[Transaction]) -> DbResult<()> {
        let mut db_tx = self.pool.begin().await.map_err(StorageError::from)?;

        if block_exists(&mut *db_tx, block.block_number).await? {
            return Err(Conflict::BlockExists(block.block_number).into());
        }

        for tx in mined {
            let mined_block: Option<Option<i64>> =
                sqlx::query_scalar("SELECT mined_block FROM transactions WHERE hash = $1")
                    .bind(DbHash::from(tx.hash))
                    .fetch_optional(&mut *db_tx)
                    .await
                    .map_err(StorageError::from)?;

            match mined_block {
                None => return Err(Missing::Transaction(tx.hash).into()),
                Some(Some(_)) => return Err(Conflict::AlreadyMined(tx.hash).into()),
                Some(None) => {}
            }

            if !coin_exists(&mut *db_tx, tx.slot).await? {
                return Err(Missing::Coin(tx.slot).into());
            }
        }

        let block_number = to_db_int(block.block_number)?;
        let timestamp = to_db_int(block.timestamp)?;

        for tx in mined {
            sqlx::query(
                "UPDATE transactions SET mined_block = $1, mined_timestamp = $2 WHERE hash = $3",
            )
            .bind(block_number)
            .bind(timestamp)
            .bind(DbHash::from(tx.hash))
            .execute(&mut *db_tx)
            .await
            .map_err(StorageError::from)?;

            if tx.is_swap() {
                sqlx::query("UPDATE coin_states SET owner = $1, state = $2 WHERE slot = $3")
                    .bind(DbAddress::from(tx.recipient))
                    .bind(DbCoinStatus::from(CoinStatus::Swapping))
                    .bind(DbSlot::from(tx.slot))
                    .execute(&mut *db_tx)
                    .await
                    .map_err(StorageError::from)?;
            } else {
                sqlx::query("UPDATE coin_states SET owner = $1 WHERE slot = $2")
                    .bind(DbAddress::from(tx.recipient))
                    .bind(DbSlot::from(tx.slot))
                    .execute(&mut *db_tx)
                    .await
                    .map_err(StorageError::from)?;
            }
        }

        insert_block_rows(&mut *db_tx, block).await?;

        db_tx.commit().await.map_err(StorageError::from)?;

        debug!(block = %block.block_number, num_txs = %mined.len(), "committed block");

        Ok(())
    }

    async fn try_invalidate_swaps(&self, swaps: &[Transaction]) -> DbResult<()> {
        let mut db_tx = self.pool.begin().await.map_err(StorageError::from)?;

        for swap in swaps {
            let mined_swap: Option<(Option<i64>, i64)> = sqlx::query_as(
                "SELECT mined_block, swapping_slot IS NOT NULL FROM transactions WHERE hash = $1",
            )
            .bind(DbHash::from(swap.hash))
            .fetch_optional(&mut *db_tx)
            .await
            .map_err(StorageError::from)?;

            match mined_swap {
                None => return Err(Missing::Transaction(swap.hash).into()),
                Some((Some(_), 1)) => {}
                Some(_) => return Err(Missing::MinedSwap(swap.hash).into()),
            }

            if !coin_exists(&mut *db_tx, swap.slot).await? {
                return Err(Missing::Coin(swap.slot).into());
            }

            sqlx::query("UPDATE transactions SET invalidated = 1 WHERE hash = $1")
                .bind(DbHash::from(swap.hash))
                .execute(&mut *db_tx)
                .await
                .map_err(StorageError::from)?;

            sqlx::query("UPDATE coin_states SET owner = $1, state = $2 WHERE slot = $3")
                .bind(DbAddress::from(swap.owner))
                .bind(DbCoinStatus::from(CoinStatus::Deposited))
                .bind(DbSlot::from(swap.slot))
                .execute(&mut *db_tx)
                .await
                .map_err(StorageError::from)?;
        }

        db_tx.commit().await.map_err(StorageError::from)?;

        debug!(num_swaps = %swaps.len(), "invalidated swaps");

        Ok(())
    }
}

#[async_trait]
impl TransactionDb for SqliteDb {
    async fn get_transaction(&self, hash: B256) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(select_transactions!(
            "FROM transactions WHERE hash = $1"
        ))
        .bind(DbHash::from(hash))
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(Transaction::try_from).transpose()?)
    }

    async fn insert_transaction(&self, tx: &Transaction) -> DbResult<()> {
        let mut db_tx = self.pool.begin().await.map_err(StorageError::from)?;

        if transaction_exists(&mut *db_tx, tx.hash).await? {
            return Err(Conflict::TransactionExists(tx.hash).into());
        }

        insert_transaction_row(&mut *db_tx, tx).await?;

        db_tx.commit().await.map_err(StorageError::from)?;

        Ok(())
    }

    async fn delete_transaction(&self, hash: B256) -> DbResult<()> {
        sqlx::query("DELETE FROM transactions WHERE hash = $1")
            .bind(DbHash::from(hash))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn pending_transactions(&self) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(select_transactions!(
            "FROM transactions WHERE mined_block IS NULL ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        into_transactions(rows)
    }

    async fn has_transactions(&self, slot: Slot) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE slot = $1")
            .bind(DbSlot::from(slot))
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(count > 0)
    }

    async fn last_mined_transaction(&self, slot: Slot) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(select_transactions!(
            "FROM transactions WHERE slot = $1 AND mined_block IS NOT NULL AND invalidated = 0 ",
            "ORDER BY mined_block DESC, seq DESC LIMIT 1"
        ))
        .bind(DbSlot::from(slot))
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(Transaction::try_from).transpose()?)
    }

    async fn mined_transaction_in_block(
        &self,
        slot: Slot,
        block_number: BlockNumber,
    ) -> DbResult<Option<Transaction>> {
        let Ok(block_number) = i64::try_from(block_number) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, TransactionRow>(select_transactions!(
            "FROM transactions WHERE slot = $1 AND mined_block = $2 AND invalidated = 0 ",
            "ORDER BY seq LIMIT 1"
        ))
        .bind(DbSlot::from(slot))
        .bind(block_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(Transaction::try_from).transpose()?)
    }

    async fn mined_transactions_spending(
        &self,
        slot: Slot,
        block_spent: BlockNumber,
    ) -> DbResult<Vec<Transaction>> {
        let Ok(block_spent) = i64::try_from(block_spent) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as::<_, TransactionRow>(select_transactions!(
            "FROM transactions WHERE slot = $1 AND block_spent = $2 AND mined_block IS NOT NULL ",
            "AND invalidated = 0 ORDER BY mined_block, seq"
        ))
        .bind(DbSlot::from(slot))
        .bind(block_spent)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        into_transactions(rows)
    }

    async fn last_mined_transaction_spending_at_most(
        &self,
        slot: Slot,
        block_number: BlockNumber,
    ) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(select_transactions!(
            "FROM transactions WHERE slot = $1 AND block_spent <= $2 AND mined_block IS NOT NULL ",
            "AND invalidated = 0 ORDER BY mined_block DESC, seq DESC LIMIT 1"
        ))
        .bind(DbSlot::from(slot))
        .bind(clamp_block_number(block_number))
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(Transaction::try_from).transpose()?)
    }

    async fn transactions_in_block(&self, block_number: BlockNumber) -> DbResult<Vec<Transaction>> {
        let Ok(block_number) = i64::try_from(block_number) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as::<_, TransactionRow>(select_transactions!(
            "FROM block_transactions JOIN transactions ON transactions.hash = tx_hash ",
            "WHERE block_number = $1 ORDER BY position"
        ))
        .bind(block_number)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        into_transactions(rows)
    }

    async fn set_swap_secret(&self, hash: B256, secret: B256) -> DbResult<()> {
        let mut db_tx = self.pool.begin().await.map_err(StorageError::from)?;

        if !transaction_exists(&mut *db_tx, hash).await? {
            return Err(Missing::Transaction(hash).into());
        }

        sqlx::query(
            "UPDATE transactions SET secret = $1 WHERE hash = $2 AND swapping_slot IS NOT NULL",
        )
        .bind(DbHash::from(secret))
        .bind(DbHash::from(hash))
        .execute(&mut *db_tx)
        .await
        .map_err(StorageError::from)?;

        db_tx.commit().await.map_err(StorageError::from)?;

        Ok(())
    }
}

#[async_trait]
impl BlockDb for SqliteDb {
    async fn get_block(&self, block_number: BlockNumber) -> DbResult<Option<Block>> {
        let Ok(block_number) = i64::try_from(block_number) else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await.map_err(StorageError::from)?;
        let header = sqlx::query_as::<_, BlockRow>(
            "SELECT block_number, root_hash, timestamp FROM blocks WHERE block_number = $1",
        )
        .bind(block_number)
        .fetch_optional(&mut *conn)
        .await
        .map_err(StorageError::from)?;

        match header {
            Some(header) => Ok(Some(load_block(&mut *conn, header).await?)),
            None => Ok(None),
        }
    }

    async fn latest_block(&self) -> DbResult<Option<Block>> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::from)?;
        let header = sqlx::query_as::<_, BlockRow>(
            "SELECT block_number, root_hash, timestamp FROM blocks
                ORDER BY block_number DESC LIMIT 1",
        )
        .fetch_optional(&mut *conn)
        .await
        .map_err(StorageError::from)?;

        match header {
            Some(header) => Ok(Some(load_block(&mut *conn, header).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CoinDb for SqliteDb {
    async fn get_coin_state(&self, slot: Slot) -> DbResult<Option<CoinState>> {
        let row = sqlx::query_as::<_, CoinStateRow>(
            "SELECT slot, state, owner FROM coin_states WHERE slot = $1",
        )
        .bind(DbSlot::from(slot))
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(CoinState::from))
    }

    async fn put_coin_state(&self, coin: CoinState) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO coin_states (slot, state, owner) VALUES ($1, $2, $3)
                ON CONFLICT(slot) DO UPDATE SET state = excluded.state, owner = excluded.owner",
        )
        .bind(DbSlot::from(coin.slot))
        .bind(DbCoinStatus::from(coin.state))
        .bind(DbAddress::from(coin.owner))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(())
    }

    async fn set_coin_status(&self, slot: Slot, status: CoinStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE coin_states SET state = $1 WHERE slot = $2")
            .bind(DbCoinStatus::from(status))
            .bind(DbSlot::from(slot))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(Missing::Coin(slot).into());
        }

        Ok(())
    }
}

#[async_trait]
impl ChainDb for SqliteDb {
    async fn insert_deposit(
        &self,
        coin: CoinState,
        tx: &Transaction,
        block: &Block,
    ) -> DbResult<()> {
        self.with_retries("insert_deposit", || {
            self.try_insert_deposit(coin, tx, block)
        })
        .await
    }

    async fn commit_block(&self, block: &Block, mined: &[Transaction]) -> DbResult<()> {
        self.with_retries("commit_block", || self.try_commit_block(block, mined))
            .await
    }

    async fn invalidate_swaps(&self, swaps: &[Transaction]) -> DbResult<()> {
        self.with_retries("invalidate_swaps", || self.try_invalidate_swaps(swaps))
            .await
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::test_suite;

    /// Creates a fresh, migrated in-memory database.
    ///
    /// The pool holds a single connection that never expires since every connection to
    /// `sqlite::memory:` opens a distinct database.
    async fn test_db() -> SqliteDb {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("must be able to open in-memory sqlite");

        MIGRATOR
            .run(&pool)
            .await
            .expect("must be able to run migrations");

        SqliteDb::new(pool)
    }

    #[tokio::test]
    async fn deposits() {
        test_suite::deposits(&test_db().await).await;
    }

    #[tokio::test]
    async fn block_commits() {
        test_suite::block_commits(&test_db().await).await;
    }

    #[tokio::test]
    async fn history_queries() {
        test_suite::history_queries(&test_db().await).await;
    }

    #[tokio::test]
    async fn pending_and_secrets() {
        test_suite::pending_and_secrets(&test_db().await).await;
    }

    #[tokio::test]
    async fn swap_invalidation() {
        test_suite::swap_invalidation(&test_db().await).await;
    }

    #[tokio::test]
    async fn coin_states() {
        test_suite::coin_states(&test_db().await).await;
    }

    #[tokio::test]
    async fn large_slots_roundtrip() {
        let db = test_db().await;
        let tx = Transaction::deposit(u64::MAX, alloy_primitives::Address::repeat_byte(1));
        let block = Block {
            block_number: 1,
            root_hash: B256::repeat_byte(2),
            timestamp: 3,
            transactions: vec![tx.hash],
        };

        db.insert_deposit(
            CoinState::deposited(u64::MAX, tx.recipient),
            &tx,
            &block,
        )
        .await
        .expect("must be able to store a deposit on the last slot");

        let stored = db.get_transaction(tx.hash).await.unwrap().unwrap();
        assert_eq!(stored.slot, u64::MAX);
        assert_eq!(db.get_block(1).await.unwrap(), Some(block));
    }
}
