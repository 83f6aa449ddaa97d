use std::time::Duration;

pub(crate) const DEFAULT_THREAD_COUNT: u8 = 4;

pub(crate) const DEFAULT_MINING_INTERVAL: Duration = Duration::from_secs(10);

pub(crate) const DB_NAME: &str = "plasma.db";

/// Root chain events buffered between the watcher and the handler.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

/// JSON-RPC error code for requests about an unknown block, coin or transaction.
pub(crate) const NOT_FOUND_ERROR_CODE: i32 = -32004;

/// JSON-RPC error code for writes that collide with existing state.
pub(crate) const CONFLICT_ERROR_CODE: i32 = -32009;
