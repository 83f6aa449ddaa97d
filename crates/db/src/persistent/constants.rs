//! Defaults of the SQLite backend.

use std::time::Duration;

/// Retries of a busy or locked database before the error is returned.
pub const DEFAULT_MAX_RETRY_COUNT: usize = 5;

/// Pause between two attempts at a busy or locked database.
pub const DEFAULT_BACKOFF_PERIOD: Duration = Duration::from_millis(200);
