//! Tuning of the SQLite backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_BACKOFF_PERIOD, DEFAULT_MAX_RETRY_COUNT};

/// How [`SqliteDb`](super::sqlite::SqliteDb) copes with a busy or locked database file.
///
/// Only transient failures are retried; conflicts and decoding failures surface immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    max_retry_count: usize,
    backoff_period: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            backoff_period: DEFAULT_BACKOFF_PERIOD,
        }
    }
}

impl DbConfig {
    /// Overrides how many times a transient failure is retried before giving up.
    pub fn with_max_retry_count(self, count: usize) -> Self {
        Self {
            max_retry_count: count,
            ..self
        }
    }

    /// Overrides the pause between two attempts.
    pub fn with_backoff_period(self, period: Duration) -> Self {
        Self {
            backoff_period: period,
            ..self
        }
    }

    /// Attempts made after the first failure.
    pub fn max_retry_count(&self) -> usize {
        self.max_retry_count
    }

    /// The pause between two attempts.
    pub fn backoff_period(&self) -> Duration {
        self.backoff_period
    }
}
