//! Sync checkpoint: the boundary of already-processed notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::NotificationRecord;

/// Persisted timestamp marking the last successful notification sync.
///
/// Each execution context (background worker, foreground poller) keeps its
/// own checkpoint; the two are never reconciled. Within a context the value
/// is monotonic: it only ever advances, never rewinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncCheckpoint(DateTime<Utc>);

impl Default for SyncCheckpoint {
    /// First run: everything ever created counts as unseen.
    fn default() -> Self {
        Self(DateTime::UNIX_EPOCH)
    }
}

impl SyncCheckpoint {
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    #[must_use]
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Advance to `at`, ignoring rewinds.
    ///
    /// Returns the resulting checkpoint so callers can persist exactly what
    /// was applied.
    #[must_use]
    pub fn advanced_to(self, at: DateTime<Utc>) -> Self {
        if at > self.0 { Self(at) } else { self }
    }

    /// Strict filter: a record whose `created_at` equals the checkpoint is
    /// already seen; only strictly newer records pass.
    #[must_use]
    pub fn is_unseen(self, record: &NotificationRecord) -> bool {
        record.created_at > self.0
    }
}

impl From<DateTime<Utc>> for SyncCheckpoint {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}
