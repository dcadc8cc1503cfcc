//! The shared fetch → filter → present → checkpoint pipeline.
//!
//! Both execution contexts drive this exact sequence; they differ only in
//! where their checkpoint lives ([`dashmet_store::CacheStore`] for the
//! worker, [`dashmet_store::LocalStore`] for the poller) and in what
//! triggers a cycle.
//!
//! Failure handling is deliberately blunt: any error in the cycle aborts
//! the whole batch with a warning and leaves the checkpoint untouched, so
//! the same window is retried on the next trigger. Retry timing belongs to
//! the trigger source (platform sync heuristics, poll timer), not here.

use anyhow::Result;
use chrono::{DateTime, Utc};

use dashmet_client::NotificationFetcher;
use dashmet_store::{CacheStore, LocalStore};
use dashmet_types::SyncCheckpoint;

use crate::presenter::Presenter;

/// Where a context keeps its sync checkpoint.
///
/// The two implementations are independent stores by design; a record can
/// legitimately be presented once per context if both run before either
/// advances (at-least-once delivery).
pub trait CheckpointStore: Send {
    fn checkpoint(&self) -> Result<SyncCheckpoint>;
    /// Advance monotonically to `at` and persist; rewinds are no-ops.
    fn advance(&mut self, at: DateTime<Utc>) -> Result<SyncCheckpoint>;
}

impl CheckpointStore for CacheStore {
    fn checkpoint(&self) -> Result<SyncCheckpoint> {
        CacheStore::checkpoint(self)
    }

    fn advance(&mut self, at: DateTime<Utc>) -> Result<SyncCheckpoint> {
        self.advance_checkpoint(at)
    }
}

impl CheckpointStore for LocalStore {
    fn checkpoint(&self) -> Result<SyncCheckpoint> {
        Ok(LocalStore::checkpoint(self))
    }

    fn advance(&mut self, at: DateTime<Utc>) -> Result<SyncCheckpoint> {
        self.advance_checkpoint(at)
    }
}

/// Result of one sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The batch was processed; the checkpoint now sits at the cycle's
    /// completion time (not at the newest record's timestamp).
    Completed {
        presented: usize,
        checkpoint: SyncCheckpoint,
    },
    /// Something failed; nothing was committed and the checkpoint is
    /// unchanged. The error has already been logged.
    Aborted,
}

/// Run one fetch/filter/present/checkpoint cycle against `checkpoints`.
pub async fn run_sync_cycle(
    fetcher: &NotificationFetcher,
    presenter: &Presenter,
    checkpoints: &mut dyn CheckpointStore,
) -> CycleOutcome {
    let since = match checkpoints.checkpoint() {
        Ok(since) => since,
        Err(e) => {
            tracing::warn!("Sync cycle aborted: cannot read checkpoint: {e}");
            return CycleOutcome::Aborted;
        }
    };

    let records = match fetcher.fetch_pending(since).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Sync cycle aborted: {e}");
            return CycleOutcome::Aborted;
        }
    };

    let mut presented = 0;
    for record in &records {
        match presenter.present(record) {
            Ok(outcome) => {
                if matches!(outcome, crate::presenter::PresentOutcome::Presented) {
                    presented += 1;
                }
            }
            Err(e) => {
                // Abort before the checkpoint moves: the unshown remainder
                // of this window stays pending for the next cycle.
                tracing::warn!("Sync cycle aborted: presentation failed: {e}");
                return CycleOutcome::Aborted;
            }
        }
    }

    let checkpoint = match checkpoints.advance(Utc::now()) {
        Ok(checkpoint) => checkpoint,
        Err(e) => {
            tracing::warn!("Sync cycle aborted: cannot persist checkpoint: {e}");
            return CycleOutcome::Aborted;
        }
    };

    tracing::debug!(presented, total = records.len(), "Sync cycle completed");
    CycleOutcome::Completed {
        presented,
        checkpoint,
    }
}
