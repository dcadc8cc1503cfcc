//! Foreground poller (the page execution context).
//!
//! Runs in the open page, independently of the background worker, with its
//! own checkpoint in the local settings store. Two triggers drive the same
//! sync cycle:
//!
//! - a repeating timer, which only fires the cycle when the page is hidden
//!   or unfocused (an actively-viewed dashboard should not spawn native
//!   notifications for things already on screen);
//! - visibility-change events, where becoming visible triggers an
//!   immediate catch-up cycle for anything missed while backgrounded.
//!
//! On startup the poller asks the permission host exactly once if the user
//! has not decided yet; a denial is final and simply suppresses all
//! presentation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use url::Url;

use dashmet_client::NotificationFetcher;
use dashmet_store::LocalStore;
use dashmet_types::PermissionState;

use crate::presenter::{NotificationSink, Presenter};
use crate::sync::{CycleOutcome, run_sync_cycle};

/// Default poll interval, matching the page script's 30-second timer.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Host-side permission surface (read + one-time request).
pub trait PermissionHost: Send {
    fn state(&self) -> PermissionState;
    /// Prompt the user. Only ever called when [`state`](Self::state) is
    /// [`PermissionState::Default`], and only once per process.
    fn request(&mut self) -> PermissionState;
}

/// Live visibility/focus state of the page.
pub trait PageStatus: Send {
    fn is_visible(&self) -> bool;
    fn has_focus(&self) -> bool;
}

/// A page visibility transition, as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityEvent {
    Visible,
    Hidden,
}

/// The page-context half of the pipeline.
pub struct ForegroundPoller {
    fetcher: NotificationFetcher,
    presenter: Presenter,
    local: LocalStore,
    page: Box<dyn PageStatus>,
}

impl std::fmt::Debug for ForegroundPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForegroundPoller")
            .field("presenter", &self.presenter)
            .finish_non_exhaustive()
    }
}

impl ForegroundPoller {
    /// Build the poller, resolving notification permission exactly once.
    ///
    /// An undecided (`Default`) permission triggers one request; the answer,
    /// whatever it is, stands for the life of the poller.
    pub fn start(
        base_url: Url,
        local: LocalStore,
        sink: Arc<dyn NotificationSink>,
        permissions: &mut dyn PermissionHost,
        page: Box<dyn PageStatus>,
    ) -> Self {
        let mut permission = permissions.state();
        if permission == PermissionState::Default {
            permission = permissions.request();
            tracing::info!(granted = permission.can_present(), "Requested notification permission");
        }

        let silent = !local.sound_alerts();
        Self {
            fetcher: NotificationFetcher::new(base_url),
            presenter: Presenter::new(sink, permission).silent(silent),
            local,
            page,
        }
    }

    /// Timer trigger: sync only when the user is not actively watching.
    ///
    /// Returns `None` when the page is visible AND focused (cycle skipped
    /// entirely, no fetch issued).
    pub async fn poll_tick(&mut self) -> Option<CycleOutcome> {
        if self.page.is_visible() && self.page.has_focus() {
            tracing::debug!("Skipping poll: page is visible and focused");
            return None;
        }
        Some(run_sync_cycle(&self.fetcher, &self.presenter, &mut self.local).await)
    }

    /// Visibility trigger: catch up immediately when the page surfaces.
    pub async fn handle_visibility_change(&mut self, event: VisibilityEvent) -> Option<CycleOutcome> {
        match event {
            VisibilityEvent::Visible => {
                Some(run_sync_cycle(&self.fetcher, &self.presenter, &mut self.local).await)
            }
            VisibilityEvent::Hidden => None,
        }
    }

    /// Drive the poller until shutdown.
    ///
    /// Within this task cycles run to completion; a trigger arriving
    /// mid-cycle waits its turn rather than cancelling anything.
    pub async fn run(
        mut self,
        poll_interval: Duration,
        mut visibility: mpsc::Receiver<VisibilityEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let start = tokio::time::Instant::now() + poll_interval;
        let mut ticker = tokio::time::interval_at(start, poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_tick().await;
                }
                event = visibility.recv() => {
                    match event {
                        Some(event) => {
                            self.handle_visibility_change(event).await;
                        }
                        None => {
                            tracing::debug!("Visibility channel closed; stopping poller");
                            return;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Foreground poller shutting down");
                    return;
                }
            }
        }
    }
}
