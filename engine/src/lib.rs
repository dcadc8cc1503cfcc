//! Sync coordination for DASHMET notifications.
//!
//! # Architecture
//!
//! Two independent execution contexts drive one shared pipeline
//! (fetch -> filter-by-checkpoint -> present -> advance checkpoint):
//!
//! - [`SyncCoordinator`] - the background worker: cache install/activate
//!   lifecycle, fetch interception, push events, background sync events,
//!   notification clicks.
//! - [`ForegroundPoller`] - the page context: a polling timer that defers
//!   to an actively-viewed page, plus visibility-change catch-up.
//!
//! The contexts share no memory. Each has its own persisted checkpoint
//! (cache store vs. local settings), so delivery is at-least-once: a
//! record may be presented once per context if both run before either
//! advances. Platform seams ([`NotificationSink`], [`WindowRegistry`],
//! [`PermissionHost`], [`PageStatus`]) are traits so hosts and tests plug
//! in the same way.

mod config;
mod poller;
mod presenter;
mod sync;
mod worker;

pub use config::{CONFIG_PATH_ENV, ConfigError, DashmetConfig};
pub use poller::{
    DEFAULT_POLL_INTERVAL, ForegroundPoller, PageStatus, PermissionHost, VisibilityEvent,
};
pub use presenter::{NotificationSink, PresentOutcome, Presenter};
pub use sync::{CheckpointStore, CycleOutcome, run_sync_cycle};
pub use worker::{
    ClickResolution, FetchOutcome, FetchSource, SYNC_TAG, SyncCoordinator, WindowRegistry,
    WorkerPhase,
};
