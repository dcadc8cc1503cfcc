//! Core domain types for DASHMET notification sync.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from either execution context
//! (background worker or foreground poller).

mod checkpoint;
mod notification;
mod show;

pub use checkpoint::SyncCheckpoint;
pub use notification::{
    DEFAULT_BADGE, DEFAULT_ICON, DisplayProfile, NotificationId, NotificationKind,
    NotificationRecord, Urgency,
};
pub use show::{ClickAction, NotificationAction, NotificationClick, ShowData, ShowRequest};

/// Notification permission as reported by the host platform.
///
/// The platform owns this value; we only ever read it (and request an upgrade
/// from `Default` exactly once at poller startup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// The user has not been asked yet.
    Default,
    /// The user allowed notifications.
    Granted,
    /// The user denied notifications. Final - no retry, no error surfaced.
    Denied,
}

impl PermissionState {
    /// Whether presentation is allowed at all.
    #[must_use]
    pub fn can_present(self) -> bool {
        matches!(self, Self::Granted)
    }
}
