//! Notification presenter: maps records and push payloads onto the
//! platform's display surface.
//!
//! The display API itself lives behind [`NotificationSink`] so both the
//! real platform surface and test doubles plug in the same way. Permission
//! is checked here, once per presentation: if the user has not granted
//! notifications, the sink is never invoked.

use std::sync::Arc;

use anyhow::Result;

use dashmet_client::PushPayload;
use dashmet_types::{
    DEFAULT_BADGE, NotificationAction, NotificationRecord, PermissionState, ShowData, ShowRequest,
};

/// The platform display surface (`showNotification` equivalent).
pub trait NotificationSink: Send + Sync {
    fn show(&self, request: ShowRequest) -> Result<()>;
}

/// What happened to one presentation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The sink was invoked and accepted the request.
    Presented,
    /// Permission is not granted; the sink was never invoked. This is a
    /// user decision, not an error - no retry, nothing surfaced.
    Suppressed,
}

/// Renders notification records as native notifications.
#[derive(Clone)]
pub struct Presenter {
    sink: Arc<dyn NotificationSink>,
    permission: PermissionState,
    /// Presented notifications skip the platform sound when the user turned
    /// sound alerts off.
    silent: bool,
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("permission", &self.permission)
            .field("silent", &self.silent)
            .finish_non_exhaustive()
    }
}

impl Presenter {
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>, permission: PermissionState) -> Self {
        Self {
            sink,
            permission,
            silent: false,
        }
    }

    /// Disable the notification sound on everything this presenter shows.
    #[must_use]
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    #[must_use]
    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    /// Present a fetched notification record.
    ///
    /// Title, icon, and urgency come from the record kind's static display
    /// mapping. Sticky kinds require explicit dismissal and vibrate where
    /// the platform supports it.
    pub fn present(&self, record: &NotificationRecord) -> Result<PresentOutcome> {
        if !self.permission.can_present() {
            tracing::debug!(
                kind = %record.kind,
                "Presentation suppressed: notification permission not granted"
            );
            return Ok(PresentOutcome::Suppressed);
        }

        let profile = record.kind.display_profile();
        let request = ShowRequest {
            title: profile.title.to_string(),
            body: record.description.clone(),
            icon: profile.icon.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            tag: record.tag(),
            data: ShowData {
                url: "/".to_string(),
                kind: Some(record.kind.clone()),
                notification_id: Some(record.id.clone()),
            },
            require_interaction: profile.urgency.requires_interaction(),
            silent: self.silent,
            vibrate: profile.urgency.vibration_pattern().map(<[u32]>::to_vec),
            actions: Vec::new(),
            timestamp: Some(record.created_at),
        };

        self.sink.show(request)?;
        Ok(PresentOutcome::Presented)
    }

    /// Present a push payload immediately, bypassing checkpoint filtering.
    ///
    /// Push is assumed already deduplicated upstream. The standard
    /// view/dismiss action pair is attached.
    pub fn present_push(&self, payload: &PushPayload) -> Result<PresentOutcome> {
        if !self.permission.can_present() {
            tracing::debug!("Push presentation suppressed: notification permission not granted");
            return Ok(PresentOutcome::Suppressed);
        }

        let request = ShowRequest {
            title: payload.title.clone(),
            body: payload.body.clone(),
            icon: payload.icon.clone(),
            badge: payload.badge.clone(),
            tag: payload.tag.clone(),
            data: payload.data.clone(),
            require_interaction: false,
            silent: self.silent,
            vibrate: None,
            actions: NotificationAction::standard_pair(&payload.icon),
            timestamp: None,
        };

        self.sink.show(request)?;
        Ok(PresentOutcome::Presented)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Recording sink shared by presenter, worker, and poller tests.

    use std::sync::Mutex;

    use anyhow::Result;
    use dashmet_types::ShowRequest;

    use super::NotificationSink;

    #[derive(Debug, Default)]
    pub struct RecordingSink {
        shown: Mutex<Vec<ShowRequest>>,
        fail: Mutex<bool>,
    }

    impl RecordingSink {
        pub fn shown(&self) -> Vec<ShowRequest> {
            self.shown.lock().expect("sink lock").clone()
        }

        pub fn shown_count(&self) -> usize {
            self.shown.lock().expect("sink lock").len()
        }

        /// Make subsequent `show` calls fail (display surface unavailable).
        pub fn fail_next_shows(&self) {
            *self.fail.lock().expect("sink lock") = true;
        }
    }

    impl NotificationSink for RecordingSink {
        fn show(&self, request: ShowRequest) -> Result<()> {
            if *self.fail.lock().expect("sink lock") {
                anyhow::bail!("display surface unavailable");
            }
            self.shown.lock().expect("sink lock").push(request);
            Ok(())
        }
    }
}
