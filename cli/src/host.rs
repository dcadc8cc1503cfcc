//! Headless host surfaces for the daemon.
//!
//! Each type fills one of the engine's platform seams with the simplest
//! useful behavior: notifications go to the log, no windows exist, and
//! permission is always granted (the process was started deliberately).

use anyhow::Result;

use dashmet_engine::{NotificationSink, PageStatus, PermissionHost, WindowRegistry};
use dashmet_types::{PermissionState, ShowRequest};

/// Display surface that writes notifications to the log.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show(&self, request: ShowRequest) -> Result<()> {
        tracing::info!(
            title = %request.title,
            body = %request.body,
            tag = %request.tag,
            sticky = request.require_interaction,
            "Notification"
        );
        Ok(())
    }
}

/// No open windows; clicks would always open a fresh one (logged only).
pub struct HeadlessWindows;

impl WindowRegistry for HeadlessWindows {
    fn open_window_urls(&self) -> Vec<String> {
        Vec::new()
    }

    fn focus(&mut self, url: &str) -> Result<()> {
        tracing::info!(url, "Focus window");
        Ok(())
    }

    fn open(&mut self, url: &str) -> Result<()> {
        tracing::info!(url, "Open window");
        Ok(())
    }
}

/// Headless daemon: permission is granted by construction.
pub struct HeadlessPermissions;

impl PermissionHost for HeadlessPermissions {
    fn state(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn request(&mut self) -> PermissionState {
        PermissionState::Granted
    }
}

/// There is no page to interrupt, so every timer tick is allowed to sync.
pub struct HeadlessPage;

impl PageStatus for HeadlessPage {
    fn is_visible(&self) -> bool {
        false
    }

    fn has_focus(&self) -> bool {
        false
    }
}
