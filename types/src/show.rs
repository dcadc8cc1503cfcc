//! Display-API request and click types.
//!
//! [`ShowRequest`] is the single argument shape handed to the platform
//! notification surface (the `showNotification(title, options)` contract).
//! It is a plain value so tests can assert on exactly what would be shown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::{NotificationId, NotificationKind};

fn default_target_url() -> String {
    "/".to_string()
}

/// Structured data attached to a notification, echoed back on click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowData {
    /// Path to focus or open when the notification is clicked.
    #[serde(default = "default_target_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NotificationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<NotificationId>,
}

impl Default for ShowData {
    fn default() -> Self {
        Self {
            url: default_target_url(),
            kind: None,
            notification_id: None,
        }
    }
}

/// An action button offered on a presented notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    /// The standard view/dismiss action pair attached to push notifications.
    #[must_use]
    pub fn standard_pair(icon: &str) -> Vec<Self> {
        vec![
            Self {
                action: "view".to_string(),
                title: "View Details".to_string(),
                icon: Some(icon.to_string()),
            },
            Self {
                action: "dismiss".to_string(),
                title: "Dismiss".to_string(),
                icon: Some(icon.to_string()),
            },
        ]
    }
}

/// Everything the platform needs to render one native notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowRequest {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Composite dedup tag (`{kind}-{millis}` for records).
    pub tag: String,
    pub data: ShowData,
    /// Sticky notifications stay until explicitly dismissed.
    pub require_interaction: bool,
    /// Suppress the platform notification sound.
    pub silent: bool,
    pub vibrate: Option<Vec<u32>>,
    pub actions: Vec<NotificationAction>,
    /// Event time shown by the platform (record `created_at`).
    pub timestamp: Option<DateTime<Utc>>,
}

/// Which part of a notification the user clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// The notification body itself.
    Body,
    /// The explicit "view" action button.
    View,
    /// The explicit "dismiss" action button.
    Dismiss,
}

impl ClickAction {
    /// Parse the platform's action string (empty means the body was clicked).
    #[must_use]
    pub fn from_action_str(action: &str) -> Self {
        match action {
            "dismiss" => Self::Dismiss,
            "view" => Self::View,
            _ => Self::Body,
        }
    }
}

/// A click event on a previously presented notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClick {
    pub tag: String,
    pub action: ClickAction,
    pub data: ShowData,
}
