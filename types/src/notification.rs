//! Server-supplied notification records and their display mapping.
//!
//! Records are created server-side and are read-only here: the server is the
//! sole source of truth, and a record never changes after it is fetched.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque server-assigned notification identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of notification categories the dashboard emits.
///
/// The wire format is the server's snake_case string. Strings outside the
/// known set deserialize to `Unknown` rather than failing the whole batch -
/// a new server-side category must never break existing clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    FormSubmission,
    IssueReport,
    InventoryAlert,
    KpiAlert,
    WeekUpdate,
    Unknown(String),
}

impl NotificationKind {
    /// The wire/slug form, also used in notification tags.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::FormSubmission => "form_submission",
            Self::IssueReport => "issue_report",
            Self::InventoryAlert => "inventory_alert",
            Self::KpiAlert => "kpi_alert",
            Self::WeekUpdate => "week_update",
            Self::Unknown(raw) => raw,
        }
    }

    /// Static display mapping for this kind.
    ///
    /// Exhaustive by construction: every kind, including `Unknown`, resolves
    /// to a concrete title, icon, and urgency.
    #[must_use]
    pub fn display_profile(&self) -> DisplayProfile {
        match self {
            Self::FormSubmission => DisplayProfile {
                title: "Form Submission",
                icon: DEFAULT_ICON,
                urgency: Urgency::Passive,
            },
            Self::IssueReport => DisplayProfile {
                title: "Issue Report",
                icon: DEFAULT_ICON,
                urgency: Urgency::Sticky,
            },
            Self::InventoryAlert => DisplayProfile {
                title: "Inventory Update",
                icon: DEFAULT_ICON,
                urgency: Urgency::Passive,
            },
            Self::KpiAlert => DisplayProfile {
                title: "Performance Alert",
                icon: DEFAULT_ICON,
                urgency: Urgency::Sticky,
            },
            Self::WeekUpdate => DisplayProfile {
                title: "Week Update",
                icon: DEFAULT_ICON,
                urgency: Urgency::Passive,
            },
            Self::Unknown(_) => DisplayProfile {
                title: "Dashboard Notification",
                icon: DEFAULT_ICON,
                urgency: Urgency::Passive,
            },
        }
    }
}

impl From<String> for NotificationKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "form_submission" => Self::FormSubmission,
            "issue_report" => Self::IssueReport,
            "inventory_alert" => Self::InventoryAlert,
            "kpi_alert" => Self::KpiAlert,
            "week_update" => Self::WeekUpdate,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Icon/badge asset served for every notification.
pub const DEFAULT_ICON: &str = "/static/avatar.png";
/// Badge asset shown in the platform status area.
pub const DEFAULT_BADGE: &str = "/static/avatar.png";

/// How a presented notification behaves once shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// Auto-dismisses per platform default.
    Passive,
    /// Requires explicit user dismissal and vibrates where supported.
    Sticky,
}

impl Urgency {
    #[must_use]
    pub fn requires_interaction(self) -> bool {
        matches!(self, Self::Sticky)
    }

    /// Vibration pattern for urgent kinds, `None` for passive ones.
    #[must_use]
    pub fn vibration_pattern(self) -> Option<&'static [u32]> {
        match self {
            Self::Passive => None,
            Self::Sticky => Some(&[200, 100, 200]),
        }
    }
}

/// Resolved display attributes for a notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayProfile {
    pub title: &'static str,
    pub icon: &'static str,
    pub urgency: Urgency,
}

/// A single server-side notification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Composite presentation tag: `{kind}-{millis}`.
    ///
    /// Distinct notifications of the same kind get distinct tags (so the
    /// platform does not collapse them), while presenting the exact same
    /// record twice coalesces into one.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{}-{}", self.kind.as_str(), self.created_at.timestamp_millis())
    }
}
