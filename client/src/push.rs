//! Push message payload parsing.
//!
//! Push payloads are best-effort structured: the server usually sends JSON
//! with partial display fields, but the delivery path only guarantees bytes.
//! Parsing therefore never fails - an unparseable payload becomes the plain
//! text body of an otherwise default notification.

use serde::Deserialize;

use dashmet_types::{DEFAULT_BADGE, DEFAULT_ICON, ShowData};

/// Fallback title when the payload does not carry one.
pub const DEFAULT_TITLE: &str = "DASHMET";
/// Fallback body for an empty or field-less payload.
pub const DEFAULT_BODY: &str = "New notification available";
/// Shared tag for untagged pushes (repeat untagged pushes coalesce).
pub const DEFAULT_TAG: &str = "dashmet-notification";

/// Structured fields a push payload may carry; all optional.
#[derive(Debug, Default, Deserialize)]
struct RawPushPayload {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    badge: Option<String>,
    tag: Option<String>,
    data: Option<ShowData>,
}

/// A fully-resolved push notification payload (defaults applied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub data: ShowData,
}

impl Default for PushPayload {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            body: DEFAULT_BODY.to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            tag: DEFAULT_TAG.to_string(),
            data: ShowData::default(),
        }
    }
}

impl PushPayload {
    /// Parse a push payload, merging any structured fields over defaults.
    ///
    /// Three shapes, in order:
    /// 1. valid JSON object - present fields override defaults;
    /// 2. any other non-empty bytes - treated as an opaque text body;
    /// 3. empty payload - the all-defaults notification.
    #[must_use]
    pub fn parse(payload: &[u8]) -> Self {
        let mut resolved = Self::default();
        if payload.is_empty() {
            return resolved;
        }

        match serde_json::from_slice::<RawPushPayload>(payload) {
            Ok(raw) => {
                if let Some(title) = raw.title {
                    resolved.title = title;
                }
                if let Some(body) = raw.body {
                    resolved.body = body;
                }
                if let Some(icon) = raw.icon {
                    resolved.icon = icon;
                }
                if let Some(badge) = raw.badge {
                    resolved.badge = badge;
                }
                if let Some(tag) = raw.tag {
                    resolved.tag = tag;
                }
                if let Some(data) = raw.data {
                    resolved.data = data;
                }
            }
            Err(e) => {
                tracing::debug!("Push payload is not JSON ({e}); using it as plain text body");
                let text = String::from_utf8_lossy(payload);
                let text = text.trim();
                if !text.is_empty() {
                    resolved.body = text.to_string();
                }
            }
        }
        resolved
    }
}
