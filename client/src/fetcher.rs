//! Notification fetcher: pull pending records, filter by checkpoint.

use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use dashmet_types::{NotificationRecord, SyncCheckpoint};

use crate::NOTIFICATIONS_PATH;

/// Why a fetch cycle produced no batch.
///
/// Every variant is non-fatal: the caller logs it, skips the cycle, and
/// leaves its checkpoint untouched so the same window is retried next time.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("notification endpoint URL is invalid: {0}")]
    BadEndpoint(#[from] url::ParseError),
    #[error("transport error fetching notifications: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("notification endpoint returned {status}")]
    Status { status: StatusCode },
    #[error("malformed notification payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("server reported success=false")]
    Rejected,
}

/// Wire envelope of `GET /api/notifications`.
#[derive(Debug, Deserialize)]
struct ListEnvelope {
    success: bool,
    #[serde(default)]
    notifications: Vec<NotificationRecord>,
}

/// Client for the server's notification-listing endpoint.
///
/// Stateless apart from the base URL; the checkpoint is supplied per call
/// because the two execution contexts each track their own.
#[derive(Debug, Clone)]
pub struct NotificationFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl NotificationFetcher {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            client: crate::http_client().clone(),
            base_url,
        }
    }

    /// Fetch notifications created strictly after `since`.
    ///
    /// A record stamped exactly at the checkpoint is already seen and is
    /// excluded. Server-side ordering is not assumed; the filter alone
    /// decides membership.
    pub async fn fetch_pending(
        &self,
        since: SyncCheckpoint,
    ) -> Result<Vec<NotificationRecord>, FetchError> {
        let endpoint = self.base_url.join(NOTIFICATIONS_PATH)?;

        let response = self
            .client
            .get(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        // Read as text first so a malformed body surfaces as Malformed, not
        // as a transport error.
        let body = response.text().await?;
        let envelope: ListEnvelope = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(FetchError::Rejected);
        }

        let total = envelope.notifications.len();
        let mut records = envelope.notifications;
        records.retain(|record| since.is_unseen(record));
        tracing::debug!(
            total,
            unseen = records.len(),
            since = %since.as_datetime().to_rfc3339(),
            "Fetched pending notifications"
        );
        Ok(records)
    }
}
