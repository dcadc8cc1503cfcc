//! HTTP client layer for DASHMET notification sync.
//!
//! Two pieces:
//!
//! - [`NotificationFetcher`] - pulls pending notifications from the server's
//!   listing endpoint and applies the strict since-checkpoint filter.
//! - [`PushPayload`] - parses server-initiated push message bodies, falling
//!   back to opaque text when the payload is not structured.
//!
//! Both execution contexts (worker and poller) use the same fetcher; they
//! differ only in which checkpoint they pass in.

mod fetcher;
mod push;

use std::sync::OnceLock;
use std::time::Duration;

pub use fetcher::{FetchError, NotificationFetcher};
pub use push::PushPayload;

/// Path of the server's notification-listing endpoint.
pub const NOTIFICATIONS_PATH: &str = "/api/notifications";

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Shared HTTP client for all fetches.
///
/// One pooled client per process; both sync contexts in the same process
/// share it. No overall request timeout: an in-flight request blocks its
/// cycle until the platform resolves or errors it, matching the polling
/// contract (a new trigger simply queues behind the current cycle).
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build HTTP client: {e}. Using default client.");
                reqwest::Client::new()
            })
    })
}
