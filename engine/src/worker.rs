//! Background sync coordinator (the worker execution context).
//!
//! A state machine over the worker lifecycle:
//!
//! ```text
//! Installing -> (skip_waiting) -> Activating -> Activated
//! ```
//!
//! Install populates the versioned cache store from a fixed manifest,
//! all-or-nothing. Activation prunes every other cache version and takes
//! control of already-open pages immediately. Once activated, the worker
//! reacts to push events, background sync events, fetch interception, and
//! notification clicks.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use url::Url;

use dashmet_client::{NotificationFetcher, PushPayload};
use dashmet_store::CacheStore;
use dashmet_types::{ClickAction, NotificationClick};

use crate::presenter::{PresentOutcome, Presenter};
use crate::sync::{CycleOutcome, run_sync_cycle};

/// The only sync tag this worker handles.
pub const SYNC_TAG: &str = "background-sync-notifications";

/// Worker lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Installing,
    /// Present for completeness; `install` skips straight past it
    /// (skip-waiting semantics).
    Waiting,
    Activating,
    Activated,
}

/// Where an intercepted fetch was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
}

/// Response to an intercepted fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub body: Vec<u8>,
    pub source: FetchSource,
}

/// How a notification click was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickResolution {
    /// Explicit dismiss action: close and do nothing else.
    Dismissed,
    /// Focused an existing window showing the target path.
    Focused(String),
    /// No matching window: opened exactly one new window.
    Opened(String),
}

/// The set of open application windows, as the platform reports them.
///
/// `focus` and `open` are separate so the coordinator - not the registry -
/// owns the first-match-wins / at-most-one-open policy.
pub trait WindowRegistry: Send {
    /// URLs of currently open windows, in platform order.
    fn open_window_urls(&self) -> Vec<String>;
    fn focus(&mut self, url: &str) -> Result<()>;
    fn open(&mut self, url: &str) -> Result<()>;
}

/// Background sync coordinator: the worker-context half of the pipeline.
pub struct SyncCoordinator {
    phase: WorkerPhase,
    base_url: Url,
    cache_dir: PathBuf,
    cache_version: String,
    manifest: Vec<String>,
    store: Option<CacheStore>,
    fetcher: NotificationFetcher,
    presenter: Presenter,
    windows: Box<dyn WindowRegistry>,
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("phase", &self.phase)
            .field("cache_version", &self.cache_version)
            .finish_non_exhaustive()
    }
}

impl SyncCoordinator {
    #[must_use]
    pub fn new(
        base_url: Url,
        cache_dir: PathBuf,
        cache_version: String,
        manifest: Vec<String>,
        presenter: Presenter,
        windows: Box<dyn WindowRegistry>,
    ) -> Self {
        Self {
            phase: WorkerPhase::Installing,
            fetcher: NotificationFetcher::new(base_url.clone()),
            base_url,
            cache_dir,
            cache_version,
            manifest,
            store: None,
            presenter,
            windows,
        }
    }

    #[must_use]
    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    /// Install step: populate the cache store from the manifest.
    ///
    /// All-or-nothing: every manifest URL is fetched before anything is
    /// written, and a single failure fails the install (the deploy must
    /// guarantee manifest URLs are reachable). On success the worker skips
    /// the waiting phase and is immediately eligible for activation.
    pub async fn install(&mut self) -> Result<()> {
        if self.phase != WorkerPhase::Installing {
            bail!("install invoked in phase {:?}", self.phase);
        }

        let mut entries = Vec::with_capacity(self.manifest.len());
        for path in &self.manifest {
            let url = self
                .base_url
                .join(path)
                .with_context(|| format!("Invalid manifest entry {path}"))?;
            let response = dashmet_client::http_client()
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("Failed to fetch manifest entry {path}"))?;
            if !response.status().is_success() {
                bail!(
                    "Manifest entry {path} returned {status}; install aborted",
                    status = response.status()
                );
            }
            let body = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read manifest entry {path}"))?;
            entries.push((path.clone(), body.to_vec()));
        }

        let mut store = CacheStore::open(&self.cache_dir, &self.cache_version)?;
        store.install(&entries)?;
        self.store = Some(store);

        // skip_waiting: straight to Activating, never parked in Waiting.
        self.phase = WorkerPhase::Activating;
        tracing::info!(version = %self.cache_version, "Worker installed, skipping waiting phase");
        Ok(())
    }

    /// Activation step: prune every other cache version, then take control
    /// of already-open pages without waiting for a reload.
    pub fn activate(&mut self) -> Result<usize> {
        if self.phase != WorkerPhase::Activating {
            bail!("activate invoked in phase {:?}", self.phase);
        }

        let pruned = CacheStore::activate(&self.cache_dir, &self.cache_version)?;
        self.phase = WorkerPhase::Activated;
        tracing::info!(
            pruned,
            open_windows = self.windows.open_window_urls().len(),
            "Worker activated and claimed open pages"
        );
        Ok(pruned)
    }

    /// Fetch interception: cache-first, no refresh.
    ///
    /// A cache hit is served as-is (stale until the next version bump); a
    /// miss goes to the network and is deliberately NOT written back unless
    /// it was part of the install manifest.
    pub async fn handle_fetch(&self, path: &str) -> Result<FetchOutcome> {
        let store = self.active_store()?;

        if let Some(body) = store.lookup(path)? {
            return Ok(FetchOutcome {
                body,
                source: FetchSource::Cache,
            });
        }

        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("Invalid fetch path {path}"))?;
        let response = dashmet_client::http_client()
            .get(url)
            .send()
            .await
            .with_context(|| format!("Network fetch failed for {path}"))?;
        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read network response for {path}"))?;
        Ok(FetchOutcome {
            body: body.to_vec(),
            source: FetchSource::Network,
        })
    }

    /// Push event: parse and present immediately.
    ///
    /// No checkpoint filtering here - push delivery is assumed already
    /// deduplicated by the server and push service.
    pub fn handle_push(&self, payload: &[u8]) -> Result<PresentOutcome> {
        let payload = PushPayload::parse(payload);
        self.presenter.present_push(&payload)
    }

    /// Background sync event.
    ///
    /// Only the notification sync tag is handled; anything else is ignored.
    /// Returns `None` for ignored tags so the platform's retry machinery is
    /// not engaged for them.
    pub async fn handle_sync(&mut self, tag: &str) -> Option<CycleOutcome> {
        if tag != SYNC_TAG {
            tracing::debug!(tag, "Ignoring sync event with unrelated tag");
            return None;
        }

        let Some(store) = self.store.as_mut() else {
            tracing::warn!("Sync event before install completed; aborting cycle");
            return Some(CycleOutcome::Aborted);
        };
        Some(run_sync_cycle(&self.fetcher, &self.presenter, store).await)
    }

    /// Notification click: close, then route.
    ///
    /// Dismiss means exactly that. Any other click focuses the FIRST open
    /// window already showing the target path, or opens exactly one new
    /// window - never more, however many windows match.
    pub fn handle_notification_click(&mut self, click: &NotificationClick) -> Result<ClickResolution> {
        tracing::debug!(tag = %click.tag, "Notification clicked; closing");

        if click.action == ClickAction::Dismiss {
            return Ok(ClickResolution::Dismissed);
        }

        let target_path = click.data.url.as_str();
        for window_url in self.windows.open_window_urls() {
            if window_path_matches(&window_url, target_path) {
                self.windows.focus(&window_url)?;
                return Ok(ClickResolution::Focused(window_url));
            }
        }

        self.windows.open(target_path)?;
        Ok(ClickResolution::Opened(target_path.to_string()))
    }

    fn active_store(&self) -> Result<&CacheStore> {
        if self.phase != WorkerPhase::Activated {
            bail!("fetch interception before activation (phase {:?})", self.phase);
        }
        self.store
            .as_ref()
            .context("Worker activated without an installed cache store")
    }
}

/// Whether an open window's URL is "showing" the target path.
///
/// Prefix match on the path component: a window on `/reports/weekly`
/// matches a click targeting `/reports`, and every window matches `/`.
fn window_path_matches(window_url: &str, target_path: &str) -> bool {
    let window_path = Url::parse(window_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| window_url.to_string());
    window_path.starts_with(target_path)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use dashmet_store::CacheStore;
    use dashmet_types::{
        ClickAction, NotificationClick, PermissionState, ShowData, SyncCheckpoint,
    };

    use super::{
        ClickResolution, FetchSource, SYNC_TAG, SyncCoordinator, WindowRegistry, WorkerPhase,
    };
    use crate::presenter::test_support::RecordingSink;
    use crate::presenter::{PresentOutcome, Presenter};
    use crate::sync::CycleOutcome;

    const MANIFEST: &[&str] = &["/", "/static/css/output.css", "/static/avatar.png"];

    #[derive(Debug, Default)]
    struct RegistryState {
        open: Vec<String>,
        focused: Vec<String>,
        opened: Vec<String>,
    }

    #[derive(Debug, Default, Clone)]
    struct FakeWindows(Arc<Mutex<RegistryState>>);

    impl FakeWindows {
        fn with_open(urls: &[&str]) -> Self {
            let fake = Self::default();
            fake.0.lock().expect("lock").open =
                urls.iter().map(ToString::to_string).collect();
            fake
        }

        fn state(&self) -> RegistryState {
            let guard = self.0.lock().expect("lock");
            RegistryState {
                open: guard.open.clone(),
                focused: guard.focused.clone(),
                opened: guard.opened.clone(),
            }
        }
    }

    impl WindowRegistry for FakeWindows {
        fn open_window_urls(&self) -> Vec<String> {
            self.0.lock().expect("lock").open.clone()
        }

        fn focus(&mut self, url: &str) -> anyhow::Result<()> {
            self.0.lock().expect("lock").focused.push(url.to_string());
            Ok(())
        }

        fn open(&mut self, url: &str) -> anyhow::Result<()> {
            let mut guard = self.0.lock().expect("lock");
            guard.opened.push(url.to_string());
            guard.open.push(url.to_string());
            Ok(())
        }
    }

    struct Fixture {
        coordinator: SyncCoordinator,
        sink: Arc<RecordingSink>,
        windows: FakeWindows,
        dir: tempfile::TempDir,
    }

    fn fixture(server: &MockServer, windows: FakeWindows) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = Arc::new(RecordingSink::default());
        let coordinator = SyncCoordinator::new(
            Url::parse(&server.uri()).expect("uri"),
            dir.path().join("caches"),
            "dashmet-v1".to_string(),
            MANIFEST.iter().map(ToString::to_string).collect(),
            Presenter::new(sink.clone(), PermissionState::Granted),
            Box::new(windows.clone()),
        );
        Fixture {
            coordinator,
            sink,
            windows,
            dir,
        }
    }

    async fn mount_manifest(server: &MockServer) {
        for entry in MANIFEST {
            Mock::given(method("GET"))
                .and(path(*entry))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!("asset:{entry}")))
                .mount(server)
                .await;
        }
    }

    #[tokio::test]
    async fn install_then_activate_reaches_activated() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;

        let mut fx = fixture(&server, FakeWindows::default());
        assert_eq!(fx.coordinator.phase(), WorkerPhase::Installing);

        fx.coordinator.install().await.expect("install");
        // skip_waiting: straight past Waiting.
        assert_eq!(fx.coordinator.phase(), WorkerPhase::Activating);

        fx.coordinator.activate().expect("activate");
        assert_eq!(fx.coordinator.phase(), WorkerPhase::Activated);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let server = MockServer::start().await;
        // Two manifest entries resolve, the third does not.
        for entry in &MANIFEST[..2] {
            Mock::given(method("GET"))
                .and(path(*entry))
                .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(MANIFEST[2]))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut fx = fixture(&server, FakeWindows::default());
        assert!(fx.coordinator.install().await.is_err());
        assert_eq!(fx.coordinator.phase(), WorkerPhase::Installing);

        // Nothing was cached.
        let cache_dir = fx.dir.path().join("caches");
        if cache_dir.exists() {
            let store = CacheStore::open(&cache_dir, "dashmet-v1").expect("open");
            assert_eq!(store.entry_count().expect("count"), 0);
        }
    }

    #[tokio::test]
    async fn activation_prunes_prior_versions() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;

        let mut fx = fixture(&server, FakeWindows::default());
        // A leftover store from a previous deploy.
        let cache_dir = fx.dir.path().join("caches");
        let mut old = CacheStore::open(&cache_dir, "dashmet-v0").expect("open old");
        old.install(&[("/".to_string(), b"stale".to_vec())])
            .expect("install old");
        drop(old);

        fx.coordinator.install().await.expect("install");
        let pruned = fx.coordinator.activate().expect("activate");
        assert_eq!(pruned, 1);
    }

    #[tokio::test]
    async fn fetch_is_cache_first_and_misses_are_not_cached() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/kpis"))
            .respond_with(ResponseTemplate::new(200).set_body_string("live data"))
            .mount(&server)
            .await;

        let mut fx = fixture(&server, FakeWindows::default());
        fx.coordinator.install().await.expect("install");
        fx.coordinator.activate().expect("activate");

        let hit = fx.coordinator.handle_fetch("/").await.expect("fetch");
        assert_eq!(hit.source, FetchSource::Cache);
        assert_eq!(hit.body, b"asset:/");

        let miss = fx
            .coordinator
            .handle_fetch("/api/kpis")
            .await
            .expect("fetch");
        assert_eq!(miss.source, FetchSource::Network);
        assert_eq!(miss.body, b"live data");

        // The miss stayed uncached: a second fetch still goes to the network
        // and the store still holds exactly the manifest entries.
        let again = fx
            .coordinator
            .handle_fetch("/api/kpis")
            .await
            .expect("fetch");
        assert_eq!(again.source, FetchSource::Network);

        let store =
            CacheStore::open(&fx.dir.path().join("caches"), "dashmet-v1").expect("open");
        assert_eq!(store.entry_count().expect("count"), MANIFEST.len());
    }

    #[tokio::test]
    async fn push_presents_immediately_regardless_of_checkpoint() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;

        let mut fx = fixture(&server, FakeWindows::default());
        fx.coordinator.install().await.expect("install");
        fx.coordinator.activate().expect("activate");

        let outcome = fx
            .coordinator
            .handle_push(br#"{"title": "X", "body": "Y"}"#)
            .expect("push");
        assert_eq!(outcome, PresentOutcome::Presented);

        let shown = fx.sink.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "X");
        assert_eq!(shown[0].body, "Y");
    }

    #[tokio::test]
    async fn sync_event_runs_cycle_and_persists_worker_checkpoint() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/notifications"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "notifications": [{
                    "id": "n-1",
                    "type": "issue_report",
                    "description": "oven 2 is down",
                    "created_at": "2024-06-01T12:00:00Z",
                }]
            })))
            .mount(&server)
            .await;

        let mut fx = fixture(&server, FakeWindows::default());
        fx.coordinator.install().await.expect("install");
        fx.coordinator.activate().expect("activate");

        let outcome = fx.coordinator.handle_sync(SYNC_TAG).await;
        assert!(matches!(
            outcome,
            Some(CycleOutcome::Completed { presented: 1, .. })
        ));
        assert_eq!(fx.sink.shown_count(), 1);

        // The worker checkpoint advanced in the cache store itself.
        let store =
            CacheStore::open(&fx.dir.path().join("caches"), "dashmet-v1").expect("open");
        assert!(store.checkpoint().expect("checkpoint") > SyncCheckpoint::default());
    }

    #[tokio::test]
    async fn unrelated_sync_tags_are_ignored() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;

        let mut fx = fixture(&server, FakeWindows::default());
        fx.coordinator.install().await.expect("install");
        fx.coordinator.activate().expect("activate");

        assert_eq!(fx.coordinator.handle_sync("some-other-tag").await, None);
    }

    #[tokio::test]
    async fn click_focuses_first_matching_window_only() {
        let server = MockServer::start().await;
        let windows = FakeWindows::with_open(&[
            "http://dash.local/reports",
            "http://dash.local/reports/weekly",
        ]);
        let mut fx = fixture(&server, windows);

        let click = NotificationClick {
            tag: "kpi_alert-1".to_string(),
            action: ClickAction::View,
            data: ShowData {
                url: "/reports".to_string(),
                ..ShowData::default()
            },
        };
        let resolution = fx
            .coordinator
            .handle_notification_click(&click)
            .expect("click");
        assert_eq!(
            resolution,
            ClickResolution::Focused("http://dash.local/reports".to_string())
        );

        let state = fx.windows.state();
        assert_eq!(state.focused, vec!["http://dash.local/reports"]);
        assert!(state.opened.is_empty());
    }

    #[tokio::test]
    async fn click_opens_exactly_one_window_when_none_match() {
        let server = MockServer::start().await;
        let windows = FakeWindows::with_open(&["http://dash.local/settings"]);
        let mut fx = fixture(&server, windows);

        let click = NotificationClick {
            tag: "week_update-1".to_string(),
            action: ClickAction::Body,
            data: ShowData {
                url: "/reports".to_string(),
                ..ShowData::default()
            },
        };
        let resolution = fx
            .coordinator
            .handle_notification_click(&click)
            .expect("click");
        assert_eq!(resolution, ClickResolution::Opened("/reports".to_string()));

        let state = fx.windows.state();
        assert!(state.focused.is_empty());
        assert_eq!(state.opened.len(), 1);
    }

    #[tokio::test]
    async fn dismiss_click_does_nothing_further() {
        let server = MockServer::start().await;
        let windows = FakeWindows::with_open(&["http://dash.local/"]);
        let mut fx = fixture(&server, windows);

        let click = NotificationClick {
            tag: "kpi_alert-1".to_string(),
            action: ClickAction::Dismiss,
            data: ShowData::default(),
        };
        let resolution = fx
            .coordinator
            .handle_notification_click(&click)
            .expect("click");
        assert_eq!(resolution, ClickResolution::Dismissed);

        let state = fx.windows.state();
        assert!(state.focused.is_empty());
        assert!(state.opened.is_empty());
    }
}
