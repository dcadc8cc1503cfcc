//! Configuration loading and resolution.
//!
//! Raw TOML structs (all-`Option` fields) stay private; [`DashmetConfig`]
//! is the resolved form handed to the rest of the engine. Resolution order
//! per value: config file -> built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use url::Url;

use crate::poller::DEFAULT_POLL_INTERVAL;

/// Env var naming an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "DASHMET_CONFIG";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_CACHE_VERSION: &str = "dashmet-v1";

/// Install-time cache manifest: the offline shell of the dashboard.
const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/static/css/output.css",
    "/static/avatar.png",
    "/static/default-avatar.png",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid server.base_url {raw:?}: {source}")]
    BadBaseUrl {
        raw: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    server: Option<RawServer>,
    poll: Option<RawPoll>,
    cache: Option<RawCache>,
    storage: Option<RawStorage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServer {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPoll {
    interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCache {
    version: Option<String>,
    manifest: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStorage {
    data_dir: Option<PathBuf>,
}

/// Fully-resolved engine configuration.
#[derive(Debug, Clone)]
pub struct DashmetConfig {
    base_url: Url,
    poll_interval: Duration,
    cache_version: String,
    manifest: Vec<String>,
    data_dir: PathBuf,
}

impl DashmetConfig {
    /// Load from `path`, the `DASHMET_CONFIG` env var, or the default
    /// location, in that order. A missing file at a non-explicit location
    /// resolves to pure defaults; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match env::var_os(CONFIG_PATH_ENV) {
                Some(raw) => (PathBuf::from(raw), true),
                None => (default_config_path(), false),
            },
        };

        let raw = match fs::read_to_string(&path) {
            Ok(contents) => {
                toml::from_str::<RawConfig>(&contents).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
            Err(source) if !explicit && source.kind() == std::io::ErrorKind::NotFound => {
                RawConfig::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        Self::resolve(raw)
    }

    fn resolve(raw: RawConfig) -> Result<Self, ConfigError> {
        let raw_base = raw
            .server
            .and_then(|s| s.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&raw_base).map_err(|source| ConfigError::BadBaseUrl {
            raw: raw_base,
            source,
        })?;

        let poll_interval = raw
            .poll
            .and_then(|p| p.interval_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let cache = raw.cache.unwrap_or_default();
        let cache_version = cache
            .version
            .unwrap_or_else(|| DEFAULT_CACHE_VERSION.to_string());
        let manifest = cache
            .manifest
            .unwrap_or_else(|| DEFAULT_MANIFEST.iter().map(ToString::to_string).collect());

        let data_dir = raw
            .storage
            .and_then(|s| s.data_dir)
            .unwrap_or_else(default_data_dir);

        Ok(Self {
            base_url,
            poll_interval,
            cache_version,
            manifest,
            data_dir,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn cache_version(&self) -> &str {
        &self.cache_version
    }

    #[must_use]
    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    /// Directory holding the versioned cache stores.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("caches")
    }

    /// Path of the page-context settings file.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dashmet")
        .join("config.toml")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".dashmet"))
        .join("dashmet")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ConfigError, DashmetConfig};

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let err = DashmetConfig::load(Some(&missing)).expect_err("must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn full_file_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
base_url = "https://dash.example.com"

[poll]
interval_secs = 10

[cache]
version = "dashmet-v7"
manifest = ["/", "/static/app.css"]

[storage]
data_dir = "/tmp/dashmet-test"
"#,
        )
        .expect("write config");

        let config = DashmetConfig::load(Some(&path)).expect("load");
        assert_eq!(config.base_url().as_str(), "https://dash.example.com/");
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.cache_version(), "dashmet-v7");
        assert_eq!(config.manifest(), ["/", "/static/app.css"]);
        assert_eq!(
            config.settings_path(),
            std::path::Path::new("/tmp/dashmet-test/settings.json")
        );
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[poll]\ninterval_secs = 5\n").expect("write config");

        let config = DashmetConfig::load(Some(&path)).expect("load");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.cache_version(), "dashmet-v1");
        assert_eq!(config.manifest().len(), 4);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nbase_url=").expect("write config");

        let err = DashmetConfig::load(Some(&path)).expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nbase_url = \"not a url\"\n").expect("write config");

        let err = DashmetConfig::load(Some(&path)).expect_err("must fail");
        assert!(matches!(err, ConfigError::BadBaseUrl { .. }));
    }
}
