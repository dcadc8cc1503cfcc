//! Page-context settings store.
//!
//! A small JSON file holding the foreground poller's sync checkpoint and
//! user preferences. Deliberately separate from the worker's
//! [`crate::CacheStore`] checkpoint: the two execution contexts track their
//! own last-sync boundary and never reconcile (at-least-once delivery).
//!
//! Writes go through a temp file + rename so a crash mid-write never leaves
//! a truncated settings file behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use dashmet_types::SyncCheckpoint;

fn default_sound_alerts() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PageSettings {
    /// RFC 3339 timestamp of the poller's last successful sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_notification_check: Option<DateTime<Utc>>,
    /// Whether presented notifications may play a sound.
    #[serde(default = "default_sound_alerts")]
    sound_alerts: bool,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            last_notification_check: None,
            sound_alerts: true,
        }
    }
}

/// Persisted key-value state for the foreground (page) context.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    settings: PageSettings,
}

impl LocalStore {
    /// Load from `path`, falling back to defaults when the file is missing
    /// or unreadable. A malformed file is logged and treated as first-run
    /// state rather than failing startup.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        "Malformed settings file: {e}; starting from defaults"
                    );
                    PageSettings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PageSettings::default(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    "Failed to read settings file: {e}; starting from defaults"
                );
                PageSettings::default()
            }
        };
        Self { path, settings }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The page-context checkpoint, epoch on first run.
    #[must_use]
    pub fn checkpoint(&self) -> SyncCheckpoint {
        self.settings
            .last_notification_check
            .map(SyncCheckpoint::new)
            .unwrap_or_default()
    }

    /// Advance the page-context checkpoint and persist it.
    ///
    /// Monotonic like the worker-side checkpoint: rewinds are ignored (and
    /// skip the disk write).
    pub fn advance_checkpoint(&mut self, at: DateTime<Utc>) -> Result<SyncCheckpoint> {
        let current = self.checkpoint();
        let advanced = current.advanced_to(at);
        if advanced != current {
            self.settings.last_notification_check = Some(advanced.as_datetime());
            self.save()?;
        }
        Ok(advanced)
    }

    #[must_use]
    pub fn sound_alerts(&self) -> bool {
        self.settings.sound_alerts
    }

    pub fn set_sound_alerts(&mut self, enabled: bool) -> Result<()> {
        self.settings.sound_alerts = enabled;
        self.save()
    }

    fn save(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.settings)
            .context("Failed to serialize page settings")?;
        atomic_write(&self.path, &bytes)
            .with_context(|| format!("Failed to persist settings to {}", self.path.display()))
    }
}

/// Temp file + rename write. On platforms where rename-over-existing fails,
/// fall back to a backup-and-restore swap so the old file is never lost.
fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    if let Err(err) = tmp.persist(path) {
        if path.exists() {
            let backup = path.with_extension("bak");
            let _ = fs::remove_file(&backup);
            fs::rename(path, &backup)?;
            if let Err(rename_err) = err.file.persist(path) {
                let _ = fs::rename(&backup, path);
                return Err(rename_err.error);
            }
            let _ = fs::remove_file(&backup);
        } else {
            return Err(err.error);
        }
    }
    Ok(())
}
