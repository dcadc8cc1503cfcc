//! Versioned cache store (worker-context persistence).
//!
//! One SQLite database per cache version, all under a single cache
//! directory. The version string is the only invalidation mechanism:
//! bumping it and running [`CacheStore::activate`] deletes every other
//! version's database wholesale. There is no per-entry eviction.
//!
//! The worker's sync checkpoint also lives here, in a `meta` table, so it
//! survives worker restarts the same way cached responses do.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use dashmet_types::SyncCheckpoint;

/// Meta key holding the worker-context sync checkpoint (RFC 3339).
const LAST_SYNC_KEY: &str = "last_sync_time";

const FILE_PREFIX: &str = "cache-";
const FILE_SUFFIX: &str = ".sqlite3";

/// Key-value store of cached response bodies for one cache version.
pub struct CacheStore {
    conn: Connection,
    version: String,
    path: PathBuf,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("version", &self.version)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    const SCHEMA: &'static str = "
        CREATE TABLE IF NOT EXISTS entries (
            url       TEXT PRIMARY KEY,
            body      BLOB NOT NULL,
            stored_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
    ";

    /// Open (creating if needed) the store for `version` under `dir`.
    pub fn open(dir: &Path, version: &str) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;

        let path = dir.join(file_name_for(version));
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open cache store at {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
            .context("Failed to set pragmas")?;
        conn.execute_batch(Self::SCHEMA)
            .context("Failed to create cache schema")?;

        Ok(Self {
            conn,
            version: version.to_string(),
            path,
        })
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Populate the store from an install manifest, all-or-nothing.
    ///
    /// Runs inside one transaction: if anything fails, no entry is written
    /// and the install step as a whole fails.
    pub fn install(&mut self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin install transaction")?;
        for (url, body) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO entries (url, body, stored_at) VALUES (?1, ?2, ?3)",
                params![url, body, now],
            )
            .with_context(|| format!("Failed to cache manifest entry {url}"))?;
        }
        tx.commit().context("Failed to commit install transaction")?;
        tracing::info!(
            version = %self.version,
            entries = entries.len(),
            "Cache store populated from manifest"
        );
        Ok(())
    }

    /// Look up a cached response body by request URL.
    pub fn lookup(&self, url: &str) -> Result<Option<Vec<u8>>> {
        self.conn
            .query_row(
                "SELECT body FROM entries WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read cache entry {url}"))
    }

    /// Number of cached entries.
    pub fn entry_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .context("Failed to count cache entries")?;
        Ok(count as usize)
    }

    /// Read the worker-context checkpoint, defaulting to epoch on first run.
    ///
    /// A malformed stored value is treated as absent (and logged): the worst
    /// case is re-presenting old notifications, never losing new ones.
    pub fn checkpoint(&self) -> Result<SyncCheckpoint> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![LAST_SYNC_KEY],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read sync checkpoint")?;

        let Some(raw) = stored else {
            return Ok(SyncCheckpoint::default());
        };

        match DateTime::parse_from_rfc3339(&raw) {
            Ok(parsed) => Ok(SyncCheckpoint::new(parsed.with_timezone(&Utc))),
            Err(e) => {
                tracing::warn!("Malformed stored checkpoint {raw:?}: {e}; treating as first run");
                Ok(SyncCheckpoint::default())
            }
        }
    }

    /// Advance the worker-context checkpoint to `at` and persist it.
    ///
    /// Monotonic: a rewind attempt persists nothing new and returns the
    /// existing checkpoint.
    pub fn advance_checkpoint(&self, at: DateTime<Utc>) -> Result<SyncCheckpoint> {
        let current = self.checkpoint()?;
        let advanced = current.advanced_to(at);
        if advanced != current {
            self.conn
                .execute(
                    "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
                    params![LAST_SYNC_KEY, advanced.as_datetime().to_rfc3339()],
                )
                .context("Failed to persist sync checkpoint")?;
        }
        Ok(advanced)
    }

    /// Delete every cache version under `dir` except `current_version`.
    ///
    /// The activation step of the worker lifecycle: afterwards exactly one
    /// version's store remains on disk. Returns the number of pruned stores.
    pub fn activate(dir: &Path, current_version: &str) -> Result<usize> {
        let keep = file_name_for(current_version);
        let mut pruned = 0;

        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            // Nothing installed yet: nothing to prune.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list cache directory {}", dir.display()));
            }
        };

        for entry in read_dir {
            let entry = entry
                .with_context(|| format!("Failed to list cache directory {}", dir.display()))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(FILE_PREFIX) || !name.ends_with(FILE_SUFFIX) {
                continue;
            }
            if name == keep {
                continue;
            }

            tracing::info!(store = name, "Clearing old cache version");
            fs::remove_file(entry.path())
                .with_context(|| format!("Failed to delete old cache store {name}"))?;
            for suffix in ["-wal", "-shm"] {
                let sidecar = dir.join(format!("{name}{suffix}"));
                if sidecar.exists() {
                    let _ = fs::remove_file(sidecar);
                }
            }
            pruned += 1;
        }

        Ok(pruned)
    }
}

/// File name for a version's database, with path-hostile characters mapped
/// to `_` so a version string can never escape the cache directory.
fn file_name_for(version: &str) -> String {
    let safe: String = version
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{FILE_PREFIX}{safe}{FILE_SUFFIX}")
}
