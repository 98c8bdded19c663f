//! Durable deduplication store (the seen-file).
//!
//! Keeps the set of already-processed item keys across runs so re-running
//! the pipeline never re-ingests an item. The on-disk format is one JSON
//! document, `{"urls": {"<key>": {"seen_at": ..., "skipped": true?}}}`,
//! rewritten after every newly marked key — a crash mid-run loses at most
//! the one in-flight item's durability, never the whole batch.
//!
//! The store is constructed by the pipeline runner and shared by reference
//! into concurrent item tasks. Insertion is idempotent: a benign race
//! between two tasks produces at most one duplicate ingest, not corruption.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use schemewatch_shared::{Result, SchemeWatchError};

// ---------------------------------------------------------------------------
// On-disk format
// ---------------------------------------------------------------------------

/// One seen entry. `skipped` marks keys recorded for unreachable items so
/// they are not refetched on later runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupRecord {
    /// When the key was first marked.
    pub seen_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
}

/// Root of the seen-file document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SeenFile {
    #[serde(default)]
    urls: BTreeMap<String, DedupRecord>,
}

// ---------------------------------------------------------------------------
// DedupStore
// ---------------------------------------------------------------------------

/// Persisted set of already-processed item keys.
pub struct DedupStore {
    path: PathBuf,
    inner: Mutex<SeenFile>,
}

impl DedupStore {
    /// Load the store from `path`. An absent file is an empty store; an
    /// unreadable or malformed file is fatal, discovered before any
    /// network activity.
    pub fn load(path: &Path) -> Result<Self> {
        let seen = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| SchemeWatchError::io(path, e))?;
            serde_json::from_str(&content).map_err(|e| {
                SchemeWatchError::Store(format!("malformed seen-file {}: {e}", path.display()))
            })?
        } else {
            debug!(?path, "seen-file not found, starting empty");
            SeenFile::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(seen),
        })
    }

    /// Whether `key` has already been processed in any run.
    pub fn has(&self, key: &str) -> bool {
        let seen = self.inner.lock().expect("seen-file lock poisoned");
        seen.urls.contains_key(key)
    }

    /// Mark `key` as processed and persist immediately.
    ///
    /// Idempotent: marking an existing key refreshes its record and
    /// rewrites the file, which is harmless.
    pub fn mark_seen(&self, key: &str, skipped: bool) -> Result<()> {
        // The lock is held across the write so concurrent marks cannot
        // persist their snapshots out of order.
        let mut seen = self.inner.lock().expect("seen-file lock poisoned");
        seen.urls.insert(
            key.to_string(),
            DedupRecord {
                seen_at: Utc::now(),
                skipped: skipped.then_some(true),
            },
        );
        let snapshot = serde_json::to_string_pretty(&*seen)
            .map_err(|e| SchemeWatchError::Store(e.to_string()))?;
        self.persist(&snapshot)
    }

    /// Number of keys in the store.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("seen-file lock poisoned").urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite the whole document via temp-file-then-rename so a crash
    /// never leaves a truncated seen-file behind.
    fn persist(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SchemeWatchError::io(parent, e))?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content).map_err(|e| SchemeWatchError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| SchemeWatchError::io(&self.path, e))?;
        Ok(())
    }
}
