//! File-backed TTL cache.
//!
//! One JSON file per entry inside the cache directory. Expired entries are
//! removed when read and by [`TtlCache::cleanup`], which runs once at startup.
//! There is no background eviction.
//!
//! Keys are turned into file names by replacing every non-alphanumeric
//! character with `_`, so distinct keys can share a file. The last write wins.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::Result;

/// Default lifetime of a cache entry
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest lifetime an entry can be given; larger TTLs are capped
pub const MAX_TTL: Duration = Duration::from_secs(3650 * 24 * 60 * 60);

const ENTRY_EXTENSION: &str = "json";

/// One cached value as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(key: &str, data: T, ttl: Duration) -> Self {
        let created_at = Utc::now();
        // Never let an entry expire at the instant it is created
        let ttl = ttl.clamp(Duration::from_millis(1), MAX_TTL);
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            key: key.to_string(),
            data,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Key/value cache persisted as one file per entry
#[derive(Debug, Clone)]
pub struct TtlCache {
    dir: PathBuf,
    default_ttl: Duration,
}

impl TtlCache {
    /// Open (and create if needed) a cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs_err::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            default_ttl: DEFAULT_TTL,
        })
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_key(key), ENTRY_EXTENSION))
    }

    /// Look up `key`. Missing, corrupted and expired entries all read as `None`;
    /// the latter two are deleted.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key);

        let content = match fs_err::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != IoErrorKind::NotFound {
                    tracing::debug!("Cache read failed for {}: {}", key, e);
                }
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Dropping corrupted cache entry {}: {}", path.display(), e);
                self.remove_file(&path);
                return None;
            }
        };

        if entry.is_expired() {
            tracing::debug!("Cache entry expired: {}", key);
            self.remove_file(&path);
            return None;
        }

        tracing::debug!("Cache hit: {}", key);
        Some(entry.data)
    }

    /// Store `data` under `key` with the default TTL
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        self.set_with_ttl(key, data, self.default_ttl)
    }

    /// Store `data` under `key`. Failures are logged and otherwise ignored.
    pub fn set_with_ttl<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) {
        let entry = CacheEntry::new(key, data, ttl);
        match self.write_entry(&self.entry_path(key), &entry) {
            Ok(()) => tracing::debug!("Cached {} until {}", key, entry.expires_at),
            Err(e) => tracing::warn!("Failed to write cache entry {}: {:#}", key, e),
        }
    }

    /// Write to a temporary file in the cache directory, then rename over the target
    fn write_entry<T: Serialize>(&self, path: &Path, entry: &CacheEntry<&T>) -> Result<()> {
        let json = serde_json::to_vec(entry)?;
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(&json)?;
        file.flush()?;
        file.persist(path)?;
        Ok(())
    }

    /// Remove the entry for `key`, if any
    pub fn delete(&self, key: &str) {
        self.remove_file(&self.entry_path(key));
    }

    /// Remove every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = self
            .entry_files()
            .into_iter()
            .filter(|path| self.remove_file(path))
            .count();

        tracing::info!("Cleared {} cache entries from {}", removed, self.dir.display());
        removed
    }

    /// Remove every expired or unreadable entry. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Utc::now();
        let mut removed = 0;

        for path in self.entry_files() {
            let stale = match fs_err::read_to_string(&path) {
                Ok(content) => serde_json::from_str::<CacheEntry<serde_json::Value>>(&content)
                    .map(|entry| entry.is_expired_at(now))
                    .unwrap_or(true),
                Err(e) if e.kind() == IoErrorKind::NotFound => false,
                Err(_) => true,
            };

            if stale && self.remove_file(&path) {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Cache cleanup removed {} stale entries", removed);
        }
        removed
    }

    /// Number of entry files currently on disk, expired or not
    pub fn len(&self) -> usize {
        self.entry_files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let entries = match fs_err::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot list cache directory: {}", e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION)
            })
            .collect()
    }

    /// Returns true if a file was actually removed
    fn remove_file(&self, path: &Path) -> bool {
        match fs_err::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == IoErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("Failed to remove cache file: {}", e);
                false
            }
        }
    }
}

/// Map a cache key to a file stem. Lossy: `a:b` and `a/b` collide.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
