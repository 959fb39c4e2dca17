//! Cache store for persisting resource collections to disk
//!
//! Provides a `CacheStore` that stores serializable payloads as JSON files with
//! a stored-at timestamp and a per-entry TTL.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::clock::{Clock, SystemClock};

/// File name prefix marking entries owned by this cache
///
/// `clear(None)` only removes files carrying it.
pub const CACHE_NAMESPACE: &str = "campusdeck_";

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    key: String,
    payload: T,
    stored_at: DateTime<Utc>,
    ttl_ms: u64,
}

/// Result of reading from cache, including metadata about cache freshness
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<T> {
    /// The cached payload
    pub data: T,
    /// When the payload was stored
    pub stored_at: DateTime<Utc>,
    /// Whether the entry has outlived its TTL
    pub is_expired: bool,
}

/// Reads and writes cached collections for a single tenant
///
/// Every tenant gets its own directory (`~/.cache/campusdeck/<tenant>/` on
/// Linux), so one tenant's entries are never visible to another. Instances are
/// cheap to clone and share the same directory and clock.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where this tenant's entries live
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Creates a store for `tenant` under the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn open(tenant: &str) -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "campusdeck")?;
        Some(Self::for_tenant(project_dirs.cache_dir(), tenant))
    }

    /// Creates a store for `tenant` below an explicit cache root
    pub fn for_tenant(root: &Path, tenant: &str) -> Self {
        Self::with_dir(root.join(sanitize(tenant)))
    }

    /// Creates a store over exactly `dir`
    ///
    /// Useful for testing or when a specific cache location is needed.
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source used for timestamps and freshness checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Directory holding this store's entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}.json", CACHE_NAMESPACE, sanitize(key)))
    }

    /// Writes `payload` under `key`, overwriting any previous entry
    ///
    /// # Arguments
    /// * `key` - Cache key (e.g., "batches")
    /// * `payload` - The data to cache
    /// * `ttl` - How long the entry should be considered fresh
    pub fn set<T: Serialize>(&self, key: &str, payload: &T, ttl: Duration) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            stored_at: self.clock.now(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Write then rename so a crash never leaves a half-written entry behind
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(tmp, path)
    }

    /// Reads an entry regardless of its freshness
    ///
    /// Returns `None` if the entry doesn't exist, cannot be parsed, or was
    /// written under a different key that sanitizes to the same file name.
    /// Expired entries come back with `is_expired = true`.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let content = fs::read_to_string(self.entry_path(key)).ok()?;
        let entry: CacheEntry<T> = serde_json::from_str(&content).ok()?;
        if entry.key != key {
            return None;
        }

        let age_ms = (self.clock.now() - entry.stored_at).num_milliseconds();
        let is_expired = age_ms >= 0 && age_ms as u128 >= u128::from(entry.ttl_ms);

        Some(CachedData {
            data: entry.payload,
            stored_at: entry.stored_at,
            is_expired,
        })
    }

    /// Returns the payload only if the entry exists and is fresh
    ///
    /// Stale and absent entries are both misses.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read(key)
            .filter(|cached| !cached.is_expired)
            .map(|cached| cached.data)
    }

    /// Removes one entry, or every namespaced entry when `key` is `None`
    ///
    /// Idempotent: clearing something already gone is not an error.
    pub fn clear(&self, key: Option<&str>) -> io::Result<()> {
        match key {
            Some(key) => remove_if_present(&self.entry_path(key)),
            None => {
                let entries = match fs::read_dir(&self.dir) {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                    Err(e) => return Err(e),
                };
                for entry in entries {
                    let path = entry?.path();
                    let owned = path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(CACHE_NAMESPACE));
                    if owned {
                        remove_if_present(&path)?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Maps a key or tenant id onto a safe file name component
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
