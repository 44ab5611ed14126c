//! On-disk snapshot of the cache: loaded once at startup, rewritten wholesale
//! by a single background task whenever the cache is dirty.
//!
//! Durability failures never reach request handlers. A missing or corrupt
//! snapshot starts the process with an empty cache, and a failed flush leaves
//! the cache dirty so the next tick tries again.

use super::cache::KeyedCache;
use super::error::PersistenceError;
use crate::utils::{fmt_duration, log_if_slow};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SNAPSHOT_PATH: &str = "data/db.json";
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

const SLOW_FLUSH_THRESHOLD: Duration = Duration::from_millis(500);

/// Plain values the store needs; parsed elsewhere and injected.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub flush_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// Load the snapshot at `path` into a fresh cache.
///
/// Absent, unreadable, or unparsable files all yield an empty cache.
pub async fn load(path: &Path) -> KeyedCache {
    match read_snapshot(path).await {
        Ok(Some(entries)) => {
            info!(entries = entries.len(), path = %path.display(), "Snapshot loaded");
            KeyedCache::from_entries(entries)
        }
        Ok(None) => {
            info!(path = %path.display(), "No snapshot found, starting empty");
            KeyedCache::new()
        }
        Err(e) => {
            error!(error = %e, source = ?std::error::Error::source(&e), path = %path.display(), "Failed to load snapshot, starting empty");
            KeyedCache::new()
        }
    }
}

async fn read_snapshot(path: &Path) -> Result<Option<HashMap<String, Value>>, PersistenceError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PersistenceError::Io {
                path: path.display().to_string(),
                source: e,
            });
        }
    };
    let entries = serde_json::from_slice(&bytes).map_err(PersistenceError::Decode)?;
    Ok(Some(entries))
}

/// Write the cache to `path` if it has unflushed changes.
///
/// Returns `true` when a snapshot was written. Errors are logged, and the
/// dirty flag is restored so a later flush retries.
pub async fn flush(cache: &KeyedCache, path: &Path) -> bool {
    let start = Instant::now();
    let bytes = match cache.encode_if_dirty().await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!("Snapshot clean, skipping flush");
            return false;
        }
        Err(e) => {
            error!(error = %PersistenceError::Encode(e), "Failed to encode snapshot");
            return false;
        }
    };

    match write_snapshot(path, &bytes).await {
        Ok(()) => {
            let elapsed = log_if_slow(start, SLOW_FLUSH_THRESHOLD, "snapshot flush");
            info!(
                bytes = bytes.len(),
                path = %path.display(),
                duration = fmt_duration(elapsed),
                "Snapshot flushed"
            );
            true
        }
        Err(e) => {
            cache.mark_dirty();
            error!(error = %e, source = ?std::error::Error::source(&e), "Failed to write snapshot");
            false
        }
    }
}

/// Write to a sibling temp file, then rename over the target so readers never
/// see a half-written snapshot.
async fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let io_err = |p: &Path| {
        let p = p.display().to_string();
        move |source| PersistenceError::Io { path: p, source }
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_err(parent))?;
    }

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(io_err(&tmp_path))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(io_err(path))?;
    Ok(())
}

/// Spawn the periodic flush task.
///
/// Runs until `shutdown` is cancelled, then performs one final flush before
/// returning. This is the only writer of the snapshot file.
pub fn spawn_flush_task(
    cache: KeyedCache,
    config: StoreConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            path = %config.path.display(),
            interval = fmt_duration(config.flush_interval),
            "Snapshot flush task started"
        );

        let mut ticker = tokio::time::interval(config.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // skip the immediate first tick

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    flush(&cache, &config.path).await;
                }
            }
        }

        if flush(&cache, &config.path).await {
            info!("Final snapshot written on shutdown");
        } else if cache.is_dirty() {
            warn!("Shutting down with unflushed changes");
        }
    })
}
