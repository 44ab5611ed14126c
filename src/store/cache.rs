//! In-memory key-value cache backing all per-user state.
//!
//! Values are held as raw [`serde_json::Value`] so the cache needs no
//! compile-time knowledge of what it stores: callers encode on [`put`] and
//! decode into whatever shape they want on [`get`]. The same representation is
//! what the snapshot file holds, so unknown fields on untouched keys survive a
//! load/flush cycle.
//!
//! A dirty flag records whether anything changed since the last successful
//! flush. It is only raised when a put actually changes the stored value.
//!
//! [`put`]: KeyedCache::put
//! [`get`]: KeyedCache::get

use super::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::trace;

/// Shared cache. Clone-cheap (all `Arc`-wrapped internals).
#[derive(Clone, Default)]
pub struct KeyedCache {
    entries: Arc<RwLock<HashMap<String, Value>>>,
    dirty: Arc<AtomicBool>,
}

impl KeyedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache pre-populated from a loaded snapshot. Starts clean.
    pub fn from_entries(entries: HashMap<String, Value>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Raises the dirty flag only if the encoded value differs structurally
    /// from what was stored before. The comparison happens inside the write
    /// section, so a flush can never observe the new value without the flag.
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_value(value)?;

        let mut entries = self.entries.write().await;
        let changed = entries.get(key) != Some(&encoded);
        entries.insert(key.to_owned(), encoded);
        if changed {
            self.dirty.store(true, Ordering::Release);
        }
        trace!(key, changed, "cache put");
        Ok(())
    }

    /// Decode an owned copy of the value stored under `key`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let stored = {
            let entries = self.entries.read().await;
            entries
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(key.to_owned()))?
        };
        Ok(serde_json::from_value(stored)?)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether there are changes not yet written by a flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Serialize the whole map if it is dirty, clearing the flag.
    ///
    /// The flag is swapped while the read lock is held, so no put can land
    /// between the swap and the encode. Callers must call [`mark_dirty`] if
    /// the encoded bytes never make it to disk.
    ///
    /// [`mark_dirty`]: KeyedCache::mark_dirty
    pub(crate) async fn encode_if_dirty(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
        let entries = self.entries.read().await;
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(None);
        }
        match serde_json::to_vec(&*entries) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                Err(e)
            }
        }
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        count: i64,
        label: String,
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let cache = KeyedCache::new();
        let err = cache.get::<Sample>("nobody").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref key) if key == "nobody"));
    }

    #[tokio::test]
    async fn put_then_get_returns_equal_copy() {
        let cache = KeyedCache::new();
        let original = Sample {
            count: 7,
            label: "seven".into(),
        };
        cache.put("k", &original).await.unwrap();

        let mut fetched: Sample = cache.get("k").await.unwrap();
        assert_eq!(fetched, original);

        // Mutating the copy must not leak back into the cache.
        fetched.count = 99;
        let again: Sample = cache.get("k").await.unwrap();
        assert_eq!(again.count, 7);
    }

    #[tokio::test]
    async fn put_marks_dirty_only_on_change() {
        let cache = KeyedCache::new();
        assert!(!cache.is_dirty());

        cache.put("k", &json!({"a": 1})).await.unwrap();
        assert!(cache.is_dirty());

        cache.encode_if_dirty().await.unwrap();
        assert!(!cache.is_dirty());

        cache.put("k", &json!({"a": 1})).await.unwrap();
        assert!(!cache.is_dirty(), "identical put must not dirty the cache");

        cache.put("k", &json!({"a": 2})).await.unwrap();
        assert!(cache.is_dirty());
    }

    #[tokio::test]
    async fn loaded_cache_starts_clean() {
        let mut entries = HashMap::new();
        entries.insert("k".to_owned(), json!({"count": 1, "label": "x"}));
        let cache = KeyedCache::from_entries(entries);
        assert!(!cache.is_dirty());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn encode_if_dirty_skips_clean_cache() {
        let cache = KeyedCache::new();
        assert!(cache.encode_if_dirty().await.unwrap().is_none());

        cache.put("k", &json!("v")).await.unwrap();
        let bytes = cache.encode_if_dirty().await.unwrap().unwrap();
        let decoded: HashMap<String, Value> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded["k"], json!("v"));
        assert!(cache.encode_if_dirty().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn decode_into_wrong_shape_is_serialization_error() {
        let cache = KeyedCache::new();
        cache.put("k", &json!("just a string")).await.unwrap();
        let err = cache.get::<Sample>("k").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn concurrent_puts_leave_flag_set() {
        let cache = KeyedCache::new();
        let mut handles = Vec::new();
        for i in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.put(&format!("k{i}"), &i).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(cache.is_dirty());
        assert_eq!(cache.len().await, 32);
    }
}
