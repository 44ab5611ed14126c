//! Error types for the key-value store.

/// Errors surfaced to callers of [`KeyedCache`](super::KeyedCache).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no value stored for key {0:?}")]
    NotFound(String),
    #[error("failed to encode or decode stored value")]
    Serialization(#[from] serde_json::Error),
}

/// Load/flush failures. Never returned past the snapshot module; only logged.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PersistenceError {
    #[error("snapshot I/O failed for {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot is not a valid JSON object")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode snapshot")]
    Encode(#[source] serde_json::Error),
}
