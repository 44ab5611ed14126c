//! Persistence and caching layer: an in-memory JSON key-value cache, a
//! per-key lock registry, and the snapshot file that makes the cache durable.

pub mod cache;
pub mod error;
pub mod keyed_mutex;
pub mod snapshot;

pub use cache::KeyedCache;
pub use error::StoreError;
pub use keyed_mutex::KeyedMutex;
pub use snapshot::StoreConfig;
