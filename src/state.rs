//! Application state shared across request handlers.

use crate::store::KeyedCache;
use crate::video::VideoService;

#[derive(Clone)]
pub struct AppState {
    /// Backing cache, also watched by the flush task.
    pub cache: KeyedCache,
    pub videos: VideoService,
}

impl AppState {
    pub fn new(cache: KeyedCache, videos: VideoService) -> Self {
        Self { cache, videos }
    }
}
