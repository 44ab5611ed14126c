//! Per-user video watch-time tracking.

pub mod models;
pub mod service;

pub use models::{UserState, VideoSetting, VideoSubmit};
pub use service::{VideoError, VideoService};
