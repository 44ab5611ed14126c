//! Per-user daily video watch-time tracking.
//!
//! State lives in an in-memory JSON cache that a background task flushes to
//! a snapshot file; per-user locks serialize read-modify-write cycles.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod state;
pub mod store;
pub mod utils;
pub mod video;
pub mod web;
