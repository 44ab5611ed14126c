//! HTTP transport for the watch-time service.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod status;
pub mod videos;

pub use routes::*;
