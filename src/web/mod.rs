//! HTTP file server for FileShare.
//!
//! Serves folder listings, file downloads and optional uploads to browsers
//! on the local network.

pub mod error;
pub mod handlers;
pub mod middleware;
mod render;
pub mod router;
pub mod server;
pub mod shutdown;

pub use error::{ApiError, ErrorCode};
pub use handlers::AppState;
pub use middleware::SESSION_COOKIE;
pub use router::create_router;
pub use server::{ServiceState, WebServer};
pub use shutdown::ForceClose;
