//! HTTP handlers for the file server.

pub mod auth;
pub mod file;
pub mod listing;

pub use auth::*;
pub use file::*;
pub use listing::*;

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::registry::ContentRegistry;
use crate::storage::ContentStore;

use super::error::ApiError;
use super::shutdown::ForceClose;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Content registry.
    pub registry: ContentRegistry,
    /// Session manager.
    pub sessions: Arc<SessionManager>,
    /// Storage collaborator.
    pub store: Arc<dyn ContentStore>,
    /// Fired when a stop's grace period runs out.
    pub force_close: Arc<ForceClose>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        registry: ContentRegistry,
        sessions: Arc<SessionManager>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            registry,
            sessions,
            store,
            force_close: Arc::new(ForceClose::new()),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Parse a numeric path segment, treating anything else as a missing resource.
pub(crate) fn parse_id(segment: &str, what: &str) -> Result<i64, ApiError> {
    segment
        .parse()
        .map_err(|_| ApiError::not_found(format!("{what} {segment} not found")))
}
