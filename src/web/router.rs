//! Router configuration for the file server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    download_file, list_folder, list_folders, login, login_form, logout, upload_file, AppState,
};
use crate::config::FilesConfig;

/// Create the file server router.
///
/// Static segments take precedence over the `:folder_id` captures, so
/// `/login` and `/:folder_id/upload` never reach the listing or download
/// handlers.
pub fn create_router(app_state: Arc<AppState>, files_config: &FilesConfig) -> Router {
    let auth_routes = Router::new()
        .route("/login", get(login_form).post(login))
        .route("/logout", post(logout));

    let content_routes = Router::new()
        .route("/", get(list_folders))
        .route("/:folder_id", get(list_folder))
        .route("/:folder_id/upload", post(upload_file))
        .route("/:folder_id/:file_id", get(download_file));

    Router::new()
        .merge(auth_routes)
        .merge(content_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(files_config.max_upload_bytes())),
        )
        .with_state(app_state)
        .merge(create_health_router())
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
