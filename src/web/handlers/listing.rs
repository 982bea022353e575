//! Folder and file listings.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Html,
};

use super::{parse_id, AppState};
use crate::web::error::ApiError;
use crate::web::middleware::Authorized;
use crate::web::render;

/// GET / - List all shared folders.
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    _auth: Authorized,
) -> Result<Html<String>, ApiError> {
    let folders = state.registry.list_folders().await?;

    let mut entries = Vec::with_capacity(folders.len());
    for folder in folders {
        let count = state.registry.count_files(folder.id).await?;
        entries.push((folder, count));
    }

    let access = state.sessions.access_config().await?;
    Ok(Html(render::folder_index(&entries, &access)))
}

/// GET /:folder_id - List the files of one folder.
pub async fn list_folder(
    State(state): State<Arc<AppState>>,
    _auth: Authorized,
    Path(folder_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let folder_id = parse_id(&folder_id, "folder")?;
    let folder = state.registry.get_folder(folder_id).await?;
    let files = state.registry.list_children(folder.id).await?;
    let allow_uploads = state.sessions.allow_uploads().await?;

    Ok(Html(render::file_list(&folder, &files, allow_uploads)))
}
