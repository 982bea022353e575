//! File download and upload handlers.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, Response, StatusCode},
    response::Html,
};
use axum_extra::extract::cookie::CookieJar;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use super::{parse_id, AppState};
use crate::registry::NewSharedFile;
use crate::storage::{guess_mime, sanitize_name, ContentNode, NewContent, StorageError};
use crate::web::error::{ApiError, ErrorCode};
use crate::web::middleware::{session_token, Authorized};
use crate::web::render;
use crate::web::shutdown::until_forced;

/// Build a safe Content-Disposition header value.
///
/// Control characters are dropped and quotes/backslashes replaced in the
/// plain `filename` parameter. Non-ASCII names also get an RFC 5987
/// `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let encoded = urlencoding::encode(filename);
    let fallback: String = sanitized
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

/// GET /:folder_id/:file_id - Stream a shared file.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    _auth: Authorized,
    Path((folder_id, file_id)): Path<(String, String)>,
) -> Result<Response<Body>, ApiError> {
    let folder_id = parse_id(&folder_id, "folder")?;
    let file_id = parse_id(&file_id, "file")?;
    let file = state.registry.get_file_in_folder(folder_id, file_id).await?;

    // Prefer the live size; the registered one may be stale.
    let size = match state.store.stat(&file.storage_ref).await? {
        ContentNode::Leaf { size, .. } => size,
        ContentNode::Container { .. } => {
            return Err(StorageError::NotFound(file.storage_ref.clone()).into());
        }
    };
    let reader = state.store.open(&file.storage_ref).await?;
    let body = until_forced(ReaderStream::new(reader), state.force_close.token());

    tracing::info!(folder_id, file_id, name = %file.name, "Serving download");

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, &file.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&file.name),
        );
    if let Some(size) = size {
        builder = builder.header(header::CONTENT_LENGTH, size);
    }

    builder
        .body(Body::from_stream(body))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// POST /:folder_id/upload - Upload files into a shared folder.
///
/// Request body: multipart/form-data with one or more "file" fields.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(folder_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Html<String>), ApiError> {
    let token = session_token(&jar);
    let allowed = state.sessions.allow_uploads().await?
        && state.sessions.authorize(token.as_deref()).await?;
    if !allowed {
        tracing::warn!(folder_id = %folder_id, "Upload rejected");
        return Err(ApiError::forbidden("Uploads are not allowed"));
    }

    let folder_id = parse_id(&folder_id, "folder")?;
    let folder = state.registry.get_folder(folder_id).await?;

    let mut multipart = multipart.map_err(|e| {
        tracing::warn!("Rejected upload body: {}", e);
        ApiError::bad_request("Expected a multipart/form-data body")
    })?;

    let force = state.force_close.token();
    let mut uploaded = 0usize;
    while let Some(mut field) = unless_forced(&force, multipart.next_field())
        .await?
        .map_err(multipart_error)?
    {
        if field.name() != Some("file") {
            continue;
        }

        let raw_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("Missing file name"))?;
        let name = sanitize_name(&raw_name)?;
        let mime_type = field
            .content_type()
            .filter(|m| !m.is_empty() && *m != "application/octet-stream")
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime(&name));

        let NewContent {
            storage_ref,
            mut sink,
        } = state.store.create(&folder.storage_ref, &name).await?;

        let mut size = 0u64;
        while let Some(chunk) = unless_forced(&force, field.chunk())
            .await?
            .map_err(multipart_error)?
        {
            sink.write_all(&chunk).await.map_err(StorageError::from)?;
            size += chunk.len() as u64;
        }
        sink.commit().await?;

        let file = NewSharedFile::new(folder.id, name, storage_ref, mime_type).with_size(Some(size));
        let shared = state.registry.add_file_to_folder(&file).await?;
        tracing::info!(folder_id, file_id = shared.id, name = %shared.name, size, "File uploaded");
        uploaded += 1;
    }

    if uploaded == 0 {
        return Err(ApiError::bad_request("No file in upload"));
    }

    let files = state.registry.list_children(folder.id).await?;
    Ok((
        StatusCode::CREATED,
        Html(render::file_list(&folder, &files, true)),
    ))
}

/// Await `fut` unless the server is forcing in-flight requests closed.
async fn unless_forced<F: Future>(
    force: &CancellationToken,
    fut: F,
) -> Result<F::Output, ApiError> {
    tokio::select! {
        biased;
        _ = force.cancelled() => {
            tracing::warn!("Upload cut off by server stop");
            Err(ApiError::new(ErrorCode::ServiceUnavailable, "The file server is stopping"))
        }
        output = fut => Ok(output),
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    tracing::warn!("Failed to read multipart field: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(ErrorCode::PayloadTooLarge, "Upload exceeds the size limit")
    } else {
        ApiError::bad_request("Invalid multipart data")
    }
}
