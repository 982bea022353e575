//! Local filesystem storage.
//!
//! References are filesystem paths. Directories are containers, everything
//! else is a leaf.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tokio::fs::{self, File};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    guess_mime, sanitize_name, ContentNode, ContentReader, ContentSink, ContentStore, NewContent,
    StorageError, StorageResult,
};

/// Suffix of in-progress upload files.
const PARTIAL_SUFFIX: &str = ".part";

/// [`ContentStore`] backed by the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalContentStore;

impl LocalContentStore {
    /// Create a new LocalContentStore.
    pub fn new() -> Self {
        Self
    }

    async fn stat_path(reference: &str) -> StorageResult<ContentNode> {
        let path = Path::new(reference);
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| map_io_error(e, reference))?;
        let name = display_name(path);

        if metadata.is_dir() {
            Ok(ContentNode::Container { name })
        } else {
            Ok(ContentNode::Leaf {
                mime_type: guess_mime(&name),
                size: Some(metadata.len()),
                name,
            })
        }
    }

    async fn list_path(reference: &str) -> StorageResult<Vec<String>> {
        let mut entries = fs::read_dir(reference)
            .await
            .map_err(|e| map_io_error(e, reference))?;

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_partial_upload(&path) {
                debug!(path = ?path, "Skipping upload in progress");
                continue;
            }
            match path.to_str() {
                Some(s) => children.push(s.to_string()),
                None => warn!(path = ?path, "Skipping entry with non UTF-8 path"),
            }
        }
        children.sort();
        Ok(children)
    }

    async fn create_in(container: &str, name: &str) -> StorageResult<NewContent> {
        let name = sanitize_name(name)?;
        let dir = Path::new(container);

        let metadata = fs::metadata(dir)
            .await
            .map_err(|e| map_io_error(e, container))?;
        if !metadata.is_dir() {
            return Err(StorageError::NotAContainer(container.to_string()));
        }

        let final_path = dir.join(&name);
        let temp_path = dir.join(format!(".{}{PARTIAL_SUFFIX}", Uuid::new_v4()));
        let file = File::create(&temp_path)
            .await
            .map_err(|e| map_io_error(e, container))?;

        let storage_ref = final_path
            .to_str()
            .ok_or_else(|| StorageError::InvalidName(name.clone()))?
            .to_string();

        debug!(temp = ?temp_path, target = %storage_ref, "Created upload sink");
        Ok(NewContent {
            storage_ref,
            sink: Box::new(LocalSink {
                file: Some(file),
                temp_path,
                final_path,
                committed: false,
            }),
        })
    }
}

impl ContentStore for LocalContentStore {
    fn stat<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, StorageResult<ContentNode>> {
        Box::pin(Self::stat_path(reference))
    }

    fn list<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, StorageResult<Vec<String>>> {
        Box::pin(Self::list_path(reference))
    }

    fn open<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, StorageResult<ContentReader>> {
        Box::pin(async move {
            let file = File::open(reference)
                .await
                .map_err(|e| map_io_error(e, reference))?;
            Ok(Box::new(file) as ContentReader)
        })
    }

    fn create<'a>(
        &'a self,
        container: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<NewContent>> {
        Box::pin(Self::create_in(container, name))
    }
}

/// Temporary file renamed into place on commit.
struct LocalSink {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl LocalSink {
    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("upload sink already closed"))
    }
}

impl AsyncWrite for LocalSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.file() {
            Ok(file) => Pin::new(file).poll_write(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.file() {
            Ok(file) => Pin::new(file).poll_flush(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.file() {
            Ok(file) => Pin::new(file).poll_shutdown(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

impl ContentSink for LocalSink {
    fn commit(mut self: Box<Self>) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async move {
            let file = self.file()?;
            file.flush().await?;
            file.sync_all().await?;
            self.file = None;

            fs::rename(&self.temp_path, &self.final_path).await?;
            self.committed = true;
            Ok(())
        })
    }
}

impl Drop for LocalSink {
    fn drop(&mut self) {
        if !self.committed {
            // Close the handle first so the unlink also succeeds on Windows.
            self.file = None;
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                warn!(path = ?self.temp_path, error = %e, "Failed to remove partial upload");
            }
        }
    }
}

/// Temp files written by [`LocalSink`] before commit.
fn is_partial_upload(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix('.'))
        .and_then(|n| n.strip_suffix(PARTIAL_SUFFIX))
        .is_some_and(|id| Uuid::parse_str(id).is_ok())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn map_io_error(e: io::Error, reference: &str) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound(reference.to_string()),
        io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(reference.to_string()),
        _ => StorageError::Io(e),
    }
}
