//! Storage collaborator interface.
//!
//! The core never builds filesystem paths itself. Everything it knows about
//! content goes through a [`ContentStore`] using opaque string references.

mod local;

pub use local::LocalContentStore;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Storage collaborator errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reference does not resolve.
    #[error("{0} not found")]
    NotFound(String),

    /// Access to the reference was refused.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A container operation was attempted on a leaf.
    #[error("not a container: {0}")]
    NotAContainer(String),

    /// A name that cannot be stored under a container.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// What a reference resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    /// A single file.
    Leaf {
        name: String,
        mime_type: String,
        size: Option<u64>,
    },
    /// Something enumerable into child references.
    Container { name: String },
}

impl ContentNode {
    /// Display name of the node.
    pub fn name(&self) -> &str {
        match self {
            ContentNode::Leaf { name, .. } | ContentNode::Container { name } => name,
        }
    }

    /// Whether the node is a container.
    pub fn is_container(&self) -> bool {
        matches!(self, ContentNode::Container { .. })
    }
}

/// Boxed byte reader returned by [`ContentStore::open`].
pub type ContentReader = Box<dyn AsyncRead + Send + Unpin>;

/// Writer for new content.
///
/// Bytes written are not visible under the final reference until
/// [`commit`](ContentSink::commit) succeeds. Dropping an uncommitted sink
/// discards what was written.
pub trait ContentSink: AsyncWrite + Send + Unpin {
    /// Flush and publish the content.
    fn commit(self: Box<Self>) -> BoxFuture<'static, StorageResult<()>>;
}

/// Content being created by [`ContentStore::create`].
pub struct NewContent {
    /// Reference the content will have once committed.
    pub storage_ref: String,
    /// Writer for the bytes.
    pub sink: Box<dyn ContentSink>,
}

impl std::fmt::Debug for NewContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewContent")
            .field("storage_ref", &self.storage_ref)
            .finish_non_exhaustive()
    }
}

/// Access to the content the server shares.
pub trait ContentStore: Send + Sync {
    /// Resolve a reference to a leaf or a container.
    fn stat<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, StorageResult<ContentNode>>;

    /// Enumerate the child references of a container.
    fn list<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, StorageResult<Vec<String>>>;

    /// Open a leaf for reading.
    fn open<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, StorageResult<ContentReader>>;

    /// Start writing a new leaf called `name` inside a container.
    fn create<'a>(
        &'a self,
        container: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<NewContent>>;
}

/// Reduce a client-supplied file name to a single safe path component.
///
/// Browsers on some platforms send full paths, so only the part after the
/// last separator is kept.
pub fn sanitize_name(raw: &str) -> StorageResult<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return Err(StorageError::InvalidName(raw.to_string()));
    }

    Ok(name.to_string())
}

/// Guess a MIME type from a file name.
pub fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
