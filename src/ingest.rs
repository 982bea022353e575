//! Folder ingestion.
//!
//! Expands a storage reference into individual registry entries. Every leaf
//! reachable from the source lands in the single target folder, so nested
//! directory structure is flattened.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::registry::{ContentRegistry, Folder, NewSharedFile};
use crate::storage::{ContentNode, ContentStore};
use crate::{FileShareError, Result};

/// Outcome of one ingestion walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Leaves registered (new or updated).
    pub added: usize,
    /// Items that failed or were cut off, logged and passed over.
    pub skipped: usize,
}

/// Walks storage references into the registry.
pub struct Ingestor {
    registry: ContentRegistry,
    store: Arc<dyn ContentStore>,
    max_depth: usize,
}

impl Ingestor {
    /// Create a new ingestor.
    ///
    /// Containers nested deeper than `max_depth` below the source are not
    /// enumerated.
    pub fn new(registry: ContentRegistry, store: Arc<dyn ContentStore>, max_depth: usize) -> Self {
        Self {
            registry,
            store,
            max_depth,
        }
    }

    /// Ingest `source_ref` into an existing folder.
    pub async fn ingest(&self, source_ref: &str, folder_id: i64) -> Result<IngestReport> {
        self.registry.get_folder(folder_id).await?;
        let root = self.store.stat(source_ref).await?;
        self.walk(source_ref, root, folder_id).await
    }

    /// Share a new folder named after `source_ref` and ingest into it.
    ///
    /// Sharing the same reference twice reuses the existing folder.
    pub async fn share_folder(&self, source_ref: &str) -> Result<(Folder, IngestReport)> {
        let root = self.store.stat(source_ref).await?;
        let folder = self.registry.add_folder(root.name(), source_ref).await?;
        let report = self.walk(source_ref, root, folder.id).await?;
        Ok((folder, report))
    }

    async fn walk(&self, source_ref: &str, root: ContentNode, folder_id: i64) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut visited = HashSet::new();
        let mut pending = vec![(source_ref.to_string(), 0usize, Some(root))];

        while let Some((reference, depth, known)) = pending.pop() {
            let node = match known {
                Some(node) => node,
                None => match self.store.stat(&reference).await {
                    Ok(node) => node,
                    Err(e) => {
                        warn!(reference = %reference, error = %e, "Skipping unreadable item");
                        report.skipped += 1;
                        continue;
                    }
                },
            };

            match node {
                ContentNode::Leaf {
                    name,
                    mime_type,
                    size,
                } => {
                    let file = NewSharedFile::new(folder_id, name, reference.as_str(), mime_type)
                        .with_size(size);
                    match self.registry.add_file_to_folder(&file).await {
                        Ok(_) => report.added += 1,
                        Err(e) => {
                            warn!(reference = %reference, error = %e, "Failed to register file");
                            report.skipped += 1;
                        }
                    }
                }
                ContentNode::Container { .. } => {
                    if depth >= self.max_depth {
                        let err = FileShareError::IngestionTooDeep(self.max_depth);
                        warn!(reference = %reference, error = %err, "Skipping container");
                        report.skipped += 1;
                        continue;
                    }
                    if !visited.insert(reference.clone()) {
                        debug!(reference = %reference, "Container already visited");
                        report.skipped += 1;
                        continue;
                    }

                    let children = match self.store.list(&reference).await {
                        Ok(children) => children,
                        Err(e) => {
                            warn!(reference = %reference, error = %e, "Failed to list container");
                            report.skipped += 1;
                            continue;
                        }
                    };

                    // Reversed so the stack yields children in listing order.
                    pending.extend(children.into_iter().rev().map(|c| (c, depth + 1, None)));
                }
            }
        }

        info!(
            folder_id,
            source = %source_ref,
            added = report.added,
            skipped = report.skipped,
            "Ingestion finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}
