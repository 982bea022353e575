//! Content registry for FileShare.
//!
//! The registry is the source of truth for what the server may expose:
//! shared root folders and the flat list of files under each of them.

mod folder;
mod shared_file;

pub use folder::{Folder, FolderRepository};
pub use shared_file::{NewSharedFile, SharedFile, SharedFileRepository};

use tracing::{debug, info};

use crate::db::DbPool;
use crate::{FileShareError, Result};

/// Registry of shared folders and files.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Debug, Clone)]
pub struct ContentRegistry {
    pool: DbPool,
}

impl ContentRegistry {
    /// Create a registry over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add a folder, returning the existing one if the storage reference is
    /// already shared.
    pub async fn add_folder(&self, name: &str, storage_ref: &str) -> Result<Folder> {
        let folder = FolderRepository::new(&self.pool)
            .create_or_get(name, storage_ref)
            .await?;
        info!(folder_id = folder.id, name = %folder.name, "Folder shared");
        Ok(folder)
    }

    /// Register a file in a folder, updating it if the name is already present.
    pub async fn add_file_to_folder(&self, file: &NewSharedFile) -> Result<SharedFile> {
        let shared = SharedFileRepository::new(&self.pool).upsert(file).await?;
        debug!(
            folder_id = shared.folder_id,
            file_id = shared.id,
            name = %shared.name,
            "File registered"
        );
        Ok(shared)
    }

    /// List the files of a folder in insertion order.
    pub async fn list_children(&self, folder_id: i64) -> Result<Vec<SharedFile>> {
        SharedFileRepository::new(&self.pool)
            .list_by_folder(folder_id)
            .await
    }

    /// List all folders ordered by id.
    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        FolderRepository::new(&self.pool).list().await
    }

    /// Get a folder by id.
    pub async fn get_folder(&self, folder_id: i64) -> Result<Folder> {
        FolderRepository::new(&self.pool)
            .get_by_id(folder_id)
            .await?
            .ok_or_else(|| FileShareError::NotFound(format!("folder {folder_id}")))
    }

    /// Get a file by id.
    pub async fn get_file(&self, file_id: i64) -> Result<SharedFile> {
        SharedFileRepository::new(&self.pool)
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| FileShareError::NotFound(format!("file {file_id}")))
    }

    /// Get a file only if it belongs to the given folder.
    pub async fn get_file_in_folder(&self, folder_id: i64, file_id: i64) -> Result<SharedFile> {
        SharedFileRepository::new(&self.pool)
            .get_in_folder(folder_id, file_id)
            .await?
            .ok_or_else(|| FileShareError::NotFound(format!("file {file_id} in folder {folder_id}")))
    }

    /// Remove a folder and every file under it.
    pub async fn remove_folder(&self, folder_id: i64) -> Result<()> {
        if !FolderRepository::new(&self.pool).delete(folder_id).await? {
            return Err(FileShareError::NotFound(format!("folder {folder_id}")));
        }
        info!(folder_id, "Folder removed");
        Ok(())
    }

    /// Remove a single file.
    pub async fn remove_file(&self, file_id: i64) -> Result<()> {
        if !SharedFileRepository::new(&self.pool).delete(file_id).await? {
            return Err(FileShareError::NotFound(format!("file {file_id}")));
        }
        debug!(file_id, "File removed");
        Ok(())
    }

    /// Count the files in a folder.
    pub async fn count_files(&self, folder_id: i64) -> Result<i64> {
        FolderRepository::new(&self.pool).count_files(folder_id).await
    }
}
