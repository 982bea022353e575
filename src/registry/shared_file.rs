//! Shared file types and repository.

use crate::db::DbPool;
use crate::{FileShareError, Result};

/// A file exposed under exactly one folder.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SharedFile {
    /// Unique file ID.
    pub id: i64,
    /// Owning folder ID.
    pub folder_id: i64,
    /// Display name, unique within the folder.
    pub name: String,
    /// Opaque storage collaborator reference.
    pub storage_ref: String,
    /// MIME type served with downloads.
    pub mime_type: String,
    /// Size in bytes, if known.
    pub size: Option<i64>,
    /// When the file was first registered.
    pub created_at: String,
    /// When the entry was last upserted.
    pub updated_at: String,
}

impl SharedFile {
    /// Size in bytes, if known and non-negative.
    pub fn known_size(&self) -> Option<u64> {
        self.size.and_then(|s| u64::try_from(s).ok())
    }
}

/// Data for registering a file.
#[derive(Debug, Clone)]
pub struct NewSharedFile {
    /// Owning folder ID.
    pub folder_id: i64,
    /// Display name.
    pub name: String,
    /// Opaque storage collaborator reference.
    pub storage_ref: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes, if known.
    pub size: Option<u64>,
}

impl NewSharedFile {
    /// Create a new NewSharedFile with unknown size.
    pub fn new(
        folder_id: i64,
        name: impl Into<String>,
        storage_ref: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            folder_id,
            name: name.into(),
            storage_ref: storage_ref.into(),
            mime_type: mime_type.into(),
            size: None,
        }
    }

    /// Set the size.
    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }
}

const FILE_COLUMNS: &str =
    "id, folder_id, name, storage_ref, mime_type, size, created_at, updated_at";

/// Repository for shared file operations.
pub struct SharedFileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SharedFileRepository<'a> {
    /// Create a new SharedFileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a file, or update reference, MIME type and size of the file with
    /// the same name in the same folder.
    ///
    /// The upsert is one statement, so concurrent calls for the same pair
    /// leave exactly one row and the row keeps its original id.
    pub async fn upsert(&self, file: &NewSharedFile) -> Result<SharedFile> {
        let size = file.size.and_then(|s| i64::try_from(s).ok());
        let sql = format!(
            "INSERT INTO shared_files (folder_id, name, storage_ref, mime_type, size)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(folder_id, name) DO UPDATE SET
                 storage_ref = excluded.storage_ref,
                 mime_type = excluded.mime_type,
                 size = excluded.size,
                 updated_at = datetime('now')
             RETURNING {FILE_COLUMNS}"
        );

        sqlx::query_as::<_, SharedFile>(&sql)
            .bind(file.folder_id)
            .bind(&file.name)
            .bind(&file.storage_ref)
            .bind(&file.mime_type)
            .bind(size)
            .fetch_one(self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db_err) if db_err.is_foreign_key_violation() => {
                    FileShareError::NotFound(format!("folder {}", file.folder_id))
                }
                _ => e.into(),
            })
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<SharedFile>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM shared_files WHERE id = ?");
        let file = sqlx::query_as::<_, SharedFile>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(file)
    }

    /// Get a file by ID only if it belongs to the given, still existing folder.
    pub async fn get_in_folder(&self, folder_id: i64, file_id: i64) -> Result<Option<SharedFile>> {
        let file = sqlx::query_as::<_, SharedFile>(
            "SELECT f.id, f.folder_id, f.name, f.storage_ref, f.mime_type, f.size,
                    f.created_at, f.updated_at
             FROM shared_files f
             JOIN folders d ON d.id = f.folder_id
             WHERE f.id = ? AND f.folder_id = ?",
        )
        .bind(file_id)
        .bind(folder_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List files in a folder in insertion order.
    pub async fn list_by_folder(&self, folder_id: i64) -> Result<Vec<SharedFile>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM shared_files WHERE folder_id = ? ORDER BY id");
        let files = sqlx::query_as::<_, SharedFile>(&sql)
            .bind(folder_id)
            .fetch_all(self.pool)
            .await?;

        Ok(files)
    }

    /// Delete a file by ID.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shared_files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
