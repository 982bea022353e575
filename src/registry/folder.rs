//! Folder types and repository.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::db::DbPool;
use crate::Result;

/// A shared root folder.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Opaque storage collaborator reference.
    pub storage_ref: String,
    /// When the folder was created (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub created_at: String,
}

impl Folder {
    /// Get the created_at as DateTime<Utc>.
    pub fn created_at_datetime(&self) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%d %H:%M:%S")
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|_| Utc::now())
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a folder, or return the existing one for the same storage reference.
    ///
    /// The existing folder keeps its id and name.
    pub async fn create_or_get(&self, name: &str, storage_ref: &str) -> Result<Folder> {
        let folder = sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (name, storage_ref) VALUES (?, ?)
             ON CONFLICT(storage_ref) DO UPDATE SET storage_ref = excluded.storage_ref
             RETURNING id, name, storage_ref, created_at",
        )
        .bind(name)
        .bind(storage_ref)
        .fetch_one(self.pool)
        .await?;

        Ok(folder)
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, name, storage_ref, created_at FROM folders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// List all folders in creation order.
    pub async fn list(&self) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT id, name, storage_ref, created_at FROM folders ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// Delete a folder by ID. Its files go with it (`ON DELETE CASCADE`).
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count files in a folder.
    pub async fn count_files(&self, folder_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shared_files WHERE folder_id = ?")
            .bind(folder_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
