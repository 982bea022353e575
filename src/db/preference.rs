//! Key-value preference storage.

use super::DbPool;
use crate::{FileShareError, Result};

/// Preference keys persisted by FileShare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKey {
    /// Whether listing and downloads require a session.
    RequireLogin,
    /// Whether clients may upload into shared folders.
    AllowUploads,
    /// Argon2 PHC hash of the shared password, empty when unset.
    Password,
    /// Whether the front end starts the service on launch.
    ServiceOnStartup,
}

impl PreferenceKey {
    /// Get the storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKey::RequireLogin => "require_login",
            PreferenceKey::AllowUploads => "allow_uploads",
            PreferenceKey::Password => "password",
            PreferenceKey::ServiceOnStartup => "service_on_startup",
        }
    }

    /// Value assumed when the key was never written.
    pub fn default_value(&self) -> &'static str {
        match self {
            PreferenceKey::RequireLogin => "false",
            PreferenceKey::AllowUploads => "false",
            PreferenceKey::Password => "",
            PreferenceKey::ServiceOnStartup => "true",
        }
    }
}

/// Repository for preference reads and writes.
pub struct PreferenceRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PreferenceRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a preference value, falling back to the key's default.
    pub async fn get(&self, key: PreferenceKey) -> Result<String> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM preferences WHERE key = ?")
                .bind(key.as_str())
                .fetch_optional(self.pool)
                .await?;

        Ok(value.unwrap_or_else(|| key.default_value().to_string()))
    }

    /// Get a boolean preference.
    pub async fn get_bool(&self, key: PreferenceKey) -> Result<bool> {
        parse_bool(&self.get(key).await?)
    }

    /// Set a preference value.
    pub async fn set(&self, key: PreferenceKey, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key.as_str())
        .bind(value)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Set a boolean preference.
    pub async fn set_bool(&self, key: PreferenceKey, value: bool) -> Result<()> {
        self.set(key, bool_str(value)).await
    }
}

/// Parse a stored boolean.
pub(crate) fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(FileShareError::Database(format!(
            "invalid boolean preference value: {other}"
        ))),
    }
}

/// Encode a boolean for storage.
pub(crate) fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
