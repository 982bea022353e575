//! Session repository for cookie-based login.
//!
//! Only SHA-256 digests of session tokens are stored.

use super::preference::{parse_bool, PreferenceKey};
use super::DbPool;
use crate::Result;

/// Login requirement and session presence, read together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCheck {
    /// The `require_login` preference.
    pub require_login: bool,
    /// A session row exists for the digest.
    pub has_session: bool,
}

impl SessionCheck {
    /// Whether the request may proceed.
    pub fn allowed(&self) -> bool {
        !self.require_login || self.has_session
    }
}

/// Repository for session operations.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new session digest.
    pub async fn create(&self, token_hash: &str) -> Result<()> {
        sqlx::query("INSERT INTO sessions (token_hash) VALUES (?)")
            .bind(token_hash)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Read the login preference and the session for `token_hash` in one
    /// statement.
    pub async fn check(&self, token_hash: &str) -> Result<SessionCheck> {
        let (require_login, has_session): (String, bool) = sqlx::query_as(
            "SELECT COALESCE((SELECT value FROM preferences WHERE key = ?), ?),
                    EXISTS(SELECT 1 FROM sessions WHERE token_hash = ?)",
        )
        .bind(PreferenceKey::RequireLogin.as_str())
        .bind(PreferenceKey::RequireLogin.default_value())
        .bind(token_hash)
        .fetch_one(self.pool)
        .await?;

        Ok(SessionCheck {
            require_login: parse_bool(&require_login)?,
            has_session,
        })
    }

    /// Delete a single session.
    pub async fn delete(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count live sessions.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
