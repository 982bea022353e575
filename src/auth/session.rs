//! Cookie session management against the single shared password.
//!
//! Tokens are 256 random bits, hex encoded. Only their SHA-256 digest is
//! persisted, so a leaked database does not leak live cookies.

use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::password::{hash_password, verify_password, PasswordError};
use crate::db::{DbPool, PreferenceKey, PreferenceRepository, SessionRepository};
use crate::{FileShareError, Result};

/// Token length in bytes.
pub const TOKEN_BYTES: usize = 32;

/// Access settings as seen by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessConfig {
    /// Listing and downloads require a session.
    pub require_login: bool,
    /// Clients may upload into shared folders.
    pub allow_uploads: bool,
    /// A password is configured.
    pub has_password: bool,
}

/// Issues, validates and revokes sessions.
pub struct SessionManager {
    pool: DbPool,
    /// Serializes login and password changes.
    write_lock: Mutex<()>,
}

impl SessionManager {
    /// Create a new session manager over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Log in with the shared password and return a new session token.
    pub async fn login(&self, supplied: &str) -> Result<String> {
        let _guard = self.write_lock.lock().await;

        let stored = PreferenceRepository::new(&self.pool)
            .get(PreferenceKey::Password)
            .await?;
        if stored.is_empty() {
            warn!("Login attempted but no password is configured");
            return Err(FileShareError::InvalidCredentials);
        }

        let supplied = supplied.to_string();
        let matches = run_blocking(move || verify_password(&supplied, &stored)).await;
        match matches {
            Ok(()) => {}
            Err(PasswordError::VerificationFailed) => {
                warn!("Login failed: wrong password");
                return Err(FileShareError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        }

        let token = generate_token();
        SessionRepository::new(&self.pool)
            .create(&hash_token(&token))
            .await?;

        info!("Session created");
        Ok(token)
    }

    /// Drop the session for `token`, if any.
    pub async fn logout(&self, token: &str) -> Result<()> {
        if !is_well_formed(token) {
            return Ok(());
        }
        if SessionRepository::new(&self.pool)
            .delete(&hash_token(token))
            .await?
        {
            info!("Session closed");
        }
        Ok(())
    }

    /// Whether a request carrying `token` may proceed.
    ///
    /// Always true while login is not required. The preference and the
    /// session row are read in one statement.
    pub async fn authorize(&self, token: Option<&str>) -> Result<bool> {
        let digest = token
            .filter(|t| is_well_formed(t))
            .map(hash_token)
            .unwrap_or_default();

        let check = SessionRepository::new(&self.pool).check(&digest).await?;
        if !check.allowed() {
            debug!(has_token = token.is_some(), "Request not authorized");
        }
        Ok(check.allowed())
    }

    /// Drop every live session.
    pub async fn invalidate_all(&self) -> Result<u64> {
        let count = SessionRepository::new(&self.pool).delete_all().await?;
        info!(count, "All sessions invalidated");
        Ok(count)
    }

    /// Replace the shared password. An empty password clears it.
    ///
    /// When the password actually changes, every session is dropped in the
    /// same transaction. Returns whether it changed.
    pub async fn set_password(&self, new_password: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let old = PreferenceRepository::new(&self.pool)
            .get(PreferenceKey::Password)
            .await?;

        let new_hash = if new_password.is_empty() {
            if old.is_empty() {
                return Ok(false);
            }
            String::new()
        } else {
            let candidate = new_password.to_string();
            let previous = old.clone();
            let unchanged = !previous.is_empty()
                && run_blocking(move || verify_password(&candidate, &previous))
                    .await
                    .is_ok();
            if unchanged {
                debug!("Password unchanged");
                return Ok(false);
            }

            let candidate = new_password.to_string();
            run_blocking(move || hash_password(&candidate)).await?
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(PreferenceKey::Password.as_str())
        .bind(&new_hash)
        .execute(&mut *tx)
        .await?;
        let dropped = sqlx::query("DELETE FROM sessions")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        info!(sessions_dropped = dropped, cleared = new_hash.is_empty(), "Password changed");
        Ok(true)
    }

    /// Toggle whether login is required.
    pub async fn set_require_login(&self, value: bool) -> Result<()> {
        PreferenceRepository::new(&self.pool)
            .set_bool(PreferenceKey::RequireLogin, value)
            .await?;
        info!(require_login = value, "Access setting updated");
        Ok(())
    }

    /// Toggle whether uploads are accepted.
    pub async fn set_allow_uploads(&self, value: bool) -> Result<()> {
        PreferenceRepository::new(&self.pool)
            .set_bool(PreferenceKey::AllowUploads, value)
            .await?;
        info!(allow_uploads = value, "Access setting updated");
        Ok(())
    }

    /// Whether uploads are currently accepted.
    pub async fn allow_uploads(&self) -> Result<bool> {
        PreferenceRepository::new(&self.pool)
            .get_bool(PreferenceKey::AllowUploads)
            .await
    }

    /// Current access settings.
    pub async fn access_config(&self) -> Result<AccessConfig> {
        let prefs = PreferenceRepository::new(&self.pool);
        Ok(AccessConfig {
            require_login: prefs.get_bool(PreferenceKey::RequireLogin).await?,
            allow_uploads: prefs.get_bool(PreferenceKey::AllowUploads).await?,
            has_password: !prefs.get(PreferenceKey::Password).await?.is_empty(),
        })
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> Result<i64> {
        SessionRepository::new(&self.pool).count().await
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

/// Argon2 is CPU bound; keep it off the async workers.
async fn run_blocking<T, F>(f: F) -> std::result::Result<T, PasswordError>
where
    F: FnOnce() -> std::result::Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PasswordError::HashError(e.to_string()))?
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup() -> (Database, SessionManager) {
        let db = Database::open_in_memory().await.unwrap();
        let manager = SessionManager::new(db.pool().clone());
        (db, manager)
    }

    #[test]
    fn test_generate_token_format() {
        let token = generate_token();
        assert!(is_well_formed(&token));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_is_well_formed() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abc"));
        assert!(!is_well_formed(&"G".repeat(64)));
        assert!(is_well_formed(&"0a".repeat(32)));
    }

    #[tokio::test]
    async fn test_login_without_password_fails() {
        let (_db, manager) = setup().await;
        assert!(matches!(
            manager.login("").await,
            Err(FileShareError::InvalidCredentials)
        ));
        assert!(matches!(
            manager.login("anything").await,
            Err(FileShareError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_and_authorize() {
        let (_db, manager) = setup().await;
        manager.set_password("a").await.unwrap();
        manager.set_require_login(true).await.unwrap();

        assert!(matches!(
            manager.login("wrong").await,
            Err(FileShareError::InvalidCredentials)
        ));

        let token = manager.login("a").await.unwrap();
        assert!(manager.authorize(Some(&token)).await.unwrap());
        assert!(!manager.authorize(None).await.unwrap());
        assert!(!manager.authorize(Some("forged")).await.unwrap());
    }

    #[tokio::test]
    async fn test_authorize_without_require_login() {
        let (_db, manager) = setup().await;
        assert!(manager.authorize(None).await.unwrap());
        assert!(manager.authorize(Some("garbage")).await.unwrap());
    }

    #[tokio::test]
    async fn test_password_change_invalidates_sessions() {
        let (_db, manager) = setup().await;
        manager.set_password("a").await.unwrap();
        manager.set_require_login(true).await.unwrap();
        let old_token = manager.login("a").await.unwrap();

        assert!(manager.set_password("b").await.unwrap());
        assert!(!manager.authorize(Some(&old_token)).await.unwrap());

        let new_token = manager.login("b").await.unwrap();
        assert!(manager.authorize(Some(&new_token)).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_keeps_sessions() {
        let (_db, manager) = setup().await;
        manager.set_password("a").await.unwrap();
        manager.set_require_login(true).await.unwrap();
        let token = manager.login("a").await.unwrap();

        assert!(!manager.set_password("a").await.unwrap());
        assert!(manager.authorize(Some(&token)).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_password() {
        let (_db, manager) = setup().await;
        manager.set_password("a").await.unwrap();
        let _token = manager.login("a").await.unwrap();

        assert!(manager.set_password("").await.unwrap());
        assert_eq!(manager.session_count().await.unwrap(), 0);
        assert!(!manager.access_config().await.unwrap().has_password);
        assert!(!manager.set_password("").await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_and_invalidate_all() {
        let (_db, manager) = setup().await;
        manager.set_password("a").await.unwrap();
        manager.set_require_login(true).await.unwrap();

        let first = manager.login("a").await.unwrap();
        let second = manager.login("a").await.unwrap();

        manager.logout(&first).await.unwrap();
        assert!(!manager.authorize(Some(&first)).await.unwrap());
        assert!(manager.authorize(Some(&second)).await.unwrap());

        assert_eq!(manager.invalidate_all().await.unwrap(), 1);
        assert!(!manager.authorize(Some(&second)).await.unwrap());
    }

    #[tokio::test]
    async fn test_access_config_defaults_and_toggles() {
        let (_db, manager) = setup().await;
        assert_eq!(
            manager.access_config().await.unwrap(),
            AccessConfig {
                require_login: false,
                allow_uploads: false,
                has_password: false,
            }
        );

        manager.set_allow_uploads(true).await.unwrap();
        assert!(manager.allow_uploads().await.unwrap());
    }
}
