//! Application wiring.
//!
//! [`FileShareService`] owns the database and every component built on it,
//! and is what front ends drive.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::auth::SessionManager;
use crate::config::Config;
use crate::db::{PreferenceKey, PreferenceRepository};
use crate::ingest::Ingestor;
use crate::registry::ContentRegistry;
use crate::storage::ContentStore;
use crate::web::{AppState, ServiceState, WebServer};
use crate::{Database, Result};

/// The file sharing service and its collaborators.
pub struct FileShareService {
    db: Database,
    registry: ContentRegistry,
    sessions: Arc<SessionManager>,
    ingestor: Ingestor,
    server: WebServer,
}

impl FileShareService {
    /// Open the configured database and build the service.
    pub async fn open(config: &Config, store: Arc<dyn ContentStore>) -> Result<Self> {
        let db = Database::open(&config.database.path).await?;
        Self::with_database(db, config, store)
    }

    /// Build the service over an already opened database.
    pub fn with_database(
        db: Database,
        config: &Config,
        store: Arc<dyn ContentStore>,
    ) -> Result<Self> {
        let registry = ContentRegistry::new(db.pool().clone());
        let sessions = Arc::new(SessionManager::new(db.pool().clone()));
        let ingestor = Ingestor::new(registry.clone(), store.clone(), config.ingest.max_depth);

        let app_state = Arc::new(AppState::new(registry.clone(), sessions.clone(), store));
        let server = WebServer::new(&config.server, &config.files, app_state)?;

        Ok(Self {
            db,
            registry,
            sessions,
            ingestor,
            server,
        })
    }

    /// Content registry.
    pub fn registry(&self) -> &ContentRegistry {
        &self.registry
    }

    /// Session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Folder ingestion.
    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// The HTTP server.
    pub fn server(&self) -> &WebServer {
        &self.server
    }

    /// Start the HTTP server.
    pub async fn start(&self) -> Result<SocketAddr> {
        self.server.start().await
    }

    /// Stop the HTTP server.
    pub async fn stop(&self) {
        self.server.stop().await
    }

    /// Current server state.
    pub fn state(&self) -> ServiceState {
        self.server.state()
    }

    /// Whether the front end should start the server on launch.
    pub async fn run_on_startup(&self) -> Result<bool> {
        PreferenceRepository::new(self.db.pool())
            .get_bool(PreferenceKey::ServiceOnStartup)
            .await
    }

    /// Set whether the front end should start the server on launch.
    pub async fn set_run_on_startup(&self, value: bool) -> Result<()> {
        PreferenceRepository::new(self.db.pool())
            .set_bool(PreferenceKey::ServiceOnStartup, value)
            .await?;
        info!(run_on_startup = value, "Startup preference updated");
        Ok(())
    }

    /// Stop the server and close the database.
    pub async fn shutdown(self) {
        self.server.stop().await;
        self.db.close().await;
    }
}

impl std::fmt::Debug for FileShareService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileShareService")
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}
