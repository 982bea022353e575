//! File server lifecycle.
//!
//! The server runs as a background task independent of any front end.
//! States move `Stopped -> Starting -> Running -> Stopping -> Stopped`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{FilesConfig, ServerConfig};
use crate::{FileShareError, Result};

use super::handlers::AppState;
use super::router::create_router;
use super::shutdown::ForceClose;

/// How long forcibly closed requests get to unwind before the server task is
/// aborted.
const FORCE_CLOSE_WAIT: Duration = Duration::from_secs(1);

/// Lifecycle state of the file server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Not accepting connections.
    Stopped,
    /// Binding the listener.
    Starting,
    /// Accepting connections.
    Running,
    /// Draining in-flight requests.
    Stopping,
}

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    force: CancellationToken,
    handle: JoinHandle<()>,
}

/// HTTP file server that can be started and stopped repeatedly.
pub struct WebServer {
    /// Address to bind.
    addr: SocketAddr,
    /// Router shared by every run.
    router: Router,
    /// Cuts off requests still running after the grace period.
    force_close: Arc<ForceClose>,
    /// How long in-flight requests may drain on stop.
    grace: Duration,
    /// Observable state.
    state: watch::Sender<ServiceState>,
    /// Serializes start and stop.
    running: Mutex<Option<RunningServer>>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(
        config: &ServerConfig,
        files_config: &FilesConfig,
        app_state: Arc<AppState>,
    ) -> Result<Self> {
        let ip: IpAddr = config
            .host
            .parse()
            .map_err(|e| FileShareError::Config(format!("invalid host {:?}: {}", config.host, e)))?;

        Ok(Self {
            addr: SocketAddr::new(ip, config.port),
            force_close: app_state.force_close.clone(),
            router: create_router(app_state, files_config),
            grace: Duration::from_secs(config.shutdown_grace_secs),
            state: watch::channel(ServiceState::Stopped).0,
            running: Mutex::new(None),
        })
    }

    /// Configured bind address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Current state.
    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// Address actually bound, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Bind the listener and start serving.
    ///
    /// Returns the bound address. Calling this while running returns the
    /// existing address. A bind failure is returned as-is and leaves the
    /// server stopped.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(server) = running.as_ref() {
            tracing::debug!("File server already running on {}", server.local_addr);
            return Ok(server.local_addr);
        }

        self.state.send_replace(ServiceState::Starting);

        let bound = match TcpListener::bind(self.addr).await {
            Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
            Err(e) => Err(e),
        };
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                self.state.send_replace(ServiceState::Stopped);
                tracing::error!(addr = %self.addr, error = %source, "Failed to bind file server");
                return Err(FileShareError::Bind {
                    addr: self.addr,
                    source,
                });
            }
        };

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let force = self.force_close.rearm();
        let router = self.router.clone();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await;
            if let Err(e) = result {
                tracing::error!("File server error: {}", e);
            }
        });

        *running = Some(RunningServer {
            local_addr,
            shutdown,
            force,
            handle,
        });
        self.state.send_replace(ServiceState::Running);

        tracing::info!("File server listening on http://{}", local_addr);
        Ok(local_addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// Requests still running after the grace period are forcibly closed.
    /// Calling this while stopped does nothing.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(server) = running.take() else {
            return;
        };

        self.state.send_replace(ServiceState::Stopping);
        server.shutdown.cancel();

        let mut handle = server.handle;
        match tokio::time::timeout(self.grace, &mut handle).await {
            Ok(Ok(())) => tracing::info!("File server stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "File server task ended abnormally"),
            Err(_) => {
                tracing::warn!(
                    grace_secs = self.grace.as_secs(),
                    "In-flight requests did not finish in time, closing them"
                );
                server.force.cancel();
                if tokio::time::timeout(FORCE_CLOSE_WAIT, &mut handle).await.is_err() {
                    tracing::error!("File server did not wind down, aborting");
                    handle.abort();
                }
            }
        }

        self.state.send_replace(ServiceState::Stopped);
    }
}

impl Drop for WebServer {
    fn drop(&mut self) {
        if let Some(server) = self.running.get_mut().take() {
            server.shutdown.cancel();
            server.force.cancel();
        }
    }
}

impl std::fmt::Debug for WebServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebServer")
            .field("addr", &self.addr)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
