//! Test helpers for integration tests.
//!
//! Provides an in-memory ContentStore and a router-backed test server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use axum::http::header::SET_COOKIE;
use axum_test::{TestResponse, TestServer};
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use fileshare::config::FilesConfig;
use fileshare::storage::{
    guess_mime, ContentNode, ContentReader, ContentSink, ContentStore, NewContent, StorageError,
    StorageResult,
};
use fileshare::web::{create_router, AppState, SESSION_COOKIE};
use fileshare::{ContentRegistry, Database, SessionManager};

#[derive(Debug, Clone)]
enum Entry {
    Leaf {
        name: String,
        mime_type: String,
        data: Vec<u8>,
    },
    Container {
        name: String,
        children: Vec<String>,
    },
    /// A container whose enumeration always fails.
    Broken { name: String },
    /// A leaf whose reader never yields a byte.
    Stalled { name: String, mime_type: String },
}

/// In-memory storage collaborator.
///
/// References are arbitrary strings; containers may reference each other in
/// cycles.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_leaf(&self, reference: &str, name: &str, mime_type: &str, data: &[u8]) {
        self.entries.lock().unwrap().insert(
            reference.to_string(),
            Entry::Leaf {
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                data: data.to_vec(),
            },
        );
    }

    pub fn add_container(&self, reference: &str, name: &str, children: &[&str]) {
        self.entries.lock().unwrap().insert(
            reference.to_string(),
            Entry::Container {
                name: name.to_string(),
                children: children.iter().map(|c| c.to_string()).collect(),
            },
        );
    }

    pub fn add_broken_container(&self, reference: &str, name: &str) {
        self.entries.lock().unwrap().insert(
            reference.to_string(),
            Entry::Broken {
                name: name.to_string(),
            },
        );
    }

    pub fn add_stalled_leaf(&self, reference: &str, name: &str, mime_type: &str) {
        self.entries.lock().unwrap().insert(
            reference.to_string(),
            Entry::Stalled {
                name: name.to_string(),
                mime_type: mime_type.to_string(),
            },
        );
    }

    pub fn remove(&self, reference: &str) {
        self.entries.lock().unwrap().remove(reference);
    }

    /// Bytes stored under a leaf reference.
    pub fn contents(&self, reference: &str) -> Option<Vec<u8>> {
        match self.entries.lock().unwrap().get(reference) {
            Some(Entry::Leaf { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    fn get(&self, reference: &str) -> StorageResult<Entry> {
        self.entries
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))
    }
}

impl ContentStore for MemoryStore {
    fn stat<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, StorageResult<ContentNode>> {
        Box::pin(async move {
            Ok(match self.get(reference)? {
                Entry::Leaf {
                    name,
                    mime_type,
                    data,
                } => ContentNode::Leaf {
                    name,
                    mime_type,
                    size: Some(data.len() as u64),
                },
                Entry::Stalled { name, mime_type } => ContentNode::Leaf {
                    name,
                    mime_type,
                    size: None,
                },
                Entry::Container { name, .. } | Entry::Broken { name } => {
                    ContentNode::Container { name }
                }
            })
        })
    }

    fn list<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, StorageResult<Vec<String>>> {
        Box::pin(async move {
            match self.get(reference)? {
                Entry::Container { children, .. } => Ok(children),
                Entry::Broken { .. } => Err(StorageError::Io(io::Error::other("enumeration failed"))),
                Entry::Leaf { .. } | Entry::Stalled { .. } => {
                    Err(StorageError::NotAContainer(reference.to_string()))
                }
            }
        })
    }

    fn open<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, StorageResult<ContentReader>> {
        Box::pin(async move {
            match self.get(reference)? {
                Entry::Leaf { data, .. } => Ok(Box::new(io::Cursor::new(data)) as ContentReader),
                Entry::Stalled { .. } => Ok(Box::new(StalledReader) as ContentReader),
                _ => Err(StorageError::NotFound(reference.to_string())),
            }
        })
    }

    fn create<'a>(
        &'a self,
        container: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, StorageResult<NewContent>> {
        Box::pin(async move {
            match self.get(container)? {
                Entry::Container { .. } => {}
                _ => return Err(StorageError::NotAContainer(container.to_string())),
            }

            let reference = format!("{container}/{name}");
            Ok(NewContent {
                storage_ref: reference.clone(),
                sink: Box::new(MemorySink {
                    entries: self.entries.clone(),
                    container: container.to_string(),
                    reference,
                    name: name.to_string(),
                    buffer: Vec::new(),
                }),
            })
        })
    }
}

/// Reader that stays pending forever.
struct StalledReader;

impl AsyncRead for StalledReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

struct MemorySink {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    container: String,
    reference: String,
    name: String,
    buffer: Vec<u8>,
}

impl AsyncWrite for MemorySink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buffer.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl ContentSink for MemorySink {
    fn commit(self: Box<Self>) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().unwrap();
            if let Some(Entry::Container { children, .. }) = entries.get_mut(&self.container) {
                if !children.contains(&self.reference) {
                    children.push(self.reference.clone());
                }
            }
            entries.insert(
                self.reference.clone(),
                Entry::Leaf {
                    mime_type: guess_mime(&self.name),
                    name: self.name.clone(),
                    data: self.buffer.clone(),
                },
            );
            Ok(())
        })
    }
}

/// Router-backed application under test.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub registry: ContentRegistry,
    pub sessions: Arc<SessionManager>,
    pub store: MemoryStore,
}

/// Create a test app with an in-memory database and store.
pub async fn create_test_app() -> TestApp {
    create_test_app_with_files(&FilesConfig::default()).await
}

/// Create a test app with the given files configuration.
pub async fn create_test_app_with_files(files_config: &FilesConfig) -> TestApp {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");

    let registry = ContentRegistry::new(db.pool().clone());
    let sessions = Arc::new(SessionManager::new(db.pool().clone()));
    let store = MemoryStore::new();

    let app_state = Arc::new(AppState::new(
        registry.clone(),
        sessions.clone(),
        Arc::new(store.clone()),
    ));
    let router = create_router(app_state, files_config);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        db,
        registry,
        sessions,
        store,
    }
}

/// `Cookie` header value for a session token.
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}")
}

/// Session token set by a response, if any.
pub fn set_cookie_token(response: &TestResponse) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix(&format!("{SESSION_COOKIE}=")).map(str::to_string))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
}

/// Full Set-Cookie header for the session cookie.
pub fn set_cookie_header(response: &TestResponse) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .map(str::to_string)
}

/// Configure a password, require login, and log in through the router.
pub async fn login_as(app: &TestApp, password: &str) -> String {
    app.sessions.set_password(password).await.unwrap();
    app.sessions.set_require_login(true).await.unwrap();

    let response = app
        .server
        .post("/login")
        .form(&[("password", password)])
        .await;
    set_cookie_token(&response).expect("login did not set a session cookie")
}
