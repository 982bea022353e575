//! FileShare - share files and folders with devices on the local network.
//!
//! A background HTTP service exposes a persistent registry of shared
//! folders. Access can be gated by a single shared password with cookie
//! sessions, and uploads into shared folders can be enabled.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod net;
pub mod registry;
pub mod service;
pub mod storage;
pub mod web;

pub use auth::{AccessConfig, SessionManager};
pub use config::Config;
pub use db::Database;
pub use error::{FileShareError, Result};
pub use ingest::{IngestReport, Ingestor};
pub use registry::{ContentRegistry, Folder, NewSharedFile, SharedFile};
pub use service::FileShareService;
pub use storage::{ContentNode, ContentStore, LocalContentStore, StorageError};
pub use web::{ServiceState, WebServer};
