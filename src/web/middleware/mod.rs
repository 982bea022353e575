//! Middleware for the file server.

pub mod auth;

pub use auth::{session_token, Authorized, SESSION_COOKIE};
