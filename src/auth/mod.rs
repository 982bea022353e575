//! Authentication module for FileShare.
//!
//! This module provides password hashing and cookie session management
//! for the single shared access password.

mod password;
mod session;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
};
pub use session::{AccessConfig, SessionManager, TOKEN_BYTES};
