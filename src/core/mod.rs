//! Core types and error handling shared across the crate.

pub mod error;

pub use error::{ErrorContext, OpsCloneError, user_friendly_error};

/// Result alias for operations that fail with [`OpsCloneError`].
pub type Result<T> = std::result::Result<T, OpsCloneError>;
