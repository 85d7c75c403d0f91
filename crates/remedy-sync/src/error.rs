//! Error types for remedy-sync.
//!
//! This module defines the [`enum@Error`] enum and [`Result`] type alias used throughout
//! the library.
//!
//! # Error Categories
//!
//! - [`Error::Validation`] - An entry was rejected before any mutation happened
//! - [`Error::Storage`] - Local persistent storage failed
//! - [`Error::Remote`] - The family backend could not be reached or refused a call
//! - [`Error::Config`] - Cloud sync is not configured
//! - [`Error::NotInFamily`] - A family operation was attempted without a family context
//! - [`Error::Serialization`] - JSON encoding or decoding failed
//!
//! Remote failures during inventory mutations never reach the caller: the
//! [`InventoryStore`](crate::InventoryStore) logs them and keeps the mutation
//! locally. They only surface from family lifecycle calls such as
//! [`InventoryStore::join_family`](crate::InventoryStore::join_family).
//!
//! Duplicate entries are not errors; see [`AddOutcome`](crate::AddOutcome).

use std::sync::Arc;
use thiserror::Error;

/// Result type alias for remedy-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in remedy-sync operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The entry failed validation
    #[error("invalid entry: {0}")]
    Validation(Arc<str>),

    /// Local storage operation failed
    #[error("storage error: {0}")]
    Storage(Arc<str>),

    /// The family backend call failed
    #[error("remote call failed: {0}")]
    Remote(Arc<str>),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(Arc<str>),

    /// No family context is active
    #[error("not a member of any family")]
    NotInFamily,

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(Arc<str>),
}

impl Error {
    /// Create a validation error
    #[inline]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(Arc::from(msg.into()))
    }

    /// Create a storage error
    #[inline]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(Arc::from(msg.into()))
    }

    /// Create a remote error
    #[inline]
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(Arc::from(msg.into()))
    }

    /// Create a configuration error
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(Arc::from(msg.into()))
    }

    /// Create a serialization error
    #[inline]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(Arc::from(msg.into()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
