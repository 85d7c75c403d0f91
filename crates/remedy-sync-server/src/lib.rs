//! remedy-sync server library
//!
//! Re-exports the server modules for use by the binary and integration tests.

use std::sync::Arc;

pub mod api;
pub mod db;

/// Shared application state
pub struct AppState {
    /// Families, members and medicines
    pub db: Arc<db::Database>,
}
