//! Application State Management
//!
//! The central AppState handed to every request handler.

use crate::core::config::Config;
use crate::core::snapshot::SnapshotStore;
use std::sync::Arc;
use std::time::Instant;

/// Central application state holding all services and components
#[derive(Clone)]
pub struct AppState {
    /// Snapshot handle and its data source
    pub store: Arc<SnapshotStore>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState around an initialised store
    pub fn new(store: Arc<SnapshotStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}
