//! Core system types and foundations
//!
//! Type definitions, error handling, configuration and the snapshot handle
//! shared by the pipeline, the sources and the API.

pub mod app_state;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod types;

// Re-export commonly used items
pub use app_state::AppState;
pub use config::Config;
pub use error::{EnvelopeError, Error, Result, SourceError};
pub use snapshot::{Snapshot, SnapshotStore, SnapshotSummary};
pub use types::{EntityType, Envelope, Payload, Provenance};
