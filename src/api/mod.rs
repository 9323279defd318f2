//! # API Module
//!
//! Read API over the enriched snapshot.
//!
//! ## Endpoints Overview
//!
//! ### Data
//! - `GET /data/{entity_type}` - Enveloped records (`product`, `user`, `transaction`)
//!
//! ### Insights
//! - `GET /insights/users` - Spending per user
//! - `GET /insights/products` - Most popular category and per-category counts
//! - `GET /insights/transactions` - Average transaction value
//!
//! ### Snapshot
//! - `POST /refresh` - Re-acquire and replace the snapshot
//!
//! ### System Essentials
//! - `GET /health` - Health check
//! - `GET /info` - Service info
//! - `GET /metrics` - Prometheus metrics

pub mod handlers;
pub mod server;

// Re-export commonly used items
pub use server::{create_app, start_server};
