// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod classify;
pub mod config;
pub mod enrich;
pub mod feed;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod reconcile;
pub mod scheduler;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::models::{Grant, IngestCandidate, IngestionOutcome, RunSummary, Subscription};
pub use crate::orchestrator::Orchestrator;
