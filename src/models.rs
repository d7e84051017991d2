// src/models.rs
// Persistent and per-invocation record shapes shared across the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A grant as persisted by the enrichment collaborator. This engine only
/// ever mutates `is_open`; every other field is written once at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    pub name: String,
    pub agency_name: String,
    pub max_funding: Option<i64>,
    pub strategic_intent: Option<String>,
    pub original_url: String,
    pub is_open: bool,
    pub embedding: Vec<f32>,
}

/// An email subscription with a preference embedding for semantic matching.
/// Lifecycle is managed elsewhere; this engine only reads matches and stamps
/// `last_notified_at` after a successful send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub email: String,
    pub organization_name: String,
    pub preference_embedding: Option<Vec<f32>>,
    pub is_active: bool,
    pub last_notified_at: Option<DateTime<Utc>>,
}

/// Fast-path write: flip `is_open` on an already-known grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub id: String,
    pub is_open: bool,
}

/// Expensive-path work item: a grant the store has never seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestCandidate {
    pub id: String,
    pub slug: String,
    pub url: Option<String>,
}

/// Per-candidate result of one scheduler unit. `succeeded` reflects the
/// enrichment call only; notification failures never flip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOutcome {
    pub id: String,
    pub succeeded: bool,
}

/// Invocation summary returned by the HTTP trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub new_processed: usize,
    pub new_succeeded: usize,
    pub new_failed: usize,
    pub status_updated: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[IngestionOutcome], status_updated: usize) -> Self {
        let new_succeeded = outcomes.iter().filter(|o| o.succeeded).count();
        Self {
            new_processed: outcomes.len(),
            new_succeeded,
            new_failed: outcomes.len() - new_succeeded,
            status_updated,
        }
    }
}
