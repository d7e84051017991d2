// src/notify/mod.rs
// Subscriber matching and the notification seam. The matcher is invoked once
// per freshly-enriched grant; its failures never change ingestion outcomes.

pub mod email;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::models::Grant;
use crate::store::GrantStore;

/// Display fields of one grant, as rendered into a notification.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GrantDigest {
    pub name: String,
    pub agency_name: String,
    pub max_funding: Option<i64>,
    pub strategic_intent: Option<String>,
    pub original_url: String,
}

impl From<&Grant> for GrantDigest {
    fn from(grant: &Grant) -> Self {
        Self {
            name: grant.name.clone(),
            agency_name: grant.agency_name.clone(),
            max_funding: grant.max_funding,
            strategic_intent: grant.strategic_intent.clone(),
            original_url: grant.original_url.clone(),
        }
    }
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver one notification. An `Err` leaves the subscriber unstamped so
    /// a later cycle may reach them again.
    async fn send(&self, email: &str, org_name: &str, grants: &[GrantDigest]) -> Result<()>;
}

/// Cosine similarity in f64, 0.0 when either vector is degenerate.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Finds subscribers whose preferences match a newly ingested grant and
/// notifies each one, stamping `last_notified_at` only for successful sends.
pub struct NotificationMatcher {
    store: Arc<dyn GrantStore>,
    sender: Arc<dyn NotificationSender>,
    similarity_threshold: f64,
}

impl NotificationMatcher {
    pub fn new(
        store: Arc<dyn GrantStore>,
        sender: Arc<dyn NotificationSender>,
        similarity_threshold: f64,
    ) -> Self {
        Self {
            store,
            sender,
            similarity_threshold,
        }
    }

    /// Returns the number of notifications successfully sent for this grant.
    pub async fn notify_for_grant(&self, grant_id: &str) -> Result<usize> {
        let Some(grant) = self.store.load_grant(grant_id).await? else {
            // Tolerated race: the enrichment write may not be visible yet.
            info!(grant_id, "grant not found for notification matching");
            return Ok(0);
        };

        let matches = self.store.similar_subscriptions(&grant.embedding).await?;
        let digest = GrantDigest::from(&grant);
        let mut notified = Vec::new();

        for candidate in matches {
            if candidate.similarity <= self.similarity_threshold {
                // Ranked descending; everything past here is below threshold.
                break;
            }
            let sub = candidate.subscription;
            match self
                .sender
                .send(&sub.email, &sub.organization_name, std::slice::from_ref(&digest))
                .await
            {
                Ok(()) => notified.push(sub.id),
                Err(e) => {
                    warn!(error = ?e, email = %sub.email, grant_id, "notification send failed");
                }
            }
        }

        if !notified.is_empty() {
            self.store.mark_notified(&notified, Utc::now()).await?;
        }
        info!(grant_id, sent = notified.len(), "notification matching done");
        Ok(notified.len())
    }
}
