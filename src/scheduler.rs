// src/scheduler.rs
// Bounded fan-out of the expensive path. Each candidate runs as its own tokio
// task gated by a counting semaphore: at most `bound` enrichments in flight,
// an unbounded pending queue, and a wait-for-all join at the end.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::enrich::Enricher;
use crate::models::{IngestCandidate, IngestionOutcome};
use crate::notify::NotificationMatcher;

pub const DEFAULT_CONCURRENCY: usize = 10;

pub struct IngestionScheduler {
    enricher: Arc<dyn Enricher>,
    matcher: Arc<NotificationMatcher>,
    bound: usize,
}

impl IngestionScheduler {
    pub fn new(
        enricher: Arc<dyn Enricher>,
        matcher: Arc<NotificationMatcher>,
        bound: usize,
    ) -> Self {
        Self {
            enricher,
            matcher,
            bound: bound.max(1),
        }
    }

    /// Run every candidate to completion, in any order, never cancelling on
    /// failure. Within one unit the order is strict: enrich, then notify,
    /// then record the outcome; only the enrichment result counts.
    pub async fn run(&self, candidates: Vec<IngestCandidate>) -> Vec<IngestionOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.bound));
        let mut handles = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let id = candidate.id.clone();
            let semaphore = semaphore.clone();
            let enricher = self.enricher.clone();
            let matcher = self.matcher.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("ingestion semaphore closed");

                info!(id = %candidate.id, slug = %candidate.slug, "starting full ingestion");
                let succeeded = match enricher.enrich(&candidate).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = ?e, id = %candidate.id, "enrichment failed");
                        false
                    }
                };

                if succeeded {
                    // Notification problems are logged and absorbed; the
                    // ingestion already happened.
                    if let Err(e) = matcher.notify_for_grant(&candidate.id).await {
                        warn!(error = ?e, id = %candidate.id, "notification matching failed");
                    }
                }

                succeeded
            });
            handles.push((id, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let succeeded = match handle.await {
                Ok(ok) => ok,
                Err(e) => {
                    error!(error = ?e, id = %id, "ingestion task aborted");
                    false
                }
            };
            if succeeded {
                counter!("ingestion_succeeded_total").increment(1);
            } else {
                counter!("ingestion_failed_total").increment(1);
            }
            outcomes.push(IngestionOutcome { id, succeeded });
        }
        outcomes
    }
}
