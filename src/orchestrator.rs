// src/orchestrator.rs
// End-to-end reconciliation run. Only a feed fetch failure is fatal; every
// other stage degrades and shows up, at most, as lower counts in the summary.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{error, info, warn};

use crate::feed::FeedSource;
use crate::models::RunSummary;
use crate::reconcile;
use crate::scheduler::IngestionScheduler;
use crate::store::GrantStore;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingestion_runs_total", "Reconciliation runs triggered.");
        describe_counter!(
            "ingestion_succeeded_total",
            "New grants fully ingested successfully."
        );
        describe_counter!("ingestion_failed_total", "New grants whose ingestion failed.");
        describe_counter!(
            "status_updates_total",
            "Known grants whose is_open flag was refreshed."
        );
        describe_gauge!("ingestion_last_run_ts", "Unix ts of the last run.");
    });
}

pub struct Orchestrator {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn GrantStore>,
    scheduler: IngestionScheduler,
    recency_cutoff_days: i64,
}

impl Orchestrator {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn GrantStore>,
        scheduler: IngestionScheduler,
        recency_cutoff_days: i64,
    ) -> Self {
        Self {
            feed,
            store,
            scheduler,
            recency_cutoff_days,
        }
    }

    /// One full reconciliation cycle. The returned `Err` maps to the 500
    /// response; it can only come from the feed fetch itself.
    pub async fn run(&self) -> Result<RunSummary> {
        ensure_metrics_described();
        counter!("ingestion_runs_total").increment(1);
        let now = Utc::now();
        gauge!("ingestion_last_run_ts").set(now.timestamp() as f64);

        let entries = self
            .feed
            .fetch()
            .await
            .context("fetching the grants feed")?;
        info!(entries = entries.len(), "fetched grants feed");

        let known_ids = match self.store.known_grant_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                // Fail-safe: treat everything as new rather than lose data.
                // Enrichment is idempotent per id, so the cost is duplicate work.
                warn!(error = ?e, "could not load known grant ids; treating all records as new");
                HashSet::new()
            }
        };

        let plan = reconcile::reconcile(
            &entries,
            &known_ids,
            now.date_naive(),
            self.recency_cutoff_days,
        );
        info!(
            fast_path = plan.status_updates.len(),
            full_ingestion = plan.to_ingest.len(),
            skipped_stale = plan.skipped_stale,
            skipped_invalid = plan.skipped_invalid,
            "reconciled feed against store"
        );

        // Fast path commits as one unit before any full-ingestion task starts,
        // so status writes and new-grant writes never interleave for one id.
        let status_updated = match self.store.apply_status_updates(&plan.status_updates).await {
            Ok(n) => {
                counter!("status_updates_total").increment(n as u64);
                n
            }
            Err(e) => {
                error!(error = ?e, "fast-path status update failed; continuing to full ingestion");
                0
            }
        };

        if plan.to_ingest.is_empty() {
            return Ok(RunSummary::from_outcomes(&[], status_updated));
        }

        let outcomes = self.scheduler.run(plan.to_ingest).await;
        let summary = RunSummary::from_outcomes(&outcomes, status_updated);
        info!(
            new_processed = summary.new_processed,
            new_succeeded = summary.new_succeeded,
            new_failed = summary.new_failed,
            status_updated = summary.status_updated,
            "reconciliation run complete"
        );
        Ok(summary)
    }
}
