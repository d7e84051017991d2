// src/reconcile.rs
// Partitions one fetched feed cycle against the set of known grant ids:
// known grants get a cheap status update, fresh unknown grants go to full
// ingestion, stale unknown grants are dropped.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::classify;
use crate::feed::FeedEntry;
use crate::models::{IngestCandidate, StatusUpdate};

#[derive(Debug, Default)]
pub struct ReconcilePlan {
    pub status_updates: Vec<StatusUpdate>,
    pub to_ingest: Vec<IngestCandidate>,
    pub skipped_stale: usize,
    pub skipped_invalid: usize,
}

/// Pure partition over the fetched entries. Feed order is preserved. If the
/// feed lists an id twice: a known id keeps the last status seen (last write
/// wins), an unknown id keeps the first ingestion candidate so a grant is
/// enriched at most once per cycle.
pub fn reconcile(
    entries: &[FeedEntry],
    known_ids: &HashSet<String>,
    today: NaiveDate,
    cutoff_days: i64,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let mut status_slots: HashMap<String, usize> = HashMap::new();
    let mut queued_ids: HashSet<String> = HashSet::new();

    for entry in entries {
        let (Some(id), Some(slug)) = (entry.id.as_deref(), entry.value.as_deref()) else {
            plan.skipped_invalid += 1;
            continue;
        };

        let is_open = classify::is_open(&entry.closing_dates, &entry.available);

        if known_ids.contains(id) {
            let update = StatusUpdate { id: id.to_string(), is_open };
            match status_slots.get(id) {
                Some(&slot) => {
                    debug!(id, "duplicate feed entry for known grant; keeping latest status");
                    plan.status_updates[slot] = update;
                }
                None => {
                    status_slots.insert(id.to_string(), plan.status_updates.len());
                    plan.status_updates.push(update);
                }
            }
            continue;
        }

        if !classify::is_recently_updated(entry.updated_at.as_deref(), cutoff_days, today) {
            debug!(id, updated_at = ?entry.updated_at, "skipping stale unseen grant");
            plan.skipped_stale += 1;
            continue;
        }

        if !queued_ids.insert(id.to_string()) {
            debug!(id, "duplicate feed entry for new grant; keeping first candidate");
            continue;
        }

        plan.to_ingest.push(IngestCandidate {
            id: id.to_string(),
            slug: slug.to_string(),
            url: entry.resolve_url(),
        });
    }

    plan
}
