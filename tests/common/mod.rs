// tests/common/mod.rs
// In-memory fakes for the orchestrator's collaborator seams.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use grant_radar::feed::{FeedEntry, FeedSource};
use grant_radar::enrich::Enricher;
use grant_radar::models::{Grant, IngestCandidate, StatusUpdate, Subscription};
use grant_radar::notify::{cosine_similarity, GrantDigest, NotificationSender};
use grant_radar::store::{GrantStore, SubscriptionMatch};

pub fn feed_entry(id: &str, slug: &str, closing: &[(&str, &str)]) -> FeedEntry {
    FeedEntry {
        id: Some(id.to_string()),
        value: Some(slug.to_string()),
        closing_dates: closing
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect(),
        ..Default::default()
    }
}

pub fn grant(id: &str, embedding: Vec<f32>) -> Grant {
    Grant {
        id: id.to_string(),
        name: format!("Grant {id}"),
        agency_name: "Test Agency".into(),
        max_funding: Some(10_000),
        strategic_intent: Some("test intent".into()),
        original_url: format!("https://example.gov/{id}"),
        is_open: true,
        embedding,
    }
}

pub fn subscription(id: &str, email: &str, embedding: Option<Vec<f32>>) -> Subscription {
    Subscription {
        id: id.to_string(),
        email: email.to_string(),
        organization_name: format!("Org {id}"),
        preference_embedding: embedding,
        is_active: true,
        last_notified_at: None,
    }
}

// ---- Feed fakes ----

pub struct StaticFeed(pub Vec<FeedEntry>);

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> Result<Vec<FeedEntry>> {
        Ok(self.0.clone())
    }
}

pub struct FailingFeed;

#[async_trait]
impl FeedSource for FailingFeed {
    async fn fetch(&self) -> Result<Vec<FeedEntry>> {
        bail!("feed unreachable")
    }
}

// ---- Store fake ----

#[derive(Default)]
pub struct InMemoryStore {
    pub grants: Mutex<HashMap<String, Grant>>,
    pub subscriptions: Mutex<Vec<Subscription>>,
    pub status_writes: Mutex<Vec<StatusUpdate>>,
    pub notified: Mutex<Vec<(String, DateTime<Utc>)>>,
    pub fail_known_ids: bool,
    pub fail_status_updates: bool,
    pub fail_load_grant: bool,
}

impl InMemoryStore {
    pub fn with_grants(grants: impl IntoIterator<Item = Grant>) -> Self {
        let store = Self::default();
        {
            let mut map = store.grants.lock().unwrap();
            for g in grants {
                map.insert(g.id.clone(), g);
            }
        }
        store
    }
}

#[async_trait]
impl GrantStore for InMemoryStore {
    async fn known_grant_ids(&self) -> Result<HashSet<String>> {
        if self.fail_known_ids {
            bail!("known-id read failed")
        }
        Ok(self.grants.lock().unwrap().keys().cloned().collect())
    }

    async fn apply_status_updates(&self, updates: &[StatusUpdate]) -> Result<usize> {
        if self.fail_status_updates {
            bail!("status commit failed")
        }
        let mut grants = self.grants.lock().unwrap();
        for update in updates {
            if let Some(grant) = grants.get_mut(&update.id) {
                grant.is_open = update.is_open;
            }
        }
        self.status_writes.lock().unwrap().extend_from_slice(updates);
        Ok(updates.len())
    }

    async fn load_grant(&self, id: &str) -> Result<Option<Grant>> {
        if self.fail_load_grant {
            bail!("grant read failed")
        }
        Ok(self.grants.lock().unwrap().get(id).cloned())
    }

    async fn similar_subscriptions(&self, embedding: &[f32]) -> Result<Vec<SubscriptionMatch>> {
        let mut matches: Vec<SubscriptionMatch> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.is_active)
            .filter_map(|s| {
                s.preference_embedding.as_ref().map(|pref| SubscriptionMatch {
                    subscription: s.clone(),
                    similarity: cosine_similarity(pref, embedding),
                })
            })
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(matches)
    }

    async fn mark_notified(&self, subscription_ids: &[String], at: DateTime<Utc>) -> Result<()> {
        let mut notified = self.notified.lock().unwrap();
        for id in subscription_ids {
            notified.push((id.clone(), at));
        }
        let mut subs = self.subscriptions.lock().unwrap();
        for sub in subs.iter_mut() {
            if subscription_ids.contains(&sub.id) {
                sub.last_notified_at = Some(at);
            }
        }
        Ok(())
    }
}

// ---- Enricher fake ----

/// Records call order and tracks how many enrichments are in flight at once.
#[derive(Default)]
pub struct FakeEnricher {
    pub fail_ids: HashSet<String>,
    pub delay_ms: u64,
    pub calls: Mutex<Vec<String>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeEnricher {
    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Default::default()
        }
    }

    pub fn observed_max(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Enricher for FakeEnricher {
    async fn enrich(&self, candidate: &IngestCandidate) -> Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        self.calls.lock().unwrap().push(candidate.id.clone());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail_ids.contains(&candidate.id) {
            bail!("enrichment rejected {}", candidate.id)
        }
        Ok(())
    }
}

// ---- Sender fake ----

#[derive(Default)]
pub struct RecordingSender {
    pub fail_emails: HashSet<String>,
    pub sent: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, email: &str, org_name: &str, grants: &[GrantDigest]) -> Result<()> {
        if self.fail_emails.contains(email) {
            bail!("smtp rejected {email}")
        }
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), org_name.to_string(), grants.len()));
        Ok(())
    }
}
