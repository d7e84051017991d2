// src/feed.rs
// The external grants feed: tolerant wire types and the HTTP source.
//
// The feed is untrusted; every field is optional and missing maps collapse to
// empty. Entries without an id or slug are dropped later by the reconciler.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

/// Top-level feed payload: `{ "grant_metadata": [ ... ] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPayload {
    #[serde(default)]
    pub grant_metadata: Vec<FeedEntry>,
}

/// One raw feed record. `value` is the human-readable slug.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub deactivation_url: Option<String>,
    #[serde(default)]
    pub call_to_action_url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub closing_dates: HashMap<String, Option<String>>,
    #[serde(default)]
    pub available: HashMap<String, bool>,
}

impl FeedEntry {
    /// Canonical source URL, in the feed's priority order.
    pub fn resolve_url(&self) -> Option<String> {
        self.original_url
            .clone()
            .or_else(|| self.deactivation_url.clone())
            .or_else(|| self.call_to_action_url.clone())
    }
}

/// The feed sometimes serializes ids as JSON numbers; normalize to strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(i64),
    }
    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    }))
}

/// Seam for the remote feed so the orchestrator can be exercised offline.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FeedEntry>>;
}

pub struct HttpFeedSource {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn new(url: String, timeout_secs: u64) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedEntry>> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("fetching grants feed from {}", self.url))?
            .error_for_status()
            .context("grants feed returned an error status")?;

        let payload: FeedPayload = resp.json().await.context("decoding grants feed json")?;
        Ok(payload.grant_metadata)
    }
}
