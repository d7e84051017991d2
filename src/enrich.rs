// src/enrich.rs
// Seam for the AI enrichment collaborator. The collaborator owns the whole
// expensive pipeline (scrape, analyze, embed) and persists the Grant record
// itself; this engine only needs a success/failure signal per candidate.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::models::IngestCandidate;

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Fully ingest one unseen grant. Idempotent per id on the collaborator
    /// side, so a retried cycle may safely call this again.
    async fn enrich(&self, candidate: &IngestCandidate) -> Result<()>;
}

#[derive(Serialize)]
struct EnrichRequest<'a> {
    id: &'a str,
    slug: &'a str,
    url: Option<&'a str>,
}

/// Talks to the enrichment service over HTTP: POST one candidate, any non-2xx
/// status is a failed ingestion.
pub struct HttpEnricher {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpEnricher {
    pub fn new(endpoint: String, timeout_secs: u64) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl Enricher for HttpEnricher {
    async fn enrich(&self, candidate: &IngestCandidate) -> Result<()> {
        let body = EnrichRequest {
            id: &candidate.id,
            slug: &candidate.slug,
            url: candidate.url.as_deref(),
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("calling enrichment service for {}", candidate.id))?;

        if !resp.status().is_success() {
            bail!(
                "enrichment service returned {} for grant {}",
                resp.status(),
                candidate.id
            );
        }
        Ok(())
    }
}
