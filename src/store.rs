// src/store.rs
// Persistence seam. The orchestrator only ever needs five operations, so the
// trait stays narrow and every error is surfaced to the caller, which decides
// how (and whether) to degrade.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::models::{Grant, StatusUpdate, Subscription};

/// An active subscription together with its cosine similarity to the grant
/// being matched, as ranked by the store (descending).
#[derive(Debug, Clone)]
pub struct SubscriptionMatch {
    pub subscription: Subscription,
    pub similarity: f64,
}

#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Ids of every grant already persisted. An `Err` here means the caller
    /// must choose between aborting and treating the whole feed as new.
    async fn known_grant_ids(&self) -> Result<HashSet<String>>;

    /// Apply all fast-path `is_open` writes as one unit. Returns the number
    /// of rows written; an `Err` means none of them were.
    async fn apply_status_updates(&self, updates: &[StatusUpdate]) -> Result<usize>;

    async fn load_grant(&self, id: &str) -> Result<Option<Grant>>;

    /// Active subscriptions with a non-null preference embedding, ranked by
    /// descending cosine similarity to `embedding`. Threshold filtering is
    /// the caller's job so the cutoff stays uniform across backends.
    async fn similar_subscriptions(&self, embedding: &[f32]) -> Result<Vec<SubscriptionMatch>>;

    /// Stamp `last_notified_at` for the given subscriptions in one write.
    async fn mark_notified(&self, subscription_ids: &[String], at: DateTime<Utc>) -> Result<()>;
}

/// Postgres-backed store. Embeddings live in pgvector columns; similarity
/// ranking is pushed down to the `<=>` cosine-distance operator.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a lazily-connecting pool so process start never blocks on the
    /// database; the first query pays the connection cost instead.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)
            .context("configuring postgres pool")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl GrantStore for PgStore {
    async fn known_grant_ids(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT id FROM grants")
            .fetch_all(&self.pool)
            .await
            .context("listing known grant ids")?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("id").context("reading grant id"))
            .collect()
    }

    async fn apply_status_updates(&self, updates: &[StatusUpdate]) -> Result<usize> {
        if updates.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await.context("opening status tx")?;
        for update in updates {
            sqlx::query("UPDATE grants SET is_open = $1 WHERE id = $2")
                .bind(update.is_open)
                .bind(&update.id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("updating is_open for grant {}", update.id))?;
        }
        tx.commit().await.context("committing status updates")?;
        Ok(updates.len())
    }

    async fn load_grant(&self, id: &str) -> Result<Option<Grant>> {
        let row = sqlx::query(
            "SELECT id, name, agency_name, max_funding, strategic_intent, \
                    original_url, is_open, embedding \
             FROM grants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("loading grant {id}"))?;

        row.map(|row| {
            let embedding: Vector = row.try_get("embedding").context("reading embedding")?;
            Ok(Grant {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                agency_name: row.try_get("agency_name")?,
                max_funding: row.try_get("max_funding")?,
                strategic_intent: row.try_get("strategic_intent")?,
                original_url: row.try_get("original_url")?,
                is_open: row.try_get("is_open")?,
                embedding: embedding.to_vec(),
            })
        })
        .transpose()
    }

    async fn similar_subscriptions(&self, embedding: &[f32]) -> Result<Vec<SubscriptionMatch>> {
        let query_vec = Vector::from(embedding.to_vec());
        let rows = sqlx::query(
            "SELECT id, email, organization_name, is_active, last_notified_at, \
                    1 - (preference_embedding <=> $1) AS similarity \
             FROM subscriptions \
             WHERE is_active AND preference_embedding IS NOT NULL \
             ORDER BY preference_embedding <=> $1",
        )
        .bind(query_vec)
        .fetch_all(&self.pool)
        .await
        .context("ranking subscriptions by similarity")?;

        rows.iter()
            .map(|row| {
                Ok(SubscriptionMatch {
                    subscription: Subscription {
                        id: row.try_get("id")?,
                        email: row.try_get("email")?,
                        organization_name: row.try_get("organization_name")?,
                        // Not needed past ranking; skip shipping the vector back.
                        preference_embedding: None,
                        is_active: row.try_get("is_active")?,
                        last_notified_at: row.try_get("last_notified_at")?,
                    },
                    similarity: row.try_get("similarity")?,
                })
            })
            .collect()
    }

    async fn mark_notified(&self, subscription_ids: &[String], at: DateTime<Utc>) -> Result<()> {
        if subscription_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE subscriptions SET last_notified_at = $1 WHERE id = ANY($2)")
            .bind(at)
            .bind(subscription_ids)
            .execute(&self.pool)
            .await
            .context("stamping last_notified_at")?;
        Ok(())
    }
}
