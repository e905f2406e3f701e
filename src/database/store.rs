use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use uuid::Uuid;

use super::models::{Lead, LeadPatch, LeadStatus};

/// Errors from a lead store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached (pool exhausted, connection refused, closed).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate lead id: {0}")]
    Duplicate(Uuid),

    #[error("Corrupt lead row {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error("Query error: {0}")]
    Query(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other),
        }
    }
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Optional narrowing applied to listing and export queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
    pub owner_id: Option<String>,
    /// Case-insensitive substring matched against name, email and company.
    pub search: Option<String>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        if let Some(status) = self.status {
            if lead.status != status {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if lead.source.as_deref() != Some(source.as_str()) {
                return false;
            }
        }
        if let Some(owner) = &self.owner_id {
            if lead.owner_id.as_deref() != Some(owner.as_str()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = lead.name.to_lowercase().contains(&needle)
                || lead.email.to_lowercase().contains(&needle)
                || lead
                    .company
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// 1-based page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub limit: u32,
}

impl Page {
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Keyset position used to walk the collection in `(created_at, id)` order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl From<&Lead> for ScanCursor {
    fn from(lead: &Lead) -> Self {
        Self {
            created_at: lead.created_at,
            id: lead.id,
        }
    }
}

/// Persistent collection of leads.
///
/// Each method is a single-document (or single-statement) operation; callers
/// rely on that atomicity and never hold a lead across calls.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Page of leads ordered newest first (`created_at DESC, id DESC`).
    async fn find(&self, filter: &LeadFilter, page: Page) -> Result<Vec<Lead>, StoreError>;

    async fn count(&self, filter: &LeadFilter) -> Result<u64, StoreError>;

    /// Up to `limit` leads strictly after `after`, ordered `created_at ASC, id ASC`.
    async fn scan(
        &self,
        filter: &LeadFilter,
        after: Option<&ScanCursor>,
        limit: u32,
    ) -> Result<Vec<Lead>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, StoreError>;

    async fn insert(&self, lead: &Lead) -> Result<(), StoreError>;

    /// Apply `patch` atomically. `Ok(None)` when no lead has this id.
    async fn update(
        &self,
        id: Uuid,
        patch: &LeadPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, StoreError>;

    /// Hard delete. `Ok(false)` when no lead has this id.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn close(&self);
}

/// Walk every lead matching `filter` in keyset batches of `batch_size`.
///
/// The stream ends after the first error. Dropping it stops further queries.
pub fn scan_all(
    store: Arc<dyn LeadStore>,
    filter: LeadFilter,
    batch_size: u32,
) -> BoxStream<'static, Result<Lead, StoreError>> {
    let batch_size = batch_size.max(1);

    stream::unfold(Some(None::<ScanCursor>), move |state| {
        let store = store.clone();
        let filter = filter.clone();
        async move {
            let after = state?;
            match store.scan(&filter, after.as_ref(), batch_size).await {
                Ok(batch) if batch.is_empty() => None,
                Ok(batch) => {
                    let next = if (batch.len() as u32) < batch_size {
                        None
                    } else {
                        batch.last().map(|lead| Some(ScanCursor::from(lead)))
                    };
                    let items: Vec<Result<Lead, StoreError>> = batch.into_iter().map(Ok).collect();
                    Some((items, next))
                }
                Err(e) => Some((vec![Err(e)], None)),
            }
        }
    })
    .flat_map(stream::iter)
    .boxed()
}
