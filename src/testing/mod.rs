use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::database::models::{Lead, LeadPatch, LeadStatus, NewLead};
use crate::database::{LeadFilter, LeadStore, MemoryLeadStore, Page, ScanCursor, StoreError};

/// Build a lead whose `created_at` is `offset_secs` after a fixed base time
pub fn lead_at(name: &str, offset_secs: i64) -> Lead {
    let base: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().expect("valid timestamp");
    NewLead {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: None,
        company: None,
        status: LeadStatus::New,
        source: None,
        notes: None,
    }
    .into_lead(None, base + Duration::seconds(offset_secs))
}

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

/// Store whose every call fails as if the database were unreachable
pub struct UnavailableStore;

#[async_trait]
impl LeadStore for UnavailableStore {
    async fn find(&self, _: &LeadFilter, _: Page) -> Result<Vec<Lead>, StoreError> {
        Err(down())
    }

    async fn count(&self, _: &LeadFilter) -> Result<u64, StoreError> {
        Err(down())
    }

    async fn scan(
        &self,
        _: &LeadFilter,
        _: Option<&ScanCursor>,
        _: u32,
    ) -> Result<Vec<Lead>, StoreError> {
        Err(down())
    }

    async fn get(&self, _: Uuid) -> Result<Option<Lead>, StoreError> {
        Err(down())
    }

    async fn insert(&self, _: &Lead) -> Result<(), StoreError> {
        Err(down())
    }

    async fn update(
        &self,
        _: Uuid,
        _: &LeadPatch,
        _: DateTime<Utc>,
    ) -> Result<Option<Lead>, StoreError> {
        Err(down())
    }

    async fn delete(&self, _: Uuid) -> Result<bool, StoreError> {
        Err(down())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(down())
    }

    async fn close(&self) {}
}

/// Memory store whose `scan` starts failing after a number of successful batches
pub struct FlakyScanStore {
    inner: MemoryLeadStore,
    healthy_scans: AtomicU32,
}

impl FlakyScanStore {
    pub fn new(inner: MemoryLeadStore, healthy_scans: u32) -> Self {
        Self {
            inner,
            healthy_scans: AtomicU32::new(healthy_scans),
        }
    }
}

#[async_trait]
impl LeadStore for FlakyScanStore {
    async fn find(&self, filter: &LeadFilter, page: Page) -> Result<Vec<Lead>, StoreError> {
        self.inner.find(filter, page).await
    }

    async fn count(&self, filter: &LeadFilter) -> Result<u64, StoreError> {
        self.inner.count(filter).await
    }

    async fn scan(
        &self,
        filter: &LeadFilter,
        after: Option<&ScanCursor>,
        limit: u32,
    ) -> Result<Vec<Lead>, StoreError> {
        let remaining = self
            .healthy_scans
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match remaining {
            Ok(_) => self.inner.scan(filter, after, limit).await,
            Err(_) => Err(down()),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        self.inner.get(id).await
    }

    async fn insert(&self, lead: &Lead) -> Result<(), StoreError> {
        self.inner.insert(lead).await
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &LeadPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, StoreError> {
        self.inner.update(id, patch, updated_at).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn close(&self) {}
}
