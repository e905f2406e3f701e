use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Lead, LeadPatch};
use super::store::{LeadFilter, LeadStore, Page, ScanCursor, StoreError};

/// Process-local lead store used in development and tests
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: RwLock<HashMap<Uuid, Lead>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn matching(&self, filter: &LeadFilter) -> Vec<Lead> {
        let leads = self.leads.read().await;
        leads.values().filter(|l| filter.matches(l)).cloned().collect()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn find(&self, filter: &LeadFilter, page: Page) -> Result<Vec<Lead>, StoreError> {
        let mut leads = self.matching(filter).await;
        leads.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        Ok(leads
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &LeadFilter) -> Result<u64, StoreError> {
        let leads = self.leads.read().await;
        Ok(leads.values().filter(|l| filter.matches(l)).count() as u64)
    }

    async fn scan(
        &self,
        filter: &LeadFilter,
        after: Option<&ScanCursor>,
        limit: u32,
    ) -> Result<Vec<Lead>, StoreError> {
        let mut leads = self.matching(filter).await;
        leads.sort_by_key(|l| (l.created_at, l.id));

        Ok(leads
            .into_iter()
            .filter(|l| after.map_or(true, |c| (l.created_at, l.id) > (c.created_at, c.id)))
            .take(limit as usize)
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        Ok(self.leads.read().await.get(&id).cloned())
    }

    async fn insert(&self, lead: &Lead) -> Result<(), StoreError> {
        let mut leads = self.leads.write().await;
        if leads.contains_key(&lead.id) {
            return Err(StoreError::Duplicate(lead.id));
        }
        leads.insert(lead.id, lead.clone());
        Ok(())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &LeadPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, StoreError> {
        let mut leads = self.leads.write().await;
        Ok(leads.get_mut(&id).map(|lead| {
            patch.apply(lead, updated_at);
            lead.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.leads.write().await.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {}
}
