use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Identity;
use crate::database::models::Lead;
use crate::database::{scan_all, LeadFilter, LeadStore, Page, StoreError};
use crate::validation::{
    validate_create, validate_update, CreateLeadPayload, FieldErrors, UpdateLeadPayload,
    ValidationRules,
};

// Microsecond precision so a returned lead equals what the store reads back
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    ValidationFailed(FieldErrors),

    #[error("Lead {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One page of a listing plus the size of the whole filtered set
#[derive(Debug, Clone)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub total: u64,
    pub page: Page,
}

/// Orchestrates validation, timestamps and ownership over a `LeadStore`
#[derive(Clone)]
pub struct LeadService {
    store: Arc<dyn LeadStore>,
    rules: ValidationRules,
    export_batch_size: u32,
}

impl LeadService {
    pub fn new(store: Arc<dyn LeadStore>, rules: ValidationRules, export_batch_size: u32) -> Self {
        Self {
            store,
            rules,
            export_batch_size,
        }
    }

    pub fn store(&self) -> &Arc<dyn LeadStore> {
        &self.store
    }

    pub async fn list(&self, filter: &LeadFilter, page: Page) -> Result<LeadPage, ServiceError> {
        let (leads, total) = tokio::try_join!(self.store.find(filter, page), self.store.count(filter))?;
        debug!(
            "Listed {} of {} leads (page {}, limit {})",
            leads.len(),
            total,
            page.number,
            page.limit
        );
        Ok(LeadPage { leads, total, page })
    }

    pub async fn get(&self, id: Uuid) -> Result<Lead, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Validate, stamp timestamps and owner, then persist.
    pub async fn create(
        &self,
        payload: &CreateLeadPayload,
        identity: &Identity,
    ) -> Result<Lead, ServiceError> {
        let new_lead =
            validate_create(payload, &self.rules).map_err(ServiceError::ValidationFailed)?;

        let lead = new_lead.into_lead(Some(identity.subject.clone()), now());
        self.store.insert(&lead).await?;

        info!("Created lead {} for owner {}", lead.id, identity.subject);
        Ok(lead)
    }

    /// Merge the present fields of `payload` into an existing lead. Never inserts.
    pub async fn update(&self, id: Uuid, payload: &UpdateLeadPayload) -> Result<Lead, ServiceError> {
        let patch = validate_update(payload, &self.rules).map_err(ServiceError::ValidationFailed)?;

        let lead = self
            .store
            .update(id, &patch, now())
            .await?
            .ok_or(ServiceError::NotFound(id))?;

        info!("Updated lead {}", id);
        Ok(lead)
    }

    /// Hard delete. A second call for the same id is `NotFound`.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        info!("Deleted lead {}", id);
        Ok(())
    }

    /// Every lead matching `filter`, oldest first.
    ///
    /// The first record is fetched before returning so an unreachable store is
    /// reported as an error instead of an empty stream.
    pub async fn export(
        &self,
        filter: LeadFilter,
    ) -> Result<BoxStream<'static, Result<Lead, StoreError>>, ServiceError> {
        let mut leads = scan_all(self.store.clone(), filter, self.export_batch_size);

        match leads.next().await {
            Some(Err(e)) => Err(e.into()),
            Some(Ok(first)) => Ok(stream::once(async move { Ok(first) }).chain(leads).boxed()),
            None => Ok(stream::empty().boxed()),
        }
    }
}
