use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::models::{Lead, LeadPatch};
use super::store::{LeadFilter, LeadStore, Page, ScanCursor, StoreError};
use crate::config::DatabaseConfig;

const COLUMNS: &str = "id, name, email, phone, company, status, source, notes, owner_id, created_at, updated_at";

// $1 status, $2 source, $3 owner_id, $4 ILIKE pattern
const FILTER: &str = "($1::text IS NULL OR status = $1) \
    AND ($2::text IS NULL OR source = $2) \
    AND ($3::text IS NULL OR owner_id = $3) \
    AND ($4::text IS NULL OR name ILIKE $4 OR email ILIKE $4 OR company ILIKE $4)";

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS leads (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        email       TEXT NOT NULL,
        phone       TEXT,
        company     TEXT,
        status      TEXT NOT NULL DEFAULT 'new',
        source      TEXT,
        notes       TEXT,
        owner_id    TEXT,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS leads_created_at_id_idx ON leads (created_at, id)",
    "CREATE INDEX IF NOT EXISTS leads_status_idx ON leads (status)",
];

#[derive(Debug, FromRow)]
struct LeadRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    status: String,
    source: Option<String>,
    notes: Option<String>,
    owner_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = StoreError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|reason| StoreError::Corrupt {
            id: row.id,
            reason,
        })?;

        Ok(Lead {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            status,
            source: row.source,
            notes: row.notes,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Lead store backed by a PostgreSQL `leads` table
#[derive(Clone)]
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Created database pool (max_connections={})",
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `leads` table and its indexes if missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Lead schema ensured");
        Ok(())
    }
}

fn search_pattern(search: &Option<String>) -> Option<String> {
    search.as_ref().map(|s| {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "23505")
}

fn into_leads(rows: Vec<LeadRow>) -> Result<Vec<Lead>, StoreError> {
    rows.into_iter().map(Lead::try_from).collect()
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn find(&self, filter: &LeadFilter, page: Page) -> Result<Vec<Lead>, StoreError> {
        let sql = format!(
            "SELECT {} FROM leads WHERE {} ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6",
            COLUMNS, FILTER
        );

        let rows = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.source.as_deref())
            .bind(filter.owner_id.as_deref())
            .bind(search_pattern(&filter.search))
            .bind(i64::from(page.limit))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        into_leads(rows)
    }

    async fn count(&self, filter: &LeadFilter) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM leads WHERE {}", FILTER);

        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.source.as_deref())
            .bind(filter.owner_id.as_deref())
            .bind(search_pattern(&filter.search))
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn scan(
        &self,
        filter: &LeadFilter,
        after: Option<&ScanCursor>,
        limit: u32,
    ) -> Result<Vec<Lead>, StoreError> {
        let sql = format!(
            "SELECT {} FROM leads WHERE {} \
             AND ($5::timestamptz IS NULL OR (created_at, id) > ($5, $6)) \
             ORDER BY created_at ASC, id ASC LIMIT $7",
            COLUMNS, FILTER
        );

        let rows = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.source.as_deref())
            .bind(filter.owner_id.as_deref())
            .bind(search_pattern(&filter.search))
            .bind(after.map(|c| c.created_at))
            .bind(after.map(|c| c.id))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        into_leads(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        let sql = format!("SELECT {} FROM leads WHERE id = $1", COLUMNS);

        sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Lead::try_from)
            .transpose()
    }

    async fn insert(&self, lead: &Lead) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO leads ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            COLUMNS
        );

        sqlx::query(&sql)
            .bind(lead.id)
            .bind(&lead.name)
            .bind(&lead.email)
            .bind(&lead.phone)
            .bind(&lead.company)
            .bind(lead.status.as_str())
            .bind(&lead.source)
            .bind(&lead.notes)
            .bind(&lead.owner_id)
            .bind(lead.created_at)
            .bind(lead.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate(lead.id)
                } else {
                    StoreError::from(e)
                }
            })?;

        Ok(())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &LeadPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, StoreError> {
        // Optional columns carry a "present" flag so an explicit clear can be told apart from "leave as is".
        let sql = format!(
            r#"
            UPDATE leads SET
                name       = COALESCE($2, name),
                email      = COALESCE($3, email),
                phone      = CASE WHEN $4 THEN $5 ELSE phone END,
                company    = CASE WHEN $6 THEN $7 ELSE company END,
                status     = COALESCE($8, status),
                source     = CASE WHEN $9 THEN $10 ELSE source END,
                notes      = CASE WHEN $11 THEN $12 ELSE notes END,
                updated_at = $13
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        );

        sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.email.as_deref())
            .bind(patch.phone.is_some())
            .bind(patch.phone.clone().flatten())
            .bind(patch.company.is_some())
            .bind(patch.company.clone().flatten())
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.source.is_some())
            .bind(patch.source.clone().flatten())
            .bind(patch.notes.is_some())
            .bind(patch.notes.clone().flatten())
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await?
            .map(Lead::try_from)
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}
