//! Streaming serialization of the lead collection.
//!
//! Column order is fixed: `id, name, email, phone, company, status, source,
//! notes, ownerId, createdAt, updatedAt`. CSV follows RFC 4180 (CRLF line
//! endings, quoted fields when needed). JSON is a single array whose objects
//! use the same key order as the CSV header.

use std::borrow::Cow;
use std::str::FromStr;

use axum::body::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::ready;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::Lead;
use crate::database::StoreError;

pub const COLUMNS: [&str; 11] = [
    "id",
    "name",
    "email",
    "phone",
    "company",
    "status",
    "source",
    "notes",
    "ownerId",
    "createdAt",
    "updatedAt",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("store failed during export: {0}")]
    Store(#[from] StoreError),

    #[error("failed to serialize lead {id}: {source}")]
    Serialization {
        id: Uuid,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// `leads-YYYYMMDD.<ext>`
    pub fn attachment_filename(&self, now: DateTime<Utc>) -> String {
        format!("leads-{}.{}", now.format("%Y%m%d"), self.extension())
    }

    fn header(&self) -> Bytes {
        match self {
            ExportFormat::Csv => {
                let mut line = COLUMNS.join(",");
                line.push_str("\r\n");
                Bytes::from(line)
            }
            ExportFormat::Json => Bytes::from_static(b"["),
        }
    }

    fn footer(&self) -> Bytes {
        match self {
            ExportFormat::Csv => Bytes::new(),
            ExportFormat::Json => Bytes::from_static(b"]"),
        }
    }

    fn record(&self, index: usize, lead: &Lead) -> Result<Bytes, ExportError> {
        match self {
            ExportFormat::Csv => Ok(Bytes::from(csv_record(lead))),
            ExportFormat::Json => {
                let json = serde_json::to_string(lead).map_err(|source| {
                    ExportError::Serialization {
                        id: lead.id,
                        source,
                    }
                })?;
                let chunk = if index == 0 { json } else { format!(",{}", json) };
                Ok(Bytes::from(chunk))
            }
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unsupported export format '{}'", other)),
        }
    }
}

/// Encode `leads` as a byte stream: header, one chunk per lead, footer.
///
/// The first error ends the stream without a footer, so a failed export is
/// never mistaken for a complete document.
pub fn encode(
    format: ExportFormat,
    leads: BoxStream<'static, Result<Lead, StoreError>>,
) -> BoxStream<'static, Result<Bytes, ExportError>> {
    let rows = leads
        .enumerate()
        .map(move |(index, item)| format.record(index, &item?));

    stream::once(ready(Ok(format.header())))
        .chain(rows)
        .chain(stream::once(ready(Ok(format.footer()))))
        .scan(false, |failed, item| {
            if *failed {
                return ready(None);
            }
            *failed = item.is_err();
            ready(Some(item))
        })
        .boxed()
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn csv_record(lead: &Lead) -> String {
    let id = lead.id.to_string();
    let created_at = timestamp(&lead.created_at);
    let updated_at = timestamp(&lead.updated_at);

    let cells: [&str; 11] = [
        &id,
        &lead.name,
        &lead.email,
        lead.phone.as_deref().unwrap_or(""),
        lead.company.as_deref().unwrap_or(""),
        lead.status.as_str(),
        lead.source.as_deref().unwrap_or(""),
        lead.notes.as_deref().unwrap_or(""),
        lead.owner_id.as_deref().unwrap_or(""),
        &created_at,
        &updated_at,
    ];

    let mut line = cells
        .iter()
        .map(|cell| csv_escape(cell))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

fn csv_escape(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
