use serde::Deserialize;

use crate::config::ApiConfig;
use crate::database::models::LeadStatus;
use crate::database::{LeadFilter, Page};
use crate::error::ApiError;
use crate::export::ExportFormat;

/// Query string accepted by `GET /leads` and `GET /leads/export`.
///
/// Everything arrives as text so bad values produce field-specific messages.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadQuery {
    pub status: Option<String>,
    pub source: Option<String>,
    pub owner_id: Option<String>,
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub format: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn positive(name: &str, value: &Option<String>) -> Result<Option<u32>, ApiError> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(ApiError::bad_request(format!(
                "{} must be a positive integer",
                name
            ))),
        },
    }
}

impl LeadQuery {
    pub fn filter(&self) -> Result<LeadFilter, ApiError> {
        let status = non_blank(&self.status)
            .map(|s| s.parse::<LeadStatus>())
            .transpose()
            .map_err(ApiError::bad_request)?;

        Ok(LeadFilter {
            status,
            source: non_blank(&self.source),
            owner_id: non_blank(&self.owner_id),
            search: non_blank(&self.q),
        })
    }

    /// Requested page; `limit` is clamped to the configured maximum.
    pub fn page(&self, api: &ApiConfig) -> Result<Page, ApiError> {
        let number = positive("page", &self.page)?.unwrap_or(1);
        let limit = positive("limit", &self.limit)?
            .unwrap_or(api.default_page_size)
            .min(api.max_page_size);
        Ok(Page { number, limit })
    }

    pub fn format(&self) -> Result<ExportFormat, ApiError> {
        non_blank(&self.format)
            .map(|f| f.parse::<ExportFormat>())
            .transpose()
            .map_err(ApiError::bad_request)
            .map(Option::unwrap_or_default)
    }
}
