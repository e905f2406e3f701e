use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::TryStreamExt;

use super::query::LeadQuery;
use crate::app::AppState;
use crate::error::ApiError;
use crate::export;

/// GET /leads/export - Stream every matching lead as CSV (default) or JSON
pub async fn export(
    State(state): State<AppState>,
    query: Result<Query<LeadQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let format = query.format()?;
    let filter = query.filter()?;

    let leads = state.leads.export(filter).await?;
    let chunks = export::encode(format, leads)
        .inspect_err(|e| tracing::error!("Lead export aborted mid-stream: {}", e));

    let disposition = format!(
        "attachment; filename=\"{}\"",
        format.attachment_filename(Utc::now())
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}
