use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Query, State,
    },
    Json,
};
use serde_json::{json, Value};

use super::object_body;
use super::query::LeadQuery;
use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::Lead;
use crate::middleware::{ApiResponse, ApiResult};
use crate::validation::CreateLeadPayload;

/// GET /leads - List leads, newest first, one page at a time
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<LeadQuery>, QueryRejection>,
) -> ApiResult<Vec<Lead>> {
    let Query(query) = query?;
    let filter = query.filter()?;
    let page = query.page(&state.config.api)?;

    let result = state.leads.list(&filter, page).await?;
    let limit = u64::from(result.page.limit);
    let pages = (result.total + limit - 1) / limit;
    let count = result.leads.len();

    Ok(ApiResponse::success(result.leads)
        .with("count", json!(count))
        .with(
            "pagination",
            json!({
                "page": result.page.number,
                "limit": result.page.limit,
                "total": result.total,
                "pages": pages,
            }),
        ))
}

/// POST /leads - Create a lead owned by the authenticated caller
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Lead> {
    let payload: CreateLeadPayload = object_body(body)?;
    let lead = state.leads.create(&payload, &identity).await?;
    Ok(ApiResponse::created(lead))
}
