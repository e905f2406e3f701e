use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::object_body;
use crate::app::AppState;
use crate::database::models::Lead;
use crate::middleware::{ApiResponse, ApiResult};
use crate::validation::UpdateLeadPayload;

/// GET /leads/:id - Get a single lead by ID
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Lead> {
    let Path(id) = id?;
    let lead = state.leads.get(id).await?;
    Ok(ApiResponse::success(lead))
}

/// PUT /leads/:id - Partially update a lead; never creates one
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Lead> {
    let Path(id) = id?;
    let payload: UpdateLeadPayload = object_body(body)?;
    let lead = state.leads.update(id, &payload).await?;
    Ok(ApiResponse::success(lead))
}

/// DELETE /leads/:id - Permanently delete a lead
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    state.leads.delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id })).with("message", json!("Lead deleted")))
}
