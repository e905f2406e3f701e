pub mod collection;
pub mod export;
pub mod query;
pub mod record;

use axum::{extract::rejection::JsonRejection, Json};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Accept only a JSON object body; per-field type problems are left to validation.
fn object_body<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(body) = body?;
    if !body.is_object() {
        return Err(ApiError::invalid_json("Request body must be a JSON object"));
    }
    serde_json::from_value(body).map_err(|e| ApiError::invalid_json(e.to_string()))
}

// Re-export handler functions for use in routing
pub use collection::create as lead_create;
pub use collection::list as lead_list;
pub use export::export as lead_export;
pub use record::delete as lead_delete;
pub use record::get as lead_get;
pub use record::update as lead_update;
