pub mod leads;

use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

/// GET / - Service banner
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "message": "Lead management API",
        "data": {
            "name": "Lead API",
            "version": version,
            "endpoints": {
                "health": "/health (public)",
                "list": "GET /leads",
                "export": "GET /leads/export?format=csv|json",
                "get": "GET /leads/:id",
                "create": "POST /leads (protected)",
                "update": "PUT /leads/:id (protected)",
                "delete": "DELETE /leads/:id (protected)",
            }
        }
    }))
}

/// GET /health - Liveness only; never consults the store
pub async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Fallback for unknown routes
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route not found",
            "code": "NOT_FOUND"
        })),
    )
}
