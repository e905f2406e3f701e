use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::AuthGate;
use crate::error::ApiError;

/// Rejects the request with a 401 unless it carries a valid token.
///
/// Runs before body extraction, so an unauthenticated request never reaches
/// validation or the store. The resolved `Identity` is placed in request
/// extensions for handlers.
pub async fn require_identity(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = gate.authenticate(request.headers())?;

    tracing::debug!(
        "Authenticated {} for {} {}",
        identity.subject,
        request.method(),
        request.uri().path()
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
