use axum::{
    body::Body as AxumBody, extract::State, http::Request, middleware::Next, response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::services::api_key_auth;
use crate::web::{AppState, error::AppError};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Guards the admin routes. Inserts the resolved `AdminPrincipal` into the
/// request extensions.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing API key".to_string()))?
        .to_string();

    let principal = api_key_auth::authenticate_api_key(
        &state.db_pool,
        &presented,
        state.config.admin_bootstrap_key.as_deref(),
    )
    .await?;
    debug!(?principal, "Admin request authenticated.");

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
