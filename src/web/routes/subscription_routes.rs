use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::db::entities::payment;
use crate::db::services::{self, SubscriptionSummary};
use crate::services::billing_service;
use crate::web::models::{AuthenticatedUser, SuccessResponse, UpgradeRequest};
use crate::web::{AppError, AppState};

pub fn create_subscription_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_subscription))
        .route("/upgrade", post(upgrade_subscription))
        .route("/cancel", post(cancel_subscription))
}

async fn get_subscription(
    State(app_state): State<Arc<AppState>>,
    Extension(authenticated_user): Extension<AuthenticatedUser>,
) -> Result<Json<SubscriptionSummary>, AppError> {
    let summary = services::get_subscription(&app_state.db_pool, authenticated_user.id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(Json(summary))
}

async fn upgrade_subscription(
    State(app_state): State<Arc<AppState>>,
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    Json(payload): Json<UpgradeRequest>,
) -> Result<Json<payment::Model>, AppError> {
    let payment = billing_service::upgrade_plan(
        &app_state.db_pool,
        app_state.payment_verifier.as_ref(),
        authenticated_user.id,
        payload.plan,
        &payload.reference,
    )
    .await?;
    Ok(Json(payment))
}

async fn cancel_subscription(
    State(app_state): State<Arc<AppState>>,
    Extension(authenticated_user): Extension<AuthenticatedUser>,
) -> Result<Json<SuccessResponse>, AppError> {
    services::cancel_subscription(&app_state.db_pool, authenticated_user.id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    info!(user_id = authenticated_user.id, "Subscription cancelled.");
    Ok(Json(SuccessResponse::ok()))
}
