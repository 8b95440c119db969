use axum::{
    extract::{Extension, State},
    routing::put,
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::db::services;
use crate::services::auth_service;
use crate::web::models::{
    AuthenticatedUser, SuccessResponse, UpdatePasswordRequest, UpdateUsernameRequest, UserResponse,
};
use crate::web::{AppError, AppState};

pub fn create_user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/username", put(update_username))
        .route("/password", put(update_password))
}

async fn update_username(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<UpdateUsernameRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let username = payload.username.trim().to_string();
    auth_service::validate_username(&username)?;

    let updated_user = services::update_username(&app_state.db_pool, auth_user.id, username)
        .await
        .map_err(|e| AppError::from_db_conflict(e, "Username already taken"))?
        .ok_or(AppError::UserNotFound)?;
    info!(user_id = updated_user.id, username = %updated_user.username, "Username changed.");

    Ok(Json(UserResponse {
        id: updated_user.id,
        username: updated_user.username,
        role: updated_user.role,
    }))
}

async fn update_password(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_model = services::get_user_by_id(&app_state.db_pool, auth_user.id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let valid_password = bcrypt::verify(&payload.current_password, &user_model.password_hash)
        .map_err(|_| AppError::InternalServerError("Password verification failed".to_string()))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    auth_service::validate_password(&payload.new_password)?;
    let new_hash =
        auth_service::hash_password(&payload.new_password, app_state.config.password_hash_cost)?;
    services::update_password_hash(&app_state.db_pool, auth_user.id, new_hash)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(SuccessResponse::ok()))
}
