use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::db::entities::api_key;
use crate::db::services::{self, AdminUserChanges};
use crate::services::api_key_auth;
use crate::web::models::{
    AdminPrincipal, AdminUpdateUserRequest, AdminUserResponse, CreateApiKeyRequest,
    CreatedApiKeyResponse, LinkResponse,
};
use crate::web::{AppError, AppState};

/// Administrative endpoints. Must be wrapped in the API key middleware.
pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{user_id}", put(update_user).delete(delete_user))
        .route("/users/{user_id}/links", get(list_user_links))
        .route("/links/{link_id}", delete(delete_link))
        .route("/api-keys", get(list_api_keys).post(create_api_key))
        .route("/api-keys/{key_id}", delete(revoke_api_key))
}

async fn list_users(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<AdminUserResponse>>, AppError> {
    let users = services::list_users(&app_state.db_pool).await?;
    Ok(Json(users.into_iter().map(AdminUserResponse::from).collect()))
}

async fn update_user(
    State(app_state): State<Arc<AppState>>,
    Extension(principal): Extension<AdminPrincipal>,
    Path(user_id): Path<i32>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<AdminUserResponse>, AppError> {
    let changes = AdminUserChanges {
        plan: payload.plan,
        role: payload.role,
        is_verified: payload.is_verified,
    };
    let updated = services::admin_update_user(&app_state.db_pool, user_id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    info!(user_id, admin = ?principal, "User updated by admin.");
    Ok(Json(updated.into()))
}

async fn delete_user(
    State(app_state): State<Arc<AppState>>,
    Extension(principal): Extension<AdminPrincipal>,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected = services::delete_user(&app_state.db_pool, user_id).await?;
    if rows_affected == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    info!(user_id, admin = ?principal, "User deleted by admin.");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_user_links(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<LinkResponse>>, AppError> {
    let links = services::get_links_by_user_id(&app_state.db_pool, user_id).await?;
    Ok(Json(links.into_iter().map(LinkResponse::from).collect()))
}

async fn delete_link(
    State(app_state): State<Arc<AppState>>,
    Extension(principal): Extension<AdminPrincipal>,
    Path(link_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected = services::delete_link_by_id(&app_state.db_pool, link_id).await?;
    if rows_affected == 0 {
        return Err(AppError::NotFound("Link not found".to_string()));
    }
    info!(link_id, admin = ?principal, "Link removed by admin.");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_api_keys(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<api_key::Model>>, AppError> {
    Ok(Json(services::list_api_keys(&app_state.db_pool).await?))
}

async fn create_api_key(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<CreatedApiKeyResponse>), AppError> {
    let issued = api_key_auth::issue_api_key(
        &app_state.db_pool,
        &payload.name,
        app_state.config.password_hash_cost,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedApiKeyResponse {
            id: issued.record.id,
            name: issued.record.name,
            prefix: issued.record.prefix,
            key: issued.secret,
        }),
    ))
}

async fn revoke_api_key(
    State(app_state): State<Arc<AppState>>,
    Path(key_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected = services::revoke_api_key(&app_state.db_pool, key_id).await?;
    if rows_affected == 0 {
        return Err(AppError::NotFound("API key not found".to_string()));
    }
    info!(key_id, "API key revoked.");
    Ok(StatusCode::NO_CONTENT)
}
