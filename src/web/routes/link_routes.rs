use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::db::services::{self, LinkChanges, NewLink};
use crate::web::models::{
    AuthenticatedUser, CreateLinkRequest, LinkResponse, ReorderRequest, ReorderResponse,
    SuccessResponse, UpdateLinkRequest,
};
use crate::web::{AppError, AppState};

// --- Route Handlers ---

async fn list_links_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<LinkResponse>>, AppError> {
    let links = services::get_links_by_user_id(&app_state.db_pool, authenticated_user.id).await?;
    Ok(Json(links.into_iter().map(LinkResponse::from).collect()))
}

async fn create_link_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    if payload.title.trim().is_empty() || payload.url.trim().is_empty() {
        return Err(AppError::InvalidInput("Title and URL are required.".to_string()));
    }
    if payload.price.is_some_and(|price| price < 0) {
        return Err(AppError::InvalidInput("Price cannot be negative.".to_string()));
    }

    let created = services::create_link(
        &app_state.db_pool,
        authenticated_user.id,
        NewLink {
            title: payload.title,
            url: payload.url,
            icon: payload.icon,
            color: payload.color,
            price: payload.price,
            is_product: payload.is_product.unwrap_or(false),
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn update_link_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(link_id): Path<i32>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    if payload.position.is_some_and(|position| position < 0) {
        return Err(AppError::InvalidInput("Position cannot be negative.".to_string()));
    }
    if payload.price.flatten().is_some_and(|price| price < 0) {
        return Err(AppError::InvalidInput("Price cannot be negative.".to_string()));
    }

    let changes = LinkChanges {
        title: payload.title,
        url: payload.url,
        icon: payload.icon,
        color: payload.color,
        price: payload.price,
        is_product: payload.is_product,
        active: payload.active,
        position: payload.position,
    };
    let updated = services::update_link(&app_state.db_pool, link_id, authenticated_user.id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Link not found or permission denied".to_string()))?;
    Ok(Json(updated.into()))
}

async fn reorder_links_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<ReorderResponse>, AppError> {
    let batch_size = payload.links.len();
    let updated =
        services::reorder_links(&app_state.db_pool, authenticated_user.id, payload.links).await?;
    info!(user_id = authenticated_user.id, batch_size, updated, "Links reordered.");
    Ok(Json(ReorderResponse {
        success: true,
        updated,
    }))
}

async fn delete_link_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(link_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected =
        services::delete_link(&app_state.db_pool, link_id, authenticated_user.id).await?;
    if rows_affected > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Link not found or permission denied".to_string()))
    }
}

async fn click_link_handler(
    State(app_state): State<Arc<AppState>>,
    Path(link_id): Path<i32>,
) -> Result<Json<SuccessResponse>, AppError> {
    let rows_affected = services::record_click(&app_state.db_pool, link_id).await?;
    if rows_affected > 0 {
        Ok(Json(SuccessResponse::ok()))
    } else {
        Err(AppError::NotFound("Link not found".to_string()))
    }
}

// --- Router ---

/// Owner-only link management. Must be wrapped in the auth middleware.
pub fn create_links_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_links_handler).post(create_link_handler))
        .route("/reorder", put(reorder_links_handler))
        .route("/{link_id}", put(update_link_handler).delete(delete_link_handler))
}

/// Public click-through counter.
pub fn create_public_links_router() -> Router<Arc<AppState>> {
    Router::new().route("/{link_id}/click", post(click_link_handler))
}
