use axum::{
    extract::{Extension, Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::db::services::{self, ProfileChanges, ProfileView};
use crate::services::appearance::{self, AppearanceCatalog};
use crate::web::models::{
    AuthenticatedUser, LinkResponse, PublicProfileResponse, UpdateProfileRequest,
};
use crate::web::{AppError, AppState};

pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_own_profile).post(update_own_profile))
}

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/{username}", get(get_public_profile))
}

pub async fn appearance_handler() -> Json<AppearanceCatalog> {
    Json(appearance::catalog())
}

async fn get_own_profile(
    State(app_state): State<Arc<AppState>>,
    Extension(authenticated_user): Extension<AuthenticatedUser>,
) -> Result<Json<ProfileView>, AppError> {
    let profile = services::get_profile_view(&app_state.db_pool, authenticated_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    Ok(Json(profile))
}

async fn update_own_profile(
    State(app_state): State<Arc<AppState>>,
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileView>, AppError> {
    if let Some(theme) = payload.theme.as_deref() {
        if !appearance::is_known_theme(theme) {
            return Err(AppError::InvalidInput(format!("Unknown theme '{theme}'.")));
        }
    }
    if let Some(font) = payload.font_family.as_deref() {
        if !appearance::is_known_font(font) {
            return Err(AppError::InvalidInput(format!("Unknown font '{font}'.")));
        }
    }
    if payload.display_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError::InvalidInput("Display name cannot be empty.".to_string()));
    }

    let db = &app_state.db_pool;
    let changes = ProfileChanges {
        display_name: payload.display_name,
        bio: payload.bio,
        avatar_url: payload.avatar_url,
        theme: payload.theme,
        font_family: payload.font_family,
        bg_image_url: payload.bg_image_url,
    };
    services::update_profile(db, authenticated_user.id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    let profile = services::get_profile_view(db, authenticated_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    Ok(Json(profile))
}

async fn get_public_profile(
    State(app_state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfileResponse>, AppError> {
    let db = &app_state.db_pool;
    let profile = services::get_profile_view_by_username(db, &username)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    let links = services::get_active_links_by_user_id(db, profile.user_id).await?;

    Ok(Json(PublicProfileResponse {
        profile,
        links: links.into_iter().map(LinkResponse::from).collect(),
    }))
}
