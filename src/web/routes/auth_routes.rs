use axum::{
    extract::{Extension, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use std::sync::Arc;
use tracing::info;

use crate::services::auth_service;
use crate::web::middleware::auth::AUTH_COOKIE;
use crate::web::models::{
    AuthenticatedUser, LoginRequest, SignupRequest, SignupResponse, SuccessResponse, UserResponse,
};
use crate::web::{AppError, AppState};

async fn signup_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let response = auth_service::register_user(
        &app_state.db_pool,
        payload,
        &app_state.config,
        app_state.notifier.as_ref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn verify_handler(
    State(app_state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let verified = auth_service::verify_email(&app_state.db_pool, &token).await?;
    info!(user_id = verified.id, "Email address verified.");
    Ok(Json(SuccessResponse::ok()))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let login_response =
        auth_service::login_user(&app_state.db_pool, payload, &app_state.config).await?;

    let auth_cookie = Cookie::build((AUTH_COOKIE, login_response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    let cookie_value = auth_cookie
        .to_string()
        .parse()
        .map_err(|_| AppError::InternalServerError("Invalid auth cookie header".to_string()))?;

    let mut response = Json(login_response).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie_value);
    Ok(response)
}

async fn me_handler(Extension(authenticated_user): Extension<AuthenticatedUser>) -> Json<UserResponse> {
    Json(UserResponse {
        id: authenticated_user.id,
        username: authenticated_user.username,
        role: authenticated_user.role,
    })
}

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup_handler))
        .route("/verify/{token}", post(verify_handler))
        .route("/login", post(login_handler))
}

pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me_handler))
}
