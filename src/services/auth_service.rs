use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::db::entities::user;
use crate::db::services::{self, NewUser};
use crate::server::config::ServerConfig;
use crate::services::notifier::VerificationNotifier;
use crate::services::random_hex;
use crate::web::error::AppError;
use crate::web::models::{Claims, LoginRequest, LoginResponse, SignupRequest, SignupResponse};

pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 32;
const VERIFICATION_TOKEN_BYTES: usize = 32;

/// Usernames appear in public profile URLs, so they are limited to URL-safe characters.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "Username must be between 1 and {MAX_USERNAME_LEN} characters."
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AppError::InvalidInput(
            "Username may only contain letters, digits, '_', '.' and '-'.".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long."
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::PasswordHashingError(e.to_string()))
}

pub async fn register_user(
    db: &DatabaseConnection,
    req: SignupRequest,
    config: &ServerConfig,
    notifier: &dyn VerificationNotifier,
) -> Result<SignupResponse, AppError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();
    validate_username(&username)?;
    if !email.contains('@') {
        return Err(AppError::InvalidInput("A valid email address is required.".to_string()));
    }
    validate_password(&req.password)?;

    let password_hash = hash_password(&req.password, config.password_hash_cost)?;
    let verification_token = random_hex(VERIFICATION_TOKEN_BYTES);

    let created = services::create_user_with_profile(
        db,
        NewUser {
            username,
            email,
            password_hash,
            verification_token: verification_token.clone(),
        },
    )
    .await
    .map_err(|e| {
        AppError::from_db_conflict(
            crate::db::flatten_transaction_error(e),
            "Username or email already exists",
        )
    })?;

    let verify_url = format!(
        "{}/verify/{}",
        config.app_url.trim_end_matches('/'),
        verification_token
    );
    // Signup succeeds even when the message cannot be delivered.
    if let Err(e) = notifier
        .send_verification(&created.email, &created.username, &verify_url)
        .await
    {
        warn!(user_id = created.id, error = %e, "Failed to send verification message.");
    }

    info!(user_id = created.id, username = %created.username, "User registered.");
    Ok(SignupResponse {
        success: true,
        message: "Verification email sent".to_string(),
    })
}

pub async fn verify_email(db: &DatabaseConnection, token: &str) -> Result<user::Model, AppError> {
    services::verify_user_by_token(db, token)
        .await?
        .ok_or_else(|| AppError::InvalidInput("Invalid or expired verification token".to_string()))
}

pub async fn login_user(
    db: &DatabaseConnection,
    req: LoginRequest,
    config: &ServerConfig,
) -> Result<LoginResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput("Email and password are required.".to_string()));
    }

    let user = services::get_user_by_email(db, &req.email.trim().to_lowercase())
        .await?
        .ok_or(AppError::UserNotFound)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_verified {
        return Err(AppError::EmailNotVerified);
    }

    create_jwt_for_user(&user, &config.jwt_secret, config.token_ttl_hours)
}

pub fn create_jwt_for_user(
    user: &user::Model,
    jwt_secret: &str,
    ttl_hours: i64,
) -> Result<LoginResponse, AppError> {
    let expiration = (Utc::now() + Duration::hours(ttl_hours)).timestamp();
    let exp = usize::try_from(expiration)
        .map_err(|_| AppError::TokenCreationError("Token expiry out of range".to_string()))?;

    let claims = Claims {
        sub: user.username.clone(),
        user_id: user.id,
        role: user.role,
        exp,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse {
        token,
        user_id: user.id,
        username: user.username.clone(),
    })
}

pub fn decode_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding error.");
        AppError::InvalidCredentials
    })
}
