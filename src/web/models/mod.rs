use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::entities::{link, user};
use crate::db::enums::{Plan, SubscriptionStatus, UserRole};
use crate::db::services::{LinkPosition, ProfileView};

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i32,
    pub username: String,
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub user_id: i32,
    pub role: UserRole,
    pub exp: usize,
}

/// Struct to hold authenticated user details, to be passed as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
    pub role: UserRole,
}

/// Who passed the admin API key check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPrincipal {
    Bootstrap,
    ApiKey { id: i32, name: String },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

// --- Links ---

/// Wraps any value that is present in the body, `null` included, in `Some`.
/// Paired with `#[serde(default)]` so an absent field stays `None`.
fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub price: Option<i64>,
    pub is_product: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLinkRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Absent leaves the price alone, `null` removes it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub price: Option<Option<i64>>,
    pub is_product: Option<bool>,
    pub active: Option<bool>,
    pub position: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub links: Vec<LinkPosition>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReorderResponse {
    pub success: bool,
    pub updated: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub price: Option<i64>,
    pub is_product: bool,
    pub position: i32,
    pub active: bool,
    pub clicks: i64,
}

impl From<link::Model> for LinkResponse {
    fn from(model: link::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            url: model.url,
            icon: model.icon,
            color: model.color,
            price: model.price,
            is_product: model.is_product,
            position: model.position,
            active: model.active,
            clicks: model.clicks,
        }
    }
}

// --- Profiles ---

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub theme: Option<String>,
    pub font_family: Option<String>,
    pub bg_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    #[serde(flatten)]
    pub profile: ProfileView,
    pub links: Vec<LinkResponse>,
}

// --- Account ---

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// --- Subscription ---

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    pub plan: Plan,
    pub reference: String,
}

// --- Admin ---

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminUserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub plan: Plan,
    pub is_verified: bool,
    pub subscription_status: SubscriptionStatus,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for AdminUserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role: model.role,
            plan: model.plan,
            is_verified: model.is_verified,
            subscription_status: model.subscription_status,
            next_billing_date: model.next_billing_date,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub plan: Option<Plan>,
    pub role: Option<UserRole>,
    pub is_verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedApiKeyResponse {
    pub id: i32,
    pub name: String,
    pub prefix: String,
    /// Shown once; only its hash is stored.
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_link_price_distinguishes_null_from_absent() {
        let absent: UpdateLinkRequest = serde_json::from_str(r#"{"title": "shop"}"#).unwrap();
        assert_eq!(absent.price, None);

        let cleared: UpdateLinkRequest = serde_json::from_str(r#"{"price": null}"#).unwrap();
        assert_eq!(cleared.price, Some(None));

        let set: UpdateLinkRequest = serde_json::from_str(r#"{"price": 5000}"#).unwrap();
        assert_eq!(set.price, Some(Some(5000)));
    }
}
