use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};
use serde::Serialize;

use crate::db::entities::{profile, user};
use crate::db::enums::Plan;

// --- Profile Service Functions ---

/// A profile joined with the owning account's public fields.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProfileView {
    pub user_id: i32,
    pub username: String,
    pub plan: Plan,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub theme: String,
    pub font_family: String,
    pub bg_image_url: Option<String>,
}

impl ProfileView {
    fn from_parts(profile: profile::Model, user: user::Model) -> Self {
        Self {
            user_id: profile.user_id,
            username: user.username,
            plan: user.plan,
            display_name: profile.display_name,
            bio: profile.bio,
            avatar_url: profile.avatar_url,
            theme: profile.theme,
            font_family: profile.font_family,
            bg_image_url: profile.bg_image_url,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub theme: Option<String>,
    pub font_family: Option<String>,
    pub bg_image_url: Option<String>,
}

pub async fn get_profile_view(db: &DatabaseConnection, user_id: i32) -> Result<Option<ProfileView>, DbErr> {
    let found = profile::Entity::find_by_id(user_id)
        .find_also_related(user::Entity)
        .one(db)
        .await?;
    Ok(match found {
        Some((profile, Some(user))) => Some(ProfileView::from_parts(profile, user)),
        _ => None,
    })
}

pub async fn get_profile_view_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<ProfileView>, DbErr> {
    let found = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .find_also_related(profile::Entity)
        .one(db)
        .await?;
    Ok(match found {
        Some((user, Some(profile))) => Some(ProfileView::from_parts(profile, user)),
        _ => None,
    })
}

/// Applies the given changes; empty strings clear the optional image fields.
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: i32,
    changes: ProfileChanges,
) -> Result<Option<profile::Model>, DbErr> {
    let Some(existing) = profile::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(None);
    };

    let mut active_profile = existing.into_active_model();
    if let Some(display_name) = changes.display_name {
        active_profile.display_name = Set(display_name);
    }
    if let Some(bio) = changes.bio {
        active_profile.bio = Set(bio);
    }
    if let Some(avatar_url) = changes.avatar_url {
        active_profile.avatar_url = Set(Some(avatar_url).filter(|s| !s.is_empty()));
    }
    if let Some(theme) = changes.theme {
        active_profile.theme = Set(theme);
    }
    if let Some(font_family) = changes.font_family {
        active_profile.font_family = Set(font_family);
    }
    if let Some(bg_image_url) = changes.bg_image_url {
        active_profile.bg_image_url = Set(Some(bg_image_url).filter(|s| !s.is_empty()));
    }
    active_profile.updated_at = Set(Utc::now());

    active_profile.update(db).await.map(Some)
}
