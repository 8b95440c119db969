use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One entry in a user's ordered list of links. Display order is ascending
/// `position` among rows sharing the same `user_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Minor currency units; only meaningful when `is_product` is set.
    pub price: Option<i64>,
    pub is_product: bool,
    pub position: i32,
    pub active: bool,
    pub clicks: i64,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade", // If a User is deleted, their links are also deleted
        on_update = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
