use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 hash, never the plaintext.
    pub password: String,
    pub role: String,
    /// Used only for outbound notifications.
    pub email: Option<String>,

    #[sea_orm(has_many)]
    pub attempts: HasMany<super::attempt::Entity>,
    #[sea_orm(has_many)]
    pub participations: HasMany<super::participant::Entity>,
    #[sea_orm(has_many)]
    pub captained_teams: HasMany<super::team::Entity>,
    #[sea_orm(has_many)]
    pub team_memberships: HasMany<super::team_member::Entity>,
    #[sea_orm(has_many)]
    pub news: HasMany<super::news::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
