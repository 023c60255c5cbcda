use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    pub captain_id: i32,
    #[sea_orm(belongs_to, from = "captain_id", to = "id")]
    pub captain: HasOne<super::user::Entity>,

    /// Shared out-of-band with teammates; knowing it is what lets them join.
    #[sea_orm(unique)]
    pub invite_code: String,

    #[sea_orm(has_many)]
    pub members: HasMany<super::team_member::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
