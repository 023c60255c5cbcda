use sea_orm::entity::prelude::*;
use sea_orm::prelude::StringLen;
use serde::{Deserialize, Serialize};

/// Discriminator for the two participant variants. Exactly one of
/// `user_id`/`team_id` is set, matching the kind.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    DeriveActiveEnum,
    EnumIter,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    #[sea_orm(string_value = "individual")]
    Individual,
    #[sea_orm(string_value = "team")]
    Team,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participant")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "contest_user")]
    pub contest_id: i32,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,

    pub kind: ParticipantKind,

    #[sea_orm(unique_key = "contest_user")]
    pub user_id: Option<i32>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: Option<super::user::Entity>,

    pub team_id: Option<i32>,
    #[sea_orm(belongs_to, from = "team_id", to = "id")]
    pub team: Option<super::team::Entity>,

    #[sea_orm(default_value = true)]
    pub is_approved: bool,
    #[sea_orm(default_value = false)]
    pub is_disqualified: bool,
    #[sea_orm(default_value = true)]
    pub is_visible_in_scoreboard: bool,

    #[sea_orm(has_many)]
    pub attempts: HasMany<super::attempt::Entity>,
    #[sea_orm(has_many)]
    pub manual_opens: HasMany<super::manual_opened_task::Entity>,
    #[sea_orm(has_many)]
    pub files: HasMany<super::task_file::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
