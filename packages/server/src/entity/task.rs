use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    /// Fixed at creation for scoring consistency.
    pub max_score: i32,

    /// Tagged `CheckerSpec` stored as JSON.
    #[sea_orm(column_type = "JsonBinary")]
    pub checker: serde_json::Value,

    /// Tagged `StatementSpec` stored as JSON.
    #[sea_orm(column_type = "JsonBinary")]
    pub statement: serde_json::Value,

    #[sea_orm(has_many)]
    pub attempts: HasMany<super::attempt::Entity>,
    #[sea_orm(has_many)]
    pub files: HasMany<super::task_file::Entity>,
    #[sea_orm(has_many, via = "contest_task")]
    pub contests: HasMany<super::contest::Entity>,
    #[sea_orm(has_many)]
    pub manual_opens: HasMany<super::manual_opened_task::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
