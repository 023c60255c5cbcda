use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A task-opening policy attached to a contest.
///
/// Several policies may be attached at once; a task is open if any of them
/// opens it. Organizer edits replace the whole list (delete before insert).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "opening_policy")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub contest_id: i32,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,

    /// Tagged `PolicySpec` stored as JSON.
    #[sea_orm(column_type = "JsonBinary")]
    pub spec: serde_json::Value,
}

impl ActiveModelBehavior for ActiveModel {}
