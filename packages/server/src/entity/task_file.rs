use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task_file")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "task_participant_name")]
    pub task_id: i32,
    #[sea_orm(belongs_to, from = "task_id", to = "id")]
    pub task: HasOne<super::task::Entity>,

    /// NULL if the file is for all participants.
    #[sea_orm(unique_key = "task_participant_name")]
    pub participant_id: Option<i32>,
    #[sea_orm(belongs_to, from = "participant_id", to = "id")]
    pub participant: Option<super::participant::Entity>,

    /// File name shown to participants.
    #[sea_orm(unique_key = "task_participant_name")]
    pub name: String,

    /// Unpredictable relative path inside the file store.
    pub stored_path: String,

    pub content_type: String,

    /// Private files are visible to organizers only (e.g. wasm checker
    /// modules and per-participant generator inputs).
    #[sea_orm(default_value = false)]
    pub is_private: bool,

    pub size: i64,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
