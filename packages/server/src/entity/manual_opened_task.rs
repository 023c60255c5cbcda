use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An organizer's manual override opening a task.
///
/// A NULL participant means the task is open for everyone in the contest.
/// Presence of the row means "open"; under the manual policy alone its
/// absence means "closed".
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manual_opened_task")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "contest_task_participant")]
    pub contest_id: i32,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,

    #[sea_orm(unique_key = "contest_task_participant")]
    pub task_id: i32,
    #[sea_orm(belongs_to, from = "task_id", to = "id")]
    pub task: HasOne<super::task::Entity>,

    #[sea_orm(unique_key = "contest_task_participant")]
    pub participant_id: Option<i32>,
    #[sea_orm(belongs_to, from = "participant_id", to = "id")]
    pub participant: Option<super::participant::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
