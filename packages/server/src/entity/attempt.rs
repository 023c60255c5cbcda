use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One submitted answer and its evaluation state.
///
/// Creation-time fields (contest, task, participant, author, answer,
/// created_at) are immutable. Evaluation fields are written once by the
/// synchronous check and afterwards only by reviewer edits. An attempt the
/// checker postponed or failed on stays `is_checked = false` until a
/// reviewer finalizes it.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attempt")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub contest_id: i32,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,

    pub task_id: i32,
    #[sea_orm(belongs_to, from = "task_id", to = "id")]
    pub task: HasOne<super::task::Entity>,

    pub participant_id: i32,
    #[sea_orm(belongs_to, from = "participant_id", to = "id")]
    pub participant: HasOne<super::participant::Entity>,

    /// The user who typed the answer (relevant for team participants).
    pub author_id: i32,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: HasOne<super::user::Entity>,

    #[sea_orm(column_type = "Text")]
    pub answer: String,

    #[sea_orm(default_value = false)]
    pub is_checked: bool,
    #[sea_orm(default_value = false)]
    pub is_correct: bool,
    #[sea_orm(default_value = false)]
    pub is_plagiarized: bool,
    /// Participant id the answer was copied from; no FK relation on purpose,
    /// the source participant may be removed independently.
    pub plagiarized_from: Option<i32>,

    #[sea_orm(default_value = 0)]
    pub score: i32,

    #[sea_orm(column_type = "Text")]
    pub public_comment: String,
    /// Reviewer-only; checker failures store their diagnostics here.
    #[sea_orm(column_type = "Text")]
    pub private_comment: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
