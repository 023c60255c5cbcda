use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::task_file;

#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskFileResponse {
    pub id: i32,
    pub task_id: i32,
    pub participant_id: Option<i32>,
    pub name: String,
    pub content_type: String,
    pub is_private: bool,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

impl From<task_file::Model> for TaskFileResponse {
    fn from(m: task_file::Model) -> Self {
        Self {
            id: m.id,
            task_id: m.task_id,
            participant_id: m.participant_id,
            name: m.name,
            content_type: m.content_type,
            is_private: m.is_private,
            size: m.size,
            created_at: m.created_at,
        }
    }
}
