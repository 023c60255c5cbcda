use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership of a task in a contest's task set.
///
/// `category_id` is set iff the contest groups tasks by categories, so a
/// task is never both in a category and in the flat list.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contest_task")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub contest_id: i32,
    #[sea_orm(primary_key)]
    pub task_id: i32,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: Option<super::contest::Entity>,
    #[sea_orm(belongs_to, from = "task_id", to = "id")]
    pub task: Option<super::task::Entity>,

    pub category_id: Option<i32>,
    #[sea_orm(belongs_to, from = "category_id", to = "id")]
    pub category: Option<super::category::Entity>,

    #[sea_orm(default_value = 0)]
    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
