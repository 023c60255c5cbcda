use chrono::Utc;
use common::{ParticipationMode, RegistrationType, TasksGrouping};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    pub short_description: String,
    pub description: String, // in Markdown

    #[sea_orm(default_value = false)]
    pub is_visible_in_list: bool,

    pub registration_type: RegistrationType,
    pub participation_mode: ParticipationMode,
    pub tasks_grouping: TasksGrouping,

    pub start_time: DateTimeUtc,
    pub finish_time: DateTimeUtc,
    /// Only for open and moderated registration.
    pub registration_start_time: Option<DateTimeUtc>,
    pub registration_finish_time: Option<DateTimeUtc>,

    #[sea_orm(has_many)]
    pub participants: HasMany<super::participant::Entity>,
    #[sea_orm(has_many)]
    pub attempts: HasMany<super::attempt::Entity>,
    #[sea_orm(has_many)]
    pub categories: HasMany<super::category::Entity>,
    #[sea_orm(has_many, via = "contest_task")]
    pub tasks: HasMany<super::task::Entity>,
    #[sea_orm(has_many)]
    pub opening_policies: HasMany<super::opening_policy::Entity>,
    #[sea_orm(has_many)]
    pub manual_opens: HasMany<super::manual_opened_task::Entity>,
    #[sea_orm(has_many)]
    pub news: HasMany<super::news::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_started(&self) -> bool {
        self.start_time <= Utc::now()
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time <= Utc::now()
    }

    pub fn is_running(&self) -> bool {
        let now = Utc::now();
        self.start_time <= now && now < self.finish_time
    }

    /// Self-registration requires an open/moderated contest and an active
    /// registration window.
    pub fn can_register_now(&self) -> bool {
        if !self.registration_type.allows_self_registration() {
            return false;
        }
        let now = Utc::now();
        match (self.registration_start_time, self.registration_finish_time) {
            (Some(start), Some(finish)) => start <= now && now < finish,
            _ => false,
        }
    }
}
