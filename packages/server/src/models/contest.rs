use chrono::{DateTime, Utc};
use common::{ParticipationMode, RegistrationType, TasksGrouping};
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_markdown, validate_name};
use crate::entity::participant::ParticipantKind;
use crate::entity::{contest, participant};
use crate::error::AppError;
use crate::opening::PolicySpec;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContestRequest {
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_visible_in_list: bool,
    pub registration_type: RegistrationType,
    pub participation_mode: ParticipationMode,
    pub tasks_grouping: TasksGrouping,
    pub start_time: DateTime<Utc>,
    pub finish_time: DateTime<Utc>,
    pub registration_start_time: Option<DateTime<Utc>>,
    pub registration_finish_time: Option<DateTime<Utc>>,
    /// Opening policies attached at creation. Defaults to all-open.
    pub opening_policies: Option<Vec<PolicySpec>>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateContestRequest {
    pub name: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub is_visible_in_list: Option<bool>,
    pub registration_type: Option<RegistrationType>,
    pub participation_mode: Option<ParticipationMode>,
    /// Immutable once tasks are attached.
    pub tasks_grouping: Option<TasksGrouping>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub registration_start_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub registration_finish_time: Option<Option<DateTime<Utc>>>,
    /// Replaces the whole policy list when present (delete before insert).
    pub opening_policies: Option<Vec<PolicySpec>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestResponse {
    pub id: i32,
    pub name: String,
    pub short_description: String,
    pub description: String,
    pub is_visible_in_list: bool,
    pub registration_type: RegistrationType,
    pub participation_mode: ParticipationMode,
    pub tasks_grouping: TasksGrouping,
    pub start_time: DateTime<Utc>,
    pub finish_time: DateTime<Utc>,
    pub registration_start_time: Option<DateTime<Utc>>,
    pub registration_finish_time: Option<DateTime<Utc>>,
    pub opening_policies: Vec<PolicySpec>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContestResponse {
    pub fn from_model(m: contest::Model, opening_policies: Vec<PolicySpec>) -> Self {
        Self {
            id: m.id,
            name: m.name,
            short_description: m.short_description,
            description: m.description,
            is_visible_in_list: m.is_visible_in_list,
            registration_type: m.registration_type,
            participation_mode: m.participation_mode,
            tasks_grouping: m.tasks_grouping,
            start_time: m.start_time,
            finish_time: m.finish_time,
            registration_start_time: m.registration_start_time,
            registration_finish_time: m.registration_finish_time,
            opening_policies,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestListItem {
    pub id: i32,
    pub name: String,
    pub short_description: String,
    pub registration_type: RegistrationType,
    pub participation_mode: ParticipationMode,
    pub start_time: DateTime<Utc>,
    pub finish_time: DateTime<Utc>,
}

impl From<contest::Model> for ContestListItem {
    fn from(m: contest::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            short_description: m.short_description,
            registration_type: m.registration_type,
            participation_mode: m.participation_mode,
            start_time: m.start_time,
            finish_time: m.finish_time,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddParticipantRequest {
    /// For individual contests.
    pub user_id: Option<i32>,
    /// For team contests.
    pub team_id: Option<i32>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateParticipantStatusRequest {
    pub is_approved: Option<bool>,
    pub is_disqualified: Option<bool>,
    pub is_visible_in_scoreboard: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ParticipantResponse {
    pub id: i32,
    pub contest_id: i32,
    pub kind: ParticipantKind,
    pub user_id: Option<i32>,
    pub team_id: Option<i32>,
    pub name: String,
    pub is_approved: bool,
    pub is_disqualified: bool,
    pub is_visible_in_scoreboard: bool,
    pub created_at: DateTime<Utc>,
}

impl ParticipantResponse {
    pub fn from_model(m: participant::Model, name: String) -> Self {
        Self {
            id: m.id,
            contest_id: m.contest_id,
            kind: m.kind,
            user_id: m.user_id,
            team_id: m.team_id,
            name,
            is_approved: m.is_approved,
            is_disqualified: m.is_disqualified,
            is_visible_in_scoreboard: m.is_visible_in_scoreboard,
            created_at: m.created_at,
        }
    }
}

/// Shared window checks for create and update.
fn validate_windows(
    start: DateTime<Utc>,
    finish: DateTime<Utc>,
    registration_start: Option<DateTime<Utc>>,
    registration_finish: Option<DateTime<Utc>>,
    registration_type: RegistrationType,
) -> Result<(), AppError> {
    if finish <= start {
        return Err(AppError::Validation(
            "finish_time must be after start_time".into(),
        ));
    }
    match (registration_start, registration_finish) {
        (None, None) => {
            if registration_type.allows_self_registration() {
                return Err(AppError::Validation(
                    "Open and moderated registration need a registration window".into(),
                ));
            }
        }
        (Some(reg_start), Some(reg_finish)) => {
            if reg_finish <= reg_start {
                return Err(AppError::Validation(
                    "registration_finish_time must be after registration_start_time".into(),
                ));
            }
            // The window must precede or overlap the contest window.
            if reg_start > finish {
                return Err(AppError::Validation(
                    "Registration cannot start after the contest finishes".into(),
                ));
            }
        }
        _ => {
            return Err(AppError::Validation(
                "Registration window needs both a start and a finish".into(),
            ));
        }
    }
    Ok(())
}

pub fn validate_create_contest(req: &CreateContestRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Contest name", 256)?;
    validate_markdown(&req.short_description, "Short description")?;
    validate_markdown(&req.description, "Description")?;
    validate_windows(
        req.start_time,
        req.finish_time,
        req.registration_start_time,
        req.registration_finish_time,
        req.registration_type,
    )
}

pub fn validate_update_contest(
    req: &UpdateContestRequest,
    existing: &contest::Model,
) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name, "Contest name", 256)?;
    }
    if let Some(ref short) = req.short_description {
        validate_markdown(short, "Short description")?;
    }
    if let Some(ref description) = req.description {
        validate_markdown(description, "Description")?;
    }

    // Cross-field validation against existing values.
    let start = req.start_time.unwrap_or(existing.start_time);
    let finish = req.finish_time.unwrap_or(existing.finish_time);
    let reg_start = match req.registration_start_time {
        Some(v) => v,
        None => existing.registration_start_time,
    };
    let reg_finish = match req.registration_finish_time {
        Some(v) => v,
        None => existing.registration_finish_time,
    };
    let registration_type = req.registration_type.unwrap_or(existing.registration_type);

    validate_windows(start, finish, reg_start, reg_finish, registration_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn base_request() -> CreateContestRequest {
        CreateContestRequest {
            name: "Spring CTF".into(),
            short_description: String::new(),
            description: String::new(),
            is_visible_in_list: true,
            registration_type: RegistrationType::Open,
            participation_mode: ParticipationMode::Individual,
            tasks_grouping: TasksGrouping::OneByOne,
            start_time: t(10),
            finish_time: t(20),
            registration_start_time: Some(t(8)),
            registration_finish_time: Some(t(12)),
            opening_policies: None,
        }
    }

    #[test]
    fn accepts_registration_overlapping_the_contest() {
        assert!(validate_create_contest(&base_request()).is_ok());
    }

    #[test]
    fn rejects_inverted_contest_window() {
        let mut req = base_request();
        req.finish_time = t(9);
        assert!(validate_create_contest(&req).is_err());
    }

    #[test]
    fn rejects_registration_window_after_the_contest() {
        let mut req = base_request();
        req.registration_start_time = Some(t(21));
        req.registration_finish_time = Some(t(22));
        assert!(validate_create_contest(&req).is_err());
    }

    #[test]
    fn open_registration_requires_a_window() {
        let mut req = base_request();
        req.registration_start_time = None;
        req.registration_finish_time = None;
        assert!(validate_create_contest(&req).is_err());

        req.registration_type = RegistrationType::Closed;
        assert!(validate_create_contest(&req).is_ok());
    }

    #[test]
    fn rejects_half_open_registration_window() {
        let mut req = base_request();
        req.registration_finish_time = None;
        assert!(validate_create_contest(&req).is_err());
    }
}
