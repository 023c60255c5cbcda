use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::validate_name;
use crate::entity::team;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTeamRequest {
    pub name: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct JoinTeamRequest {
    pub invite_code: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamMemberItem {
    pub user_id: i32,
    pub username: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamResponse {
    pub id: i32,
    pub name: String,
    pub captain_id: i32,
    /// Visible to members only; knowing it is what lets a user join.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    pub members: Vec<TeamMemberItem>,
    pub created_at: DateTime<Utc>,
}

impl TeamResponse {
    pub fn from_model(m: team::Model, members: Vec<TeamMemberItem>, is_member: bool) -> Self {
        Self {
            id: m.id,
            name: m.name,
            captain_id: m.captain_id,
            invite_code: is_member.then_some(m.invite_code),
            members,
            created_at: m.created_at,
        }
    }
}

pub fn validate_create_team(req: &CreateTeamRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Team name", 100)
}

pub fn validate_join_team(req: &JoinTeamRequest) -> Result<(), AppError> {
    if req.invite_code.trim().is_empty() {
        return Err(AppError::Validation("Invite code is required".into()));
    }
    Ok(())
}
