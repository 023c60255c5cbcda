use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{team, team_member, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::team::*;
use crate::state::AppState;
use crate::utils::password::generate_invite_code;

async fn team_members<C: ConnectionTrait>(
    db: &C,
    team_id: i32,
) -> Result<Vec<TeamMemberItem>, AppError> {
    let rows = team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .find_also_related(user::Entity)
        .order_by_asc(team_member::Column::JoinedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(member, user_model)| TeamMemberItem {
            user_id: member.user_id,
            username: user_model.map(|u| u.username).unwrap_or_default(),
        })
        .collect())
}

#[utoipa::path(
    post,
    path = "/api/v1/teams",
    tag = "Teams",
    operation_id = "createTeam",
    summary = "Create a team",
    description = "The creator becomes captain and first member. The returned invite code is \
        what teammates use to join.",
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = TeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Team name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_team(&payload)?;

    let txn = state.db.begin().await?;
    let now = chrono::Utc::now();

    let new_team = team::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        captain_id: Set(auth_user.user_id),
        invite_code: Set(generate_invite_code()),
        created_at: Set(now),
        ..Default::default()
    };
    let model = match new_team.insert(&txn).await {
        Ok(model) => model,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict("Team name is already taken".into()));
        }
        Err(e) => return Err(e.into()),
    };

    team_member::ActiveModel {
        team_id: Set(model.id),
        user_id: Set(auth_user.user_id),
        joined_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    let members = team_members(&state.db, model.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(TeamResponse::from_model(model, members, true)),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/teams/join",
    tag = "Teams",
    operation_id = "joinTeam",
    summary = "Join a team by invite code",
    request_body = JoinTeamRequest,
    responses(
        (status = 200, description = "Joined", body = TeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No team with this invite code (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already a member (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn join_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<JoinTeamRequest>,
) -> Result<Json<TeamResponse>, AppError> {
    validate_join_team(&payload)?;

    let txn = state.db.begin().await?;
    let model = team::Entity::find()
        .filter(team::Column::InviteCode.eq(payload.invite_code.trim()))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("No team with this invite code".into()))?;

    let membership = team_member::ActiveModel {
        team_id: Set(model.id),
        user_id: Set(auth_user.user_id),
        joined_at: Set(chrono::Utc::now()),
    };
    match membership.insert(&txn).await {
        Ok(_) => {}
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict("Already a member of this team".into()));
        }
        Err(e) => return Err(e.into()),
    }
    txn.commit().await?;

    let members = team_members(&state.db, model.id).await?;
    Ok(Json(TeamResponse::from_model(model, members, true)))
}

#[utoipa::path(
    get,
    path = "/api/v1/teams/{id}",
    tag = "Teams",
    operation_id = "getTeam",
    summary = "Get a team",
    description = "The invite code is included for members only.",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team", body = TeamResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(team_id = %id))]
pub async fn get_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TeamResponse>, AppError> {
    let model = team::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))?;

    let members = team_members(&state.db, id).await?;
    let is_member = members.iter().any(|m| m.user_id == auth_user.user_id);

    Ok(Json(TeamResponse::from_model(model, members, is_member)))
}
