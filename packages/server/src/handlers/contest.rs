use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{ParticipationMode, RegistrationType};
use sea_orm::*;
use tracing::instrument;

use crate::entity::participant::ParticipantKind;
use crate::entity::{
    attempt, attempt_rate_bucket, category, contest, contest_task, manual_opened_task, news,
    opening_policy, participant, team, user,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::contest::*;
use crate::opening::PolicySpec;
use crate::state::AppState;
use crate::utils::contest::{check_contest_visible, find_contest, load_policies, participant_name};

/// Serialize and store a contest's policy list, replacing the previous one.
async fn replace_policies(
    txn: &DatabaseTransaction,
    contest_id: i32,
    policies: &[PolicySpec],
) -> Result<(), AppError> {
    opening_policy::Entity::delete_many()
        .filter(opening_policy::Column::ContestId.eq(contest_id))
        .exec(txn)
        .await?;
    for policy in policies {
        let spec = serde_json::to_value(policy)
            .map_err(|e| AppError::Internal(format!("Policy serialization failed: {e}")))?;
        opening_policy::ActiveModel {
            contest_id: Set(contest_id),
            spec: Set(spec),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/contests",
    tag = "Contests",
    operation_id = "createContest",
    summary = "Create a new contest",
    request_body = CreateContestRequest,
    responses(
        (status = 201, description = "Contest created", body = ContestResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_contest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateContestRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:create")?;
    validate_create_contest(&payload)?;

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;

    let new_contest = contest::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        short_description: Set(payload.short_description),
        description: Set(payload.description),
        is_visible_in_list: Set(payload.is_visible_in_list),
        registration_type: Set(payload.registration_type),
        participation_mode: Set(payload.participation_mode),
        tasks_grouping: Set(payload.tasks_grouping),
        start_time: Set(payload.start_time),
        finish_time: Set(payload.finish_time),
        registration_start_time: Set(payload.registration_start_time),
        registration_finish_time: Set(payload.registration_finish_time),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = new_contest.insert(&txn).await?;

    let policies = payload.opening_policies.unwrap_or(vec![PolicySpec::AllOpen]);
    replace_policies(&txn, model.id, &policies).await?;

    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ContestResponse::from_model(model, policies)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/contests",
    tag = "Contests",
    operation_id = "listContests",
    summary = "List contests",
    description = "Organizers see every contest; everyone else only contests marked visible.",
    responses(
        (status = 200, description = "List of contests", body = Vec<ContestListItem>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_contests(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ContestListItem>>, AppError> {
    let mut select = contest::Entity::find();
    if !auth_user.has_permission("contest:manage") {
        select = select.filter(contest::Column::IsVisibleInList.eq(true));
    }

    let contests = select
        .order_by_desc(contest::Column::StartTime)
        .all(&state.db)
        .await?;

    Ok(Json(contests.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}",
    tag = "Contests",
    operation_id = "getContest",
    summary = "Get a contest by ID",
    description = "Hidden contests answer 404 for non-organizers to prevent enumeration.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Contest details", body = ContestResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_contest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContestResponse>, AppError> {
    let model = find_contest(&state.db, id).await?;
    check_contest_visible(&auth_user, &model)?;
    let policies = load_policies(&state.db, id).await?;
    Ok(Json(ContestResponse::from_model(model, policies)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/contests/{id}",
    tag = "Contests",
    operation_id = "updateContest",
    summary = "Update a contest",
    description = "PATCH semantics. The task grouping mode is immutable once tasks are attached. \
        A present `opening_policies` array replaces the whole policy list.",
    params(("id" = i32, Path, description = "Contest ID")),
    request_body = UpdateContestRequest,
    responses(
        (status = 200, description = "Contest updated", body = ContestResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_contest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateContestRequest>,
) -> Result<Json<ContestResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;

    let txn = state.db.begin().await?;
    let existing = find_contest(&txn, id).await?;
    validate_update_contest(&payload, &existing)?;

    if let Some(new_grouping) = payload.tasks_grouping
        && new_grouping != existing.tasks_grouping
    {
        let has_tasks = contest_task::Entity::find()
            .filter(contest_task::Column::ContestId.eq(id))
            .one(&txn)
            .await?
            .is_some();
        if has_tasks {
            return Err(AppError::Conflict(
                "Task grouping cannot change once tasks are attached".into(),
            ));
        }
    }

    let mut active: contest::ActiveModel = existing.into();

    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(short_description) = payload.short_description {
        active.short_description = Set(short_description);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(is_visible_in_list) = payload.is_visible_in_list {
        active.is_visible_in_list = Set(is_visible_in_list);
    }
    if let Some(registration_type) = payload.registration_type {
        active.registration_type = Set(registration_type);
    }
    if let Some(participation_mode) = payload.participation_mode {
        active.participation_mode = Set(participation_mode);
    }
    if let Some(tasks_grouping) = payload.tasks_grouping {
        active.tasks_grouping = Set(tasks_grouping);
    }
    if let Some(start_time) = payload.start_time {
        active.start_time = Set(start_time);
    }
    if let Some(finish_time) = payload.finish_time {
        active.finish_time = Set(finish_time);
    }
    if let Some(registration_start_time) = payload.registration_start_time {
        active.registration_start_time = Set(registration_start_time);
    }
    if let Some(registration_finish_time) = payload.registration_finish_time {
        active.registration_finish_time = Set(registration_finish_time);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;

    let policies = match payload.opening_policies {
        Some(ref policies) => {
            replace_policies(&txn, id, policies).await?;
            policies.clone()
        }
        None => load_policies(&txn, id).await?,
    };

    txn.commit().await?;

    Ok(Json(ContestResponse::from_model(model, policies)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/contests/{id}",
    tag = "Contests",
    operation_id = "deleteContest",
    summary = "Delete a contest",
    description = "Refused once any attempt references the contest.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 204, description = "Contest deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Contest has attempts (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_contest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:delete")?;

    let txn = state.db.begin().await?;
    find_contest(&txn, id).await?;

    let has_attempts = attempt::Entity::find()
        .filter(attempt::Column::ContestId.eq(id))
        .one(&txn)
        .await?
        .is_some();
    if has_attempts {
        return Err(AppError::Conflict(
            "Contests with recorded attempts cannot be deleted".into(),
        ));
    }

    opening_policy::Entity::delete_many()
        .filter(opening_policy::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    manual_opened_task::Entity::delete_many()
        .filter(manual_opened_task::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    news::Entity::delete_many()
        .filter(news::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    attempt_rate_bucket::Entity::delete_many()
        .filter(attempt_rate_bucket::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    contest_task::Entity::delete_many()
        .filter(contest_task::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    category::Entity::delete_many()
        .filter(category::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    participant::Entity::delete_many()
        .filter(participant::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    contest::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/register",
    tag = "Contest Participants",
    operation_id = "registerForContest",
    summary = "Self-register for a contest",
    description = "Honors the contest's registration type and window. In team mode the team \
        captain registers the whole team by passing `team_id`. Moderated registration creates \
        an unapproved participant awaiting organizer approval.",
    params(("id" = i32, Path, description = "Contest ID")),
    request_body = AddParticipantRequest,
    responses(
        (status = 201, description = "Registered", body = ParticipantResponse),
        (status = 400, description = "Registration closed or malformed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already registered (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id))]
pub async fn register_for_contest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
    AppJson(payload): AppJson<AddParticipantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let contest_model = find_contest(&txn, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;

    if !contest_model.can_register_now() {
        return Err(AppError::Validation(
            "Registration is not open for this contest".into(),
        ));
    }

    let is_approved = contest_model.registration_type != RegistrationType::Moderated;

    let model = match contest_model.participation_mode {
        ParticipationMode::Individual => {
            insert_participant(
                &txn,
                contest_id,
                ParticipantKind::Individual,
                Some(auth_user.user_id),
                None,
                is_approved,
            )
            .await?
        }
        ParticipationMode::Team => {
            let team_id = payload.team_id.ok_or_else(|| {
                AppError::Validation("team_id is required for team contests".into())
            })?;
            let team_model = team::Entity::find_by_id(team_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("Team not found".into()))?;
            if team_model.captain_id != auth_user.user_id {
                return Err(AppError::PermissionDenied);
            }
            let already = participant::Entity::find()
                .filter(participant::Column::ContestId.eq(contest_id))
                .filter(participant::Column::TeamId.eq(team_id))
                .one(&txn)
                .await?;
            if already.is_some() {
                return Err(AppError::Conflict("Team is already registered".into()));
            }
            insert_participant(
                &txn,
                contest_id,
                ParticipantKind::Team,
                None,
                Some(team_id),
                is_approved,
            )
            .await?
        }
    };

    let name = participant_name(&txn, &model).await?;
    txn.commit().await?;

    if let Some(address) = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .and_then(|u| u.email)
    {
        let body = if is_approved {
            format!("You are registered for {}.", contest_model.name)
        } else {
            format!(
                "Your registration for {} awaits organizer approval.",
                contest_model.name
            )
        };
        state
            .mailer
            .send(&address, "Contest registration", &body)
            .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(ParticipantResponse::from_model(model, name)),
    ))
}

async fn insert_participant(
    txn: &DatabaseTransaction,
    contest_id: i32,
    kind: ParticipantKind,
    user_id: Option<i32>,
    team_id: Option<i32>,
    is_approved: bool,
) -> Result<participant::Model, AppError> {
    let new_participant = participant::ActiveModel {
        contest_id: Set(contest_id),
        kind: Set(kind),
        user_id: Set(user_id),
        team_id: Set(team_id),
        is_approved: Set(is_approved),
        is_disqualified: Set(false),
        is_visible_in_scoreboard: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    match new_participant.insert(txn).await {
        Ok(model) => Ok(model),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(AppError::Conflict("Already registered".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/participants",
    tag = "Contest Participants",
    operation_id = "listParticipants",
    summary = "List contest participants",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Participants", body = Vec<ParticipantResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id))]
pub async fn list_participants(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<Json<Vec<ParticipantResponse>>, AppError> {
    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;

    let rows = participant::Entity::find()
        .filter(participant::Column::ContestId.eq(contest_id))
        .order_by_asc(participant::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let name = participant_name(&state.db, &row).await?;
        items.push(ParticipantResponse::from_model(row, name));
    }

    Ok(Json(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/participants",
    tag = "Contest Participants",
    operation_id = "addParticipant",
    summary = "Add a participant (organizer action)",
    description = "Bypasses the registration window; the participant is approved immediately.",
    params(("id" = i32, Path, description = "Contest ID")),
    request_body = AddParticipantRequest,
    responses(
        (status = 201, description = "Participant added", body = ParticipantResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest, user or team not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already a participant (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id))]
pub async fn add_participant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
    AppJson(payload): AppJson<AddParticipantRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:manage")?;

    let txn = state.db.begin().await?;
    let contest_model = find_contest(&txn, contest_id).await?;

    let model = match contest_model.participation_mode {
        ParticipationMode::Individual => {
            let user_id = payload.user_id.ok_or_else(|| {
                AppError::Validation("user_id is required for individual contests".into())
            })?;
            user::Entity::find_by_id(user_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".into()))?;
            insert_participant(
                &txn,
                contest_id,
                ParticipantKind::Individual,
                Some(user_id),
                None,
                true,
            )
            .await?
        }
        ParticipationMode::Team => {
            let team_id = payload.team_id.ok_or_else(|| {
                AppError::Validation("team_id is required for team contests".into())
            })?;
            team::Entity::find_by_id(team_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("Team not found".into()))?;
            let already = participant::Entity::find()
                .filter(participant::Column::ContestId.eq(contest_id))
                .filter(participant::Column::TeamId.eq(team_id))
                .one(&txn)
                .await?;
            if already.is_some() {
                return Err(AppError::Conflict("Team is already registered".into()));
            }
            insert_participant(&txn, contest_id, ParticipantKind::Team, None, Some(team_id), true)
                .await?
        }
    };

    let name = participant_name(&txn, &model).await?;
    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ParticipantResponse::from_model(model, name)),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v1/contests/{id}/participants/{participant_id}",
    tag = "Contest Participants",
    operation_id = "updateParticipantStatus",
    summary = "Toggle a participant's status flags",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("participant_id" = i32, Path, description = "Participant ID"),
    ),
    request_body = UpdateParticipantStatusRequest,
    responses(
        (status = 200, description = "Participant updated", body = ParticipantResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Participant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id, participant_id))]
pub async fn update_participant_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, participant_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdateParticipantStatusRequest>,
) -> Result<Json<ParticipantResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;

    let txn = state.db.begin().await?;
    find_contest(&txn, contest_id).await?;

    let existing = participant::Entity::find_by_id(participant_id)
        .one(&txn)
        .await?
        .filter(|p| p.contest_id == contest_id)
        .ok_or_else(|| AppError::NotFound("Participant not found".into()))?;

    let mut active: participant::ActiveModel = existing.into();
    if let Some(is_approved) = payload.is_approved {
        active.is_approved = Set(is_approved);
    }
    if let Some(is_disqualified) = payload.is_disqualified {
        active.is_disqualified = Set(is_disqualified);
    }
    if let Some(is_visible_in_scoreboard) = payload.is_visible_in_scoreboard {
        active.is_visible_in_scoreboard = Set(is_visible_in_scoreboard);
    }
    let model = active.update(&txn).await?;
    txn.commit().await?;

    // Disqualification and visibility affect the rendered scoreboard.
    state.cache.invalidate_contest(contest_id);

    let name = participant_name(&state.db, &model).await?;
    Ok(Json(ParticipantResponse::from_model(model, name)))
}
