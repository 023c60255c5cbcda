use axum::Json;
use axum::extract::{Path, State};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::entity::{manual_opened_task, participant};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::opening::PolicySpec;
use crate::state::AppState;
use crate::utils::contest::{
    find_contest, find_task_in_contest, is_task_open, load_policies, participant_name,
};

#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskOpenRow {
    pub participant_id: i32,
    pub name: String,
    pub is_open: bool,
    pub manually_opened: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskOpensResponse {
    pub contest_id: i32,
    pub task_id: i32,
    /// Whether any attached policy honors manual opens at all.
    pub manual_opening_available: bool,
    pub globally_opened: bool,
    pub participants: Vec<TaskOpenRow>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ToggleOpenRequest {
    /// Omit to toggle the global (everyone) override.
    pub participant_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ToggleOpenResponse {
    /// Whether a manual-open row exists after the toggle.
    pub manually_opened: bool,
    /// Set when closing had no visible effect because another policy still
    /// opens the task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

async fn manual_opening_available<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
) -> Result<bool, AppError> {
    Ok(load_policies(db, contest_id)
        .await?
        .iter()
        .any(|p| matches!(p, PolicySpec::Manual)))
}

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/tasks/{task_id}/opens",
    tag = "Task Opening",
    operation_id = "getTaskOpens",
    summary = "Per-participant open state of a task",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("task_id" = i32, Path, description = "Task ID"),
    ),
    responses(
        (status = 200, description = "Open matrix", body = TaskOpensResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest or task not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id, task_id))]
pub async fn get_task_opens(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, task_id)): Path<(i32, i32)>,
) -> Result<Json<TaskOpensResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;

    let contest_model = find_contest(&state.db, contest_id).await?;
    find_task_in_contest(&state.db, contest_id, task_id).await?;

    let manual_rows = manual_opened_task::Entity::find()
        .filter(manual_opened_task::Column::ContestId.eq(contest_id))
        .filter(manual_opened_task::Column::TaskId.eq(task_id))
        .all(&state.db)
        .await?;
    let globally_opened = manual_rows.iter().any(|r| r.participant_id.is_none());

    let participants = participant::Entity::find()
        .filter(participant::Column::ContestId.eq(contest_id))
        .order_by_asc(participant::Column::Id)
        .all(&state.db)
        .await?;

    let mut rows = Vec::with_capacity(participants.len());
    for p in &participants {
        rows.push(TaskOpenRow {
            participant_id: p.id,
            name: participant_name(&state.db, p).await?,
            is_open: is_task_open(&state.db, &contest_model, task_id, Some(p)).await?,
            manually_opened: manual_rows
                .iter()
                .any(|r| r.participant_id == Some(p.id)),
        });
    }

    Ok(Json(TaskOpensResponse {
        contest_id,
        task_id,
        manual_opening_available: manual_opening_available(&state.db, contest_id).await?,
        globally_opened,
        participants: rows,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/tasks/{task_id}/opens",
    tag = "Task Opening",
    operation_id = "toggleTaskOpen",
    summary = "Toggle a manual open override",
    description = "XOR semantics: an existing override is removed, a missing one is created, so \
        toggling twice restores the original state. The response warns when closing has no \
        visible effect because another policy still opens the task.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("task_id" = i32, Path, description = "Task ID"),
    ),
    request_body = ToggleOpenRequest,
    responses(
        (status = 200, description = "Toggled", body = ToggleOpenResponse),
        (status = 400, description = "Manual opening not available (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest, task or participant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id, task_id))]
pub async fn toggle_task_open(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, task_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<ToggleOpenRequest>,
) -> Result<Json<ToggleOpenResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;

    let contest_model = find_contest(&state.db, contest_id).await?;
    find_task_in_contest(&state.db, contest_id, task_id).await?;

    if !manual_opening_available(&state.db, contest_id).await? {
        return Err(AppError::Validation(
            "Manual task opening is not enabled for this contest".into(),
        ));
    }

    let target = match payload.participant_id {
        Some(pid) => Some(
            participant::Entity::find_by_id(pid)
                .one(&state.db)
                .await?
                .filter(|p| p.contest_id == contest_id)
                .ok_or_else(|| AppError::NotFound("Participant not found".into()))?,
        ),
        None => None,
    };
    let target_id = target.as_ref().map(|p| p.id);

    let txn = state.db.begin().await?;
    let existing = manual_opened_task::Entity::find()
        .filter(manual_opened_task::Column::ContestId.eq(contest_id))
        .filter(manual_opened_task::Column::TaskId.eq(task_id))
        .filter(match target_id {
            Some(pid) => manual_opened_task::Column::ParticipantId.eq(pid),
            None => manual_opened_task::Column::ParticipantId.is_null(),
        })
        .one(&txn)
        .await?;

    let (manually_opened, warning) = match existing {
        Some(row) => {
            let active: manual_opened_task::ActiveModel = row.into();
            active.delete(&txn).await?;
            txn.commit().await?;

            // Removing the override may leave the task open via another
            // policy; tell the operator closing did nothing visible.
            let still_open =
                is_task_open(&state.db, &contest_model, task_id, target.as_ref()).await?;
            let warning = still_open.then(|| {
                "Task stays open through another policy; removing the override does not close it"
                    .to_string()
            });
            (false, warning)
        }
        None => {
            manual_opened_task::ActiveModel {
                contest_id: Set(contest_id),
                task_id: Set(task_id),
                participant_id: Set(target_id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            txn.commit().await?;
            (true, None)
        }
    };

    state.cache.invalidate_contest(contest_id);

    Ok(Json(ToggleOpenResponse {
        manually_opened,
        warning,
    }))
}
