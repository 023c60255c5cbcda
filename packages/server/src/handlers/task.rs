use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::TasksGrouping;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{attempt, category, contest_task, task};
use crate::error::{AppError, ErrorBody};
use crate::evaluation::statement_spec;
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::task::*;
use crate::state::AppState;
use crate::statements::generate_statement;
use crate::utils::contest::{
    check_contest_visible, find_contest, find_task_in_contest, open_tasks_for,
    participant_for_user, participant_name, solved_task_ids,
};

fn spec_to_json<T: serde::Serialize>(spec: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(spec)
        .map_err(|e| AppError::Internal(format!("Spec serialization failed: {e}")))
}

async fn find_task<C: ConnectionTrait>(db: &C, id: i32) -> Result<task::Model, AppError> {
    task::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    tag = "Tasks",
    operation_id = "createTask",
    summary = "Create a task",
    description = "The checker and statement specs are validated up front so broken \
        configurations never reach participants. `max_score` is fixed at creation.",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Task name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("task:manage")?;
    validate_create_task(&payload)?;

    let now = chrono::Utc::now();
    let new_task = task::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        max_score: Set(payload.max_score),
        checker: Set(spec_to_json(&payload.checker)?),
        statement: Set(spec_to_json(&payload.statement)?),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_task
        .insert(&state.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("A task with this name already exists".into())
            }
            _ => AppError::from(e),
        })?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from_model(model)?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    operation_id = "getTask",
    summary = "Get a task with its checker configuration",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task details", body = TaskResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Task not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(task_id = %id))]
pub async fn get_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TaskResponse>, AppError> {
    auth_user.require_permission("task:manage")?;
    let model = find_task(&state.db, id).await?;
    Ok(Json(TaskResponse::from_model(model)?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    operation_id = "updateTask",
    summary = "Update a task's name, checker or statement",
    params(("id" = i32, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Task not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Task name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(task_id = %id))]
pub async fn update_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    auth_user.require_permission("task:manage")?;
    validate_update_task(&payload)?;

    let txn = state.db.begin().await?;
    let existing = find_task(&txn, id).await?;

    let mut active: task::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(ref checker) = payload.checker {
        active.checker = Set(spec_to_json(checker)?);
    }
    if let Some(ref statement) = payload.statement {
        active.statement = Set(spec_to_json(statement)?);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("A task with this name already exists".into())
        }
        _ => AppError::from(e),
    })?;
    txn.commit().await?;

    Ok(Json(TaskResponse::from_model(model)?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    operation_id = "deleteTask",
    summary = "Delete a task",
    description = "Refused once any attempt references the task.",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Task not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Task has attempts (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(task_id = %id))]
pub async fn delete_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("task:manage")?;

    let txn = state.db.begin().await?;
    let existing = find_task(&txn, id).await?;

    let has_attempts = attempt::Entity::find()
        .filter(attempt::Column::TaskId.eq(id))
        .one(&txn)
        .await?
        .is_some();
    if has_attempts {
        return Err(AppError::Conflict(
            "Tasks with recorded attempts cannot be deleted".into(),
        ));
    }

    let files = crate::entity::task_file::Entity::find()
        .filter(crate::entity::task_file::Column::TaskId.eq(id))
        .all(&txn)
        .await?;

    contest_task::Entity::delete_many()
        .filter(contest_task::Column::TaskId.eq(id))
        .exec(&txn)
        .await?;
    crate::entity::manual_opened_task::Entity::delete_many()
        .filter(crate::entity::manual_opened_task::Column::TaskId.eq(id))
        .exec(&txn)
        .await?;
    crate::entity::task_file::Entity::delete_many()
        .filter(crate::entity::task_file::Column::TaskId.eq(id))
        .exec(&txn)
        .await?;
    let active: task::ActiveModel = existing.into();
    active.delete(&txn).await?;
    txn.commit().await?;

    // Stored bytes are cleaned up after the rows are gone; a leftover blob
    // is harmless if this is interrupted.
    for file in files {
        state.scripts.evict(&file.stored_path);
        if let Ok(stored) = common::storage::StoredPath::parse(&file.stored_path) {
            let _ = state.files.delete(&stored).await;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn next_task_position<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
) -> Result<i32, AppError> {
    let max_pos: Option<i32> = contest_task::Entity::find()
        .filter(contest_task::Column::ContestId.eq(contest_id))
        .select_only()
        .column_as(contest_task::Column::Position.max(), "max_pos")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    max_pos
        .unwrap_or(-1)
        .checked_add(1)
        .ok_or_else(|| AppError::Validation("Position overflow".into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/tasks",
    tag = "Contest Tasks",
    operation_id = "attachTask",
    summary = "Attach a task to a contest",
    description = "By-categories contests require `category_id`; one-by-one contests forbid it, \
        so a task is never both in a category and in the flat list.",
    params(("id" = i32, Path, description = "Contest ID")),
    request_body = AttachTaskRequest,
    responses(
        (status = 201, description = "Task attached"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest, task or category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Task already attached (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id))]
pub async fn attach_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
    AppJson(payload): AppJson<AttachTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:manage")?;
    validate_attach_task(&payload)?;

    let txn = state.db.begin().await?;
    let contest_model = find_contest(&txn, contest_id).await?;
    find_task(&txn, payload.task_id).await?;

    let category_id = match contest_model.tasks_grouping {
        TasksGrouping::ByCategories => {
            let category_id = payload.category_id.ok_or_else(|| {
                AppError::Validation("category_id is required for this contest".into())
            })?;
            category::Entity::find_by_id(category_id)
                .one(&txn)
                .await?
                .filter(|c| c.contest_id == contest_id)
                .ok_or_else(|| AppError::NotFound("Category not found".into()))?;
            Some(category_id)
        }
        TasksGrouping::OneByOne => {
            if payload.category_id.is_some() {
                return Err(AppError::Validation(
                    "This contest keeps tasks in a flat list, not categories".into(),
                ));
            }
            None
        }
    };

    let position = match payload.position {
        Some(p) => p,
        None => next_task_position(&txn, contest_id).await?,
    };

    let link = contest_task::ActiveModel {
        contest_id: Set(contest_id),
        task_id: Set(payload.task_id),
        category_id: Set(category_id),
        position: Set(position),
    };
    match link.insert(&txn).await {
        Ok(_) => {}
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict("Task is already in this contest".into()));
        }
        Err(e) => return Err(e.into()),
    }
    txn.commit().await?;

    state.cache.invalidate_contest(contest_id);

    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    delete,
    path = "/api/v1/contests/{id}/tasks/{task_id}",
    tag = "Contest Tasks",
    operation_id = "detachTask",
    summary = "Detach a task from a contest",
    description = "The task itself is kept.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("task_id" = i32, Path, description = "Task ID"),
    ),
    responses(
        (status = 204, description = "Task detached"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Task not in contest (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id, task_id))]
pub async fn detach_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, task_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:manage")?;

    let txn = state.db.begin().await?;
    let (link, _task) = find_task_in_contest(&txn, contest_id, task_id).await?;
    let active: contest_task::ActiveModel = link.into();
    active.delete(&txn).await?;
    txn.commit().await?;

    state.cache.invalidate_contest(contest_id);

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/tasks",
    tag = "Contest Tasks",
    operation_id = "listContestTasks",
    summary = "List a contest's tasks with open/solved markers",
    description = "Markers are computed for the calling participant by unioning all attached \
        opening policies. Cached per viewer until the next correct submission.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Task list", body = ContestTaskListResponse),
        (status = 400, description = "Contest not started (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id))]
pub async fn list_contest_tasks(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;

    let is_manager = auth_user.has_permission("contest:manage");
    if !contest_model.is_started() && !is_manager {
        return Err(AppError::Validation(format!(
            "{} has not started yet",
            contest_model.name
        )));
    }

    let participant = participant_for_user(&state.db, &contest_model, auth_user.user_id).await?;
    let cache_key = crate::cache::FragmentCache::task_list_key(
        contest_id,
        participant.as_ref().map(|p| p.id),
    );
    if let Some(cached) = state.cache.get(&cache_key) {
        return Ok(([("content-type", "application/json")], cached).into_response());
    }

    let links = contest_task::Entity::find()
        .filter(contest_task::Column::ContestId.eq(contest_id))
        .find_also_related(task::Entity)
        .order_by_asc(contest_task::Column::Position)
        .all(&state.db)
        .await?;

    let open = open_tasks_for(&state.db, &contest_model, participant.as_ref()).await?;
    let solved = match participant {
        Some(ref p) => solved_task_ids(&state.db, contest_id, Some(p.id)).await?,
        None => Default::default(),
    };

    let tasks = links
        .into_iter()
        .map(|(link, task_model)| {
            let task_model =
                task_model.ok_or_else(|| AppError::Internal("Task row missing".into()))?;
            Ok(ContestTaskItem {
                task_id: link.task_id,
                name: task_model.name,
                max_score: task_model.max_score,
                category_id: link.category_id,
                position: link.position,
                is_open: is_manager || open.contains(&link.task_id),
                is_solved: solved.contains(&link.task_id),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let response = ContestTaskListResponse { contest_id, tasks };
    let body = serde_json::to_string(&response)
        .map_err(|e| AppError::Internal(format!("Task list serialization failed: {e}")))?;
    state.cache.set(cache_key, body.clone());

    Ok(([("content-type", "application/json")], body).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/tasks/{task_id}",
    tag = "Contest Tasks",
    operation_id = "viewTask",
    summary = "View a task's statement",
    description = "Requires the task to be open for the calling participant (organizers bypass). \
        Lists the shared and participant-scoped files next to the statement.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("task_id" = i32, Path, description = "Task ID"),
    ),
    responses(
        (status = 200, description = "Task statement", body = TaskViewResponse),
        (status = 400, description = "Contest not started (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Task is closed (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest or task not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id, task_id))]
pub async fn view_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, task_id)): Path<(i32, i32)>,
) -> Result<Json<TaskViewResponse>, AppError> {
    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;

    let is_manager = auth_user.has_permission("contest:manage");
    if !contest_model.is_started() && !is_manager {
        return Err(AppError::Validation("Contest has not started yet".into()));
    }

    let (_link, task_model) = find_task_in_contest(&state.db, contest_id, task_id).await?;
    let participant = participant_for_user(&state.db, &contest_model, auth_user.user_id).await?;

    if !is_manager {
        let open = open_tasks_for(&state.db, &contest_model, participant.as_ref()).await?;
        if !open.contains(&task_id) {
            return Err(AppError::PermissionDenied);
        }
    }

    let spec = statement_spec(&task_model)?;
    let name = match participant {
        Some(ref p) => Some(participant_name(&state.db, p).await?),
        None => None,
    };

    // Generated statements may live in a wasm module that is not loaded yet.
    if let crate::statements::StatementSpec::Wasm { ref module } = spec
        && !state.scripts.is_loaded(module)
    {
        let stored = common::storage::StoredPath::parse(module)
            .map_err(|e| AppError::Internal(format!("Bad statement module reference: {e}")))?;
        let bytes = state.files.read(&stored).await?;
        state
            .scripts
            .load(module, bytes)
            .map_err(|e| AppError::Internal(format!("Statement module failed to load: {e}")))?;
    }

    let statement = generate_statement(
        &spec,
        &state.scripts,
        participant.as_ref().map(|p| p.id),
        name.as_deref(),
    )
    .map_err(|e| AppError::Internal(format!("Statement generation failed: {e}")))?;

    // Files can be shared or scoped to this participant; private ones are
    // for organizers only.
    let mut file_filter = Condition::any().add(crate::entity::task_file::Column::ParticipantId.is_null());
    if let Some(ref p) = participant {
        file_filter = file_filter.add(crate::entity::task_file::Column::ParticipantId.eq(p.id));
    }
    let mut files_select = crate::entity::task_file::Entity::find()
        .filter(crate::entity::task_file::Column::TaskId.eq(task_id))
        .filter(file_filter);
    if !auth_user.has_permission("task:manage") {
        files_select =
            files_select.filter(crate::entity::task_file::Column::IsPrivate.eq(false));
    }
    let files = files_select
        .order_by_asc(crate::entity::task_file::Column::Name)
        .all(&state.db)
        .await?;

    let participant_score = match participant {
        Some(ref p) => {
            let scores: Vec<i32> = attempt::Entity::find()
                .filter(attempt::Column::ContestId.eq(contest_id))
                .filter(attempt::Column::TaskId.eq(task_id))
                .filter(attempt::Column::ParticipantId.eq(p.id))
                .filter(attempt::Column::IsChecked.eq(true))
                .select_only()
                .column(attempt::Column::Score)
                .into_tuple()
                .all(&state.db)
                .await?;
            scores.into_iter().max()
        }
        None => None,
    };

    Ok(Json(TaskViewResponse {
        task_id,
        name: task_model.name,
        max_score: task_model.max_score,
        statement,
        files: files.into_iter().map(Into::into).collect(),
        participant_score,
    }))
}
