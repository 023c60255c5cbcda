use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use common::storage::StoredPath;
use sea_orm::*;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::entity::{task, task_file};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::task_file::TaskFileResponse;
use crate::state::AppState;
use crate::utils::contest::{
    check_contest_visible, find_contest, find_task_in_contest, is_task_open, participant_for_user,
};
use crate::utils::filename::validate_flat_filename;

pub fn upload_body_limit(max_file_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_file_size as usize + 64 * 1024)
}

#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/files",
    tag = "Task Files",
    operation_id = "uploadTaskFile",
    summary = "Upload a file to a task",
    description = "Multipart upload. `file` is required; optional `participant_id` scopes the \
        file to one participant and `is_private` hides it from participants entirely (used for \
        wasm checker modules). Re-uploading the same name replaces the content in place.",
    params(("id" = i32, Path, description = "Task ID")),
    request_body(content_type = "multipart/form-data", description = "File plus optional scoping fields"),
    responses(
        (status = 201, description = "File stored", body = TaskFileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Task not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(task_id))]
pub async fn upload_task_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("task:manage")?;

    task::Entity::find_by_id(task_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut participant_id: Option<i32> = None;
    let mut is_private = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                file_name = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                file_bytes = Some(data.to_vec());
            }
            Some("participant_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {e}")))?;
                participant_id = Some(text.trim().parse().map_err(|_| {
                    AppError::Validation("participant_id must be an integer".into())
                })?);
            }
            Some("is_private") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {e}")))?;
                is_private = matches!(text.trim(), "true" | "1");
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let data = file_bytes.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let filename =
        file_name.ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
    let filename = validate_flat_filename(&filename)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    let content_type = mime_guess::from_path(&filename)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let size = data.len() as i64;
    let now = Utc::now();

    // Same (task, participant, name) replaces the bytes in place and keeps
    // the stored path stable.
    let existing = task_file::Entity::find()
        .filter(task_file::Column::TaskId.eq(task_id))
        .filter(match participant_id {
            Some(pid) => task_file::Column::ParticipantId.eq(pid),
            None => task_file::Column::ParticipantId.is_null(),
        })
        .filter(task_file::Column::Name.eq(&filename))
        .one(&state.db)
        .await?;

    let model = match existing {
        Some(row) => {
            let stored = StoredPath::parse(&row.stored_path)
                .map_err(|e| AppError::Internal(format!("Corrupt stored path: {e}")))?;
            state.files.replace(&stored, &data).await?;
            // A replaced module must not keep its old instance around.
            state.scripts.evict(&row.stored_path);

            let mut active: task_file::ActiveModel = row.into();
            active.content_type = Set(content_type);
            active.is_private = Set(is_private);
            active.size = Set(size);
            active.update(&state.db).await?
        }
        None => {
            let stored = state.files.save(&data).await?;
            task_file::ActiveModel {
                task_id: Set(task_id),
                participant_id: Set(participant_id),
                name: Set(filename),
                stored_path: Set(stored.to_string()),
                content_type: Set(content_type),
                is_private: Set(is_private),
                size: Set(size),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&state.db)
            .await?
        }
    };

    Ok((StatusCode::CREATED, Json(TaskFileResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}/files",
    tag = "Task Files",
    operation_id = "listTaskFiles",
    summary = "List all files of a task (organizer view)",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Files", body = Vec<TaskFileResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Task not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(task_id))]
pub async fn list_task_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
) -> Result<Json<Vec<TaskFileResponse>>, AppError> {
    auth_user.require_permission("task:manage")?;

    task::Entity::find_by_id(task_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let rows = task_file::Entity::find()
        .filter(task_file::Column::TaskId.eq(task_id))
        .order_by_asc(task_file::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}/files/{file_id}",
    tag = "Task Files",
    operation_id = "deleteTaskFile",
    summary = "Delete a task file",
    params(
        ("id" = i32, Path, description = "Task ID"),
        ("file_id" = i32, Path, description = "File ID"),
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(task_id, file_id))]
pub async fn delete_task_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((task_id, file_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("task:manage")?;

    let row = task_file::Entity::find_by_id(file_id)
        .one(&state.db)
        .await?
        .filter(|f| f.task_id == task_id)
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    let stored_path = row.stored_path.clone();
    let active: task_file::ActiveModel = row.into();
    active.delete(&state.db).await?;

    state.scripts.evict(&stored_path);
    if let Ok(stored) = StoredPath::parse(&stored_path) {
        let _ = state.files.delete(&stored).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/tasks/{task_id}/files/{file_id}",
    tag = "Task Files",
    operation_id = "downloadTaskFile",
    summary = "Download a task file",
    description = "Streams the bytes with the stored content type and an attachment disposition. \
        Requires the task to be open for the caller; participant-scoped files are served only to \
        their participant, private files only to organizers.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("task_id" = i32, Path, description = "Task ID"),
        ("file_id" = i32, Path, description = "File ID"),
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Task closed (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id, task_id, file_id))]
pub async fn download_task_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, task_id, file_id)): Path<(i32, i32, i32)>,
) -> Result<Response, AppError> {
    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;
    find_task_in_contest(&state.db, contest_id, task_id).await?;

    let row = task_file::Entity::find_by_id(file_id)
        .one(&state.db)
        .await?
        .filter(|f| f.task_id == task_id)
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    let is_manager = auth_user.has_permission("task:manage");
    let participant = participant_for_user(&state.db, &contest_model, auth_user.user_id).await?;

    if !is_manager {
        if row.is_private {
            return Err(AppError::NotFound("File not found".into()));
        }
        if let Some(owner) = row.participant_id
            && participant.as_ref().map(|p| p.id) != Some(owner)
        {
            return Err(AppError::NotFound("File not found".into()));
        }
        if !is_task_open(&state.db, &contest_model, task_id, participant.as_ref()).await? {
            return Err(AppError::PermissionDenied);
        }
    }

    let stored = StoredPath::parse(&row.stored_path)
        .map_err(|e| AppError::Internal(format!("Corrupt stored path: {e}")))?;
    let reader = state.files.open(&stored).await?;
    let stream = ReaderStream::new(reader);

    let disposition = format!("attachment; filename=\"{}\"", row.name);
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, row.content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, row.size)
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Response build failed: {e}")))?;

    Ok(response)
}
