use axum::Json;
use axum::extract::State;
use common::TasksGrouping;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{category, contest, contest_task, task};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::import::{ImportResponse, TaskImport, parse_import_document};
use crate::models::task::{CreateTaskRequest, validate_create_task};
use crate::state::AppState;

/// Upsert one imported task by name and return (task id, created?).
async fn upsert_task(txn: &DatabaseTransaction, item: &TaskImport) -> Result<(i32, bool), AppError> {
    let checker = serde_json::to_value(&item.checker)
        .map_err(|e| AppError::Internal(format!("Checker serialization failed: {e}")))?;
    let statement = serde_json::to_value(&item.statement)
        .map_err(|e| AppError::Internal(format!("Statement serialization failed: {e}")))?;

    let now = chrono::Utc::now();
    let existing = task::Entity::find()
        .filter(task::Column::Name.eq(item.name.trim()))
        .one(txn)
        .await?;

    match existing {
        Some(row) => {
            let id = row.id;
            let mut active: task::ActiveModel = row.into();
            // max_score stays as created; imports may not rescale scored
            // attempts.
            active.checker = Set(checker);
            active.statement = Set(statement);
            active.updated_at = Set(now);
            active.update(txn).await?;
            Ok((id, false))
        }
        None => {
            let model = task::ActiveModel {
                name: Set(item.name.trim().to_string()),
                max_score: Set(item.max_score),
                checker: Set(checker),
                statement: Set(statement),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            Ok((model.id, true))
        }
    }
}

/// Attach an imported task to its contest, resolving the category by name.
async fn attach_imported_task(
    txn: &DatabaseTransaction,
    item: &TaskImport,
    task_id: i32,
) -> Result<(), AppError> {
    let Some(contest_id) = item.contest_id else {
        if item.category.is_some() {
            return Err(AppError::Validation(format!(
                "Task '{}': category given without contest_id",
                item.name
            )));
        }
        return Ok(());
    };

    let contest_model = contest::Entity::find_by_id(contest_id)
        .one(txn)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Task '{}': contest {contest_id} does not exist",
                item.name
            ))
        })?;

    let category_id = match (&item.category, contest_model.tasks_grouping) {
        (Some(name), TasksGrouping::ByCategories) => {
            let cat = category::Entity::find()
                .filter(category::Column::ContestId.eq(contest_id))
                .filter(category::Column::Name.eq(name.trim()))
                .one(txn)
                .await?
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "Task '{}': category '{name}' not found in contest {contest_id}",
                        item.name
                    ))
                })?;
            Some(cat.id)
        }
        (Some(_), TasksGrouping::OneByOne) => {
            return Err(AppError::Validation(format!(
                "Task '{}': contest {contest_id} keeps tasks in a flat list",
                item.name
            )));
        }
        (None, TasksGrouping::ByCategories) => {
            return Err(AppError::Validation(format!(
                "Task '{}': contest {contest_id} requires a category",
                item.name
            )));
        }
        (None, TasksGrouping::OneByOne) => None,
    };

    if contest_task::Entity::find_by_id((contest_id, task_id))
        .one(txn)
        .await?
        .is_some()
    {
        return Ok(()); // Idempotent re-import.
    }

    let max_pos: Option<i32> = contest_task::Entity::find()
        .filter(contest_task::Column::ContestId.eq(contest_id))
        .select_only()
        .column_as(contest_task::Column::Position.max(), "max_pos")
        .into_tuple::<Option<i32>>()
        .one(txn)
        .await?
        .flatten();

    contest_task::ActiveModel {
        contest_id: Set(contest_id),
        task_id: Set(task_id),
        category_id: Set(category_id),
        position: Set(max_pos.unwrap_or(-1) + 1),
    }
    .insert(txn)
    .await?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/import",
    tag = "Import",
    operation_id = "runImport",
    summary = "Bulk-load tasks from an operator YAML document",
    description = "Tasks are upserted by name (`update_or_create` semantics) and optionally \
        attached to a contest. Any error fails the whole import with a validation error; no \
        partial batch is intended, though upserted rows from an earlier killed run may remain.",
    request_body(content_type = "application/yaml", description = "Import document"),
    responses(
        (status = 200, description = "Import applied", body = ImportResponse),
        (status = 400, description = "Bad document or references (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, body))]
pub async fn run_import(
    auth_user: AuthUser,
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportResponse>, AppError> {
    auth_user.require_permission("import:run")?;

    let document = parse_import_document(&body)?;
    if document.tasks.is_empty() {
        return Err(AppError::Validation("Import document has no tasks".into()));
    }

    // Validate everything before touching the store so a bad entry fails
    // the import up front.
    for item in &document.tasks {
        let as_create = CreateTaskRequest {
            name: item.name.clone(),
            max_score: item.max_score,
            checker: item.checker.clone(),
            statement: item.statement.clone(),
        };
        validate_create_task(&as_create)
            .map_err(|e| prefix_validation(e, &item.name))?;
    }

    let txn = state.db.begin().await?;
    let mut created = Vec::new();
    let mut updated = Vec::new();

    for item in &document.tasks {
        let (task_id, was_created) = upsert_task(&txn, item).await?;
        attach_imported_task(&txn, item, task_id).await?;
        if was_created {
            created.push(item.name.trim().to_string());
        } else {
            updated.push(item.name.trim().to_string());
        }
    }

    txn.commit().await?;

    info!(
        created = created.len(),
        updated = updated.len(),
        user_id = auth_user.user_id,
        "Import applied"
    );

    Ok(Json(ImportResponse { created, updated }))
}

fn prefix_validation(err: AppError, task_name: &str) -> AppError {
    match err {
        AppError::Validation(msg) => AppError::Validation(format!("Task '{task_name}': {msg}")),
        other => other,
    }
}
