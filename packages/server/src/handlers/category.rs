use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::TasksGrouping;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{category, contest, contest_task};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::category::*;
use crate::state::AppState;
use crate::utils::contest::{check_contest_visible, find_contest};

fn require_categorized(contest_model: &contest::Model) -> Result<(), AppError> {
    if contest_model.tasks_grouping != TasksGrouping::ByCategories {
        return Err(AppError::Validation(
            "This contest does not group tasks by categories".into(),
        ));
    }
    Ok(())
}

async fn next_category_position<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
) -> Result<i32, AppError> {
    let max_pos: Option<i32> = category::Entity::find()
        .filter(category::Column::ContestId.eq(contest_id))
        .select_only()
        .column_as(category::Column::Position.max(), "max_pos")
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
    get,
    path = "/api/v1/contests/{id}/categories",
    tag = "Categories",
    operation_id = "listCategories",
    summary = "List a contest's categories in order",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Categories", body = Vec<CategoryResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id))]
pub async fn list_categories(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;

    let rows = category::Entity::find()
        .filter(category::Column::ContestId.eq(contest_id))
        .order_by_asc(category::Column::Position)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/categories",
    tag = "Categories",
    operation_id = "createCategory",
    summary = "Add a category to a by-categories contest",
    params(("id" = i32, Path, description = "Contest ID")),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id))]
pub async fn create_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:manage")?;
    validate_create_category(&payload)?;

    let txn = state.db.begin().await?;
    let contest_model = find_contest(&txn, contest_id).await?;
    require_categorized(&contest_model)?;

    let position = match payload.position {
        Some(p) => p,
        None => next_category_position(&txn, contest_id).await?,
    };

    let model = category::ActiveModel {
        contest_id: Set(contest_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        position: Set(position),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/contests/{id}/categories/{category_id}",
    tag = "Categories",
    operation_id = "updateCategory",
    summary = "Update a category",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("category_id" = i32, Path, description = "Category ID"),
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id, category_id))]
pub async fn update_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, category_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;
    validate_update_category(&payload)?;

    let txn = state.db.begin().await?;
    let existing = category::Entity::find_by_id(category_id)
        .one(&txn)
        .await?
        .filter(|c| c.contest_id == contest_id)
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    let mut active: category::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(position) = payload.position {
        active.position = Set(position);
    }
    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(CategoryResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/contests/{id}/categories/{category_id}",
    tag = "Categories",
    operation_id = "deleteCategory",
    summary = "Delete an empty category",
    description = "Refused while tasks are still attached to the category.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("category_id" = i32, Path, description = "Category ID"),
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Category still has tasks (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id, category_id))]
pub async fn delete_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, category_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:manage")?;

    let txn = state.db.begin().await?;
    let existing = category::Entity::find_by_id(category_id)
        .one(&txn)
        .await?
        .filter(|c| c.contest_id == contest_id)
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    let has_tasks = contest_task::Entity::find()
        .filter(contest_task::Column::CategoryId.eq(Some(category_id)))
        .one(&txn)
        .await?
        .is_some();
    if has_tasks {
        return Err(AppError::Conflict(
            "Detach the category's tasks before deleting it".into(),
        ));
    }

    let active: category::ActiveModel = existing.into();
    active.delete(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
