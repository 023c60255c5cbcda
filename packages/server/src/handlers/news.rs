use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::news;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::news::*;
use crate::state::AppState;
use crate::utils::contest::{check_contest_visible, find_contest};

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/news",
    tag = "News",
    operation_id = "listNews",
    summary = "List contest news",
    description = "Participants see published items only; `news:manage` holders see drafts too.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "News items", body = Vec<NewsResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id))]
pub async fn list_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<Json<Vec<NewsResponse>>, AppError> {
    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;

    let mut select = news::Entity::find().filter(news::Column::ContestId.eq(contest_id));
    if !auth_user.has_permission("news:manage") {
        select = select.filter(news::Column::IsPublished.eq(true));
    }

    let rows = select
        .order_by_desc(news::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/news",
    tag = "News",
    operation_id = "createNews",
    summary = "Post a news item",
    params(("id" = i32, Path, description = "Contest ID")),
    request_body = CreateNewsRequest,
    responses(
        (status = 201, description = "News created", body = NewsResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id))]
pub async fn create_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
    AppJson(payload): AppJson<CreateNewsRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("news:manage")?;
    validate_create_news(&payload)?;

    find_contest(&state.db, contest_id).await?;

    let now = chrono::Utc::now();
    let model = news::ActiveModel {
        contest_id: Set(contest_id),
        author_id: Set(auth_user.user_id),
        title: Set(payload.title.trim().to_string()),
        text: Set(payload.text),
        is_published: Set(payload.is_published),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(NewsResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/contests/{id}/news/{news_id}",
    tag = "News",
    operation_id = "updateNews",
    summary = "Edit a news item",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("news_id" = i32, Path, description = "News ID"),
    ),
    request_body = UpdateNewsRequest,
    responses(
        (status = 200, description = "News updated", body = NewsResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "News not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id, news_id))]
pub async fn update_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, news_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdateNewsRequest>,
) -> Result<Json<NewsResponse>, AppError> {
    auth_user.require_permission("news:manage")?;
    validate_update_news(&payload)?;

    let txn = state.db.begin().await?;
    let existing = news::Entity::find_by_id(news_id)
        .one(&txn)
        .await?
        .filter(|n| n.contest_id == contest_id)
        .ok_or_else(|| AppError::NotFound("News not found".into()))?;

    let mut active: news::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(text) = payload.text {
        active.text = Set(text);
    }
    if let Some(is_published) = payload.is_published {
        active.is_published = Set(is_published);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(NewsResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/contests/{id}/news/{news_id}",
    tag = "News",
    operation_id = "deleteNews",
    summary = "Delete a news item",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("news_id" = i32, Path, description = "News ID"),
    ),
    responses(
        (status = 204, description = "News deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "News not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id, news_id))]
pub async fn delete_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, news_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("news:manage")?;

    let existing = news::Entity::find_by_id(news_id)
        .one(&state.db)
        .await?
        .filter(|n| n.contest_id == contest_id)
        .ok_or_else(|| AppError::NotFound("News not found".into()))?;

    let active: news::ActiveModel = existing.into();
    active.delete(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}
