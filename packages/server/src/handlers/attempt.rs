use std::cmp;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{attempt, participant};
use crate::error::{AppError, ErrorBody};
use crate::evaluation::{apply_outcome, checker_spec, run_checker};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::attempt::*;
use crate::models::shared::Pagination;
use crate::ratelimit;
use crate::state::AppState;
use crate::utils::contest::{
    check_contest_visible, find_contest, find_task_in_contest, is_task_open, participant_for_user,
};

/// Pre-insert submission gate. Checks run in a fixed order and a failed
/// check rejects the submission without creating an attempt row.
fn submission_gate<'a>(
    participant: Option<&'a participant::Model>,
    contest_finished: bool,
) -> Result<&'a participant::Model, AppError> {
    let Some(p) = participant else {
        return Err(AppError::Validation(
            "You are not registered for this contest".into(),
        ));
    };
    if p.is_disqualified {
        return Err(AppError::PermissionDenied);
    }
    if contest_finished {
        return Err(AppError::Validation(
            "Contest is finished, submissions are closed".into(),
        ));
    }
    Ok(p)
}

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/tasks/{task_id}/attempts",
    tag = "Attempts",
    operation_id = "submitAttempt",
    summary = "Submit an answer",
    description = "Rejects, in order: missing registration, disqualification, finished contest, \
        exceeded per-minute budget, closed task, malformed answer. Otherwise the attempt is \
        recorded and checked synchronously; postponed or failed checks leave it awaiting manual \
        review.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("task_id" = i32, Path, description = "Task ID"),
    ),
    request_body = SubmitAttemptRequest,
    responses(
        (status = 201, description = "Attempt recorded and checked", body = AttemptResponse),
        (status = 400, description = "Gate rejection (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Disqualified or task closed (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest or task not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id, task_id, user_id = auth_user.user_id))]
pub async fn submit_attempt(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, task_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("attempt:submit")?;

    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;
    let (_link, task_model) = find_task_in_contest(&state.db, contest_id, task_id).await?;

    if !contest_model.is_started() && !auth_user.has_permission("contest:manage") {
        return Err(AppError::Validation("Contest has not started yet".into()));
    }

    let registered = participant_for_user(&state.db, &contest_model, auth_user.user_id).await?;
    let participant = submission_gate(registered.as_ref(), contest_model.is_finished())?.clone();

    ratelimit::note_and_check(
        &state.db,
        contest_id,
        participant.id,
        state.config.submission.max_attempts_per_minute,
        Utc::now(),
    )
    .await?;

    if !auth_user.has_permission("contest:manage")
        && !is_task_open(&state.db, &contest_model, task_id, Some(&participant)).await?
    {
        return Err(AppError::PermissionDenied);
    }

    validate_submit_attempt(&payload, state.config.submission.max_answer_length)?;

    // The attempt is committed unchecked first: a crash during evaluation
    // leaves it waiting for manual review instead of losing it.
    let txn = state.db.begin().await?;
    let model = attempt::ActiveModel {
        contest_id: Set(contest_id),
        task_id: Set(task_id),
        participant_id: Set(participant.id),
        author_id: Set(auth_user.user_id),
        answer: Set(payload.answer.trim().to_string()),
        is_checked: Set(false),
        is_correct: Set(false),
        is_plagiarized: Set(false),
        plagiarized_from: Set(None),
        score: Set(0),
        public_comment: Set(String::new()),
        private_comment: Set(String::new()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    let spec = checker_spec(&task_model)?;
    let outcome = run_checker(
        &spec,
        &model.answer,
        participant.id,
        task_model.max_score,
        &state.scripts,
        &state.files,
    )
    .await;

    let was_correct = outcome.is_correct();
    let mut active: attempt::ActiveModel = model.into();
    apply_outcome(&mut active, outcome);
    let model = active.update(&state.db).await?;

    if was_correct {
        // Scoreboard and task-list fragments for this contest are stale now.
        state.cache.invalidate_contest(contest_id);
    }

    info!(
        attempt_id = model.id,
        checked = model.is_checked,
        correct = model.is_correct,
        "Attempt evaluated"
    );

    Ok((
        StatusCode::CREATED,
        Json(AttemptResponse::for_viewer(
            model,
            true,
            auth_user.has_permission("attempt:review"),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/attempts",
    tag = "Attempts",
    operation_id = "listAttempts",
    summary = "List attempts in a contest",
    description = "Participants see their own attempts; `attempt:view_all` holders see everyone's \
        and may filter by participant.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        AttemptListQuery,
    ),
    responses(
        (status = 200, description = "Attempts", body = AttemptListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(contest_id))]
pub async fn list_attempts(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
    Query(query): Query<AttemptListQuery>,
) -> Result<Json<AttemptListResponse>, AppError> {
    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;

    let can_view_all = auth_user.has_permission("attempt:view_all");
    let is_reviewer = auth_user.has_permission("attempt:review");

    let own_participant = participant_for_user(&state.db, &contest_model, auth_user.user_id).await?;

    let page = cmp::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);

    let mut select = attempt::Entity::find().filter(attempt::Column::ContestId.eq(contest_id));

    if can_view_all {
        if let Some(pid) = query.participant_id {
            select = select.filter(attempt::Column::ParticipantId.eq(pid));
        }
    } else {
        let Some(ref own) = own_participant else {
            return Ok(Json(AttemptListResponse {
                data: vec![],
                pagination: Pagination {
                    page,
                    per_page,
                    total: 0,
                    total_pages: 0,
                },
            }));
        };
        select = select.filter(attempt::Column::ParticipantId.eq(own.id));
    }

    if let Some(task_id) = query.task_id {
        select = select.filter(attempt::Column::TaskId.eq(task_id));
    }

    let total = select.clone().count(&state.db).await?;
    let total_pages = total.div_ceil(per_page);

    let rows = select
        .order_by_desc(attempt::Column::CreatedAt)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let own_id = own_participant.map(|p| p.id);
    let data = rows
        .into_iter()
        .map(|m| {
            let is_owner = own_id == Some(m.participant_id);
            AttemptResponse::for_viewer(m, is_owner, is_reviewer)
        })
        .collect();

    Ok(Json(AttemptListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/attempts/{attempt_id}",
    tag = "Attempts",
    operation_id = "getAttempt",
    summary = "Get one attempt",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("attempt_id" = i32, Path, description = "Attempt ID"),
    ),
    responses(
        (status = 200, description = "Attempt", body = AttemptResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Attempt not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id, attempt_id))]
pub async fn get_attempt(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, attempt_id)): Path<(i32, i32)>,
) -> Result<Json<AttemptResponse>, AppError> {
    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;

    let model = attempt::Entity::find_by_id(attempt_id)
        .one(&state.db)
        .await?
        .filter(|a| a.contest_id == contest_id)
        .ok_or_else(|| AppError::NotFound("Attempt not found".into()))?;

    let is_reviewer = auth_user.has_permission("attempt:review");
    let own_participant = participant_for_user(&state.db, &contest_model, auth_user.user_id).await?;
    let is_owner = own_participant.map(|p| p.id) == Some(model.participant_id);

    if !is_owner && !is_reviewer && !auth_user.has_permission("attempt:view_all") {
        return Err(AppError::NotFound("Attempt not found".into()));
    }

    Ok(Json(AttemptResponse::for_viewer(model, is_owner, is_reviewer)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/contests/{id}/attempts/{attempt_id}",
    tag = "Attempts",
    operation_id = "reviewAttempt",
    summary = "Finalize or correct an attempt's evaluation",
    description = "Direct reviewer edit of the evaluation fields. This is how postponed and \
        failed checks get finalized. The score is not clamped to the task's maximum.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("attempt_id" = i32, Path, description = "Attempt ID"),
    ),
    request_body = ReviewAttemptRequest,
    responses(
        (status = 200, description = "Attempt updated", body = AttemptResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Attempt not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id, attempt_id))]
pub async fn review_attempt(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((contest_id, attempt_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<ReviewAttemptRequest>,
) -> Result<Json<AttemptResponse>, AppError> {
    auth_user.require_permission("attempt:review")?;
    validate_review_attempt(&payload)?;

    let txn = state.db.begin().await?;
    let existing = attempt::Entity::find_by_id(attempt_id)
        .one(&txn)
        .await?
        .filter(|a| a.contest_id == contest_id)
        .ok_or_else(|| AppError::NotFound("Attempt not found".into()))?;

    let mut active: attempt::ActiveModel = existing.into();
    if let Some(is_checked) = payload.is_checked {
        active.is_checked = Set(is_checked);
    }
    if let Some(is_correct) = payload.is_correct {
        active.is_correct = Set(is_correct);
    }
    if let Some(score) = payload.score {
        active.score = Set(score);
    }
    if let Some(public_comment) = payload.public_comment {
        active.public_comment = Set(public_comment);
    }
    if let Some(private_comment) = payload.private_comment {
        active.private_comment = Set(private_comment);
    }
    if let Some(is_plagiarized) = payload.is_plagiarized {
        active.is_plagiarized = Set(is_plagiarized);
    }
    if let Some(plagiarized_from) = payload.plagiarized_from {
        active.plagiarized_from = Set(plagiarized_from);
    }
    let model = active.update(&txn).await?;
    txn.commit().await?;

    // A reviewer edit can change scores and solves.
    state.cache.invalidate_contest(contest_id);

    Ok(Json(AttemptResponse::for_viewer(model, false, true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::participant::ParticipantKind;

    fn sample_participant(disqualified: bool) -> participant::Model {
        participant::Model {
            id: 1,
            contest_id: 1,
            kind: ParticipantKind::Individual,
            user_id: Some(1),
            team_id: None,
            is_approved: true,
            is_disqualified: disqualified,
            is_visible_in_scoreboard: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn gate_rejects_unregistered_actors() {
        assert!(matches!(
            submission_gate(None, false),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn gate_rejects_disqualified_participants() {
        let p = sample_participant(true);
        assert!(matches!(
            submission_gate(Some(&p), false),
            Err(AppError::PermissionDenied)
        ));
    }

    #[test]
    fn gate_rejects_finished_contests() {
        let p = sample_participant(false);
        assert!(matches!(
            submission_gate(Some(&p), true),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn gate_admits_registered_active_participants() {
        let p = sample_participant(false);
        assert!(submission_gate(Some(&p), false).is_ok());
    }
}
