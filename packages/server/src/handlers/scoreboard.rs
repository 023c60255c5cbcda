use axum::extract::{Path, State};
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::cache::FragmentCache;
use crate::entity::{attempt, participant};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::scoreboard::ScoreboardResponse;
use crate::scoreboard::{AttemptFacts, ScoreboardParticipant, compute_standings};
use crate::state::AppState;
use crate::utils::contest::{check_contest_visible, find_contest, participant_name};

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/scoreboard",
    tag = "Scoreboard",
    operation_id = "getScoreboard",
    summary = "Ranked standings for a contest",
    description = "Participants hidden from the scoreboard are excluded. Reviewers additionally \
        see the plagiarism overlay. The rendered board is cached per contest and invalidated by \
        correct submissions and reviewer edits.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Standings", body = ScoreboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id))]
pub async fn get_scoreboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let contest_model = find_contest(&state.db, contest_id).await?;
    check_contest_visible(&auth_user, &contest_model)?;

    let reviewer = auth_user.has_permission("attempt:review");
    let cache_key = FragmentCache::scoreboard_key(contest_id, reviewer);
    if let Some(cached) = state.cache.get(&cache_key) {
        return Ok(([("content-type", "application/json")], cached).into_response());
    }

    let rows = participant::Entity::find()
        .filter(participant::Column::ContestId.eq(contest_id))
        .filter(participant::Column::IsVisibleInScoreboard.eq(true))
        .all(&state.db)
        .await?;

    let mut participants = Vec::with_capacity(rows.len());
    for row in &rows {
        participants.push(ScoreboardParticipant {
            id: row.id,
            name: participant_name(&state.db, row).await?,
            is_disqualified: row.is_disqualified,
        });
    }

    let attempts: Vec<AttemptFacts> = attempt::Entity::find()
        .filter(attempt::Column::ContestId.eq(contest_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|a| AttemptFacts {
            attempt_id: a.id,
            participant_id: a.participant_id,
            task_id: a.task_id,
            is_checked: a.is_checked,
            is_correct: a.is_correct,
            is_plagiarized: a.is_plagiarized,
            score: a.score,
            created_at: a.created_at,
        })
        .collect();

    let standings = compute_standings(participants, &attempts);
    let response = ScoreboardResponse::from_standings(contest_id, standings, reviewer);

    let body = serde_json::to_string(&response)
        .map_err(|e| AppError::Internal(format!("Scoreboard serialization failed: {e}")))?;
    state.cache.set(cache_key, body.clone());

    Ok(([("content-type", "application/json")], body).into_response())
}
