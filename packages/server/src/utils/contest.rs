use std::collections::HashSet;

use common::ParticipationMode;
use sea_orm::*;

use crate::entity::{
    attempt, category, contest, contest_task, manual_opened_task, opening_policy, participant,
    task, team_member,
};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::opening::{OpeningContext, PolicySpec, union_open_tasks};

/// Look up a contest by ID, returning 404 if not found.
pub async fn find_contest<C: ConnectionTrait>(db: &C, id: i32) -> Result<contest::Model, AppError> {
    contest::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Contest not found".into()))
}

/// Hidden contests answer 404 (not 403) for non-organizers to prevent
/// enumeration.
pub fn check_contest_visible(
    auth_user: &AuthUser,
    contest: &contest::Model,
) -> Result<(), AppError> {
    if contest.is_visible_in_list || auth_user.has_permission("contest:manage") {
        Ok(())
    } else {
        Err(AppError::NotFound("Contest not found".into()))
    }
}

/// Look up a task and confirm it belongs to the contest's task set.
pub async fn find_task_in_contest<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    task_id: i32,
) -> Result<(contest_task::Model, task::Model), AppError> {
    let link = contest_task::Entity::find_by_id((contest_id, task_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found in this contest".into()))?;
    let task_model = task::Entity::find_by_id(task_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok((link, task_model))
}

/// Resolve the participant record for a user, honoring the contest's
/// participation mode: their own record for individual contests, their
/// team's record for team contests.
pub async fn participant_for_user<C: ConnectionTrait>(
    db: &C,
    contest: &contest::Model,
    user_id: i32,
) -> Result<Option<participant::Model>, AppError> {
    match contest.participation_mode {
        ParticipationMode::Individual => Ok(participant::Entity::find()
            .filter(participant::Column::ContestId.eq(contest.id))
            .filter(participant::Column::UserId.eq(user_id))
            .one(db)
            .await?),
        ParticipationMode::Team => {
            let team_ids: Vec<i32> = team_member::Entity::find()
                .filter(team_member::Column::UserId.eq(user_id))
                .select_only()
                .column(team_member::Column::TeamId)
                .into_tuple()
                .all(db)
                .await?;
            if team_ids.is_empty() {
                return Ok(None);
            }
            Ok(participant::Entity::find()
                .filter(participant::Column::ContestId.eq(contest.id))
                .filter(participant::Column::TeamId.is_in(team_ids))
                .one(db)
                .await?)
        }
    }
}

/// Display name for a participant (username or team name).
pub async fn participant_name<C: ConnectionTrait>(
    db: &C,
    p: &participant::Model,
) -> Result<String, AppError> {
    if let Some(user_id) = p.user_id {
        let user = crate::entity::user::Entity::find_by_id(user_id).one(db).await?;
        return Ok(user.map(|u| u.username).unwrap_or_else(|| format!("user #{user_id}")));
    }
    if let Some(team_id) = p.team_id {
        let team = crate::entity::team::Entity::find_by_id(team_id).one(db).await?;
        return Ok(team.map(|t| t.name).unwrap_or_else(|| format!("team #{team_id}")));
    }
    Ok(format!("participant #{}", p.id))
}

/// Ordered task ids grouped the way the contest presents them: one group
/// per category in category order, or a single group for one-by-one
/// contests.
pub async fn load_task_groups<C: ConnectionTrait>(
    db: &C,
    contest: &contest::Model,
) -> Result<Vec<Vec<i32>>, AppError> {
    let links = contest_task::Entity::find()
        .filter(contest_task::Column::ContestId.eq(contest.id))
        .order_by_asc(contest_task::Column::Position)
        .all(db)
        .await?;

    match contest.tasks_grouping {
        common::TasksGrouping::OneByOne => {
            Ok(vec![links.into_iter().map(|l| l.task_id).collect()])
        }
        common::TasksGrouping::ByCategories => {
            let categories = category::Entity::find()
                .filter(category::Column::ContestId.eq(contest.id))
                .order_by_asc(category::Column::Position)
                .all(db)
                .await?;
            let mut groups = Vec::with_capacity(categories.len());
            for cat in &categories {
                groups.push(
                    links
                        .iter()
                        .filter(|l| l.category_id == Some(cat.id))
                        .map(|l| l.task_id)
                        .collect(),
                );
            }
            Ok(groups)
        }
    }
}

/// Decode all opening policies attached to a contest.
pub async fn load_policies<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
) -> Result<Vec<PolicySpec>, AppError> {
    let rows = opening_policy::Entity::find()
        .filter(opening_policy::Column::ContestId.eq(contest_id))
        .all(db)
        .await?;
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row.spec).map_err(|e| {
                AppError::Internal(format!("Corrupt opening policy {}: {e}", row.id))
            })
        })
        .collect()
}

/// Task ids solved (checked and correct) contest-wide, or by one
/// participant.
pub async fn solved_task_ids<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    participant_id: Option<i32>,
) -> Result<HashSet<i32>, AppError> {
    let mut select = attempt::Entity::find()
        .filter(attempt::Column::ContestId.eq(contest_id))
        .filter(attempt::Column::IsChecked.eq(true))
        .filter(attempt::Column::IsCorrect.eq(true));
    if let Some(pid) = participant_id {
        select = select.filter(attempt::Column::ParticipantId.eq(pid));
    }
    let ids: Vec<i32> = select
        .select_only()
        .column(attempt::Column::TaskId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Task ids with a manual-open row applying to this participant: their own
/// rows plus global (NULL participant) rows.
pub async fn manual_open_ids<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    participant_id: Option<i32>,
) -> Result<HashSet<i32>, AppError> {
    let mut condition = Condition::any().add(manual_opened_task::Column::ParticipantId.is_null());
    if let Some(pid) = participant_id {
        condition = condition.add(manual_opened_task::Column::ParticipantId.eq(pid));
    }
    let ids: Vec<i32> = manual_opened_task::Entity::find()
        .filter(manual_opened_task::Column::ContestId.eq(contest_id))
        .filter(condition)
        .select_only()
        .column(manual_opened_task::Column::TaskId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Effective open set for a participant (or the anonymous/global view):
/// the union of every attached policy's output.
pub async fn open_tasks_for<C: ConnectionTrait>(
    db: &C,
    contest: &contest::Model,
    participant: Option<&participant::Model>,
) -> Result<HashSet<i32>, AppError> {
    let policies = load_policies(db, contest.id).await?;
    if policies.is_empty() {
        return Ok(HashSet::new());
    }

    let participant_id = participant.map(|p| p.id);
    let groups = load_task_groups(db, contest).await?;
    let solved_by_anyone = solved_task_ids(db, contest.id, None).await?;
    let solved_by_participant = match participant_id {
        Some(pid) => solved_task_ids(db, contest.id, Some(pid)).await?,
        None => HashSet::new(),
    };
    let manual_open = manual_open_ids(db, contest.id, participant_id).await?;

    let ctx = OpeningContext {
        grouping: contest.tasks_grouping,
        groups: &groups,
        has_any_correct: !solved_by_participant.is_empty(),
        solved_by_participant: &solved_by_participant,
        solved_by_anyone: &solved_by_anyone,
        manual_open: &manual_open,
    };

    Ok(union_open_tasks(policies.iter(), &ctx))
}

/// Check whether one task is open for a participant.
pub async fn is_task_open<C: ConnectionTrait>(
    db: &C,
    contest: &contest::Model,
    task_id: i32,
    participant: Option<&participant::Model>,
) -> Result<bool, AppError> {
    Ok(open_tasks_for(db, contest, participant).await?.contains(&task_id))
}
