use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scoreboard::StandingsEntry;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ScoreboardCell {
    pub task_id: i32,
    pub attempt_id: i32,
    pub score: i32,
    pub is_correct: bool,
    /// Reviewer view only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_plagiarized: Option<bool>,
    pub first_correct_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ScoreboardEntry {
    pub rank: usize,
    pub participant_id: i32,
    pub name: String,
    pub is_disqualified: bool,
    pub total_score: i64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub cells: Vec<ScoreboardCell>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ScoreboardResponse {
    pub contest_id: i32,
    pub entries: Vec<ScoreboardEntry>,
}

impl ScoreboardResponse {
    /// Project computed standings for a viewer. The plagiarism overlay is
    /// included for reviewers only.
    pub fn from_standings(
        contest_id: i32,
        standings: Vec<StandingsEntry>,
        reviewer: bool,
    ) -> Self {
        let entries = standings
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let mut cells: Vec<ScoreboardCell> = entry
                    .cells
                    .into_iter()
                    .map(|(task_id, cell)| ScoreboardCell {
                        task_id,
                        attempt_id: cell.attempt_id,
                        score: cell.score,
                        is_correct: cell.is_correct,
                        is_plagiarized: reviewer.then_some(cell.is_plagiarized),
                        first_correct_at: cell.first_correct_at,
                    })
                    .collect();
                cells.sort_by_key(|c| c.task_id);
                ScoreboardEntry {
                    rank: i + 1,
                    participant_id: entry.participant_id,
                    name: entry.name,
                    is_disqualified: entry.is_disqualified,
                    total_score: entry.total_score,
                    last_success_at: entry.last_success_at,
                    cells,
                }
            })
            .collect();
        Self {
            contest_id,
            entries,
        }
    }
}
