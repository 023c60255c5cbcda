use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// A participant eligible for the scoreboard (visibility flag already
/// applied by the caller).
#[derive(Clone, Debug)]
pub struct ScoreboardParticipant {
    pub id: i32,
    pub name: String,
    pub is_disqualified: bool,
}

/// The slice of an attempt the scoreboard needs.
#[derive(Clone, Debug)]
pub struct AttemptFacts {
    pub attempt_id: i32,
    pub participant_id: i32,
    pub task_id: i32,
    pub is_checked: bool,
    pub is_correct: bool,
    pub is_plagiarized: bool,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

/// Best result of one participant on one task, for rendering a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskCell {
    pub attempt_id: i32,
    pub score: i32,
    pub is_correct: bool,
    pub is_plagiarized: bool,
    pub first_correct_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct StandingsEntry {
    pub participant_id: i32,
    pub name: String,
    pub is_disqualified: bool,
    pub total_score: i64,
    /// Latest correct attempt; `None` sorts first among equal scores.
    pub last_success_at: Option<DateTime<Utc>>,
    pub cells: HashMap<i32, TaskCell>,
}

/// Rank visible participants by their attempts.
///
/// Per (participant, task) the contribution is the maximum score among
/// checked attempts; the first correct attempt's timestamp is kept for the
/// cell. Order: non-disqualified first, then descending total score, then
/// ascending last-success time, then participant id as a stable tie-break.
pub fn compute_standings(
    participants: Vec<ScoreboardParticipant>,
    attempts: &[AttemptFacts],
) -> Vec<StandingsEntry> {
    let mut by_participant: HashMap<i32, Vec<&AttemptFacts>> = HashMap::new();
    for attempt in attempts {
        by_participant
            .entry(attempt.participant_id)
            .or_default()
            .push(attempt);
    }

    let mut entries: Vec<StandingsEntry> = participants
        .into_iter()
        .map(|p| {
            let own = by_participant.get(&p.id).map(Vec::as_slice).unwrap_or(&[]);

            let mut cells: HashMap<i32, TaskCell> = HashMap::new();
            for attempt in own {
                if !attempt.is_checked {
                    continue;
                }
                let cell = cells.entry(attempt.task_id).or_insert(TaskCell {
                    attempt_id: attempt.attempt_id,
                    score: attempt.score,
                    is_correct: attempt.is_correct,
                    is_plagiarized: attempt.is_plagiarized,
                    first_correct_at: None,
                });
                if attempt.score > cell.score {
                    cell.attempt_id = attempt.attempt_id;
                    cell.score = attempt.score;
                    cell.is_correct = attempt.is_correct;
                    cell.is_plagiarized = attempt.is_plagiarized;
                }
            }
            for attempt in own {
                if !attempt.is_correct {
                    continue;
                }
                if let Some(cell) = cells.get_mut(&attempt.task_id) {
                    cell.first_correct_at = Some(match cell.first_correct_at {
                        Some(t) => t.min(attempt.created_at),
                        None => attempt.created_at,
                    });
                }
            }

            let total_score = cells.values().map(|c| c.score as i64).sum();
            let last_success_at = own
                .iter()
                .filter(|a| a.is_correct)
                .map(|a| a.created_at)
                .max();

            StandingsEntry {
                participant_id: p.id,
                name: p.name,
                is_disqualified: p.is_disqualified,
                total_score,
                last_success_at,
                cells,
            }
        })
        .collect();

    entries.sort_by_key(|e| {
        (
            e.is_disqualified,
            Reverse(e.total_score),
            e.last_success_at,
            e.participant_id,
        )
    });

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn participant(id: i32, disqualified: bool) -> ScoreboardParticipant {
        ScoreboardParticipant {
            id,
            name: format!("p{id}"),
            is_disqualified: disqualified,
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn attempt(
        attempt_id: i32,
        participant_id: i32,
        task_id: i32,
        correct: bool,
        score: i32,
        minute: u32,
    ) -> AttemptFacts {
        AttemptFacts {
            attempt_id,
            participant_id,
            task_id,
            is_checked: true,
            is_correct: correct,
            is_plagiarized: false,
            score,
            created_at: at(minute),
        }
    }

    #[test]
    fn higher_score_ranks_first() {
        let entries = compute_standings(
            vec![participant(1, false), participant(2, false)],
            &[
                attempt(1, 1, 10, true, 50, 0),
                attempt(2, 2, 10, true, 100, 1),
            ],
        );
        assert_eq!(entries[0].participant_id, 2);
        assert_eq!(entries[0].total_score, 100);
        assert_eq!(entries[1].total_score, 50);
    }

    #[test]
    fn disqualified_sorts_last_regardless_of_score() {
        let entries = compute_standings(
            vec![participant(1, true), participant(2, false)],
            &[
                attempt(1, 1, 10, true, 1000, 0),
                attempt(2, 2, 10, true, 10, 1),
            ],
        );
        assert_eq!(entries[0].participant_id, 2);
        assert!(entries[1].is_disqualified);
    }

    #[test]
    fn earlier_last_success_wins_ties() {
        let entries = compute_standings(
            vec![participant(1, false), participant(2, false)],
            &[
                attempt(1, 1, 10, true, 100, 30),
                attempt(2, 2, 10, true, 100, 5),
            ],
        );
        assert_eq!(entries[0].participant_id, 2);
    }

    #[test]
    fn never_succeeded_sorts_before_equal_score_with_success() {
        // Matches the source's epoch-zero sentinel for "never".
        let entries = compute_standings(
            vec![participant(1, false), participant(2, false)],
            &[attempt(1, 1, 10, true, 0, 30)],
        );
        assert_eq!(entries[0].participant_id, 2);
        assert_eq!(entries[0].last_success_at, None);
    }

    #[test]
    fn participant_id_is_the_final_tie_break() {
        let entries = compute_standings(
            vec![participant(2, false), participant(1, false)],
            &[],
        );
        assert_eq!(entries[0].participant_id, 1);
    }

    #[test]
    fn cell_keeps_max_score_among_checked_attempts() {
        // A wrong later attempt must not clobber an earlier correct one.
        let entries = compute_standings(
            vec![participant(1, false)],
            &[
                attempt(1, 1, 10, true, 100, 0),
                attempt(2, 1, 10, false, 0, 1),
            ],
        );
        let cell = &entries[0].cells[&10];
        assert_eq!(cell.score, 100);
        assert!(cell.is_correct);
        assert_eq!(cell.attempt_id, 1);
        assert_eq!(entries[0].total_score, 100);
    }

    #[test]
    fn unchecked_attempts_do_not_score() {
        let mut pending = attempt(1, 1, 10, false, 0, 0);
        pending.is_checked = false;
        let entries = compute_standings(vec![participant(1, false)], &[pending]);
        assert!(entries[0].cells.is_empty());
        assert_eq!(entries[0].total_score, 0);
    }

    #[test]
    fn total_sums_across_tasks() {
        let entries = compute_standings(
            vec![participant(1, false)],
            &[
                attempt(1, 1, 10, true, 100, 0),
                attempt(2, 1, 11, true, 50, 1),
            ],
        );
        assert_eq!(entries[0].total_score, 150);
    }

    #[test]
    fn first_correct_time_is_kept_per_cell() {
        let entries = compute_standings(
            vec![participant(1, false)],
            &[
                attempt(1, 1, 10, true, 50, 5),
                attempt(2, 1, 10, true, 100, 9),
            ],
        );
        let cell = &entries[0].cells[&10];
        assert_eq!(cell.score, 100);
        assert_eq!(cell.first_correct_at, Some(at(5)));
        assert_eq!(entries[0].last_success_at, Some(at(9)));
    }
}
