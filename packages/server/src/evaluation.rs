use common::CheckOutcome;
use common::storage::{FileStore, StoredPath};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::checkers::wasm::ScriptRuntime;
use crate::checkers::{CheckerSpec, check_answer_sync};
use crate::entity::{attempt, task};
use crate::error::AppError;
use crate::statements::StatementSpec;

/// Decode a task's stored checker spec.
pub fn checker_spec(task: &task::Model) -> Result<CheckerSpec, AppError> {
    serde_json::from_value(task.checker.clone())
        .map_err(|e| AppError::Internal(format!("Corrupt checker spec on task {}: {e}", task.id)))
}

/// Decode a task's stored statement spec.
pub fn statement_spec(task: &task::Model) -> Result<StatementSpec, AppError> {
    serde_json::from_value(task.statement.clone())
        .map_err(|e| AppError::Internal(format!("Corrupt statement spec on task {}: {e}", task.id)))
}

#[derive(Serialize)]
struct WasmCheckRequest<'a> {
    answer: &'a str,
    participant_id: i32,
    max_score: i32,
}

/// What a wasm checker's `check` export returns.
#[derive(Deserialize)]
struct WasmVerdict {
    correct: bool,
    score: Option<i32>,
    #[serde(default)]
    public_comment: String,
    #[serde(default)]
    private_comment: String,
    #[serde(default)]
    plagiarized_from: Option<i32>,
}

/// Judge an answer with the task's checker.
///
/// Never fails the request: wasm load or execution problems become a
/// `Failed` outcome whose detail ends up in the attempt's private comment,
/// and the attempt waits for manual review.
pub async fn run_checker(
    spec: &CheckerSpec,
    answer: &str,
    participant_id: i32,
    max_score: i32,
    scripts: &ScriptRuntime,
    files: &FileStore,
) -> CheckOutcome {
    if let Some(outcome) = check_answer_sync(spec, answer, max_score) {
        return outcome;
    }

    let CheckerSpec::Wasm { module } = spec else {
        // check_answer_sync covers every other variant.
        return CheckOutcome::Failed {
            detail: "Checker dispatch mismatch".into(),
        };
    };

    let stored = match StoredPath::parse(module) {
        Ok(p) => p,
        Err(e) => {
            return CheckOutcome::Failed {
                detail: format!("Checker module reference is invalid: {e}"),
            };
        }
    };

    if !scripts.is_loaded(module) {
        let bytes = match files.read(&stored).await {
            Ok(b) => b,
            Err(e) => {
                return CheckOutcome::Failed {
                    detail: format!("Checker module could not be read: {e}"),
                };
            }
        };
        if let Err(e) = scripts.load(module, bytes) {
            return CheckOutcome::Failed {
                detail: format!("Checker module could not be loaded: {e}"),
            };
        }
    }

    let request = WasmCheckRequest {
        answer,
        participant_id,
        max_score,
    };
    match scripts.call_json::<_, WasmVerdict>(module, "check", &request) {
        Ok(wasm_verdict) => {
            let score = wasm_verdict
                .score
                .unwrap_or(if wasm_verdict.correct { max_score } else { 0 });
            CheckOutcome::Checked(common::Verdict {
                correct: wasm_verdict.correct,
                score,
                public_comment: wasm_verdict.public_comment,
                private_comment: wasm_verdict.private_comment,
                is_plagiarized: wasm_verdict.plagiarized_from.is_some(),
                plagiarized_from: wasm_verdict.plagiarized_from,
            })
        }
        Err(e) => {
            warn!(module = %module, "Wasm checker failed: {e}");
            CheckOutcome::Failed {
                detail: format!("Checker execution failed: {e}"),
            }
        }
    }
}

/// Write a check outcome back onto an attempt.
///
/// `Postponed` leaves the attempt untouched in its unchecked state;
/// `Failed` additionally records the diagnostics for reviewers.
pub fn apply_outcome(active: &mut attempt::ActiveModel, outcome: CheckOutcome) {
    match outcome {
        CheckOutcome::Checked(verdict) => {
            active.is_checked = Set(true);
            active.is_correct = Set(verdict.correct);
            active.is_plagiarized = Set(verdict.is_plagiarized);
            active.plagiarized_from = Set(verdict.plagiarized_from);
            active.score = Set(verdict.score);
            active.public_comment = Set(verdict.public_comment);
            active.private_comment = Set(verdict.private_comment);
        }
        CheckOutcome::Postponed => {}
        CheckOutcome::Failed { detail } => {
            active.is_checked = Set(false);
            active.is_correct = Set(false);
            active.private_comment = Set(detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;

    fn unchecked_attempt() -> attempt::ActiveModel {
        attempt::ActiveModel::default()
    }

    #[test]
    fn checked_outcome_finalizes_the_attempt() {
        let mut active = unchecked_attempt();
        apply_outcome(
            &mut active,
            CheckOutcome::Checked(common::Verdict::correct(100)),
        );
        assert_eq!(active.is_checked, Set(true));
        assert_eq!(active.is_correct, Set(true));
        assert_eq!(active.score, Set(100));
    }

    #[test]
    fn postponed_outcome_leaves_the_attempt_unchecked() {
        let mut active = unchecked_attempt();
        apply_outcome(&mut active, CheckOutcome::Postponed);
        assert!(matches!(active.is_checked, ActiveValue::NotSet));
        assert!(matches!(active.score, ActiveValue::NotSet));
    }

    #[test]
    fn failed_outcome_stores_diagnostics_privately() {
        let mut active = unchecked_attempt();
        apply_outcome(
            &mut active,
            CheckOutcome::Failed {
                detail: "trap: out of bounds".into(),
            },
        );
        assert_eq!(active.is_checked, Set(false));
        assert_eq!(active.private_comment, Set("trap: out of bounds".into()));
        assert!(matches!(active.public_comment, ActiveValue::NotSet));
    }

    #[tokio::test]
    async fn missing_wasm_module_yields_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(dir.path().join("files"), 1024).await.unwrap();
        let scripts = ScriptRuntime::new();
        let spec = CheckerSpec::Wasm {
            module: "ab/0123456789abcdef0123456789abcd".into(),
        };
        let outcome = run_checker(&spec, "answer", 1, 100, &scripts, &files).await;
        assert!(matches!(outcome, CheckOutcome::Failed { .. }));
    }
}
