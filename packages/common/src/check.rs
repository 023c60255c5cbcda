use serde::{Deserialize, Serialize};

/// A checker's decision about one submitted answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub correct: bool,
    pub score: i32,
    #[serde(default)]
    pub public_comment: String,
    /// Visible to reviewers only, never to the participant.
    #[serde(default)]
    pub private_comment: String,
    #[serde(default)]
    pub is_plagiarized: bool,
    /// Participant id the answer was copied from, when known.
    #[serde(default)]
    pub plagiarized_from: Option<i32>,
}

impl Verdict {
    pub fn correct(score: i32) -> Self {
        Self {
            correct: true,
            score,
            public_comment: String::new(),
            private_comment: String::new(),
            is_plagiarized: false,
            plagiarized_from: None,
        }
    }

    pub fn incorrect() -> Self {
        Self {
            correct: false,
            score: 0,
            public_comment: String::new(),
            private_comment: String::new(),
            is_plagiarized: false,
            plagiarized_from: None,
        }
    }
}

/// Outcome of running a task's checker against one attempt.
///
/// Only `Checked` marks the attempt as checked. `Postponed` and `Failed`
/// leave it unchecked until a reviewer finalizes it by hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckOutcome {
    Checked(Verdict),
    /// The checker defers to human review.
    Postponed,
    /// Evaluation itself failed. The detail is stored as a private comment.
    Failed { detail: String },
}

impl CheckOutcome {
    /// Normalize a boolean-returning checker: `true` scores the task's
    /// maximum, `false` scores zero.
    pub fn from_bool(correct: bool, max_score: i32) -> Self {
        if correct {
            Self::Checked(Verdict::correct(max_score))
        } else {
            Self::Checked(Verdict::incorrect())
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Checked(v) if v.correct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bool_true_scores_max() {
        let outcome = CheckOutcome::from_bool(true, 100);
        match outcome {
            CheckOutcome::Checked(v) => {
                assert!(v.correct);
                assert_eq!(v.score, 100);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn from_bool_false_scores_zero() {
        let outcome = CheckOutcome::from_bool(false, 100);
        match outcome {
            CheckOutcome::Checked(v) => {
                assert!(!v.correct);
                assert_eq!(v.score, 0);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn is_correct_only_for_correct_verdicts() {
        assert!(CheckOutcome::from_bool(true, 1).is_correct());
        assert!(!CheckOutcome::from_bool(false, 1).is_correct());
        assert!(!CheckOutcome::Postponed.is_correct());
        assert!(
            !CheckOutcome::Failed {
                detail: "boom".into()
            }
            .is_correct()
        );
    }
}
