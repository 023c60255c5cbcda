use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::double_option;
use crate::entity::attempt;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitAttemptRequest {
    pub answer: String,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct AttemptListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub task_id: Option<i32>,
    pub participant_id: Option<i32>,
}

/// Reviewer edit of an attempt's evaluation fields.
///
/// Deliberately unconstrained beyond shape: a reviewer may set any score,
/// including one above the task's maximum.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct ReviewAttemptRequest {
    pub is_checked: Option<bool>,
    pub is_correct: Option<bool>,
    pub score: Option<i32>,
    pub public_comment: Option<String>,
    pub private_comment: Option<String>,
    pub is_plagiarized: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub plagiarized_from: Option<Option<i32>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AttemptResponse {
    pub id: i32,
    pub contest_id: i32,
    pub task_id: i32,
    pub participant_id: i32,
    pub author_id: i32,
    /// Included for the attempt's owner and reviewers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub is_checked: bool,
    pub is_correct: bool,
    pub score: i32,
    pub public_comment: String,
    /// Reviewer-only fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_plagiarized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plagiarized_from: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl AttemptResponse {
    /// Project an attempt for a viewer. Owners see their answer; reviewers
    /// additionally see private comments and plagiarism details.
    pub fn for_viewer(m: attempt::Model, is_owner: bool, is_reviewer: bool) -> Self {
        Self {
            id: m.id,
            contest_id: m.contest_id,
            task_id: m.task_id,
            participant_id: m.participant_id,
            author_id: m.author_id,
            answer: (is_owner || is_reviewer).then_some(m.answer),
            is_checked: m.is_checked,
            is_correct: m.is_correct,
            score: m.score,
            public_comment: m.public_comment,
            private_comment: is_reviewer.then_some(m.private_comment),
            is_plagiarized: is_reviewer.then_some(m.is_plagiarized),
            plagiarized_from: if is_reviewer { m.plagiarized_from } else { None },
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AttemptListResponse {
    pub data: Vec<AttemptResponse>,
    pub pagination: super::shared::Pagination,
}

pub fn validate_submit_attempt(req: &SubmitAttemptRequest, max_len: usize) -> Result<(), AppError> {
    let answer = req.answer.trim();
    if answer.is_empty() {
        return Err(AppError::Validation("Answer must not be empty".into()));
    }
    if answer.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "Answer must be at most {max_len} characters"
        )));
    }
    Ok(())
}

pub fn validate_review_attempt(req: &ReviewAttemptRequest) -> Result<(), AppError> {
    if let Some(ref comment) = req.public_comment
        && comment.len() > 100_000
    {
        return Err(AppError::Validation("Public comment is too large".into()));
    }
    if let Some(ref comment) = req.private_comment
        && comment.len() > 100_000
    {
        return Err(AppError::Validation("Private comment is too large".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_must_be_non_empty_and_bounded() {
        let empty = SubmitAttemptRequest { answer: "  ".into() };
        assert!(validate_submit_attempt(&empty, 1000).is_err());

        let ok = SubmitAttemptRequest {
            answer: "FLAG{ok}".into(),
        };
        assert!(validate_submit_attempt(&ok, 1000).is_ok());

        let too_long = SubmitAttemptRequest {
            answer: "x".repeat(1001),
        };
        assert!(validate_submit_attempt(&too_long, 1000).is_err());
        assert!(validate_submit_attempt(&too_long, 2000).is_ok());
    }

    fn sample_attempt() -> attempt::Model {
        attempt::Model {
            id: 1,
            contest_id: 2,
            task_id: 3,
            participant_id: 4,
            author_id: 5,
            answer: "secret".into(),
            is_checked: true,
            is_correct: false,
            is_plagiarized: true,
            plagiarized_from: Some(9),
            score: 0,
            public_comment: "wrong".into(),
            private_comment: "copied".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn strangers_see_neither_answer_nor_private_fields() {
        let dto = AttemptResponse::for_viewer(sample_attempt(), false, false);
        assert_eq!(dto.answer, None);
        assert_eq!(dto.private_comment, None);
        assert_eq!(dto.is_plagiarized, None);
        assert_eq!(dto.plagiarized_from, None);
        assert_eq!(dto.public_comment, "wrong");
    }

    #[test]
    fn owners_see_their_answer_but_not_private_fields() {
        let dto = AttemptResponse::for_viewer(sample_attempt(), true, false);
        assert_eq!(dto.answer.as_deref(), Some("secret"));
        assert_eq!(dto.private_comment, None);
    }

    #[test]
    fn reviewers_see_everything() {
        let dto = AttemptResponse::for_viewer(sample_attempt(), false, true);
        assert_eq!(dto.answer.as_deref(), Some("secret"));
        assert_eq!(dto.private_comment.as_deref(), Some("copied"));
        assert_eq!(dto.is_plagiarized, Some(true));
        assert_eq!(dto.plagiarized_from, Some(9));
    }
}
