use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::validate_name;
use super::task_file::TaskFileResponse;
use crate::checkers::CheckerSpec;
use crate::entity::task;
use crate::error::AppError;
use crate::statements::{StatementSpec, TaskStatement};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTaskRequest {
    pub name: String,
    pub max_score: i32,
    pub checker: CheckerSpec,
    pub statement: StatementSpec,
}

/// `max_score` is deliberately absent: it is fixed at creation so already
/// recorded attempts keep their meaning.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub checker: Option<CheckerSpec>,
    pub statement: Option<StatementSpec>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AttachTaskRequest {
    pub task_id: i32,
    /// Required when the contest groups tasks by categories, forbidden
    /// otherwise.
    pub category_id: Option<i32>,
    pub position: Option<i32>,
}

/// Full task view for organizers, including the checker configuration.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskResponse {
    pub id: i32,
    pub name: String,
    pub max_score: i32,
    pub checker: CheckerSpec,
    pub statement: StatementSpec,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskResponse {
    pub fn from_model(m: task::Model) -> Result<Self, AppError> {
        let checker = serde_json::from_value(m.checker)
            .map_err(|e| AppError::Internal(format!("Corrupt checker spec on task {}: {e}", m.id)))?;
        let statement = serde_json::from_value(m.statement).map_err(|e| {
            AppError::Internal(format!("Corrupt statement spec on task {}: {e}", m.id))
        })?;
        Ok(Self {
            id: m.id,
            name: m.name,
            max_score: m.max_score,
            checker,
            statement,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

/// One row of the participant-facing task list.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestTaskItem {
    pub task_id: i32,
    pub name: String,
    pub max_score: i32,
    pub category_id: Option<i32>,
    pub position: i32,
    pub is_open: bool,
    pub is_solved: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestTaskListResponse {
    pub contest_id: i32,
    pub tasks: Vec<ContestTaskItem>,
}

/// The participant-facing view of one task.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskViewResponse {
    pub task_id: i32,
    pub name: String,
    pub max_score: i32,
    pub statement: TaskStatement,
    pub files: Vec<TaskFileResponse>,
    /// The viewer's best checked score on this task, if any.
    pub participant_score: Option<i32>,
}

pub fn validate_create_task(req: &CreateTaskRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Task name", 100)?;
    if req.max_score < 0 {
        return Err(AppError::Validation("max_score must be >= 0".into()));
    }
    req.checker.validate().map_err(AppError::Validation)?;
    req.statement.validate().map_err(AppError::Validation)?;
    Ok(())
}

pub fn validate_update_task(req: &UpdateTaskRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name, "Task name", 100)?;
    }
    if let Some(ref checker) = req.checker {
        checker.validate().map_err(AppError::Validation)?;
    }
    if let Some(ref statement) = req.statement {
        statement.validate().map_err(AppError::Validation)?;
    }
    Ok(())
}

pub fn validate_attach_task(req: &AttachTaskRequest) -> Result<(), AppError> {
    if let Some(pos) = req.position
        && pos < 0
    {
        return Err(AppError::Validation("Position must be >= 0".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_task_validation_covers_spec_errors() {
        let good = CreateTaskRequest {
            name: "crypto-100".into(),
            max_score: 100,
            checker: CheckerSpec::Text {
                answer: "FLAG{ok}".into(),
                case_sensitive: false,
            },
            statement: StatementSpec::Text {
                title: "Crypto 100".into(),
                template: "Break it.".into(),
            },
        };
        assert!(validate_create_task(&good).is_ok());

        let negative_score = CreateTaskRequest {
            max_score: -1,
            ..good
        };
        assert!(validate_create_task(&negative_score).is_err());
    }

    #[test]
    fn broken_checker_is_rejected_on_create() {
        let req = CreateTaskRequest {
            name: "re-100".into(),
            max_score: 100,
            checker: CheckerSpec::Regex {
                pattern: "(unclosed".into(),
                ignore_case: false,
                multiline: false,
                dot_matches_newline: false,
                verbose: false,
            },
            statement: StatementSpec::Text {
                title: "t".into(),
                template: "x".into(),
            },
        };
        assert!(validate_create_task(&req).is_err());
    }
}
