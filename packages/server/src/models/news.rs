use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{validate_markdown, validate_name};
use crate::entity::news;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateNewsRequest {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateNewsRequest {
    pub title: Option<String>,
    pub text: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct NewsResponse {
    pub id: i32,
    pub contest_id: i32,
    pub author_id: i32,
    pub title: String,
    pub text: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<news::Model> for NewsResponse {
    fn from(m: news::Model) -> Self {
        Self {
            id: m.id,
            contest_id: m.contest_id,
            author_id: m.author_id,
            title: m.title,
            text: m.text,
            is_published: m.is_published,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_create_news(req: &CreateNewsRequest) -> Result<(), AppError> {
    validate_name(&req.title, "Title", 1000)?;
    validate_markdown(&req.text, "Text")
}

pub fn validate_update_news(req: &UpdateNewsRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_name(title, "Title", 1000)?;
    }
    if let Some(ref text) = req.text {
        validate_markdown(text, "Text")?;
    }
    Ok(())
}
