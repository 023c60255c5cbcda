use serde::{Deserialize, Serialize};

use super::shared::{validate_markdown, validate_name};
use crate::entity::category;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub position: Option<i32>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub contest_id: i32,
    pub name: String,
    pub description: String,
    pub position: i32,
}

impl From<category::Model> for CategoryResponse {
    fn from(m: category::Model) -> Self {
        Self {
            id: m.id,
            contest_id: m.contest_id,
            name: m.name,
            description: m.description,
            position: m.position,
        }
    }
}

pub fn validate_create_category(req: &CreateCategoryRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Category name", 100)?;
    validate_markdown(&req.description, "Category description")?;
    if let Some(pos) = req.position
        && pos < 0
    {
        return Err(AppError::Validation("Position must be >= 0".into()));
    }
    Ok(())
}

pub fn validate_update_category(req: &UpdateCategoryRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name, "Category name", 100)?;
    }
    if let Some(ref description) = req.description {
        validate_markdown(description, "Category description")?;
    }
    if let Some(pos) = req.position
        && pos < 0
    {
        return Err(AppError::Validation("Position must be >= 0".into()));
    }
    Ok(())
}
