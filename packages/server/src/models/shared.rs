use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 20)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 3)]
    pub total_pages: u64,
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed display name (1..=max Unicode characters).
pub fn validate_name(value: &str, label: &str, max: usize) -> Result<(), AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{label} must be 1-{max} characters"
        )));
    }
    Ok(())
}

/// Validate a Markdown body (may be empty, bounded to keep rows sane).
pub fn validate_markdown(value: &str, label: &str) -> Result<(), AppError> {
    if value.len() > 1_000_000 {
        return Err(AppError::Validation(format!("{label} is too large")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_name_bounds() {
        assert!(validate_name("ok", "Name", 10).is_ok());
        assert!(validate_name("   ", "Name", 10).is_err());
        assert!(validate_name("", "Name", 10).is_err());
        assert!(validate_name(&"x".repeat(11), "Name", 10).is_err());
    }

    #[test]
    fn double_option_distinguishes_null_from_absent() {
        #[derive(Deserialize, Default)]
        struct Patch {
            #[serde(default, deserialize_with = "double_option")]
            field: Option<Option<i32>>,
        }

        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.field, None);

        let null: Patch = serde_json::from_str(r#"{"field": null}"#).unwrap();
        assert_eq!(null.field, Some(None));

        let value: Patch = serde_json::from_str(r#"{"field": 3}"#).unwrap();
        assert_eq!(value.field, Some(Some(3)));
    }
}
