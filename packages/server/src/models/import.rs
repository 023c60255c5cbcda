use serde::{Deserialize, Serialize};

use crate::checkers::CheckerSpec;
use crate::error::AppError;
use crate::statements::StatementSpec;

/// Operator-authored YAML document for bulk-loading tasks.
///
/// Checker and statement variants are selected by their `type` tag, the
/// same closed tag table used everywhere else, so an unknown tag fails the
/// whole import up front.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ImportDocument {
    #[serde(default)]
    pub tasks: Vec<TaskImport>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TaskImport {
    pub name: String,
    pub max_score: i32,
    pub checker: CheckerSpec,
    pub statement: StatementSpec,
    /// Attach the task to this contest after upserting it.
    pub contest_id: Option<i32>,
    /// Category name within the contest; requires `contest_id` and a
    /// by-categories contest.
    pub category: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImportResponse {
    pub created: Vec<String>,
    pub updated: Vec<String>,
}

pub fn parse_import_document(body: &str) -> Result<ImportDocument, AppError> {
    serde_yaml::from_str(body).map_err(|e| AppError::Validation(format!("Invalid import YAML: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_tagged_task_document() {
        let doc = parse_import_document(
            r#"
tasks:
  - name: crypto-100
    max_score: 100
    checker:
      type: text
      answer: "FLAG{ok}"
      case_sensitive: false
    statement:
      type: text
      title: Crypto 100
      template: "Break the cipher."
  - name: re-200
    max_score: 200
    checker:
      type: regex
      pattern: "FLAG\\{[0-9a-f]+\\}"
      ignore_case: true
    statement:
      type: text
      title: Reversing 200
      template: "Find the flag."
    contest_id: 1
    category: Reversing
"#,
        )
        .unwrap();

        assert_eq!(doc.tasks.len(), 2);
        assert_eq!(doc.tasks[0].name, "crypto-100");
        assert!(matches!(doc.tasks[0].checker, CheckerSpec::Text { .. }));
        assert!(matches!(doc.tasks[1].checker, CheckerSpec::Regex { .. }));
        assert_eq!(doc.tasks[1].category.as_deref(), Some("Reversing"));
    }

    #[test]
    fn unknown_checker_tag_fails_the_parse() {
        let result = parse_import_document(
            r#"
tasks:
  - name: bad
    max_score: 10
    checker:
      type: telepathy
    statement:
      type: text
      title: t
      template: x
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_fails_the_parse() {
        assert!(parse_import_document("tasks: [unclosed").is_err());
    }
}
