use serde::{Deserialize, Serialize};

use common::storage::StoredPath;

use crate::checkers::wasm::{ScriptError, ScriptRuntime};

/// How a task's displayed prompt is produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatementSpec {
    /// Markdown rendered verbatim.
    Text { title: String, template: String },
    /// User-supplied WASM module (stored in the file store) exporting
    /// `generate`, for per-participant prompts.
    Wasm { module: String },
}

impl StatementSpec {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Text { title, .. } => {
                if title.trim().is_empty() {
                    return Err("Statement title must not be empty".into());
                }
                Ok(())
            }
            Self::Wasm { module } => StoredPath::parse(module)
                .map(|_| ())
                .map_err(|e| format!("Invalid statement module reference: {e}")),
        }
    }

    /// Generated statements can depend on who is looking; the plain text
    /// variant is the only one shown to anonymous viewers.
    pub fn is_available_for_anonymous(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

/// A rendered task prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TaskStatement {
    pub title: String,
    pub statement: String,
    /// Extra file names the generator wants listed next to the task's own
    /// attachments.
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    participant_id: Option<i32>,
    participant_name: Option<&'a str>,
}

/// Render the statement for one viewer.
pub fn generate_statement(
    spec: &StatementSpec,
    scripts: &ScriptRuntime,
    participant_id: Option<i32>,
    participant_name: Option<&str>,
) -> Result<TaskStatement, ScriptError> {
    match spec {
        StatementSpec::Text { title, template } => Ok(TaskStatement {
            title: title.clone(),
            statement: template.clone(),
            files: Vec::new(),
        }),
        StatementSpec::Wasm { module } => scripts.call_json(
            module,
            "generate",
            &GenerateRequest {
                participant_id,
                participant_name,
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_statement_renders_verbatim() {
        let spec = StatementSpec::Text {
            title: "Warmup".into(),
            template: "Find the **flag**.".into(),
        };
        let scripts = ScriptRuntime::new();
        let statement = generate_statement(&spec, &scripts, None, None).unwrap();
        assert_eq!(statement.title, "Warmup");
        assert_eq!(statement.statement, "Find the **flag**.");
        assert!(statement.files.is_empty());
    }

    #[test]
    fn only_text_statements_are_anonymous_visible() {
        let text = StatementSpec::Text {
            title: "t".into(),
            template: "x".into(),
        };
        let wasm = StatementSpec::Wasm {
            module: "ab/0123456789abcdef0123456789abcd".into(),
        };
        assert!(text.is_available_for_anonymous());
        assert!(!wasm.is_available_for_anonymous());
    }

    #[test]
    fn validate_rejects_empty_title_and_bad_module() {
        assert!(
            StatementSpec::Text {
                title: "  ".into(),
                template: "x".into()
            }
            .validate()
            .is_err()
        );
        assert!(
            StatementSpec::Wasm {
                module: "../../etc".into()
            }
            .validate()
            .is_err()
        );
    }
}
