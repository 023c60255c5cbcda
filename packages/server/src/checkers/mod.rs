pub mod wasm;

use common::CheckOutcome;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use common::storage::StoredPath;

/// How a task judges submitted answers.
///
/// Stored as tagged JSON on the task row and dispatched by pattern
/// matching; each variant carries only its own fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckerSpec {
    /// Exact comparison against a reference answer.
    Text {
        answer: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Full-match against a regular expression.
    Regex {
        pattern: String,
        #[serde(default)]
        ignore_case: bool,
        #[serde(default)]
        multiline: bool,
        #[serde(default)]
        dot_matches_newline: bool,
        #[serde(default)]
        verbose: bool,
    },
    /// User-supplied WASM module (stored in the file store) exporting
    /// `check`.
    Wasm { module: String },
    /// Always postpones for human review.
    Manual,
}

impl CheckerSpec {
    /// Validate the spec at task-creation time so broken configurations
    /// are rejected before any attempt hits them.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Text { answer, .. } => {
                if answer.is_empty() {
                    return Err("Checker answer must not be empty".into());
                }
                Ok(())
            }
            Self::Regex {
                pattern,
                ignore_case,
                multiline,
                dot_matches_newline,
                verbose,
            } => compile_full_match(pattern, *ignore_case, *multiline, *dot_matches_newline, *verbose)
                .map(|_| ())
                .map_err(|e| format!("Invalid checker pattern: {e}")),
            Self::Wasm { module } => StoredPath::parse(module)
                .map(|_| ())
                .map_err(|e| format!("Invalid checker module reference: {e}")),
            Self::Manual => Ok(()),
        }
    }
}

/// Compile a checker pattern with its flag bits, anchored so a match must
/// cover the whole answer (a search hit inside it is not enough).
fn compile_full_match(
    pattern: &str,
    ignore_case: bool,
    multiline: bool,
    dot_matches_newline: bool,
    verbose: bool,
) -> Result<regex::Regex, regex::Error> {
    RegexBuilder::new(&format!("\\A(?:{pattern})\\z"))
        .case_insensitive(ignore_case)
        .multi_line(multiline)
        .dot_matches_new_line(dot_matches_newline)
        .ignore_whitespace(verbose)
        .build()
}

/// Case-insensitive comparison needs more than `to_lowercase`: visually
/// identical strings can be encoded differently, so both sides are
/// case-folded and NFKD-normalized before comparing.
fn normalize_caseless(text: &str) -> String {
    text.to_lowercase().nfkd().collect()
}

/// Judge an answer with a text checker.
pub fn check_text(answer: &str, reference: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        reference == answer
    } else {
        normalize_caseless(reference) == normalize_caseless(answer)
    }
}

/// Judge an answer with the text/regex/manual variants.
///
/// Returns `None` for the wasm variant, which needs the script runtime and
/// is dispatched by `evaluation::run_checker`.
pub fn check_answer_sync(spec: &CheckerSpec, answer: &str, max_score: i32) -> Option<CheckOutcome> {
    match spec {
        CheckerSpec::Text {
            answer: reference,
            case_sensitive,
        } => Some(CheckOutcome::from_bool(
            check_text(answer, reference, *case_sensitive),
            max_score,
        )),
        CheckerSpec::Regex {
            pattern,
            ignore_case,
            multiline,
            dot_matches_newline,
            verbose,
        } => Some(
            match compile_full_match(pattern, *ignore_case, *multiline, *dot_matches_newline, *verbose)
            {
                Ok(re) => CheckOutcome::from_bool(re.is_match(answer), max_score),
                Err(e) => CheckOutcome::Failed {
                    detail: format!("Checker pattern failed to compile: {e}"),
                },
            },
        ),
        CheckerSpec::Manual => Some(CheckOutcome::Postponed),
        CheckerSpec::Wasm { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Verdict;

    fn text(answer: &str, case_sensitive: bool) -> CheckerSpec {
        CheckerSpec::Text {
            answer: answer.into(),
            case_sensitive,
        }
    }

    fn regex(pattern: &str) -> CheckerSpec {
        CheckerSpec::Regex {
            pattern: pattern.into(),
            ignore_case: false,
            multiline: false,
            dot_matches_newline: false,
            verbose: false,
        }
    }

    fn outcome(spec: &CheckerSpec, answer: &str) -> CheckOutcome {
        check_answer_sync(spec, answer, 100).expect("sync checker")
    }

    #[test]
    fn text_case_insensitive_matches_across_case() {
        let spec = text("answer", false);
        assert!(outcome(&spec, "ANSWER").is_correct());
        assert!(outcome(&spec, "answer").is_correct());
        assert!(!outcome(&spec, "other").is_correct());
    }

    #[test]
    fn text_case_sensitive_distinguishes_case() {
        let spec = text("answer", true);
        assert!(outcome(&spec, "answer").is_correct());
        assert!(!outcome(&spec, "ANSWER").is_correct());
    }

    #[test]
    fn text_comparison_is_unicode_normalized() {
        // U+FB02 LATIN SMALL LIGATURE FL decomposes to "fl" under NFKD.
        let spec = text("ﬂag", false);
        assert!(outcome(&spec, "flag").is_correct());
        // And case-folding composes with it.
        assert!(outcome(&spec, "FLAG").is_correct());
    }

    #[test]
    fn checkers_are_pure() {
        let spec = text("FLAG{ok}", false);
        assert_eq!(outcome(&spec, "flag{OK}"), outcome(&spec, "flag{OK}"));
    }

    #[test]
    fn correct_answer_scores_max_incorrect_scores_zero() {
        let spec = text("x", true);
        assert_eq!(
            outcome(&spec, "x"),
            CheckOutcome::Checked(Verdict::correct(100))
        );
        assert_eq!(
            outcome(&spec, "y"),
            CheckOutcome::Checked(Verdict::incorrect())
        );
    }

    #[test]
    fn regex_requires_full_match() {
        let spec = regex("abc");
        assert!(outcome(&spec, "abc").is_correct());
        assert!(!outcome(&spec, "xabcx").is_correct());
        assert!(!outcome(&spec, "abcx").is_correct());
        assert!(!outcome(&spec, "xabc").is_correct());
    }

    #[test]
    fn regex_flags_apply() {
        let spec = CheckerSpec::Regex {
            pattern: "flag\\{.+\\}".into(),
            ignore_case: true,
            multiline: false,
            dot_matches_newline: false,
            verbose: false,
        };
        assert!(outcome(&spec, "FLAG{Ok}").is_correct());

        let dotall = CheckerSpec::Regex {
            pattern: "a.b".into(),
            ignore_case: false,
            multiline: false,
            dot_matches_newline: true,
            verbose: false,
        };
        assert!(outcome(&dotall, "a\nb").is_correct());
    }

    #[test]
    fn broken_pattern_fails_instead_of_judging() {
        let spec = regex("(unclosed");
        assert!(matches!(
            outcome(&spec, "anything"),
            CheckOutcome::Failed { .. }
        ));
    }

    #[test]
    fn manual_checker_postpones() {
        assert_eq!(outcome(&CheckerSpec::Manual, "whatever"), CheckOutcome::Postponed);
    }

    #[test]
    fn wasm_is_not_judged_synchronously() {
        let spec = CheckerSpec::Wasm {
            module: "ab/0123456789abcdef0123456789abcd".into(),
        };
        assert!(check_answer_sync(&spec, "x", 10).is_none());
    }

    #[test]
    fn validate_rejects_broken_specs() {
        assert!(regex("(unclosed").validate().is_err());
        assert!(text("", false).validate().is_err());
        assert!(
            CheckerSpec::Wasm {
                module: "../escape".into()
            }
            .validate()
            .is_err()
        );
        assert!(CheckerSpec::Manual.validate().is_ok());
        assert!(regex("flag\\{.*\\}").validate().is_ok());
    }

    #[test]
    fn spec_round_trips_through_tagged_json() {
        let spec = CheckerSpec::Text {
            answer: "FLAG{ok}".into(),
            case_sensitive: false,
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "text");
        let parsed: CheckerSpec = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, spec);
    }
}
