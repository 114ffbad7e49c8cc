use crate::analysis::ValidationError;
use crate::emit::translator::TranslateError;
use crate::frontend::parser_error::ParseError;
use crate::lang::LineNumber;
use thiserror::Error;

/// Any fatal error of a compilation. No partial output is ever produced.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("translation of line {line} failed: {source}")]
    Translation {
        line: LineNumber,
        #[source]
        source: TranslateError,
    },

    #[error("compilation cancelled")]
    Cancelled,
}

impl CompileError {
    /// Validation errors, if this is a validation failure.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            CompileError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<Vec<ValidationError>> for CompileError {
    fn from(errors: Vec<ValidationError>) -> Self {
        CompileError::Validation(errors)
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    let mut out = format!("validation failed with {} error(s):", errors.len());
    for e in errors {
        out.push_str("\n  ");
        out.push_str(&e.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::EdgeKind;

    #[test]
    fn test_validation_display_lists_every_error() {
        let err = CompileError::from(vec![
            ValidationError::UnresolvedTarget {
                line: 10,
                target: 15,
                kind: EdgeKind::Jump,
            },
            ValidationError::UnresolvedTarget {
                line: 20,
                target: 99,
                kind: EdgeKind::Call,
            },
        ]);

        let msg = err.to_string();
        assert!(msg.contains("2 error(s)"));
        assert!(msg.contains("line 10"));
        assert!(msg.contains("line 20"));
        assert_eq!(err.validation_errors().len(), 2);
    }

    #[test]
    fn test_parse_error_converts() {
        let err = CompileError::from(ParseError::EmptyProgram);
        assert!(err.to_string().starts_with("parse error"));
        assert!(err.validation_errors().is_empty());
    }

    #[test]
    fn test_translation_error_has_source() {
        let err = CompileError::Translation {
            line: 30,
            source: TranslateError::Malformed("no statements".to_string()),
        };
        assert!(err.to_string().contains("line 30"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
