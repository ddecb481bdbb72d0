use std::io;
use thiserror::Error;

/// Errors raised while turning grammar text into a [`CompiledGrammar`](crate::CompiledGrammar)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Syntax error in rule {rule}: {reason}")]
    Syntax { rule: String, reason: String },

    #[error("Undefined rule {name} referenced from {rule}")]
    UndefinedRule { rule: String, name: String },

    #[error("Missing start rule: {0}")]
    MissingStartRule(String),

    #[error("Invalid repeat bound {0}: must be at least 1")]
    InvalidRepeatBound(u32),
}

impl CompileError {
    pub(crate) fn syntax(rule: &str, reason: impl Into<String>) -> Self {
        CompileError::Syntax {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }

    /// The rule the error was detected in, if it is tied to one
    pub fn rule(&self) -> Option<&str> {
        match self {
            CompileError::Syntax { rule, .. } | CompileError::UndefinedRule { rule, .. } => {
                Some(rule)
            }
            CompileError::MissingStartRule(name) => Some(name),
            CompileError::InvalidRepeatBound(_) => None,
        }
    }
}

/// Top-level error for loading grammars from outside sources
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_rule() {
        let err = CompileError::syntax("<START>", "unclosed '(' at offset 0");
        assert_eq!(
            err.to_string(),
            "Syntax error in rule <START>: unclosed '(' at offset 0"
        );
        assert_eq!(err.rule(), Some("<START>"));

        let err = CompileError::UndefinedRule {
            rule: "<START>".to_string(),
            name: "<NOUN>".to_string(),
        };
        assert!(err.to_string().contains("<NOUN>"));
        assert_eq!(err.rule(), Some("<START>"));

        assert_eq!(CompileError::InvalidRepeatBound(0).rule(), None);
    }

    #[test]
    fn test_grammar_error_wraps_compile_error() {
        let err: GrammarError = CompileError::MissingStartRule("<START>".to_string()).into();
        assert_eq!(err.to_string(), "Missing start rule: <START>");
        assert!(matches!(err, GrammarError::Compile(_)));
    }
}
