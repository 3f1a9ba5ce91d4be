//! Filter engine error types
//!
//! Two distinct taxonomies: [`ConfigError`] can only surface while a filter
//! tree is being constructed or initialized, [`EvalError`] only while a
//! record is being evaluated. Cancellation (drop/done) is not an error and
//! travels through [`crate::context::Control`] instead.

use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use vetra_core::Span;

/// Raised while building or initializing a filter tree, never during eval.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid number of arguments to {function}(): {details}")]
    BadArity {
        function: &'static str,
        details: String,
    },

    #[error("{function}(): {argument} must be a literal {expected}")]
    LiteralRequired {
        function: &'static str,
        argument: &'static str,
        expected: &'static str,
    },

    #[error("failed to compile pattern {pattern:?}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown filter function {0:?}")]
    UnknownFunction(String),

    #[error("invalid template: {0}")]
    BadTemplate(#[from] vetra_core::TemplateError),

    #[error("{function}(): unexpected argument {argument:?}")]
    UnexpectedArgument {
        function: &'static str,
        argument: String,
    },
}

/// A runtime evaluation failure.
///
/// Carries the source span of the failing expression and, when a concrete
/// value was involved, its rendered form.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub message: Cow<'static, str>,
    pub span: Span,
    pub detail: Option<String>,
}

impl EvalError {
    pub fn new(message: impl Into<Cow<'static, str>>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        if !self.span.is_dummy() {
            write!(f, " (at {})", self.span)?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_detail_and_span() {
        let err = EvalError::new("bad operand", Span::new(3, 9)).with_detail("\"x\" (string)");
        assert_eq!(err.to_string(), "bad operand: \"x\" (string) (at 3..9)");
    }

    #[test]
    fn test_display_bare() {
        let err = EvalError::new("bad operand", Span::dummy());
        assert_eq!(err.to_string(), "bad operand");
    }
}
