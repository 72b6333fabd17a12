use thiserror::Error;

use super::Rule;
use crate::lang::parser::ParseError;

#[derive(Error, Debug)]
pub enum LangError {
    #[error("Parsing failed: {0}")]
    Parse(Box<ParseError>),

    #[error("AST processing error: {0}")]
    Processor(Box<ProcessorError>),

    /// A surface-syntax call whose query part has the wrong number of terms.
    #[error("{kind} requires queries with {expected}, found {found}")]
    CallShape {
        kind: String,
        expected: &'static str,
        found: usize,
    },
}

/// Errors raised while turning the Pest tree into registry atoms and rules.
#[derive(thiserror::Error, Debug)]
pub enum ProcessorError {
    #[error("Invalid literal format for {kind}: '{value}'")]
    InvalidLiteralFormat { kind: String, value: String },

    #[error("Pest rule mismatch: expected {expected:?}, found {found:?} for '{context}'")]
    RuleMismatch {
        expected: Rule,
        found: Rule,
        context: String,
    },

    #[error("Missing element: expected {element_type} for '{context}'")]
    MissingElement {
        element_type: String,
        context: String,
    },
}

impl From<ParseError> for LangError {
    fn from(err: ParseError) -> Self {
        LangError::Parse(Box::new(err))
    }
}

impl From<ProcessorError> for LangError {
    fn from(err: ProcessorError) -> Self {
        LangError::Processor(Box::new(err))
    }
}
