use thiserror::Error;

use crate::{lang::LangError, solver::SolverError};

/// Malformed higher-order input encoding.
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Input atom {atom} must have arity >= 2")]
    ArityTooSmall { atom: String },

    #[error("Input atom {atom} must contain the arity of the mapped predicate at its second position")]
    MissingArity { atom: String },

    #[error("Input atom {atom} has fewer arguments than its declared arity {arity} + 2")]
    Truncated { atom: String, arity: usize },

    #[error("Input atom {atom} must have constant empty on all positions beyond the mapped arity")]
    Padding { atom: String },

    #[error("Atom {atom} of arity {arity} exceeds the maximum input arity {max_arity}")]
    Encoding {
        atom: String,
        arity: usize,
        max_arity: usize,
    },
}

/// Why a subprogram could not be evaluated.
#[derive(Error, Debug)]
pub enum EvaluationCause {
    #[error("cannot read program: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Lang(#[from] LangError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("Error evaluating nested program {program}: {source}")]
    Evaluation {
        program: String,
        source: EvaluationCause,
    },

    #[error("{0}")]
    Query(String),
}

impl PluginError {
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }
}
