use crate::{lang::LangError, plugin::PluginError, solver::SolverError};

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // sub-categories of errors
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Lang(#[from] LangError),
    #[error(transparent)]
    Solver(#[from] SolverError),

    // Wrappers on top of other errors
    #[error("std::io::Error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("serde_json::Error: {0}")]
    Json(#[from] serde_json::Error),
}
