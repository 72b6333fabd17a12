//! The rule evaluator seam and a reference stable-model engine.

pub mod engine;
pub mod error;

pub use engine::StableModelSolver;
pub use error::SolverError;

use crate::{
    middleware::{Interpretation, Program},
    plugin::ProgramCtx,
};

/// Computes the answer sets of a subprogram together with its input facts.
///
/// The context is passed mutably so that an implementation can intern new
/// atoms and issue nested external calls of its own.
pub trait SubprogramSolver {
    fn evaluate(
        &self,
        ctx: &mut ProgramCtx,
        program: &Program,
        edb: &Interpretation,
    ) -> Result<Vec<Interpretation>, SolverError>;
}
