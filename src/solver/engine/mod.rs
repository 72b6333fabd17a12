//! Reference evaluator: grounding followed by answer-set enumeration.

pub mod grounding;
pub mod stable;

use log::debug;

use crate::{
    middleware::{Interpretation, Program},
    plugin::ProgramCtx,
    solver::{error::SolverError, SubprogramSolver},
};

/// Stable-model semantics for normal programs with constraints.
#[derive(Clone, Copy, Debug, Default)]
pub struct StableModelSolver;

impl StableModelSolver {
    pub fn new() -> Self {
        Self
    }
}

impl SubprogramSolver for StableModelSolver {
    fn evaluate(
        &self,
        ctx: &mut ProgramCtx,
        program: &Program,
        edb: &Interpretation,
    ) -> Result<Vec<Interpretation>, SolverError> {
        debug!(
            "Evaluating program with {} rules over {} input facts",
            program.idb.len(),
            edb.len()
        );
        let ground = grounding::ground(&mut ctx.registry, program, edb)?;
        stable::answer_sets(&ground, ctx.config.max_choice_atoms)
    }
}
