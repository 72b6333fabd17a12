//! External atoms that evaluate nested programs.
//!
//! A call `&hexCautious[kind, program, input, query](X...)` evaluates
//! `program` on the facts encoded in the extension of `input` and answers
//! with the tuples of `query` that hold in every answer set. `hexBrave`
//! answers with those that hold in some answer set and `hexInspection`
//! exposes the answer sets themselves.

mod atoms;
pub mod cache;
mod error;
mod learning;
pub mod query;
pub mod translation;

use std::{io, rc::Rc};

pub use atoms::{AtomSignature, InputType, NestedHexAtom};
pub use cache::{EvaluationCache, HexAnswer};
pub use error::{EvaluationCause, PluginError, TranslationError};
pub use query::{Answer, CallKind, InspectionKind, Query};
pub use translation::{encode_input_atom, translate_input_interpretation};

use crate::{
    config::Config,
    lang::SurfaceRewriter,
    middleware::{Registry, TermId},
    solver::{StableModelSolver, SubprogramSolver},
};

/// State of one evaluation run.
pub struct ProgramCtx {
    pub registry: Registry,
    pub config: Config,
    pub cache: EvaluationCache,
    solver: Rc<dyn SubprogramSolver>,
}

impl ProgramCtx {
    pub fn new(config: Config) -> Self {
        Self::with_solver(config, Rc::new(StableModelSolver::new()))
    }

    pub fn with_solver(config: Config, solver: Rc<dyn SubprogramSolver>) -> Self {
        Self {
            registry: Registry::new(),
            config,
            cache: EvaluationCache::new(),
            solver,
        }
    }

    /// The solver used for subprograms. Cloning the handle lets the solver
    /// borrow the context mutably while it runs.
    pub fn solver(&self) -> Rc<dyn SubprogramSolver> {
        Rc::clone(&self.solver)
    }

    /// The padding constant of the higher-order input encoding.
    pub fn empty(&mut self) -> TermId {
        self.registry.store_constant("empty")
    }
}

impl std::fmt::Debug for ProgramCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramCtx")
            .field("config", &self.config)
            .field("atoms", &self.registry.atom_count())
            .field("cache_entries", &self.cache.len())
            .finish()
    }
}

/// Entry point for hosts: atoms, options and the surface syntax.
#[derive(Clone, Copy, Debug, Default)]
pub struct NestedHexPlugin;

impl NestedHexPlugin {
    pub const NAME: &'static str = "nestedhex";

    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn create_atoms(&self) -> Vec<NestedHexAtom> {
        vec![
            NestedHexAtom::Cautious,
            NestedHexAtom::Brave,
            NestedHexAtom::Inspection,
        ]
    }

    pub fn process_options(&self, config: &mut Config, options: &mut Vec<String>) {
        config.process_options(options);
    }

    /// The surface syntax rewriter, if enabled.
    pub fn create_rewriter(&self, config: &Config) -> Option<SurfaceRewriter> {
        config.rewrite.then(SurfaceRewriter::new)
    }

    pub fn print_usage(&self, out: &mut impl io::Write) -> io::Result<()> {
        writeln!(out, "     --nestedhex       Enable the surface syntax for nested programs")?;
        writeln!(out, "                       CHEX, BHEX, IHEX, CFHEX, BFHEX, IFHEX.")?;
        writeln!(out, "     --supportsets     Learn support sets for nested program calls.")?;
        writeln!(out)?;
        writeln!(out, "     &hexCautious[t, p, i, q](X1, ..., Xn)")?;
        writeln!(out, "     &hexBrave[t, p, i, q](X1, ..., Xn)")?;
        writeln!(out, "          Evaluates program p, a file name if t=file or the rules")?;
        writeln!(out, "          themselves if t=string, extended with the facts encoded by")?;
        writeln!(out, "          the input predicate i. True for every tuple (X1, ..., Xn) such")?;
        writeln!(out, "          that q(X1, ..., Xn) holds in all answer sets (hexCautious)")?;
        writeln!(out, "          or in some answer set (hexBrave).")?;
        writeln!(out)?;
        writeln!(out, "     &hexInspection[t, p, i, program](X, N)")?;
        writeln!(out, "          True for all 0 <= X <= N, where N is the number of answer sets.")?;
        writeln!(out, "     &hexInspection[t, p, i, answerset, k](X, A)")?;
        writeln!(out, "          True for every atom of answer set k, with X the atom index")?;
        writeln!(out, "          and A its arity.")?;
        writeln!(out, "     &hexInspection[t, p, i, atom, j](X, T)")?;
        writeln!(out, "          True for every argument of atom j, with T the term at")?;
        writeln!(out, "          position X; position 0 holds the predicate.")?;
        writeln!(out)?;
        writeln!(out, "     Input atoms must have the form i(f, m, c1, ..., ck, empty, ..., empty),")?;
        writeln!(out, "     where f is the mapped predicate, m its arity and the number of")?;
        writeln!(out, "     empty terms fills the remaining argument positions of i.")
    }
}
