//! Evaluation cache for subprogram calls.
//!
//! Entries are keyed by (call kind, program term, input facts) and are never
//! evicted; the cache lives exactly as long as its [`ProgramCtx`].

use std::rc::Rc;

use log::{debug, info};

use super::{CallKind, EvaluationCause, PluginError, ProgramCtx};
use crate::{
    lang,
    middleware::{Interpretation, Program, TermId},
};

/// Result of evaluating one subprogram on one input.
#[derive(Debug)]
pub struct HexAnswer {
    pub kind: CallKind,
    pub program: TermId,
    pub input: Interpretation,
    /// The parsed subprogram, kept for support-set learning.
    pub subprogram: Program,
    pub answer_sets: Vec<Interpretation>,
}

impl HexAnswer {
    fn matches(&self, kind: CallKind, program: TermId, input: &Interpretation) -> bool {
        self.kind == kind && self.program == program && &self.input == input
    }
}

#[derive(Debug, Default)]
pub struct EvaluationCache {
    entries: Vec<Rc<HexAnswer>>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Rc<HexAnswer>] {
        &self.entries
    }

    fn lookup(
        &self,
        kind: CallKind,
        program: TermId,
        input: &Interpretation,
    ) -> Option<Rc<HexAnswer>> {
        self.entries
            .iter()
            .find(|e| e.matches(kind, program, input))
            .cloned()
    }

    /// Returns the answer sets of `program` on `input`, evaluating it only if
    /// this key has not been seen before. Failed evaluations are not cached.
    pub fn get_hex_answer(
        ctx: &mut ProgramCtx,
        kind: CallKind,
        program: TermId,
        input: Interpretation,
    ) -> Result<Rc<HexAnswer>, PluginError> {
        if let Some(hit) = ctx.cache.lookup(kind, program, &input) {
            debug!(
                "Cache hit for {} program {}",
                kind,
                ctx.registry.term_to_string(program)
            );
            return Ok(hit);
        }
        debug!(
            "Cache miss for {} program {} on input {}",
            kind,
            ctx.registry.term_to_string(program),
            input.display(&ctx.registry)
        );

        let answer = evaluate(ctx, kind, program, input).map_err(|source| {
            PluginError::Evaluation {
                program: ctx.registry.term_to_string(program),
                source,
            }
        })?;
        info!(
            "Nested program {} has {} answer sets",
            ctx.registry.term_to_string(program),
            answer.answer_sets.len()
        );
        let answer = Rc::new(answer);
        ctx.cache.entries.push(Rc::clone(&answer));
        Ok(answer)
    }
}

/// Loads, parses and solves a subprogram with `input` as its only extra facts.
fn evaluate(
    ctx: &mut ProgramCtx,
    kind: CallKind,
    program: TermId,
    input: Interpretation,
) -> Result<HexAnswer, EvaluationCause> {
    let reference = ctx.registry.unquoted(program);
    let text = match kind {
        CallKind::File => std::fs::read_to_string(&reference)?,
        CallKind::Inline => reference,
    };
    let subprogram = lang::parse_program(&mut ctx.registry, &text)?;
    let solver = ctx.solver();
    let answer_sets = solver.evaluate(ctx, &subprogram, &input)?;
    for (i, answer_set) in answer_sets.iter().enumerate() {
        debug!("Answer set {}: {}", i, answer_set.display(&ctx.registry));
    }
    Ok(HexAnswer {
        kind,
        program,
        input,
        subprogram,
        answer_sets,
    })
}
