//! Answer-set enumeration for ground normal programs by guess and check.
//!
//! Only atoms that occur under negation influence the reduct. For each guess
//! `G` over those atoms the least model `M` of the reduct is computed, and `M`
//! is an answer set iff it agrees with `G` on the guessed atoms and violates
//! no constraint.

use std::collections::BTreeSet;

use log::{debug, trace};

use super::grounding::{GroundProgram, GroundRule};
use crate::{
    middleware::{AtomId, Interpretation},
    solver::error::SolverError,
};

/// Atoms whose truth value has to be guessed, in ascending order.
fn choice_atoms(program: &GroundProgram) -> Vec<AtomId> {
    program
        .rules
        .iter()
        .flat_map(|r| r.negative.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Least model of the rules not blocked by `guess`; constraints are skipped.
fn least_model(program: &GroundProgram, guess: &Interpretation) -> Interpretation {
    let reduct: Vec<&GroundRule> = program
        .rules
        .iter()
        .filter(|r| r.head.is_some() && !r.negative.iter().any(|a| guess.get_fact(*a)))
        .collect();
    let mut model = program.facts.clone();
    let mut changed = true;
    while changed {
        changed = false;
        for rule in &reduct {
            if let Some(head) = rule.head {
                if !model.get_fact(head) && rule.positive.iter().all(|a| model.get_fact(*a)) {
                    model.set_fact(head);
                    changed = true;
                }
            }
        }
    }
    model
}

fn violates_constraint(program: &GroundProgram, model: &Interpretation) -> bool {
    program.rules.iter().any(|r| {
        r.head.is_none()
            && r.positive.iter().all(|a| model.get_fact(*a))
            && !r.negative.iter().any(|a| model.get_fact(*a))
    })
}

/// Enumerates all answer sets, ordered by the guess that produced them.
pub fn answer_sets(
    program: &GroundProgram,
    max_choice_atoms: usize,
) -> Result<Vec<Interpretation>, SolverError> {
    let choices = choice_atoms(program);
    // One guess per bit pattern; the limit also keeps the shift in range.
    let limit = max_choice_atoms.min(usize::BITS as usize - 1);
    if choices.len() > limit {
        return Err(SolverError::TooManyChoices {
            found: choices.len(),
            limit,
        });
    }
    debug!(
        "Enumerating answer sets over {} choice atoms and {} ground rules",
        choices.len(),
        program.rules.len()
    );

    let mut answer_sets = Vec::new();
    for bits in 0..(1usize << choices.len()) {
        let guess: Interpretation = choices
            .iter()
            .enumerate()
            .filter(|(i, _)| bits & (1 << i) != 0)
            .map(|(_, a)| *a)
            .collect();
        let model = least_model(program, &guess);
        let consistent = choices
            .iter()
            .all(|a| model.get_fact(*a) == guess.get_fact(*a));
        if consistent && !violates_constraint(program, &model) {
            trace!("Guess {:b} yields an answer set with {} atoms", bits, model.len());
            answer_sets.push(model);
        }
    }
    debug!("Found {} answer sets", answer_sets.len());
    Ok(answer_sets)
}
