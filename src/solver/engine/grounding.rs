//! Instantiation of safe normal rules over the atoms they can possibly derive.
//!
//! The domain is computed with a semi-naive fixpoint over the positive parts
//! of the rules (negation ignored), which over-approximates every answer set.
//! Rules are then instantiated against that domain. A negative literal whose
//! atom is outside the domain is always true and is dropped.

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use log::{debug, trace};

use crate::{
    middleware::{
        unify::{match_tuple, Substitution},
        AtomId, Interpretation, Program, Registry, Rule, TermId,
    },
    solver::error::SolverError,
};

/// A variable-free rule. `head == None` marks a constraint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroundRule {
    pub head: Option<AtomId>,
    pub positive: Vec<AtomId>,
    pub negative: Vec<AtomId>,
}

#[derive(Clone, Debug, Default)]
pub struct GroundProgram {
    pub facts: Interpretation,
    pub rules: Vec<GroundRule>,
}

/// Atoms indexed by predicate.
#[derive(Clone, Debug, Default)]
struct Domain {
    atoms: HashSet<AtomId>,
    by_predicate: HashMap<TermId, Vec<AtomId>>,
}

impl Domain {
    fn insert(&mut self, registry: &Registry, atom: AtomId) -> bool {
        if !self.atoms.insert(atom) {
            return false;
        }
        self.by_predicate
            .entry(registry.atom(atom).predicate())
            .or_default()
            .push(atom);
        true
    }

    fn contains(&self, atom: AtomId) -> bool {
        self.atoms.contains(&atom)
    }

    fn candidates(&self, predicate: TermId) -> &[AtomId] {
        self.by_predicate
            .get(&predicate)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn len(&self) -> usize {
        self.atoms.len()
    }
}

fn variables(registry: &Registry, atom: AtomId) -> impl Iterator<Item = TermId> + '_ {
    registry
        .atom(atom)
        .tuple
        .iter()
        .copied()
        .filter(|t| registry.is_variable(*t))
}

fn check_rule(registry: &Registry, rule: &Rule) -> Result<(), SolverError> {
    if rule.head.len() > 1 {
        return Err(SolverError::Unsupported(format!(
            "disjunctive head in {}",
            rule.display(registry)
        )));
    }
    let bound: BTreeSet<TermId> = rule
        .body
        .iter()
        .filter(|l| !l.naf)
        .flat_map(|l| variables(registry, l.atom))
        .collect();
    let unsafe_var = rule
        .head
        .iter()
        .copied()
        .chain(rule.body.iter().filter(|l| l.naf).map(|l| l.atom))
        .flat_map(|a| variables(registry, a))
        .find(|v| !bound.contains(v));
    match unsafe_var {
        Some(v) => Err(SolverError::UnsafeRule(format!(
            "variable {} in {}",
            registry.term_to_string(v),
            rule.display(registry)
        ))),
        None => Ok(()),
    }
}

/// All substitutions that map `body` into `domain`. When `pivot` is set, the
/// literal at that position is matched against `delta` instead.
fn join(
    registry: &Registry,
    body: &[AtomId],
    pivot: Option<usize>,
    domain: &Domain,
    delta: &Domain,
) -> Vec<Substitution> {
    let mut out = Vec::new();
    join_from(
        registry,
        body,
        0,
        pivot,
        domain,
        delta,
        Substitution::new(),
        &mut out,
    );
    out
}

#[allow(clippy::too_many_arguments)]
fn join_from(
    registry: &Registry,
    body: &[AtomId],
    index: usize,
    pivot: Option<usize>,
    domain: &Domain,
    delta: &Domain,
    subst: Substitution,
    out: &mut Vec<Substitution>,
) {
    let Some(atom) = body.get(index) else {
        out.push(subst);
        return;
    };
    let pattern = &registry.atom(*atom).tuple;
    let source = if pivot == Some(index) { delta } else { domain };
    for candidate in source.candidates(pattern[0]) {
        let mut next = subst.clone();
        if match_tuple(registry, pattern, &registry.atom(*candidate).tuple, &mut next) {
            join_from(registry, body, index + 1, pivot, domain, delta, next, out);
        }
    }
}

fn positive_body(rule: &Rule) -> Vec<AtomId> {
    rule.body
        .iter()
        .filter(|l| !l.naf)
        .map(|l| l.atom)
        .collect()
}

/// Semi-naive fixpoint of the positive program.
fn compute_domain(
    registry: &mut Registry,
    rules: &[Rule],
    facts: &Interpretation,
) -> Domain {
    let mut domain = Domain::default();
    for fact in facts.iter() {
        domain.insert(registry, fact);
    }
    let bodies = rules.iter().map(positive_body).collect_vec();

    // The first round runs every rule against the full domain.
    let mut delta = domain.clone();
    let mut first = true;
    let mut iteration = 0;
    loop {
        debug!(
            "Grounding iteration {} with {} atoms in the delta",
            iteration,
            delta.len()
        );
        let mut derived = Vec::new();
        for (rule, body) in rules.iter().zip(&bodies) {
            let Some(head) = rule.head.first() else {
                continue;
            };
            let substitutions = if first {
                join(registry, body, None, &domain, &delta)
            } else {
                (0..body.len())
                    .flat_map(|i| join(registry, body, Some(i), &domain, &delta))
                    .collect()
            };
            for subst in substitutions {
                derived.push(subst.apply_atom(registry, *head));
            }
        }

        let mut next = Domain::default();
        for atom in derived {
            if domain.insert(registry, atom) {
                trace!("Domain atom {}", registry.atom_to_string(atom));
                next.insert(registry, atom);
            }
        }
        if next.atoms.is_empty() {
            debug!(
                "Grounding domain fixpoint reached after {} iterations with {} atoms",
                iteration,
                domain.len()
            );
            return domain;
        }
        delta = next;
        first = false;
        iteration += 1;
    }
}

/// Grounds `program` together with the additional facts in `input`.
pub fn ground(
    registry: &mut Registry,
    program: &Program,
    input: &Interpretation,
) -> Result<GroundProgram, SolverError> {
    for rule in &program.idb {
        check_rule(registry, rule)?;
    }
    let facts = program.edb.union(input);
    let domain = compute_domain(registry, &program.idb, &facts);

    let mut seen = HashSet::new();
    let mut rules = Vec::new();
    for rule in &program.idb {
        let body = positive_body(rule);
        for subst in join(registry, &body, None, &domain, &domain) {
            let head = rule.head.first().map(|h| subst.apply_atom(registry, *h));
            let positive = body
                .iter()
                .map(|a| subst.apply_atom(registry, *a))
                .collect_vec();
            let negative = rule
                .body
                .iter()
                .filter(|l| l.naf)
                .map(|l| subst.apply_atom(registry, l.atom))
                .filter(|a| domain.contains(*a))
                .collect_vec();
            let ground_rule = GroundRule {
                head,
                positive,
                negative,
            };
            if seen.insert(ground_rule.clone()) {
                rules.push(ground_rule);
            }
        }
    }
    debug!(
        "Grounded {} rules into {} ground rules over {} atoms",
        program.idb.len(),
        rules.len(),
        domain.len()
    );
    Ok(GroundProgram { facts, rules })
}
