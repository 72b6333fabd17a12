use std::collections::{BTreeMap, BTreeSet, VecDeque};

use itertools::Itertools;

use super::{AtomId, Interpretation, Registry, TermId};

/// A body literal: an atom, possibly under default negation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyLiteral {
    pub atom: AtomId,
    pub naf: bool,
}

impl BodyLiteral {
    pub fn pos(atom: AtomId) -> Self {
        Self { atom, naf: false }
    }

    pub fn neg(atom: AtomId) -> Self {
        Self { atom, naf: true }
    }
}

/// `head :- body.` An empty head makes the rule a constraint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    pub head: Vec<AtomId>,
    pub body: Vec<BodyLiteral>,
}

impl Rule {
    pub fn is_constraint(&self) -> bool {
        self.head.is_empty()
    }

    pub fn display(&self, registry: &Registry) -> String {
        let head = self
            .head
            .iter()
            .map(|h| registry.atom_to_string(*h))
            .join(" | ");
        let body = self
            .body
            .iter()
            .map(|l| {
                let atom = registry.atom_to_string(l.atom);
                if l.naf {
                    format!("not {}", atom)
                } else {
                    atom
                }
            })
            .join(", ");
        match (head.is_empty(), body.is_empty()) {
            (false, true) => format!("{}.", head),
            (true, _) => format!(":- {}.", body),
            (false, false) => format!("{} :- {}.", head, body),
        }
    }
}

/// A parsed program: ground facts (`edb`) and everything else (`idb`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub edb: Interpretation,
    pub idb: Vec<Rule>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_constraints(&self) -> bool {
        self.idb.iter().any(Rule::is_constraint)
    }

    /// Predicates defined by some rule or fact of the program.
    pub fn head_predicates(&self, registry: &Registry) -> BTreeSet<TermId> {
        self.idb
            .iter()
            .flat_map(|r| r.head.iter().copied())
            .chain(self.edb.iter())
            .map(|a| registry.atom(a).predicate())
            .collect()
    }

    /// True iff no predicate depends negatively on itself through the rules,
    /// i.e. the program can be split into strata.
    pub fn is_stratified(&self, registry: &Registry) -> bool {
        let mut edges: BTreeMap<TermId, BTreeSet<TermId>> = BTreeMap::new();
        let mut negative = Vec::new();
        for rule in &self.idb {
            for head in &rule.head {
                let h = registry.atom(*head).predicate();
                for lit in &rule.body {
                    let b = registry.atom(lit.atom).predicate();
                    edges.entry(h).or_default().insert(b);
                    if lit.naf {
                        negative.push((h, b));
                    }
                }
            }
        }
        // A negative edge h -> b lies on a cycle iff b reaches h.
        !negative
            .into_iter()
            .any(|(h, b)| Self::reaches(&edges, b, h))
    }

    fn reaches(edges: &BTreeMap<TermId, BTreeSet<TermId>>, from: TermId, to: TermId) -> bool {
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(p) = queue.pop_front() {
            if p == to {
                return true;
            }
            for next in edges.get(&p).into_iter().flatten() {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        false
    }
}
