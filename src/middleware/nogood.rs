use std::collections::{BTreeSet, VecDeque};

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use log::{debug, trace};

use super::{
    unify::{unify_atoms, Substitution},
    AtomId, Registry, TermId, Tuple,
};

/// A signed atom. `positive` literals are satisfied when the atom is true.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub atom: AtomId,
    pub positive: bool,
}

impl Literal {
    pub fn pos(atom: AtomId) -> Self {
        Self {
            atom,
            positive: true,
        }
    }

    pub fn neg(atom: AtomId) -> Self {
        Self {
            atom,
            positive: false,
        }
    }

    pub fn negate(self) -> Self {
        Self {
            atom: self.atom,
            positive: !self.positive,
        }
    }

    pub fn display(&self, registry: &Registry) -> String {
        format!(
            "{}{}",
            if self.positive { "T " } else { "F " },
            registry.atom_to_string(self.atom)
        )
    }
}

/// A set of literals that must never be satisfied at the same time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Nogood {
    literals: BTreeSet<Literal>,
}

impl Nogood {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, literal: Literal) -> bool {
        self.literals.insert(literal)
    }

    pub fn contains(&self, literal: &Literal) -> bool {
        self.literals.contains(literal)
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Literal> + '_ {
        self.literals.iter().copied()
    }

    pub fn is_ground(&self, registry: &Registry) -> bool {
        self.iter().all(|l| registry.atom(l.atom).ground)
    }

    /// A nogood containing both `a` and `not a` can never be violated.
    pub fn is_tautological(&self) -> bool {
        self.iter().any(|l| self.contains(&l.negate()))
    }

    pub fn display(&self, registry: &Registry) -> String {
        format!(
            "{{ {} }}",
            self.iter().map(|l| l.display(registry)).join(", ")
        )
    }

    fn apply(&self, registry: &mut Registry, subst: &Substitution) -> Nogood {
        self.iter()
            .map(|l| Literal {
                atom: subst.apply_atom(registry, l.atom),
                positive: l.positive,
            })
            .collect()
    }

    /// Replaces terms through `renaming` in one step, without following
    /// chains of bindings.
    fn rename(&self, registry: &mut Registry, renaming: &HashMap<TermId, TermId>) -> Nogood {
        self.iter()
            .map(|l| {
                let original = registry.atom(l.atom);
                let flags = original.flags;
                let tuple: Tuple = original
                    .tuple
                    .iter()
                    .map(|t| *renaming.get(t).unwrap_or(t))
                    .collect();
                Literal {
                    atom: registry.store_atom(tuple, flags),
                    positive: l.positive,
                }
            })
            .collect()
    }

    /// Literals grouped by their shape with variables blanked out, groups in
    /// ascending shape order. Variants of a nogood have the same groups up to
    /// the order inside each group.
    fn shape_groups(&self, registry: &Registry) -> Vec<Vec<Literal>> {
        let shape = |l: &Literal| -> (Vec<Option<TermId>>, bool) {
            let tuple = &registry.atom(l.atom).tuple;
            let blanked = tuple
                .iter()
                .map(|t| (!registry.is_variable(*t)).then_some(*t))
                .collect();
            (blanked, l.positive)
        };
        let mut groups: Vec<Vec<Literal>> = Vec::new();
        let mut last = None;
        for lit in self.iter().sorted_by_key(|l| shape(l)) {
            let key = shape(&lit);
            if last.as_ref() == Some(&key) {
                if let Some(group) = groups.last_mut() {
                    group.push(lit);
                }
            } else {
                groups.push(vec![lit]);
                last = Some(key);
            }
        }
        groups
    }

    /// Every literal order that keeps the groups in place and permutes the
    /// literals inside each group. Falls back to a single order when there
    /// are more than [`MAX_ORDERINGS`].
    fn orderings(groups: &[Vec<Literal>]) -> Vec<Vec<Literal>> {
        let count = groups
            .iter()
            .flat_map(|g| 1..=g.len())
            .fold(1usize, |acc, n| acc.saturating_mul(n));
        if count > MAX_ORDERINGS {
            return vec![groups.concat()];
        }
        groups.iter().fold(vec![Vec::new()], |prefixes, group| {
            let perms = group.iter().copied().permutations(group.len()).collect_vec();
            prefixes
                .iter()
                .flat_map(|prefix| {
                    perms
                        .iter()
                        .map(move |p| prefix.iter().chain(p).copied().collect_vec())
                })
                .collect()
        })
    }

    /// The literals of `order` with variables numbered by first occurrence,
    /// and the variables in that order.
    fn numbered(registry: &Registry, order: &[Literal]) -> (Vec<(bool, Vec<Slot>)>, Vec<TermId>) {
        let mut vars: Vec<TermId> = Vec::new();
        let mut key = Vec::with_capacity(order.len());
        for lit in order {
            let mut slots = Vec::new();
            for t in &registry.atom(lit.atom).tuple {
                if !registry.is_variable(*t) {
                    slots.push(Slot::Term(*t));
                    continue;
                }
                let index = match vars.iter().position(|v| v == t) {
                    Some(i) => i,
                    None => {
                        vars.push(*t);
                        vars.len() - 1
                    }
                };
                slots.push(Slot::Var(index));
            }
            key.push((lit.positive, slots));
        }
        (key, vars)
    }

    /// Variables renamed to `_V0`, `_V1`, ... so that variants coincide.
    ///
    /// The numbering is taken from the literal order with the smallest
    /// numbered form, which does not depend on the names or the interning
    /// order of the variables.
    pub fn canonical(&self, registry: &mut Registry) -> Nogood {
        let groups = self.shape_groups(registry);
        let vars = {
            let registry: &Registry = registry;
            Self::orderings(&groups)
                .iter()
                .map(|order| Self::numbered(registry, order))
                .min_by(|a, b| a.0.cmp(&b.0))
                .map(|(_, vars)| vars)
                .unwrap_or_default()
        };
        let renaming: HashMap<TermId, TermId> = vars
            .into_iter()
            .enumerate()
            .map(|(i, var)| (var, registry.store_variable(&format!("_V{}", i))))
            .collect();
        self.rename(registry, &renaming)
    }

    fn standardize_apart(&self, registry: &mut Registry) -> Nogood {
        let vars: HashSet<TermId> = self
            .iter()
            .flat_map(|l| registry.atom(l.atom).tuple.clone())
            .filter(|t| registry.is_variable(*t))
            .collect();
        let renaming: HashMap<TermId, TermId> = vars
            .into_iter()
            .map(|var| {
                let name = format!("{}'", registry.term_to_string(var));
                (var, registry.store_variable(&name))
            })
            .collect();
        self.rename(registry, &renaming)
    }

    /// Whether an instance of `self` is contained in `other`. Every
    /// assignment that violates `other` then violates `self` as well, so
    /// `other` is redundant. Variables of `other` are treated as constants.
    pub fn subsumes(&self, other: &Nogood, registry: &Registry) -> bool {
        if self.len() > other.len() {
            return false;
        }
        let literals = self.iter().collect_vec();
        subsumes_from(registry, &literals, other, HashMap::new())
    }

    /// All resolvents of `self` and `other` on a pair of complementary,
    /// unifiable literals. Tautological resolvents are dropped.
    pub fn resolve_all(&self, other: &Nogood, registry: &mut Registry) -> Vec<Nogood> {
        let other = other.standardize_apart(registry);
        let mut resolvents = Vec::new();
        for l1 in self.iter() {
            for l2 in other.iter() {
                if l1.positive == l2.positive {
                    continue;
                }
                let (a1, a2) = (registry.atom(l1.atom), registry.atom(l2.atom));
                if a1.predicate() != a2.predicate() || a1.arity() != a2.arity() {
                    continue;
                }
                let Some(mgu) = unify_atoms(registry, l1.atom, l2.atom) else {
                    continue;
                };
                let mut resolvent = Nogood::new();
                for lit in self.iter().filter(|l| *l != l1) {
                    resolvent.insert(lit);
                }
                for lit in other.iter().filter(|l| *l != l2) {
                    resolvent.insert(lit);
                }
                let resolvent = resolvent.apply(registry, &mgu);
                if !resolvent.is_tautological() {
                    resolvents.push(resolvent.canonical(registry));
                }
            }
        }
        resolvents
    }
}

impl FromIterator<Literal> for Nogood {
    fn from_iter<I: IntoIterator<Item = Literal>>(iter: I) -> Self {
        Self {
            literals: iter.into_iter().collect(),
        }
    }
}

/// Term of a literal with its variables numbered by first occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Term(TermId),
    Var(usize),
}

/// Upper bound on the literal orders tried by [`Nogood::canonical`].
const MAX_ORDERINGS: usize = 720;

/// One-way matching of `pattern` onto `target`. Bindings are never chained,
/// so both sides may use the same variable names.
fn match_terms(
    registry: &Registry,
    pattern: &[TermId],
    target: &[TermId],
    bindings: &mut HashMap<TermId, TermId>,
) -> bool {
    if pattern.len() != target.len() {
        return false;
    }
    for (p, t) in pattern.iter().zip(target) {
        if registry.is_variable(*p) {
            if *bindings.entry(*p).or_insert(*t) != *t {
                return false;
            }
        } else if p != t {
            return false;
        }
    }
    true
}

fn subsumes_from(
    registry: &Registry,
    literals: &[Literal],
    other: &Nogood,
    bindings: HashMap<TermId, TermId>,
) -> bool {
    let Some((first, rest)) = literals.split_first() else {
        return true;
    };
    let pattern = &registry.atom(first.atom).tuple;
    other
        .iter()
        .filter(|l| l.positive == first.positive)
        .any(|candidate| {
            let mut next = bindings.clone();
            match_terms(registry, pattern, &registry.atom(candidate.atom).tuple, &mut next)
                && subsumes_from(registry, rest, other, next)
        })
}

/// Destination for learned nogoods, typically owned by the host solver.
pub trait NogoodContainer {
    fn add_nogood(&mut self, nogood: Nogood);
    fn nogood_count(&self) -> usize;
}

/// An ordered, duplicate-free list of nogoods.
#[derive(Clone, Debug, Default)]
pub struct SimpleNogoodContainer {
    nogoods: Vec<Nogood>,
    index: HashMap<Nogood, usize>,
}

impl SimpleNogoodContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_nogood(&self, index: usize) -> &Nogood {
        &self.nogoods[index]
    }

    pub fn nogoods(&self) -> &[Nogood] {
        &self.nogoods
    }

    pub fn contains(&self, nogood: &Nogood) -> bool {
        self.index.contains_key(nogood)
    }

    /// Whether a stored nogood subsumes `nogood`, which covers variants.
    pub fn is_subsumed(&self, nogood: &Nogood, registry: &Registry) -> bool {
        self.nogoods.iter().any(|n| n.subsumes(nogood, registry))
    }

    /// Saturates the container with resolvents of at most `max_size`
    /// literals.
    ///
    /// Every nogood is taken from the worklist once and resolved against all
    /// nogoods processed before it, including itself. New resolvents are
    /// appended and queued. Resolvents subsumed by a stored nogood, variants
    /// included, are skipped, so the size bound together with the finite set
    /// of constants guarantees termination.
    pub fn add_all_resolvents(&mut self, registry: &mut Registry, max_size: usize) {
        let mut worklist: VecDeque<usize> = (0..self.nogoods.len()).collect();
        let mut processed: Vec<usize> = Vec::new();
        while let Some(i) = worklist.pop_front() {
            processed.push(i);
            for &j in &processed {
                let resolvents = self.nogoods[i].resolve_all(&self.nogoods[j].clone(), registry);
                for r in resolvents {
                    if r.len() > max_size || self.is_subsumed(&r, registry) {
                        continue;
                    }
                    trace!("Resolvent {}", r.display(registry));
                    self.add_nogood(r);
                    worklist.push_back(self.nogoods.len() - 1);
                }
            }
        }
        debug!("Nogood container saturated with {} nogoods", self.nogoods.len());
    }
}

impl NogoodContainer for SimpleNogoodContainer {
    fn add_nogood(&mut self, nogood: Nogood) {
        if !self.index.contains_key(&nogood) {
            self.index.insert(nogood.clone(), self.nogoods.len());
            self.nogoods.push(nogood);
        }
    }

    fn nogood_count(&self) -> usize {
        self.nogoods.len()
    }
}
