//! Substitutions and unification over function-free atoms.
//!
//! Terms are flat (constants, integers, variables), so unification never has
//! to recurse and no occurs check is needed.

use hashbrown::HashMap;

use super::{AtomId, Registry, TermId, Tuple};

/// A mapping from variables to terms.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Substitution {
    bindings: HashMap<TermId, TermId>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: TermId) -> Option<TermId> {
        self.bindings.get(&var).copied()
    }

    pub fn bind(&mut self, var: TermId, term: TermId) {
        self.bindings.insert(var, term);
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Follows variable bindings until an unbound variable or a non-variable
    /// term is reached.
    pub fn resolve(&self, registry: &Registry, mut term: TermId) -> TermId {
        while registry.is_variable(term) {
            match self.bindings.get(&term) {
                Some(next) if *next != term => term = *next,
                _ => break,
            }
        }
        term
    }

    pub fn apply_tuple(&self, registry: &Registry, tuple: &[TermId]) -> Tuple {
        tuple.iter().map(|t| self.resolve(registry, *t)).collect()
    }

    /// Applies the substitution to an atom and interns the result with the
    /// flags of the original atom.
    pub fn apply_atom(&self, registry: &mut Registry, atom: AtomId) -> AtomId {
        let original = registry.atom(atom);
        let flags = original.flags;
        let tuple = self.apply_tuple(registry, &original.tuple);
        registry.store_atom(tuple, flags)
    }
}

/// Extends `subst` so that `pattern` becomes equal to the ground `target`.
/// Returns `false` (leaving `subst` in an unspecified state) on mismatch.
pub fn match_tuple(
    registry: &Registry,
    pattern: &[TermId],
    target: &[TermId],
    subst: &mut Substitution,
) -> bool {
    if pattern.len() != target.len() {
        return false;
    }
    for (p, t) in pattern.iter().zip(target) {
        let p = subst.resolve(registry, *p);
        if registry.is_variable(p) {
            subst.bind(p, *t);
        } else if p != *t {
            return false;
        }
    }
    true
}

/// Most general unifier of two atoms, if any.
pub fn unify_atoms(registry: &Registry, a: AtomId, b: AtomId) -> Option<Substitution> {
    let ta = &registry.atom(a).tuple;
    let tb = &registry.atom(b).tuple;
    if ta.len() != tb.len() {
        return None;
    }
    let mut subst = Substitution::new();
    for (x, y) in ta.iter().zip(tb) {
        let x = subst.resolve(registry, *x);
        let y = subst.resolve(registry, *y);
        if x == y {
            continue;
        }
        if registry.is_variable(x) {
            subst.bind(x, y);
        } else if registry.is_variable(y) {
            subst.bind(y, x);
        } else {
            return None;
        }
    }
    Some(subst)
}
