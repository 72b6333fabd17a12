use std::collections::{btree_set, BTreeSet};

use itertools::Itertools;

use super::{AtomId, Registry, TermId};

/// A set of atoms, identified by their registry ids.
///
/// Two interpretations are equal iff they contain the same ids; the order in
/// which facts were set does not matter. Iteration is in ascending id order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Interpretation {
    facts: BTreeSet<AtomId>,
}

impl Interpretation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fact(&mut self, atom: AtomId) -> bool {
        self.facts.insert(atom)
    }

    pub fn clear_fact(&mut self, atom: AtomId) -> bool {
        self.facts.remove(&atom)
    }

    pub fn get_fact(&self, atom: AtomId) -> bool {
        self.facts.contains(&atom)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.facts.iter().copied()
    }

    pub fn intersection(&self, other: &Interpretation) -> Interpretation {
        self.facts.intersection(&other.facts).copied().collect()
    }

    pub fn union(&self, other: &Interpretation) -> Interpretation {
        self.facts.union(&other.facts).copied().collect()
    }

    pub fn is_subset(&self, other: &Interpretation) -> bool {
        self.facts.is_subset(&other.facts)
    }

    pub fn display(&self, registry: &Registry) -> String {
        format!(
            "{{{}}}",
            self.iter().map(|a| registry.atom_to_string(a)).join(",")
        )
    }
}

impl FromIterator<AtomId> for Interpretation {
    fn from_iter<I: IntoIterator<Item = AtomId>>(iter: I) -> Self {
        Self {
            facts: iter.into_iter().collect(),
        }
    }
}

impl Extend<AtomId> for Interpretation {
    fn extend<I: IntoIterator<Item = AtomId>>(&mut self, iter: I) {
        self.facts.extend(iter)
    }
}

impl IntoIterator for Interpretation {
    type Item = AtomId;
    type IntoIter = btree_set::IntoIter<AtomId>;

    fn into_iter(self) -> Self::IntoIter {
        self.facts.into_iter()
    }
}

impl<'a> IntoIterator for &'a Interpretation {
    type Item = &'a AtomId;
    type IntoIter = btree_set::Iter<'a, AtomId>;

    fn into_iter(self) -> Self::IntoIter {
        self.facts.iter()
    }
}

/// All ground atoms of a set of predicates.
///
/// The registry only grows, so the mask is updated incrementally: atoms
/// interned since the last update are scanned on the next call to
/// [`PredicateMask::update_mask`].
#[derive(Clone, Debug, Default)]
pub struct PredicateMask {
    predicates: BTreeSet<TermId>,
    mask: Interpretation,
    known_atoms: usize,
}

impl PredicateMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_predicate(&mut self, predicate: TermId) {
        if self.predicates.insert(predicate) {
            // A new predicate invalidates the scan position.
            self.known_atoms = 0;
        }
    }

    pub fn update_mask(&mut self, registry: &Registry) {
        for index in self.known_atoms..registry.atom_count() {
            if let Some((id, atom)) = registry.get_atom(index) {
                if atom.ground && self.predicates.contains(&atom.predicate()) {
                    self.mask.set_fact(id);
                }
            }
        }
        self.known_atoms = registry.atom_count();
    }

    pub fn mask(&self) -> &Interpretation {
        &self.mask
    }
}
