use hashbrown::HashMap;
use itertools::Itertools;

use super::{AtomFlags, AtomId, OrdinaryAtom, Term, TermId, Tuple};

/// Append-only interning table for terms and atoms.
///
/// Nothing is ever removed, so ids stay valid for as long as the registry
/// lives. Interning is by value: storing the same term or tuple twice yields
/// the same id.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    terms: Vec<Term>,
    term_ids: HashMap<Term, TermId>,
    atoms: Vec<OrdinaryAtom>,
    atom_ids: HashMap<Tuple, AtomId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_term(&mut self, term: Term) -> TermId {
        if let Some(id) = self.term_ids.get(&term) {
            return *id;
        }
        let id = TermId(self.terms.len() as u32);
        self.terms.push(term.clone());
        self.term_ids.insert(term, id);
        id
    }

    pub fn store_constant(&mut self, name: &str) -> TermId {
        self.store_term(Term::Constant(name.to_string()))
    }

    pub fn store_integer(&mut self, value: i64) -> TermId {
        self.store_term(Term::Integer(value))
    }

    pub fn store_variable(&mut self, name: &str) -> TermId {
        self.store_term(Term::Variable(name.to_string()))
    }

    /// Auxiliary constant `aux_<kind>_<name>`, used for predicates introduced
    /// by rewriting and learning. User programs must not use the `aux_`
    /// prefix.
    pub fn aux_constant(&mut self, kind: char, name: &str) -> TermId {
        self.store_constant(&format!("aux_{}_{}", kind, name))
    }

    pub fn lookup_term(&self, term: &Term) -> Option<TermId> {
        self.term_ids.get(term).copied()
    }

    pub fn lookup_constant(&self, name: &str) -> Option<TermId> {
        self.lookup_term(&Term::Constant(name.to_string()))
    }

    pub fn term(&self, id: TermId) -> &Term {
        &self.terms[id.index()]
    }

    pub fn is_variable(&self, id: TermId) -> bool {
        self.term(id).is_variable()
    }

    pub fn integer_value(&self, id: TermId) -> Option<i64> {
        self.term(id).as_integer()
    }

    pub fn unquoted(&self, id: TermId) -> String {
        self.term(id).unquoted()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Interns an atom. If the tuple is already known the existing id is
    /// returned and `flags` are ignored.
    pub fn store_atom(&mut self, tuple: Tuple, flags: AtomFlags) -> AtomId {
        assert!(!tuple.is_empty(), "atom tuple must contain a predicate");
        if let Some(id) = self.atom_ids.get(&tuple) {
            return *id;
        }
        let ground = tuple.iter().all(|t| !self.is_variable(*t));
        let id = AtomId(self.atoms.len() as u32);
        self.atoms.push(OrdinaryAtom {
            tuple: tuple.clone(),
            flags,
            ground,
        });
        self.atom_ids.insert(tuple, id);
        id
    }

    pub fn store_ordinary_atom(&mut self, tuple: Tuple) -> AtomId {
        self.store_atom(tuple, AtomFlags::ORDINARY)
    }

    pub fn lookup_atom(&self, tuple: &[TermId]) -> Option<AtomId> {
        self.atom_ids.get(tuple).copied()
    }

    pub fn atom(&self, id: AtomId) -> &OrdinaryAtom {
        &self.atoms[id.index()]
    }

    pub fn get_atom(&self, index: usize) -> Option<(AtomId, &OrdinaryAtom)> {
        self.atoms.get(index).map(|a| (AtomId(index as u32), a))
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atoms(&self) -> impl Iterator<Item = (AtomId, &OrdinaryAtom)> + '_ {
        self.atoms
            .iter()
            .enumerate()
            .map(|(i, a)| (AtomId(i as u32), a))
    }

    pub fn term_to_string(&self, id: TermId) -> String {
        self.term(id).to_string()
    }

    pub fn tuple_to_string(&self, tuple: &[TermId]) -> String {
        format!(
            "({})",
            tuple.iter().map(|t| self.term_to_string(*t)).join(",")
        )
    }

    pub fn atom_to_string(&self, id: AtomId) -> String {
        let atom = self.atom(id);
        let pred = self.term_to_string(atom.predicate());
        if atom.arity() == 0 {
            pred
        } else {
            format!("{}{}", pred, self.tuple_to_string(atom.args()))
        }
    }
}
