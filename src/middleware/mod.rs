//! The shared data model: interned terms and atoms, interpretations, rules
//! and nogoods.
//!
//! Every term and atom that appears during a run is interned in a single
//! [`Registry`]. Ids handed out by the registry are stable for the lifetime of
//! the run, so sets of ids can be compared directly.

use std::fmt;

use serde::{Deserialize, Serialize};

mod interpretation;
mod nogood;
mod program;
mod registry;
pub mod unify;

pub use interpretation::{Interpretation, PredicateMask};
pub use nogood::{Literal, Nogood, NogoodContainer, SimpleNogoodContainer};
pub use program::{BodyLiteral, Program, Rule};
pub use registry::Registry;

/// Index of a term in the [`Registry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TermId(pub u32);

impl TermId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an atom in the [`Registry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomId(pub u32);

impl AtomId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A term as stored in the registry.
///
/// Constants keep their surface form, so a quoted string constant is stored
/// with its quotes. Use [`Term::unquoted`] to get the raw text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Constant(String),
    Integer(i64),
    Variable(String),
}

impl Term {
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Term::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Text of the term with surrounding double quotes removed.
    pub fn unquoted(&self) -> String {
        match self {
            Term::Constant(s) if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') => {
                s[1..s.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\")
            }
            Term::Constant(s) | Term::Variable(s) => s.clone(),
            Term::Integer(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(s) | Term::Variable(s) => write!(f, "{}", s),
            Term::Integer(i) => write!(f, "{}", i),
        }
    }
}

/// An atom is a tuple of terms; position 0 holds the predicate.
pub type Tuple = Vec<TermId>;

/// Bookkeeping properties of an atom.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomFlags {
    /// Introduced by rewriting; never reported to users.
    pub auxiliary: bool,
    /// Host-side helper atoms mixed into an external atom's input.
    pub external_input_auxiliary: bool,
    /// Replacement atoms standing for an external atom's output.
    pub external_auxiliary: bool,
}

impl AtomFlags {
    pub const ORDINARY: AtomFlags = AtomFlags {
        auxiliary: false,
        external_input_auxiliary: false,
        external_auxiliary: false,
    };

    pub fn auxiliary() -> Self {
        Self {
            auxiliary: true,
            ..Self::ORDINARY
        }
    }

    pub fn external_input_auxiliary() -> Self {
        Self {
            auxiliary: true,
            external_input_auxiliary: true,
            ..Self::ORDINARY
        }
    }

    pub fn external_auxiliary() -> Self {
        Self {
            auxiliary: true,
            external_auxiliary: true,
            ..Self::ORDINARY
        }
    }
}

/// An interned atom.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrdinaryAtom {
    pub tuple: Tuple,
    pub flags: AtomFlags,
    pub ground: bool,
}

impl OrdinaryAtom {
    pub fn predicate(&self) -> TermId {
        self.tuple[0]
    }

    pub fn args(&self) -> &[TermId] {
        &self.tuple[1..]
    }

    pub fn arity(&self) -> usize {
        self.tuple.len() - 1
    }
}
