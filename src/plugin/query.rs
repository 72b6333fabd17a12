use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumString};

use super::PluginError;
use crate::middleware::{Interpretation, Registry, TermId, Tuple};

/// How the program argument of a call is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum CallKind {
    /// The program argument names a file.
    #[strum(serialize = "file")]
    File,
    /// The program argument is the program text.
    #[strum(serialize = "string")]
    Inline,
}

/// Query selector of `hexInspection`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum InspectionKind {
    Program,
    AnswerSet,
    Atom,
}

fn parse_term<T: FromStr>(registry: &Registry, term: TermId, what: &str) -> Result<T, PluginError> {
    registry.unquoted(term).parse().map_err(|_| {
        PluginError::query(format!(
            "invalid {}: {}",
            what,
            registry.term_to_string(term)
        ))
    })
}

impl CallKind {
    /// Accepts `file` and `string`, quoted or not.
    pub fn from_term(registry: &Registry, term: TermId) -> Result<Self, PluginError> {
        parse_term(registry, term, "call type (expected file or string)")
    }
}

impl InspectionKind {
    pub fn from_term(registry: &Registry, term: TermId) -> Result<Self, PluginError> {
        parse_term(registry, term, "hexInspection query type")
    }
}

/// One evaluation request of an external atom.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    /// `[kind, program, input predicate, mode arguments...]`
    pub input: Vec<TermId>,
    /// Current extension of the input predicate, if any.
    pub interpretation: Option<Interpretation>,
    /// Output terms of the external atom as written in the calling rule.
    pub pattern: Vec<TermId>,
}

impl Query {
    pub fn new(input: Vec<TermId>, interpretation: Option<Interpretation>, pattern: Vec<TermId>) -> Self {
        Self {
            input,
            interpretation,
            pattern,
        }
    }

    pub fn pattern_is_ground(&self, registry: &Registry) -> bool {
        self.pattern.iter().all(|t| !registry.is_variable(*t))
    }
}

/// Output tuples of one query. Consumed by iterating it once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Answer {
    tuples: Vec<Tuple>,
}

impl Answer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tuple: Tuple) {
        self.tuples.push(tuple);
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

impl IntoIterator for Answer {
    type Item = Tuple;
    type IntoIter = std::vec::IntoIter<Tuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.into_iter()
    }
}

impl FromIterator<Tuple> for Answer {
    fn from_iter<I: IntoIterator<Item = Tuple>>(iter: I) -> Self {
        Self {
            tuples: iter.into_iter().collect(),
        }
    }
}
