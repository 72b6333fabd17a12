use log::trace;
use pest::iterators::Pair;

use super::{ProcessorError, Rule};
use crate::middleware::{AtomId, BodyLiteral, Program, Registry, TermId};

/// Interns the terms and atoms of a parse tree into a registry.
pub(crate) struct ProcessingContext<'a> {
    pub(crate) registry: &'a mut Registry,
    anonymous_variables: usize,
}

impl<'a> ProcessingContext<'a> {
    pub(crate) fn new(registry: &'a mut Registry) -> Self {
        Self {
            registry,
            anonymous_variables: 0,
        }
    }

    pub(crate) fn process_term(&mut self, pair: Pair<'_, Rule>) -> Result<TermId, ProcessorError> {
        let text = pair.as_str();
        match pair.as_rule() {
            Rule::identifier | Rule::string => Ok(self.registry.store_constant(text)),
            Rule::integer => text
                .parse::<i64>()
                .map(|i| self.registry.store_integer(i))
                .map_err(|_| ProcessorError::InvalidLiteralFormat {
                    kind: "integer".to_string(),
                    value: text.to_string(),
                }),
            Rule::variable if text == "_" => {
                // Every occurrence of `_` is a distinct variable.
                self.anonymous_variables += 1;
                let name = format!("_Anon{}", self.anonymous_variables);
                Ok(self.registry.store_variable(&name))
            }
            Rule::variable => Ok(self.registry.store_variable(text)),
            other => Err(ProcessorError::RuleMismatch {
                expected: Rule::identifier,
                found: other,
                context: text.to_string(),
            }),
        }
    }

    pub(crate) fn process_terms(
        &mut self,
        pair: Pair<'_, Rule>,
    ) -> Result<Vec<TermId>, ProcessorError> {
        pair.into_inner().map(|t| self.process_term(t)).collect()
    }

    fn process_atom(&mut self, pair: Pair<'_, Rule>) -> Result<AtomId, ProcessorError> {
        let context = pair.as_str().to_string();
        let mut inner = pair.into_inner();
        let predicate = inner.next().ok_or_else(|| ProcessorError::MissingElement {
            element_type: "predicate".to_string(),
            context: context.clone(),
        })?;
        let mut tuple = vec![self.process_term(predicate)?];
        if let Some(terms) = inner.next() {
            tuple.extend(self.process_terms(terms)?);
        }
        Ok(self.registry.store_ordinary_atom(tuple))
    }

    fn process_literal(&mut self, pair: Pair<'_, Rule>) -> Result<BodyLiteral, ProcessorError> {
        let mut naf = false;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::naf => naf = true,
                Rule::atom => {
                    let atom = self.process_atom(part)?;
                    return Ok(BodyLiteral { atom, naf });
                }
                other => {
                    return Err(ProcessorError::RuleMismatch {
                        expected: Rule::atom,
                        found: other,
                        context: part.as_str().to_string(),
                    })
                }
            }
        }
        Err(ProcessorError::MissingElement {
            element_type: "atom".to_string(),
            context: "literal".to_string(),
        })
    }

    fn process_body(&mut self, pair: Pair<'_, Rule>) -> Result<Vec<BodyLiteral>, ProcessorError> {
        pair.into_inner().map(|l| self.process_literal(l)).collect()
    }
}

/// Builds a [`Program`] from a `program` pair. Ground bodiless rules become
/// facts; everything else, including constraints, ends up in the idb.
pub fn process_program(
    pair: Pair<'_, Rule>,
    registry: &mut Registry,
) -> Result<Program, ProcessorError> {
    let mut ctx = ProcessingContext::new(registry);
    let mut program = Program::new();
    for statement in pair.into_inner() {
        match statement.as_rule() {
            Rule::rule_def => {
                let mut inner = statement.into_inner();
                let head = match inner.next() {
                    Some(h) => ctx.process_atom(h)?,
                    None => {
                        return Err(ProcessorError::MissingElement {
                            element_type: "head".to_string(),
                            context: "rule".to_string(),
                        })
                    }
                };
                let body = match inner.next() {
                    Some(b) => ctx.process_body(b)?,
                    None => Vec::new(),
                };
                if body.is_empty() && ctx.registry.atom(head).ground {
                    program.edb.set_fact(head);
                } else {
                    program.idb.push(crate::middleware::Rule {
                        head: vec![head],
                        body,
                    });
                }
            }
            Rule::constraint => {
                let body = match statement.into_inner().next() {
                    Some(b) => ctx.process_body(b)?,
                    None => Vec::new(),
                };
                program.idb.push(crate::middleware::Rule {
                    head: Vec::new(),
                    body,
                });
            }
            Rule::EOI => (),
            other => {
                return Err(ProcessorError::RuleMismatch {
                    expected: Rule::rule_def,
                    found: other,
                    context: statement.as_str().to_string(),
                })
            }
        }
    }
    trace!(
        "Processed program with {} facts and {} rules",
        program.edb.len(),
        program.idb.len()
    );
    Ok(program)
}
