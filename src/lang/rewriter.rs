//! Expansion of the `CHEX[...]`-style surface syntax into the primitive
//! external call plus the rules that project the declared input predicates
//! into the higher-order input encoding.

use std::str::FromStr;

use itertools::Itertools;
use log::debug;
use pest::iterators::Pair;
use strum_macros::{Display, EnumString};

use super::{parser, processor::ProcessingContext, LangError, ProcessorError, Rule};
use crate::middleware::{AtomFlags, BodyLiteral, Registry, TermId};

/// Keyword in front of a nested call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
pub enum SurfaceKind {
    #[strum(serialize = "CHEX")]
    Cautious,
    #[strum(serialize = "BHEX")]
    Brave,
    #[strum(serialize = "IHEX")]
    Inspection,
    #[strum(serialize = "CFHEX")]
    CautiousFile,
    #[strum(serialize = "BFHEX")]
    BraveFile,
    #[strum(serialize = "IFHEX")]
    InspectionFile,
}

impl SurfaceKind {
    /// Name of the external atom the call is rewritten to.
    pub fn external_predicate(self) -> &'static str {
        match self {
            SurfaceKind::Cautious | SurfaceKind::CautiousFile => "hexCautious",
            SurfaceKind::Brave | SurfaceKind::BraveFile => "hexBrave",
            SurfaceKind::Inspection | SurfaceKind::InspectionFile => "hexInspection",
        }
    }

    /// Value of the call-kind input: `file` or `string`.
    pub fn call_kind(self) -> &'static str {
        match self {
            SurfaceKind::CautiousFile | SurfaceKind::BraveFile | SurfaceKind::InspectionFile => {
                "file"
            }
            _ => "string",
        }
    }

    fn check_query_count(self, found: usize) -> Result<(), LangError> {
        let (ok, expected) = match self {
            SurfaceKind::Inspection | SurfaceKind::InspectionFile => {
                (found == 1 || found == 2, "one or two elements")
            }
            _ => (found == 1, "one element"),
        };
        if ok {
            Ok(())
        } else {
            Err(LangError::CallShape {
                kind: self.to_string(),
                expected,
                found,
            })
        }
    }
}

/// A primitive external call `&predicate[inputs](outputs)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalAtom {
    pub predicate: TermId,
    pub inputs: Vec<TermId>,
    pub outputs: Vec<TermId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewrittenAtom {
    pub external: ExternalAtom,
    /// One projection rule per declared input predicate.
    pub input_rules: Vec<crate::middleware::Rule>,
}

struct InputDecl {
    mapped: TermId,
    predicate: TermId,
    arity: usize,
}

/// Rewrites nested calls; each call gets its own auxiliary input predicate.
#[derive(Debug)]
pub struct SurfaceRewriter {
    next_pred: usize,
}

impl Default for SurfaceRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceRewriter {
    pub fn new() -> Self {
        Self { next_pred: 1 }
    }

    pub fn rewrite(
        &mut self,
        registry: &mut Registry,
        text: &str,
    ) -> Result<RewrittenAtom, LangError> {
        let call = parser::parse_nested_atom(text)?
            .next()
            .and_then(|atom| atom.into_inner().next())
            .ok_or_else(|| ProcessorError::MissingElement {
                element_type: "nested call".to_string(),
                context: text.to_string(),
            })?;
        debug!("Rewriting nested call {}", text);

        let mut ctx = ProcessingContext::new(registry);
        let mut kind = None;
        let mut program = None;
        let mut inputs = Vec::new();
        let mut query = Vec::new();
        let mut outputs = Vec::new();
        for part in call.into_inner() {
            match part.as_rule() {
                Rule::nested_kind => {
                    kind = Some(SurfaceKind::from_str(part.as_str()).map_err(|_| {
                        ProcessorError::InvalidLiteralFormat {
                            kind: "nested call kind".to_string(),
                            value: part.as_str().to_string(),
                        }
                    })?)
                }
                Rule::input_list => {
                    for decl in part.into_inner() {
                        inputs.push(process_input_decl(&mut ctx, decl)?);
                    }
                }
                Rule::query_terms => query = ctx.process_terms(part)?,
                Rule::output_terms => outputs = ctx.process_terms(part)?,
                _ => program = Some(ctx.process_term(part)?),
            }
        }
        let (kind, program) = kind.zip(program).ok_or_else(|| ProcessorError::MissingElement {
            element_type: "call kind and program".to_string(),
            context: text.to_string(),
        })?;
        kind.check_query_count(query.len())?;

        let aux = registry.aux_constant('N', &self.next_pred.to_string());
        self.next_pred += 1;
        let input_rules = projection_rules(registry, aux, &inputs);

        let mut external_inputs = vec![registry.store_constant(kind.call_kind()), program, aux];
        external_inputs.extend(query);
        let external = ExternalAtom {
            predicate: registry.store_constant(kind.external_predicate()),
            inputs: external_inputs,
            outputs,
        };
        debug!(
            "Created external atom &{}{} -> {}",
            registry.term_to_string(external.predicate),
            registry.tuple_to_string(&external.inputs),
            registry.tuple_to_string(&external.outputs)
        );
        Ok(RewrittenAtom {
            external,
            input_rules,
        })
    }
}

fn process_input_decl(
    ctx: &mut ProcessingContext<'_>,
    pair: Pair<'_, Rule>,
) -> Result<InputDecl, ProcessorError> {
    let context = pair.as_str().to_string();
    let mut names = Vec::new();
    let mut arity = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::arity => {
                arity = Some(part.as_str().parse::<usize>().map_err(|_| {
                    ProcessorError::InvalidLiteralFormat {
                        kind: "arity".to_string(),
                        value: part.as_str().to_string(),
                    }
                })?)
            }
            _ => names.push(ctx.process_term(part)?),
        }
    }
    let missing = || ProcessorError::MissingElement {
        element_type: "predicate/arity".to_string(),
        context: context.clone(),
    };
    let arity = arity.ok_or_else(missing)?;
    match names[..] {
        [predicate] => Ok(InputDecl {
            mapped: predicate,
            predicate,
            arity,
        }),
        [mapped, predicate] => Ok(InputDecl {
            mapped,
            predicate,
            arity,
        }),
        _ => Err(missing()),
    }
}

/// `aux(d, n, X0, ..., Xn-1, empty, ...) :- p(X0, ..., Xn-1).` per input,
/// padded with `empty` up to the largest declared arity.
fn projection_rules(
    registry: &mut Registry,
    aux: TermId,
    inputs: &[InputDecl],
) -> Vec<crate::middleware::Rule> {
    let max_arity = inputs.iter().map(|i| i.arity).max().unwrap_or(0);
    let vars = (0..max_arity)
        .map(|i| registry.store_variable(&format!("X{}", i)))
        .collect::<Vec<_>>();
    let empty = registry.store_constant("empty");
    inputs
        .iter()
        .map(|input| {
            let mut head = vec![aux, input.mapped, registry.store_integer(input.arity as i64)];
            head.extend(&vars[..input.arity]);
            head.extend(std::iter::repeat(empty).take(max_arity - input.arity));
            let mut body = vec![input.predicate];
            body.extend(&vars[..input.arity]);
            let rule = crate::middleware::Rule {
                head: vec![registry.store_atom(head, AtomFlags::auxiliary())],
                body: vec![BodyLiteral::pos(registry.store_ordinary_atom(body))],
            };
            debug!("Created nested call input rule: {}", rule.display(registry));
            rule
        })
        .collect_vec()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_rewrite_cautious_string_call() {
        init();
        let mut registry = Registry::new();
        let mut rewriter = SurfaceRewriter::new();
        let rewritten = rewriter
            .rewrite(&mut registry, "CHEX[\"a. b :- a.\"; p/1, d=q/2; b](X)")
            .unwrap();

        let external = &rewritten.external;
        assert_eq!(registry.term_to_string(external.predicate), "hexCautious");
        assert_eq!(
            registry.tuple_to_string(&external.inputs),
            "(string,\"a. b :- a.\",aux_N_1,b)"
        );
        assert_eq!(registry.tuple_to_string(&external.outputs), "(X)");

        let rules = rewritten
            .input_rules
            .iter()
            .map(|r| r.display(&registry))
            .collect_vec();
        assert_eq!(
            rules,
            vec![
                "aux_N_1(p,1,X0,empty) :- p(X0).".to_string(),
                "aux_N_1(d,2,X0,X1) :- q(X0,X1).".to_string(),
            ]
        );
        let head = registry.atom(rewritten.input_rules[0].head[0]);
        assert!(head.flags.auxiliary);
    }

    #[test]
    fn test_rewrite_allocates_fresh_aux_predicates() {
        let mut registry = Registry::new();
        let mut rewriter = SurfaceRewriter::new();
        let first = rewriter
            .rewrite(&mut registry, "BFHEX[\"sub.lp\";;q](X, Y)")
            .unwrap();
        let second = rewriter
            .rewrite(&mut registry, "IHEX[\"a.\";;program]()")
            .unwrap();

        assert_eq!(registry.term_to_string(first.external.inputs[0]), "file");
        assert_eq!(registry.term_to_string(first.external.inputs[2]), "aux_N_1");
        assert!(first.input_rules.is_empty());
        assert_eq!(
            registry.term_to_string(second.external.predicate),
            "hexInspection"
        );
        assert_eq!(registry.term_to_string(second.external.inputs[2]), "aux_N_2");
        assert!(second.external.outputs.is_empty());
    }

    #[test]
    fn test_rewrite_inspection_with_index() {
        let mut registry = Registry::new();
        let rewritten = SurfaceRewriter::new()
            .rewrite(&mut registry, "IFHEX[\"sub.lp\"; p/0; answerset, 2](I, A)")
            .unwrap();
        assert_eq!(
            registry.tuple_to_string(&rewritten.external.inputs),
            "(file,\"sub.lp\",aux_N_1,answerset,2)"
        );
        assert_eq!(
            rewritten.input_rules[0].display(&registry),
            "aux_N_1(p,0) :- p."
        );
    }

    #[test]
    fn test_rewrite_call_shape_errors() {
        let mut registry = Registry::new();
        let mut rewriter = SurfaceRewriter::new();
        let err = rewriter
            .rewrite(&mut registry, "CHEX[\"a.\";;a,b]()")
            .unwrap_err();
        assert!(matches!(
            err,
            LangError::CallShape {
                found: 2,
                expected: "one element",
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "CHEX requires queries with one element, found 2"
        );

        let err = rewriter
            .rewrite(&mut registry, "IHEX[\"a.\";;atom,1,2]()")
            .unwrap_err();
        assert!(matches!(err, LangError::CallShape { found: 3, .. }));

        let err = rewriter.rewrite(&mut registry, "CHEX[\"a.\"]()").unwrap_err();
        assert!(matches!(err, LangError::Parse(_)));
    }
}
