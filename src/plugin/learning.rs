//! Support sets for nested program calls.
//!
//! Every single-head rule `h :- B` of the subprogram yields the nogood
//! `{B} ∪ {F h}`. After saturating these with resolvents, the nogoods that
//! mention only input predicates plus one negative literal over the query
//! predicate are rewritten into nogoods over the host's atoms: "if these
//! inputs hold, the external atom holds for these outputs".

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};

use super::{encode_input_atom, HexAnswer, NestedHexAtom, ProgramCtx, Query};
use crate::middleware::{
    AtomFlags, AtomId, Literal, Nogood, NogoodContainer, Registry, SimpleNogoodContainer, TermId,
};

/// Nogoods `{body} ∪ {F head}` of the single-head rules of the subprogram.
fn prepare_nogoods(answer: &HexAnswer, registry: &Registry) -> SimpleNogoodContainer {
    let mut prepared = SimpleNogoodContainer::new();
    for rule in answer.subprogram.idb.iter().filter(|r| r.head.len() == 1) {
        let nogood: Nogood = rule
            .body
            .iter()
            .map(|l| Literal {
                atom: l.atom,
                positive: !l.naf,
            })
            .chain(std::iter::once(Literal::neg(rule.head[0])))
            .collect();
        trace!("Prepared nogood {}", nogood.display(registry));
        prepared.add_nogood(nogood);
    }
    prepared
}

/// Predicates of the mapped input facts with the width of their encoding.
/// Predicates defined by the subprogram itself are left out, since their
/// extension inside the subprogram is not determined by the input alone.
fn input_predicates(
    ctx: &ProgramCtx,
    query: &Query,
    answer: &HexAnswer,
) -> (BTreeSet<TermId>, usize) {
    let mut arities = BTreeMap::new();
    if let Some(interpretation) = &query.interpretation {
        for id in interpretation.iter() {
            let atom = ctx.registry.atom(id);
            if atom.flags.external_input_auxiliary || atom.tuple.len() < 3 {
                continue;
            }
            arities.insert(atom.tuple[1], atom.tuple.len() - 3);
        }
    }
    let max_arity = arities.values().copied().max().unwrap_or(0);
    let defined = answer.subprogram.head_predicates(&ctx.registry);
    let predicates = arities
        .into_keys()
        .filter(|p| !defined.contains(p))
        .collect();
    (predicates, max_arity)
}

/// Whether every possible input yields exactly one answer set: the input
/// predicates only contribute facts, so a stratified program without
/// constraints keeps a unique answer set whatever the input is.
fn learning_is_sound(ctx: &ProgramCtx, answer: &HexAnswer) -> bool {
    !answer.subprogram.has_constraints() && answer.subprogram.is_stratified(&ctx.registry)
}

/// `aux_r_<atom>(inputs..., outputs...)`, the host atom that stands for the
/// external atom being true on `outputs`.
fn replacement_atom(
    registry: &mut Registry,
    atom: NestedHexAtom,
    query: &Query,
    outputs: &[TermId],
) -> AtomId {
    let mut tuple = vec![registry.aux_constant('r', atom.predicate())];
    tuple.extend_from_slice(&query.input);
    tuple.extend_from_slice(outputs);
    registry.store_atom(tuple, AtomFlags::external_auxiliary())
}

/// Rewrites `nogood` into a support set, or returns `None` if it mentions
/// atoms that are neither inputs nor the query predicate.
fn support_set(
    ctx: &mut ProgramCtx,
    atom: NestedHexAtom,
    query: &Query,
    nogood: &Nogood,
    predicates: &BTreeSet<TermId>,
    max_arity: usize,
) -> Option<Nogood> {
    let query_predicate = query.input[3];
    let empty = ctx.empty();
    let mut support_set = Nogood::new();
    let mut query_literals = 0;
    for literal in nogood.iter() {
        let ordinary = ctx.registry.atom(literal.atom);
        let predicate = ordinary.predicate();
        if predicates.contains(&predicate) {
            let input_atom = if ctx.config.encode_support_set_inputs {
                encode_input_atom(&mut ctx.registry, query.input[2], literal.atom, max_arity, empty)
                    .ok()?
            } else {
                literal.atom
            };
            support_set.insert(Literal {
                atom: input_atom,
                positive: literal.positive,
            });
        } else if predicate == query_predicate && !literal.positive {
            let outputs = ordinary.args().to_vec();
            let replacement = replacement_atom(&mut ctx.registry, atom, query, &outputs);
            support_set.insert(Literal::neg(replacement));
            query_literals += 1;
        } else {
            return None;
        }
    }
    (query_literals == 1).then_some(support_set)
}

/// Learns the support sets of one call and returns how many were added.
pub(super) fn learn_support_sets(
    ctx: &mut ProgramCtx,
    atom: NestedHexAtom,
    query: &Query,
    answer: &HexAnswer,
    nogoods: &mut dyn NogoodContainer,
) -> usize {
    if !learning_is_sound(ctx, answer) {
        debug!(
            "Not learning support sets for {}: program is not stratified or has constraints",
            atom
        );
        return 0;
    }

    let mut prepared = prepare_nogoods(answer, &ctx.registry);
    let max_size = query.interpretation.as_ref().map_or(0, |i| i.len()) + 1;
    debug!("Computing resolvents of prepared nogoods up to size {}", max_size);
    prepared.add_all_resolvents(&mut ctx.registry, max_size);

    let (predicates, max_arity) = input_predicates(ctx, query, answer);
    debug!("Extracting support sets from {} nogoods", prepared.nogood_count());
    let mut learned = 0;
    for nogood in prepared.nogoods() {
        if let Some(support_set) = support_set(ctx, atom, query, nogood, &predicates, max_arity) {
            debug!("Learn support set {}", support_set.display(&ctx.registry));
            nogoods.add_nogood(support_set);
            learned += 1;
        }
    }
    learned
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        config::Config,
        middleware::{unify::match_tuple, unify::Substitution, Interpretation},
        plugin::{PluginError, Query},
    };

    fn setup(encode: bool) -> ProgramCtx {
        let _ = env_logger::builder().is_test(true).try_init();
        ProgramCtx::new(Config {
            support_sets: true,
            encode_support_set_inputs: encode,
            ..Config::default()
        })
    }

    fn term(ctx: &mut ProgramCtx, text: &str) -> TermId {
        if text.starts_with(|c: char| c.is_ascii_uppercase()) {
            ctx.registry.store_variable(text)
        } else {
            ctx.registry.store_constant(text)
        }
    }

    fn encoded(ctx: &mut ProgramCtx, pred: &str, args: &[&str], max_arity: usize) -> AtomId {
        let mut tuple = vec![term(ctx, pred)];
        tuple.extend(args.iter().map(|a| term(ctx, a)));
        let fact = ctx.registry.store_ordinary_atom(tuple);
        let input = term(ctx, "i");
        let empty = ctx.empty();
        encode_input_atom(&mut ctx.registry, input, fact, max_arity, empty).unwrap()
    }

    fn call(ctx: &mut ProgramCtx, program: &str, query_pred: &str, input: Interpretation) -> Query {
        let terms = vec![
            term(ctx, "string"),
            ctx.registry.store_constant(&format!("\"{}\"", program)),
            term(ctx, "i"),
            term(ctx, query_pred),
        ];
        let x = term(ctx, "X");
        Query::new(terms, Some(input), vec![x])
    }

    fn learned(ctx: &ProgramCtx, nogoods: &SimpleNogoodContainer) -> Vec<String> {
        nogoods
            .nogoods()
            .iter()
            .map(|n| n.display(&ctx.registry))
            .sorted()
            .collect()
    }

    #[test]
    fn test_learns_verbatim_support_sets() -> Result<(), PluginError> {
        let mut ctx = setup(false);
        let input: Interpretation = [encoded(&mut ctx, "p", &["a"], 1)].into_iter().collect();
        let query = call(&mut ctx, "q(X) :- p(X). r(X) :- s(X).", "q", input);

        let mut nogoods = SimpleNogoodContainer::new();
        let count = NestedHexAtom::Cautious.learn_support_sets(&mut ctx, &query, &mut nogoods)?;
        assert_eq!(count, 1);
        assert_eq!(
            learned(&ctx, &nogoods),
            vec!["{ T p(X), F aux_r_hexCautious(string,\"q(X) :- p(X). r(X) :- s(X).\",i,q,X) }"]
        );
        let replacement = nogoods
            .get_nogood(0)
            .iter()
            .find(|l| !l.positive)
            .unwrap();
        assert!(ctx.registry.atom(replacement.atom).flags.external_auxiliary);
        Ok(())
    }

    #[test]
    fn test_learns_encoded_support_sets_from_resolvents() -> Result<(), PluginError> {
        let mut ctx = setup(true);
        let input: Interpretation = [
            encoded(&mut ctx, "p", &["a"], 2),
            encoded(&mut ctx, "e", &["a", "b"], 2),
        ]
        .into_iter()
        .collect();
        // q is only reachable through the intermediate predicate m.
        let query = call(&mut ctx, "m(X) :- p(X). q(Y) :- m(X), e(X, Y).", "q", input);

        let mut nogoods = SimpleNogoodContainer::new();
        let count = NestedHexAtom::Brave.learn_support_sets(&mut ctx, &query, &mut nogoods)?;
        assert_eq!(count, 1);
        let support_set = nogoods.get_nogood(0);
        assert_eq!(support_set.len(), 3);
        let inputs = support_set
            .iter()
            .filter(|l| l.positive)
            .map(|l| ctx.registry.atom_to_string(l.atom))
            .sorted()
            .collect_vec();
        assert_eq!(inputs, vec!["i(e,2,_V0,_V1)", "i(p,1,_V0,empty)"]);
        Ok(())
    }

    #[test]
    fn test_learning_on_recursive_program_terminates() -> Result<(), PluginError> {
        let mut ctx = setup(false);
        let input: Interpretation = [["a", "b"], ["b", "c"], ["c", "d"], ["d", "e"]]
            .iter()
            .map(|edge| encoded(&mut ctx, "e", edge, 2))
            .collect();
        let query = call(
            &mut ctx,
            "p(X,Y) :- e(X,Y). p(X,Z) :- p(X,Y), e(Y,Z).",
            "p",
            input,
        );

        let mut nogoods = SimpleNogoodContainer::new();
        let count = NestedHexAtom::Cautious.learn_support_sets(&mut ctx, &query, &mut nogoods)?;
        // One support set per path length that fits the size bound of 5.
        assert_eq!(count, 4);
        let lengths = nogoods
            .nogoods()
            .iter()
            .map(|n| n.iter().filter(|l| l.positive).count())
            .sorted()
            .collect_vec();
        assert_eq!(lengths, vec![1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_no_learning_when_disabled_or_unsound() -> Result<(), PluginError> {
        let mut nogoods = SimpleNogoodContainer::new();

        let mut ctx = ProgramCtx::new(Config::default());
        let input: Interpretation = [encoded(&mut ctx, "p", &["a"], 1)].into_iter().collect();
        let query = call(&mut ctx, "q(X) :- p(X).", "q", input.clone());
        assert_eq!(
            NestedHexAtom::Cautious.learn_support_sets(&mut ctx, &query, &mut nogoods)?,
            0
        );
        assert!(ctx.cache.is_empty());

        let mut ctx = setup(false);
        let input: Interpretation = [encoded(&mut ctx, "p", &["a"], 1)].into_iter().collect();
        for program in [
            "q(X) :- p(X). :- q(a).",
            "q(X) :- p(X), not r(X). r(X) :- p(X), not q(X).",
        ] {
            let query = call(&mut ctx, program, "q", input.clone());
            assert_eq!(
                NestedHexAtom::Cautious.learn_support_sets(&mut ctx, &query, &mut nogoods)?,
                0
            );
        }
        let query = call(&mut ctx, "q(X) :- p(X).", "q", input);
        assert_eq!(
            NestedHexAtom::Inspection.learn_support_sets(&mut ctx, &query, &mut nogoods)?,
            0
        );
        assert_eq!(nogoods.nogood_count(), 0);
        Ok(())
    }

    #[test]
    fn test_defined_predicates_are_not_inputs() -> Result<(), PluginError> {
        let mut ctx = setup(false);
        // p is an input but the subprogram also derives it.
        let input: Interpretation = [encoded(&mut ctx, "p", &["a"], 1)].into_iter().collect();
        let query = call(&mut ctx, "p(b). p(X) :- t(X). q(X) :- p(X).", "q", input);
        let mut nogoods = SimpleNogoodContainer::new();
        let count = NestedHexAtom::Cautious.learn_support_sets(&mut ctx, &query, &mut nogoods)?;
        assert_eq!(count, 0);
        Ok(())
    }

    /// Every ground instance of a learned support set over the constants of
    /// the input must agree with a fresh evaluation on every input.
    #[test]
    fn test_support_sets_are_sound() -> Result<(), PluginError> {
        let program = "r(X) :- p(X), not s(X). q(X) :- r(X). q(X) :- p(X), s(X). t(X) :- s(X).";
        let universe = [("p", "a"), ("p", "b"), ("s", "a"), ("s", "b")];

        for encode in [false, true] {
            let mut ctx = setup(encode);
            let atoms = universe
                .iter()
                .map(|&(p, c)| encoded(&mut ctx, p, &[c], 1))
                .collect_vec();
            let full: Interpretation = atoms.iter().copied().collect();
            let query = call(&mut ctx, program, "q", full.clone());
            let mut nogoods = SimpleNogoodContainer::new();
            let count = NestedHexAtom::Cautious.learn_support_sets(&mut ctx, &query, &mut nogoods)?;
            assert!(count > 0);

            let constants = ["a", "b"].map(|c| term(&mut ctx, c));
            for bits in 0..(1usize << atoms.len()) {
                let input: Interpretation = atoms
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| bits & (1 << i) != 0)
                    .map(|(_, a)| *a)
                    .collect();
                let decoded = {
                    let empty = ctx.empty();
                    crate::plugin::translate_input_interpretation(
                        &mut ctx.registry,
                        empty,
                        Some(&input),
                    )?
                };
                let probe = call(&mut ctx, program, "q", input.clone());
                let outputs = NestedHexAtom::Cautious
                    .retrieve(&mut ctx, &probe)?
                    .into_iter()
                    .collect_vec();

                for nogood in nogoods.nogoods().to_vec() {
                    for c in constants {
                        let mut subst = Substitution::new();
                        for v in nogood.iter().flat_map(|l| ctx.registry.atom(l.atom).tuple.clone()) {
                            if ctx.registry.is_variable(v) {
                                subst.bind(v, c);
                            }
                        }
                        let mut inputs_hold = true;
                        let mut output = None;
                        for literal in nogood.iter() {
                            let ground = subst.apply_atom(&mut ctx.registry, literal.atom);
                            let atom = ctx.registry.atom(ground);
                            if atom.flags.external_auxiliary {
                                // aux_r_hexCautious(kind, program, i, q, X...)
                                output = Some(atom.tuple[5..].to_vec());
                                continue;
                            }
                            let holds = if encode {
                                input.get_fact(ground)
                            } else {
                                decoded.get_fact(ground)
                            };
                            inputs_hold &= holds == literal.positive;
                        }
                        let output = output.unwrap();
                        if inputs_hold {
                            let mut scratch = Substitution::new();
                            assert!(
                                outputs
                                    .iter()
                                    .any(|t| match_tuple(&ctx.registry, &output, t, &mut scratch)),
                                "support set {} violated on input {}",
                                nogood.display(&ctx.registry),
                                input.display(&ctx.registry)
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
