use std::rc::Rc;

use log::debug;
use strum_macros::{Display, EnumString, IntoStaticStr};

use super::{
    learning, translate_input_interpretation, Answer, CallKind, EvaluationCache, HexAnswer,
    InspectionKind, PluginError, ProgramCtx, Query,
};
use crate::middleware::{Interpretation, NogoodContainer, PredicateMask, Registry, TermId};

/// Kind of an input argument of an external atom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    Constant,
    /// The extension of the named predicate is passed to the call.
    Predicate,
    /// Any number of trailing terms.
    Tuple,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomSignature {
    pub predicate: &'static str,
    pub inputs: Vec<InputType>,
    /// `None` when the output arity follows the query predicate.
    pub output_arity: Option<usize>,
}

/// The external atoms of the plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum NestedHexAtom {
    /// Tuples of the query predicate true in every answer set.
    #[strum(serialize = "hexCautious")]
    Cautious,
    /// Tuples of the query predicate true in some answer set.
    #[strum(serialize = "hexBrave")]
    Brave,
    /// Structure of the answer sets: their number, their atoms, and the
    /// terms of single atoms.
    #[strum(serialize = "hexInspection")]
    Inspection,
}

impl NestedHexAtom {
    pub fn predicate(self) -> &'static str {
        self.into()
    }

    pub fn signature(self) -> AtomSignature {
        use InputType::*;
        match self {
            NestedHexAtom::Cautious | NestedHexAtom::Brave => AtomSignature {
                predicate: self.predicate(),
                inputs: vec![Constant, Constant, Predicate, Constant],
                output_arity: None,
            },
            NestedHexAtom::Inspection => AtomSignature {
                predicate: self.predicate(),
                inputs: vec![Constant, Constant, Predicate, Constant, Tuple],
                output_arity: Some(2),
            },
        }
    }

    pub fn retrieve(self, ctx: &mut ProgramCtx, query: &Query) -> Result<Answer, PluginError> {
        debug!(
            "{} retrieve with input {}",
            self,
            ctx.registry.tuple_to_string(&query.input)
        );
        match self {
            NestedHexAtom::Cautious | NestedHexAtom::Brave => {
                self.check_input_count(query, 4)?;
                let answer = hex_answer(ctx, query)?;

                let mut mask = PredicateMask::new();
                mask.add_predicate(query.input[3]);
                mask.update_mask(&ctx.registry);

                let selected = if self == NestedHexAtom::Cautious {
                    if answer.answer_sets.is_empty() {
                        // Vacuously true for ground queries, no instance otherwise.
                        return Ok(if query.pattern_is_ground(&ctx.registry) {
                            [Vec::new()].into_iter().collect()
                        } else {
                            Answer::new()
                        });
                    }
                    cautious_consequences(mask.mask(), &answer.answer_sets)
                } else {
                    brave_consequences(mask.mask(), &answer.answer_sets)
                };
                Ok(selected
                    .iter()
                    .map(|a| ctx.registry.atom(a).args().to_vec())
                    .collect())
            }
            NestedHexAtom::Inspection => inspect(ctx, query),
        }
    }

    /// Learns support sets for the call described by `query` and adds them
    /// to `nogoods`. Returns the number of support sets learned.
    pub fn learn_support_sets(
        self,
        ctx: &mut ProgramCtx,
        query: &Query,
        nogoods: &mut dyn NogoodContainer,
    ) -> Result<usize, PluginError> {
        if !ctx.config.support_sets || self == NestedHexAtom::Inspection {
            return Ok(0);
        }
        self.check_input_count(query, 4)?;
        let answer = hex_answer(ctx, query)?;
        Ok(learning::learn_support_sets(ctx, self, query, &answer, nogoods))
    }

    /// [`retrieve`](Self::retrieve) followed by support-set learning when a
    /// container is supplied.
    pub fn retrieve_with_nogoods(
        self,
        ctx: &mut ProgramCtx,
        query: &Query,
        nogoods: Option<&mut dyn NogoodContainer>,
    ) -> Result<Answer, PluginError> {
        let answer = self.retrieve(ctx, query)?;
        if let Some(nogoods) = nogoods {
            self.learn_support_sets(ctx, query, nogoods)?;
        }
        Ok(answer)
    }

    fn check_input_count(self, query: &Query, expected: usize) -> Result<(), PluginError> {
        if query.input.len() == expected {
            Ok(())
        } else {
            Err(PluginError::query(format!(
                "{} requires {} parameters, found {}",
                self,
                expected,
                query.input.len()
            )))
        }
    }
}

fn cautious_consequences(mask: &Interpretation, answer_sets: &[Interpretation]) -> Interpretation {
    answer_sets
        .iter()
        .fold(mask.clone(), |acc, answer_set| acc.intersection(answer_set))
}

fn brave_consequences(mask: &Interpretation, answer_sets: &[Interpretation]) -> Interpretation {
    answer_sets
        .iter()
        .fold(Interpretation::new(), |acc, answer_set| {
            acc.union(&mask.intersection(answer_set))
        })
}

/// Translates the input and fetches the answer sets through the cache.
fn hex_answer(ctx: &mut ProgramCtx, query: &Query) -> Result<Rc<HexAnswer>, PluginError> {
    let kind = CallKind::from_term(&ctx.registry, query.input[0])?;
    let empty = ctx.empty();
    let edb =
        translate_input_interpretation(&mut ctx.registry, empty, query.interpretation.as_ref())?;
    EvaluationCache::get_hex_answer(ctx, kind, query.input[1], edb)
}

fn integer(registry: &mut Registry, value: usize) -> TermId {
    registry.store_integer(value as i64)
}

fn index_argument(registry: &Registry, term: TermId, bound: usize) -> Option<usize> {
    registry
        .integer_value(term)
        .and_then(|i| usize::try_from(i).ok())
        .filter(|i| *i < bound)
}

fn inspect(ctx: &mut ProgramCtx, query: &Query) -> Result<Answer, PluginError> {
    if query.input.len() < 4 {
        return Err(PluginError::query(
            "hexInspection requires at least 4 parameters",
        ));
    }
    let kind = InspectionKind::from_term(&ctx.registry, query.input[3])?;
    let expected = match kind {
        InspectionKind::Program => 4,
        InspectionKind::AnswerSet | InspectionKind::Atom => 5,
    };
    if query.input.len() != expected {
        return Err(PluginError::query(format!(
            "hexInspection with query type \"{}\" requires {} parameters",
            kind, expected
        )));
    }
    let answer = hex_answer(ctx, query)?;
    let count = answer.answer_sets.len();

    let mut out = Answer::new();
    match kind {
        InspectionKind::Program => {
            let n = integer(&mut ctx.registry, count);
            for i in 0..=count {
                out.push(vec![integer(&mut ctx.registry, i), n]);
            }
        }
        InspectionKind::AnswerSet => {
            let k = index_argument(&ctx.registry, query.input[4], count)
                .ok_or_else(|| PluginError::query("hexInspection: invalid answer set index"))?;
            debug!(
                "Inspecting answer set {}",
                answer.answer_sets[k].display(&ctx.registry)
            );
            for atom in answer.answer_sets[k].iter() {
                let ordinary = ctx.registry.atom(atom);
                if ordinary.flags.auxiliary {
                    continue;
                }
                let arity = ordinary.arity();
                out.push(vec![
                    integer(&mut ctx.registry, atom.index()),
                    integer(&mut ctx.registry, arity),
                ]);
            }
        }
        InspectionKind::Atom => {
            let j = index_argument(&ctx.registry, query.input[4], ctx.registry.atom_count())
                .ok_or_else(|| PluginError::query("hexInspection: invalid atom index"))?;
            let tuple = ctx.registry.atom(crate::middleware::AtomId(j as u32)).tuple.clone();
            for (position, term) in tuple.into_iter().enumerate() {
                out.push(vec![integer(&mut ctx.registry, position), term]);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        config::Config,
        middleware::{AtomFlags, AtomId, Program},
        plugin::encode_input_atom,
        solver::{SolverError, StableModelSolver, SubprogramSolver},
    };

    fn init() -> ProgramCtx {
        let _ = env_logger::builder().is_test(true).try_init();
        ProgramCtx::new(Config::default())
    }

    fn constant(ctx: &mut ProgramCtx, name: &str) -> TermId {
        ctx.registry.store_constant(name)
    }

    fn quoted(ctx: &mut ProgramCtx, text: &str) -> TermId {
        ctx.registry.store_constant(&format!("\"{}\"", text))
    }

    /// Encoded input `i(pred, 1, arg)` for each argument.
    fn unary_input(ctx: &mut ProgramCtx, pred: &str, args: &[&str]) -> Interpretation {
        let input = constant(ctx, "i");
        let empty = ctx.empty();
        let pred = constant(ctx, pred);
        args.iter()
            .map(|a| {
                let a = constant(ctx, a);
                let fact = ctx.registry.store_ordinary_atom(vec![pred, a]);
                encode_input_atom(&mut ctx.registry, input, fact, 1, empty).unwrap()
            })
            .collect()
    }

    fn query(
        ctx: &mut ProgramCtx,
        program: &str,
        extra: &[TermId],
        input: Option<Interpretation>,
        pattern: Vec<TermId>,
    ) -> Query {
        let mut terms = vec![
            constant(ctx, "string"),
            quoted(ctx, program),
            constant(ctx, "i"),
        ];
        terms.extend_from_slice(extra);
        Query::new(terms, input, pattern)
    }

    fn render(ctx: &ProgramCtx, answer: Answer) -> Vec<String> {
        answer
            .into_iter()
            .map(|t| ctx.registry.tuple_to_string(&t))
            .sorted()
            .collect()
    }

    const CHOICE: &str =
        "sel(X) :- in(X), not out(X). out(X) :- in(X), not sel(X). all(X) :- in(X).";

    #[test]
    fn test_signatures() {
        assert_eq!(NestedHexAtom::Brave.signature().inputs.len(), 4);
        assert_eq!(NestedHexAtom::Brave.signature().output_arity, None);
        let inspection = NestedHexAtom::Inspection.signature();
        assert_eq!(inspection.predicate, "hexInspection");
        assert_eq!(inspection.inputs[4], InputType::Tuple);
        assert_eq!(inspection.output_arity, Some(2));
    }

    #[test]
    fn test_cautious_and_brave() -> Result<(), PluginError> {
        let mut ctx = init();
        let input = unary_input(&mut ctx, "in", &["a", "b"]);
        let x = ctx.registry.store_variable("X");
        for (pred, cautious, brave) in [
            ("all", vec!["(a)", "(b)"], vec!["(a)", "(b)"]),
            ("sel", vec![], vec!["(a)", "(b)"]),
        ] {
            let pred = constant(&mut ctx, pred);
            let q = query(&mut ctx, CHOICE, &[pred], Some(input.clone()), vec![x]);
            let c = NestedHexAtom::Cautious.retrieve(&mut ctx, &q)?;
            let c = render(&ctx, c);
            let b = NestedHexAtom::Brave.retrieve(&mut ctx, &q)?;
            let b = render(&ctx, b);
            assert_eq!(c, cautious);
            assert_eq!(b, brave);
            assert!(c.iter().all(|t| b.contains(t)));
        }
        // One evaluation served all four queries.
        assert_eq!(ctx.cache.len(), 1);
        assert_eq!(ctx.cache.entries()[0].answer_sets.len(), 4);
        Ok(())
    }

    #[test]
    fn test_cautious_without_answer_sets() -> Result<(), PluginError> {
        let mut ctx = init();
        let a = constant(&mut ctx, "a");
        let x = ctx.registry.store_variable("X");

        let ground = query(&mut ctx, "a :- not a.", &[a], None, vec![]);
        let answer = NestedHexAtom::Cautious.retrieve(&mut ctx, &ground)?;
        assert_eq!(answer.into_iter().collect_vec(), vec![Vec::<TermId>::new()]);

        let open = query(&mut ctx, "a :- not a.", &[a], None, vec![x]);
        assert!(NestedHexAtom::Cautious.retrieve(&mut ctx, &open)?.is_empty());
        assert!(NestedHexAtom::Brave.retrieve(&mut ctx, &ground)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_inspect_program() -> Result<(), PluginError> {
        let mut ctx = init();
        let program = constant(&mut ctx, "program");
        let q = query(
            &mut ctx,
            "a :- not b, not c. b :- not a, not c. c :- not a, not b.",
            &[program],
            None,
            vec![],
        );
        let answer = NestedHexAtom::Inspection.retrieve(&mut ctx, &q)?;
        assert_eq!(
            render(&ctx, answer),
            vec!["(0,3)", "(1,3)", "(2,3)", "(3,3)"]
        );
        Ok(())
    }

    #[test]
    fn test_inspect_answer_set_and_atom() -> Result<(), PluginError> {
        let mut ctx = init();
        // Interned as auxiliary before the subprogram mentions it.
        let hidden = constant(&mut ctx, "hidden");
        let hidden = ctx.registry.store_atom(vec![hidden], AtomFlags::auxiliary());
        let answerset = constant(&mut ctx, "answerset");
        let zero = ctx.registry.store_integer(0);
        let q = query(&mut ctx, "p(a,b). q. hidden.", &[answerset, zero], None, vec![]);
        let answer = NestedHexAtom::Inspection.retrieve(&mut ctx, &q)?;

        let tuple = ["p", "a", "b"].map(|t| constant(&mut ctx, t));
        let p = ctx.registry.lookup_atom(&tuple).unwrap();
        let q_pred = constant(&mut ctx, "q");
        let q_atom = ctx.registry.lookup_atom(&[q_pred]).unwrap();
        let mut expected = vec![
            format!("({},2)", p.index()),
            format!("({},0)", q_atom.index()),
        ];
        expected.sort();
        assert_eq!(render(&ctx, answer), expected);
        assert!(ctx.cache.entries()[0].answer_sets[0].get_fact(hidden));

        let atom = constant(&mut ctx, "atom");
        let index = ctx.registry.store_integer(p.index() as i64);
        let q = query(&mut ctx, "p(a,b). q. hidden.", &[atom, index], None, vec![]);
        let answer = NestedHexAtom::Inspection.retrieve(&mut ctx, &q)?;
        assert_eq!(render(&ctx, answer), vec!["(0,p)", "(1,a)", "(2,b)"]);
        Ok(())
    }

    #[test]
    fn test_query_errors() {
        let mut ctx = init();
        let a = constant(&mut ctx, "a");
        let program = constant(&mut ctx, "program");
        let answerset = constant(&mut ctx, "answerset");
        let atom = constant(&mut ctx, "atom");
        let bogus = constant(&mut ctx, "bogus");
        let seven = ctx.registry.store_integer(7);
        let huge = ctx.registry.store_integer(1 << 40);

        let cases = [
            (NestedHexAtom::Cautious, query(&mut ctx, "a.", &[], None, vec![])),
            (NestedHexAtom::Brave, query(&mut ctx, "a.", &[a, a], None, vec![])),
            (NestedHexAtom::Inspection, query(&mut ctx, "a.", &[program, seven], None, vec![])),
            (NestedHexAtom::Inspection, query(&mut ctx, "a.", &[answerset], None, vec![])),
            (NestedHexAtom::Inspection, query(&mut ctx, "a.", &[answerset, seven], None, vec![])),
            (NestedHexAtom::Inspection, query(&mut ctx, "a.", &[atom, huge], None, vec![])),
            (NestedHexAtom::Inspection, query(&mut ctx, "a.", &[bogus], None, vec![])),
        ];
        for (kind, q) in cases {
            let err = kind.retrieve(&mut ctx, &q).unwrap_err();
            assert!(matches!(err, PluginError::Query(_)), "{:?}", err);
        }

        let mut q = query(&mut ctx, "a.", &[a], None, vec![]);
        q.input[0] = bogus;
        assert!(matches!(
            NestedHexAtom::Cautious.retrieve(&mut ctx, &q),
            Err(PluginError::Query(_))
        ));

        let i = constant(&mut ctx, "i");
        let broken: Interpretation = [ctx.registry.store_ordinary_atom(vec![i, a])]
            .into_iter()
            .collect();
        let q = query(&mut ctx, "a.", &[a], Some(broken), vec![]);
        assert!(matches!(
            NestedHexAtom::Cautious.retrieve(&mut ctx, &q),
            Err(PluginError::Translation(_))
        ));
    }

    /// Solves `outer` by asking `hexBrave` for `inner/1` of a nested
    /// program and adding `derived(X)` for every answer.
    struct DelegatingSolver;

    impl SubprogramSolver for DelegatingSolver {
        fn evaluate(
            &self,
            ctx: &mut ProgramCtx,
            program: &Program,
            edb: &Interpretation,
        ) -> Result<Vec<Interpretation>, SolverError> {
            let outer = ctx.registry.store_constant("outer");
            let outer = ctx.registry.store_ordinary_atom(vec![outer]);
            if !program.edb.get_fact(outer) {
                return StableModelSolver.evaluate(ctx, program, edb);
            }
            let inner = ctx.registry.store_constant("inner");
            let q = Query::new(
                vec![
                    ctx.registry.store_constant("string"),
                    ctx.registry.store_constant("\"inner(a). inner(b).\""),
                    ctx.registry.store_constant("i"),
                    inner,
                ],
                None,
                vec![ctx.registry.store_variable("X")],
            );
            let answer = NestedHexAtom::Brave
                .retrieve(ctx, &q)
                .map_err(anyhow::Error::from)?;
            let derived = ctx.registry.store_constant("derived");
            let mut model = program.edb.union(edb);
            for tuple in answer {
                let mut atom = vec![derived];
                atom.extend(tuple);
                model.set_fact(ctx.registry.store_ordinary_atom(atom));
            }
            Ok(vec![model])
        }
    }

    #[test]
    fn test_nested_calls_share_the_context() -> Result<(), PluginError> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ctx = ProgramCtx::with_solver(Config::default(), Rc::new(DelegatingSolver));
        let derived = ctx.registry.store_constant("derived");
        let x = ctx.registry.store_variable("X");
        let q = query(&mut ctx, "outer.", &[derived], None, vec![x]);

        let answer = NestedHexAtom::Cautious.retrieve(&mut ctx, &q)?;
        assert_eq!(render(&ctx, answer), vec!["(a)", "(b)"]);
        // Inner entry is stored first since it completes first.
        assert_eq!(ctx.cache.len(), 2);
        let inner: Vec<AtomId> = ctx.cache.entries()[0].answer_sets[0].iter().collect();
        assert_eq!(inner.len(), 2);
        Ok(())
    }
}
