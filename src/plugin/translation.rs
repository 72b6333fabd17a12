//! Conversion between the higher-order input encoding
//! `i(d, n, c1, ..., cn, empty, ..., empty)` and ordinary facts `d(c1, ..., cn)`.

use log::{debug, trace};

use super::TranslationError;
use crate::middleware::{AtomId, Interpretation, Registry, TermId};

/// Decodes every encoded input atom. Atoms flagged as external input
/// auxiliaries are bookkeeping of the host and are skipped.
pub fn translate_input_interpretation(
    registry: &mut Registry,
    empty: TermId,
    input: Option<&Interpretation>,
) -> Result<Interpretation, TranslationError> {
    let Some(input) = input else {
        return Ok(Interpretation::new());
    };
    debug!("Translating interpretation {}", input.display(registry));

    let mut edb = Interpretation::new();
    for id in input.iter() {
        let atom = registry.atom(id);
        if atom.flags.external_input_auxiliary {
            continue;
        }
        let tuple = atom.tuple.clone();
        if tuple.len() < 3 {
            return Err(TranslationError::ArityTooSmall {
                atom: registry.atom_to_string(id),
            });
        }
        let arity = registry
            .integer_value(tuple[2])
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| TranslationError::MissingArity {
                atom: registry.atom_to_string(id),
            })?;
        if tuple.len() < arity + 3 {
            return Err(TranslationError::Truncated {
                atom: registry.atom_to_string(id),
                arity,
            });
        }
        if tuple[arity + 3..].iter().any(|t| *t != empty) {
            return Err(TranslationError::Padding {
                atom: registry.atom_to_string(id),
            });
        }

        let mut mapped = vec![tuple[1]];
        mapped.extend_from_slice(&tuple[3..arity + 3]);
        let translated = registry.store_ordinary_atom(mapped);
        trace!(
            "Translated {} to {}",
            registry.atom_to_string(id),
            registry.atom_to_string(translated)
        );
        debug_assert_eq!(
            registry.atom(translated).arity(),
            arity,
            "translation of input atom failed"
        );
        edb.set_fact(translated);
    }
    Ok(edb)
}

/// Encodes `d(c1, ..., cn)` as `input_pred(d, n, c1, ..., cn, empty, ...)`
/// padded to `max_arity` arguments after the arity marker.
pub fn encode_input_atom(
    registry: &mut Registry,
    input_pred: TermId,
    atom: AtomId,
    max_arity: usize,
    empty: TermId,
) -> Result<AtomId, TranslationError> {
    let ordinary = registry.atom(atom);
    let arity = ordinary.arity();
    if arity > max_arity {
        return Err(TranslationError::Encoding {
            atom: registry.atom_to_string(atom),
            arity,
            max_arity,
        });
    }
    let mut tuple = vec![input_pred, ordinary.predicate()];
    let args = ordinary.args().to_vec();
    tuple.push(registry.store_integer(arity as i64));
    tuple.extend(args);
    tuple.resize(max_arity + 3, empty);
    Ok(registry.store_ordinary_atom(tuple))
}
