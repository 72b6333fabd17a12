//! Text front-end: subprogram parsing and the nested-call surface syntax.
//!
//! - [`parse_program`]: parse a subprogram into a [`Program`], interning its
//!   terms and atoms in the caller's [`Registry`].
//! - [`SurfaceRewriter`]: expand `CHEX[...]`, `BHEX[...]`, `IHEX[...]` and
//!   their file variants into the primitive external call.
pub mod error;
pub mod parser;
mod processor;
pub mod rewriter;

pub use error::{LangError, ProcessorError};
pub use parser::{HexParser, ParseError, Rule};
pub use processor::process_program;
pub use rewriter::{ExternalAtom, RewrittenAtom, SurfaceKind, SurfaceRewriter};

use crate::middleware::{Program, Registry};

/// Parses subprogram text and lowers it into a [`Program`].
pub fn parse_program(registry: &mut Registry, text: &str) -> Result<Program, LangError> {
    let program = parser::parse_program_text(text)?
        .next()
        .ok_or_else(|| ProcessorError::MissingElement {
            element_type: "program".to_string(),
            context: text.to_string(),
        })?;
    Ok(process_program(program, registry)?)
}
