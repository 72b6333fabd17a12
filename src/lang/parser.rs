use pest::{iterators::Pairs, Parser};
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "lang/grammar.pest"]
pub struct HexParser;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("Pest parsing error: {0}")]
    Pest(#[from] Box<pest::error::Error<Rule>>),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::Pest(Box::new(err))
    }
}

/// Parses the text of a subprogram.
pub fn parse_program_text(input: &str) -> Result<Pairs<'_, Rule>, ParseError> {
    Ok(HexParser::parse(Rule::program, input)?)
}

/// Parses a single nested call written in the surface syntax.
pub fn parse_nested_atom(input: &str) -> Result<Pairs<'_, Rule>, ParseError> {
    Ok(HexParser::parse(Rule::nested_atom, input)?)
}
