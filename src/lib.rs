pub mod arc;
pub mod collector;
pub mod config;
pub mod context;
pub mod error;
pub mod input;
pub mod interval;
pub mod levels;
pub mod note;
pub mod parse;
pub mod prelim;
pub mod rules;
pub mod scanner;
pub mod structure;

pub use collector::LineResult;
pub use config::{LineType, ParserConfig, Species};
pub use context::{HarmonicSpans, LineContext, Triad};
pub use error::CantusError;
pub use input::LineInput;
pub use note::{Csd, Direction, Note, TieRole};
pub use parse::{Parse, ParseState};

/// Parse a line under every line type and collect the surviving readings.
/// This is the main entry point for the library.
pub fn parse_line(notes: Vec<Note>, context: &LineContext, config: &ParserConfig) -> LineResult {
    parse_line_as(
        notes,
        context,
        config,
        &[LineType::Primary, LineType::Bass, LineType::Generic],
    )
}

/// Parse a line restricted to the given line types.
pub fn parse_line_as(
    notes: Vec<Note>,
    context: &LineContext,
    config: &ParserConfig,
    line_types: &[LineType],
) -> LineResult {
    let prelim = prelim::preliminary_parse(notes, context, config);
    let mut candidates = Vec::new();
    let mut structural = prelim.errors.clone();
    for &line_type in line_types {
        let mut outcome = structure::build_candidates(&prelim, line_type, context, config);
        for parse in &mut outcome.parses {
            parse.perform(context, config);
        }
        candidates.extend(outcome.parses);
        structural.extend(outcome.structural_errors);
    }
    collector::collect(candidates, structural, config)
}
