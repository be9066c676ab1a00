//! # Parse Objects
//!
//! A `Parse` is one full candidate interpretation of a line: the structural
//! candidate it was built around, a private deep copy of the preliminary
//! note/arc state, and everything the pipeline computes from there. Sibling
//! parses share no mutable state, so candidates can be evaluated in any
//! order (or in parallel by an enclosing driver).
//!
//! ## State machine
//! ```text
//! unbuilt -> (basic-arc search) -> failed(errors)
//!                               -> basic-established
//!                                    -> secondary-rules-assigned
//!                                    -> locally-resolved-checked
//!                                    -> arcs-pruned
//!                                    -> levels-set
//!                                    -> arcs-gathered
//!                                    -> complete
//! ```
//! Terminal states are `failed` and `complete`; no mutation occurs after
//! `complete`. A parse that reaches `complete` with accumulated errors is
//! still discarded by the collector.
//!
//! ## Related Modules
//! - `structure` - Builds the basic arc (stage one)
//! - `rules` - Secondary-rule assignment, local resolutions, pruning
//! - `levels` - Dependency and arc levels

use crate::arc::Arc;
use crate::config::{LineType, ParserConfig};
use crate::context::LineContext;
use crate::note::{Note, TieRole};
use crate::prelim::Preliminary;
use crate::{levels, rules, structure};

/// Progress of a parse through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Unbuilt,
    Failed,
    BasicEstablished,
    SecondaryRulesAssigned,
    LocallyResolvedChecked,
    ArcsPruned,
    LevelsSet,
    ArcsGathered,
    Complete,
}

/// One candidate interpretation of a line.
#[derive(Debug, Clone)]
pub struct Parse {
    pub line_type: LineType,
    /// Which inference strategy produced the basic arc.
    pub method: usize,
    pub notes: Vec<Note>,
    pub arcs: Vec<Arc>,
    /// Final tonic.
    pub s1_index: usize,
    pub s2_index: Option<usize>,
    pub s3_index: Option<usize>,
    pub s4_index: Option<usize>,
    /// Primary lines: the interior notes of the basic arc.
    pub s3_indexes: Vec<usize>,
    /// The basic arc's note indices once established.
    pub arc_basic: Option<Vec<usize>>,
    /// Open heads inherited from the preliminary parse.
    pub open_heads: Vec<usize>,
    pub local_insertions: Vec<usize>,
    pub errors: Vec<String>,
    pub state: ParseState,
}

impl Parse {
    /// Deep-copy the preliminary state into a fresh candidate parse.
    pub fn from_preliminary(prelim: &Preliminary, line_type: LineType, s1_index: usize) -> Self {
        Self {
            line_type,
            method: 0,
            notes: prelim.notes.clone(),
            arcs: prelim.arcs.clone(),
            s1_index,
            s2_index: None,
            s3_index: None,
            s4_index: None,
            s3_indexes: Vec::new(),
            arc_basic: None,
            open_heads: prelim.open_heads.clone(),
            local_insertions: prelim.local_insertions.clone(),
            errors: prelim.errors.clone(),
            state: ParseState::Unbuilt,
        }
    }

    /// Run the pipeline to a terminal state.
    pub fn perform(&mut self, context: &LineContext, config: &ParserConfig) {
        if self.state != ParseState::BasicEstablished {
            // the structure engine marks success before perform is called
            self.state = ParseState::Failed;
            return;
        }
        structure::attach_open_heads(self);
        rules::assign_secondary_rules(self, context, config);
        self.state = ParseState::SecondaryRulesAssigned;
        rules::test_local_resolutions(self, context, config);
        self.state = ParseState::LocallyResolvedChecked;
        rules::prune_arcs(self, context, config);
        self.state = ParseState::ArcsPruned;
        if config.get_structural_levels {
            levels::set_dependency_levels(self, config);
            self.propagate_tie_levels();
        }
        self.state = ParseState::LevelsSet;
        levels::set_arc_levels(self);
        self.state = ParseState::ArcsGathered;
        self.state = if self.errors.is_empty() {
            ParseState::Complete
        } else {
            ParseState::Failed
        };
    }

    /// Tie followers inherit the rule and level of their tie head.
    fn propagate_tie_levels(&mut self) {
        for idx in 0..self.notes.len() {
            if matches!(self.notes[idx].tie, TieRole::Continue | TieRole::Stop) {
                let head = (0..idx)
                    .rev()
                    .find(|&h| self.notes[h].is_scanned());
                if let Some(h) = head {
                    self.notes[idx].rule = self.notes[h].rule;
                }
            }
        }
    }

    /// Signature used by the collector to deduplicate equivalent parses.
    pub fn signature(&self) -> (LineType, Vec<Vec<usize>>, Vec<Option<&'static str>>) {
        let mut arcs: Vec<Vec<usize>> = self.arcs.iter().map(|a| a.notes.clone()).collect();
        arcs.sort();
        let labels = self
            .notes
            .iter()
            .map(|n| n.rule.name.map(|r| r.as_str()))
            .collect();
        (self.line_type, arcs, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Species;
    use crate::context::LineContext;
    use crate::note::{Csd, Direction};
    use crate::prelim::preliminary_parse;

    fn major_line(values: &[i32]) -> Vec<Note> {
        let semis = [0, 2, 4, 5, 7, 9, 11];
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let pitch = 12 * v.div_euclid(7) + semis[v.rem_euclid(7) as usize];
                Note::new(i, Csd::new(v, Direction::Bidirectional), pitch, i + 1, 1.0, i as f64)
            })
            .collect()
    }

    #[test]
    fn test_unbuilt_parse_fails() {
        let notes = major_line(&[0, 1, 2, 1, 0]);
        let context = LineContext::monotriadic();
        let config = ParserConfig {
            species: Species::First,
            ..ParserConfig::default()
        };
        let prelim = preliminary_parse(notes, &context, &config);
        let mut parse = Parse::from_preliminary(&prelim, LineType::Generic, 4);
        parse.perform(&context, &config);
        assert_eq!(parse.state, ParseState::Failed);
    }
}
