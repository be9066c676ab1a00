//! # Parse Collection and Preference
//!
//! Gathers the candidate parses a line produced, discards the failed
//! ones, deduplicates equivalent readings, and optionally applies the
//! preference rules that narrow multiple survivors down to the favored
//! interpretations. When nothing survives, the deduplicated union of all
//! accumulated errors becomes the line's failure report.
//!
//! ## Related Modules
//! - `parse` - Supplies the signature used for deduplication
//! - `structure` - The producer of candidate parses

use std::collections::HashSet;

use crate::config::{LineType, ParserConfig};
use crate::parse::{Parse, ParseState};

/// The outcome for one line: surviving parses, or the reasons none
/// survived.
#[derive(Debug, Default)]
pub struct LineResult {
    pub parses: Vec<Parse>,
    pub errors: Vec<String>,
}

impl LineResult {
    pub fn is_parsed(&self) -> bool {
        !self.parses.is_empty()
    }
}

/// Filter, deduplicate, and apply preferences.
pub fn collect(
    candidates: Vec<Parse>,
    structural_errors: Vec<String>,
    config: &ParserConfig,
) -> LineResult {
    let mut failures: Vec<String> = structural_errors;
    let mut survivors: Vec<Parse> = Vec::new();
    let mut seen = HashSet::new();
    for parse in candidates {
        if parse.state == ParseState::Complete && parse.errors.is_empty() {
            let sig = format!("{:?}", parse.signature());
            if seen.insert(sig) {
                survivors.push(parse);
            }
        } else {
            failures.extend(parse.errors.iter().cloned());
        }
    }

    if survivors.is_empty() {
        let mut errors = Vec::new();
        for e in failures {
            if !errors.contains(&e) {
                errors.push(e);
            }
        }
        return LineResult {
            parses: Vec::new(),
            errors,
        };
    }

    if config.select_preferred_parses {
        apply_preferences(&mut survivors);
    }
    LineResult {
        parses: survivors,
        errors: Vec::new(),
    }
}

fn apply_preferences(survivors: &mut Vec<Parse>) {
    // primary lines: the lowest-numbered method wins
    if let Some(best) = survivors
        .iter()
        .filter(|p| p.line_type == LineType::Primary)
        .map(|p| p.method)
        .min()
    {
        let kept: Vec<usize> = survivors
            .iter()
            .enumerate()
            .filter(|(_, p)| p.line_type != LineType::Primary || p.method == best)
            .map(|(i, _)| i)
            .collect();
        // don't purge if the result would be empty
        if !kept.is_empty() {
            retain_indices(survivors, &kept);
        }
    }

    // bass lines: prefer an onbeat dominant pivot
    let onbeat: Vec<usize> = survivors
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            p.line_type != LineType::Bass
                || p.s3_index.map_or(false, |s3| p.notes[s3].beat == 1.0)
        })
        .map(|(i, _)| i)
        .collect();
    // don't purge if the result would be empty
    if !onbeat.is_empty() {
        retain_indices(survivors, &onbeat);
    }

    // bass lines: prefer the pivot nearest the line's midpoint
    let distance = |p: &Parse| -> Option<f64> {
        let s3 = p.s3_index?;
        let first = p.notes.iter().find(|n| n.is_scanned())?;
        let mid = (first.offset + p.notes[p.s1_index].offset) / 2.0;
        Some((p.notes[s3].offset - mid).abs())
    };
    if let Some(best) = survivors
        .iter()
        .filter(|p| p.line_type == LineType::Bass)
        .filter_map(&distance)
        .min_by(|a, b| a.total_cmp(b))
    {
        let kept: Vec<usize> = survivors
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.line_type != LineType::Bass
                    || distance(p).map_or(false, |d| d.total_cmp(&best).is_eq())
            })
            .map(|(i, _)| i)
            .collect();
        // don't purge if the result would be empty
        if !kept.is_empty() {
            retain_indices(survivors, &kept);
        }
    }
}

fn retain_indices(survivors: &mut Vec<Parse>, kept: &[usize]) {
    let mut i = 0;
    survivors.retain(|_| {
        let keep = kept.contains(&i);
        i += 1;
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Species;
    use crate::context::LineContext;
    use crate::note::{Csd, Direction, Note};
    use crate::prelim::preliminary_parse;
    use crate::structure::build_candidates;

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

    fn config() -> ParserConfig {
        ParserConfig {
            species: Species::First,
            ..ParserConfig::default()
        }
    }

    #[test]
    fn test_failed_candidates_surface_their_errors() {
        let context = LineContext::monotriadic();
        let config = config();
        let prelim = preliminary_parse(major_line(&[0, 4, 1]), &context, &config);
        let outcome = build_candidates(&prelim, LineType::Bass, &context, &config);
        let result = collect(outcome.parses, outcome.structural_errors, &config);
        assert!(!result.is_parsed());
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("does not end on the tonic degree (S1)")));
    }

    #[test]
    fn test_duplicate_parses_collapse() {
        let context = LineContext::monotriadic();
        let config = config();
        let prelim = preliminary_parse(major_line(&[2, 1, 0]), &context, &config);
        let mut outcome = build_candidates(&prelim, LineType::Primary, &context, &config);
        for p in &mut outcome.parses {
            p.perform(&context, &config);
        }
        // duplicate the candidate list wholesale
        let mut doubled = outcome.parses.clone();
        doubled.extend(outcome.parses.clone());
        let n = collect(outcome.parses, Vec::new(), &config).parses.len();
        let result = collect(doubled, Vec::new(), &config);
        assert_eq!(result.parses.len(), n);
    }
}
