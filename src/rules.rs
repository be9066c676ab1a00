//! # Secondary Rule Assignment
//!
//! Once the basic arc is in place, every remaining note is classified from
//! its dependency links: neighbors, passing tones, repetitions, and
//! independent notes each receive a rule label. Local insertions ('L3')
//! are then checked for forward resolution, and chains of same-direction
//! passing arcs are fused into single spans where the fusion stays
//! linearly consonant.
//!
//! ## Related Modules
//! - `parse` - Drives these stages from its pipeline
//! - `arc` - Supplies the merge primitive used by pruning
//! - `context` - Triad membership queries

use crate::arc::{self, ArcCategory, ArcKind};
use crate::config::{LineType, ParserConfig};
use crate::context::LineContext;
use crate::interval;
use crate::note::{Note, RuleName};
use crate::parse::Parse;

/// Membership test against the triad governing a note's position. Under a
/// progressing harmony the referent triad depends on the note's offset;
/// otherwise it is always the tonic triad.
fn triad_member(note: &Note, context: &LineContext, config: &ParserConfig) -> bool {
    if config.harmonic_species {
        if let Some(spans) = &context.harmonic_spans {
            let triad = if note.offset >= spans.offset_closing_tonic {
                &context.tonic_triad
            } else if note.offset >= spans.offset_dominant {
                &context.dominant_triad
            } else if spans
                .offset_predominant
                .map_or(false, |p| note.offset >= p)
            {
                &context.predominant_triad
            } else {
                &context.tonic_triad
            };
            return triad.contains(note.csd);
        }
    }
    context.tonic_triad.contains(note.csd)
}

/// Classify every note that the basic structure left unlabeled.
pub fn assign_secondary_rules(parse: &mut Parse, context: &LineContext, config: &ParserConfig) {
    for idx in 0..parse.notes.len() {
        if !parse.notes[idx].is_scanned() || parse.notes[idx].rule.name.is_some() {
            continue;
        }
        let lefthead = parse.notes[idx].dependency.lefthead;
        let righthead = parse.notes[idx].dependency.righthead;
        let member = triad_member(&parse.notes[idx], context, config);
        match (lefthead, righthead) {
            (Some(l), Some(r)) => {
                let equal = parse.notes[l].csd.degree() == parse.notes[r].csd.degree();
                if equal {
                    // neighbor: the note decorates a repeated head
                    let head_member = triad_member(&parse.notes[l], context, config);
                    let (note_rule, head_rule) = if head_member {
                        (RuleName::E2, RuleName::E1)
                    } else {
                        (RuleName::L2, RuleName::L1)
                    };
                    parse.notes[idx].rule.name = Some(note_rule);
                    if parse.notes[l].rule.name.is_none() {
                        parse.notes[l].rule.name = Some(head_rule);
                    }
                } else {
                    // passing between two different degrees
                    parse.notes[idx].rule.name = Some(RuleName::E4);
                    if parse.notes[r].rule.name.is_none()
                        && triad_member(&parse.notes[r], context, config)
                    {
                        parse.notes[r].rule.name = Some(RuleName::E3);
                    }
                }
            }
            (Some(l), None) => {
                let equal = parse.notes[l].csd.degree() == parse.notes[idx].csd.degree();
                let rule = match (equal, member) {
                    // repetition of its head
                    (true, true) => RuleName::E1,
                    (true, false) => RuleName::L1,
                    // incomplete neighbor
                    (false, true) => RuleName::E2,
                    (false, false) => RuleName::L2,
                };
                parse.notes[idx].rule.name = Some(rule);
            }
            (None, _) => {
                if member {
                    parse.notes[idx].rule.name = Some(RuleName::E3);
                    parse.notes[idx].parenthesis = true;
                } else if config.species.has_local_elaborations() || config.harmonic_species {
                    parse.notes[idx].rule.name = Some(RuleName::L3);
                    parse.notes[idx].parenthesis = true;
                } else {
                    parse.errors.push(format!(
                        "The note in measure {} is not generable.",
                        parse.notes[idx].measure
                    ));
                }
            }
        }
    }
}

/// Every local insertion must reach a triad member within one or two
/// directed diatonic steps, scanning forward.
pub fn test_local_resolutions(parse: &mut Parse, context: &LineContext, config: &ParserConfig) {
    let l3_notes: Vec<usize> = parse
        .notes
        .iter()
        .filter(|n| n.rule.name == Some(RuleName::L3))
        .map(|n| n.index)
        .collect();
    for idx in l3_notes {
        match resolution_target(parse, idx, context, config) {
            Some(target) => {
                let after_s3 = config.harmonic_species
                    && parse.line_type == LineType::Bass
                    && parse.s3_index.map_or(false, |s3| idx > s3);
                if after_s3 && parse.notes[target].csd.degree() != 3 {
                    parse.errors.push(format!(
                        "The note in measure {} makes an illegal insertion after S3.",
                        parse.notes[idx].measure
                    ));
                }
            }
            None => {
                parse.errors.push(format!(
                    "The local insertion in measure {} is not resolved.",
                    parse.notes[idx].measure
                ));
            }
        }
    }
}

/// Walk forward from `idx` by one or two directed diatonic steps and
/// return the first triad member reached, if any.
fn resolution_target(
    parse: &Parse,
    idx: usize,
    context: &LineContext,
    config: &ParserConfig,
) -> Option<usize> {
    let scanned: Vec<usize> = parse
        .notes
        .iter()
        .filter(|n| n.is_scanned() && n.index > idx)
        .map(|n| n.index)
        .collect();
    let &n1 = scanned.first()?;
    if !interval::is_diatonic_step(&parse.notes[idx], &parse.notes[n1]) {
        return None;
    }
    if triad_member(&parse.notes[n1], context, config) {
        return Some(n1);
    }
    let rising = parse.notes[n1].csd.value > parse.notes[idx].csd.value;
    let &n2 = scanned.get(1)?;
    let second_step = interval::is_diatonic_step(&parse.notes[n1], &parse.notes[n2]);
    let same_direction = (parse.notes[n2].csd.value > parse.notes[n1].csd.value) == rising;
    if second_step && same_direction && triad_member(&parse.notes[n2], context, config) {
        return Some(n2);
    }
    None
}

/// Fuse chains of same-direction passing arcs that meet end to start,
/// where the fused span remains linearly consonant and neither arc is
/// already embedded in a larger arc anchored at the junction. Interior
/// notes of the fused arc are relabeled as passing tones.
pub fn prune_arcs(parse: &mut Parse, _context: &LineContext, _config: &ParserConfig) {
    loop {
        let Some((i1, i2)) = find_fusible_pair(parse) else {
            break;
        };
        if !arc::arc_merge(&mut parse.notes, &mut parse.arcs, i1, i2) {
            break;
        }
        let fused = if i2 < i1 { i1 - 1 } else { i1 };
        let interior: Vec<usize> = parse.arcs[fused].interior().to_vec();
        for n in interior {
            parse.notes[n].rule.name = Some(RuleName::E4);
        }
    }
}

fn find_fusible_pair(parse: &Parse) -> Option<(usize, usize)> {
    for (i1, a1) in parse.arcs.iter().enumerate() {
        if a1.category != ArcCategory::Secondary {
            continue;
        }
        let Some(ArcKind::Passing { rising: r1 }) = a1.kind else {
            continue;
        };
        for (i2, a2) in parse.arcs.iter().enumerate() {
            if i1 == i2 || a2.category != ArcCategory::Secondary {
                continue;
            }
            let Some(ArcKind::Passing { rising: r2 }) = a2.kind else {
                continue;
            };
            if r1 != r2 || a1.end() != a2.start() {
                continue;
            }
            if !interval::is_permissible_span(
                &parse.notes[a1.start()],
                &parse.notes[a2.end()],
            ) {
                continue;
            }
            // a junction already absorbed by a larger arc stays put
            let embedded = parse.arcs.iter().enumerate().any(|(k, a3)| {
                k != i1
                    && k != i2
                    && ((a3.end() == a1.end() && a3.start() <= a1.start())
                        || (a3.start() == a2.start() && a3.end() >= a2.end()))
            });
            if embedded {
                continue;
            }
            return Some((i1, i2));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Species;
    use crate::note::{Csd, Direction};
    use crate::parse::ParseState;
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

    fn first_species_config() -> ParserConfig {
        ParserConfig {
            species: Species::First,
            ..ParserConfig::default()
        }
    }

    fn parse_for(values: &[i32]) -> Parse {
        let context = LineContext::monotriadic();
        let config = first_species_config();
        let prelim = preliminary_parse(major_line(values), &context, &config);
        let outcome = crate::structure::build_candidates(
            &prelim,
            LineType::Generic,
            &context,
            &config,
        );
        outcome.parses.into_iter().next().expect("one generic parse")
    }

    #[test]
    fn test_triad_membership_follows_the_progression() {
        use crate::context::HarmonicSpans;
        let mut context = LineContext::monotriadic();
        context.harmonic_spans = Some(HarmonicSpans {
            offset_predominant: None,
            offset_dominant: 2.0,
            offset_closing_tonic: 4.0,
        });
        let config = ParserConfig {
            harmonic_species: true,
            ..ParserConfig::default()
        };
        // ti is a dominant-triad member but not a tonic-triad member
        let mut ti = major_line(&[6]).remove(0);
        ti.offset = 0.0;
        assert!(!triad_member(&ti, &context, &config));
        ti.offset = 2.0;
        assert!(triad_member(&ti, &context, &config));
        // outside harmonic species the tonic triad always governs
        let plain = first_species_config();
        assert!(!triad_member(&ti, &LineContext::monotriadic(), &plain));
    }

    #[test]
    fn test_passing_interior_gets_e4() {
        let mut parse = parse_for(&[0, 1, 2]);
        assert_eq!(parse.state, ParseState::BasicEstablished);
        assign_secondary_rules(&mut parse, &LineContext::monotriadic(), &first_species_config());
        assert_eq!(parse.notes[1].rule.name, Some(RuleName::E4));
        assert!(parse.errors.is_empty());
    }

    #[test]
    fn test_neighbor_gets_e2() {
        // 1 2 1 ... closing on the tonic; the 2 is an upper neighbor
        let mut parse = parse_for(&[0, 1, 0]);
        assign_secondary_rules(&mut parse, &LineContext::monotriadic(), &first_species_config());
        assert_eq!(parse.notes[1].rule.name, Some(RuleName::E2));
    }

    #[test]
    fn test_unresolved_local_insertion_is_an_error() {
        let context = LineContext::monotriadic();
        let config = ParserConfig {
            species: Species::Third,
            ..ParserConfig::default()
        };
        let mut parse = parse_for(&[0, 2, 4, 2, 0]);
        // force an L3 with no step-reachable triad member afterward
        parse.notes[3].rule.name = Some(RuleName::L3);
        parse.notes[3].dependency.lefthead = None;
        test_local_resolutions(&mut parse, &context, &config);
        assert!(parse.errors.iter().any(|e| e.contains("not resolved")));
    }

    #[test]
    fn test_insertion_after_the_bass_pivot_is_illegal() {
        use crate::context::HarmonicSpans;
        let mut context = LineContext::monotriadic();
        context.harmonic_spans = Some(HarmonicSpans {
            offset_predominant: None,
            offset_dominant: 1.0,
            offset_closing_tonic: 5.0,
        });
        let config = ParserConfig {
            harmonic_species: true,
            ..ParserConfig::default()
        };
        // bass 1 5 6 7 5 1': the 6 sits in the dominant span after the pivot
        let prelim = preliminary_parse(major_line(&[0, 4, 5, 6, 4, 7]), &context, &config);
        assert!(prelim.errors.is_empty(), "{:?}", prelim.errors);
        let outcome =
            crate::structure::build_candidates(&prelim, LineType::Bass, &context, &config);
        let mut parse = outcome
            .parses
            .into_iter()
            .find(|p| p.s3_index == Some(1))
            .expect("a parse pivoting on the first dominant");
        parse.notes[2].rule.name = Some(RuleName::L3);
        test_local_resolutions(&mut parse, &context, &config);
        assert!(
            parse
                .errors
                .iter()
                .any(|e| e.contains("illegal insertion after S3")),
            "{:?}",
            parse.errors
        );
    }

    #[test]
    fn test_prune_is_idempotent() {
        let context = LineContext::monotriadic();
        let config = first_species_config();
        // 1 2 3 3 4 5: two rising passing arcs meeting on the third degree
        let mut parse = parse_for(&[0, 1, 2, 2, 3, 4]);
        assign_secondary_rules(&mut parse, &context, &config);
        prune_arcs(&mut parse, &context, &config);
        let after_first: Vec<Vec<usize>> =
            parse.arcs.iter().map(|a| a.notes.clone()).collect();
        prune_arcs(&mut parse, &context, &config);
        let after_second: Vec<Vec<usize>> =
            parse.arcs.iter().map(|a| a.notes.clone()).collect();
        assert_eq!(after_first, after_second);
    }
}
