//! # Basic-Structure Engine
//!
//! Given the preliminary parse of a line, this module proposes structural
//! candidates (S2 for primary lines, S3/S4 for bass lines) and tries a
//! catalog of inference methods to assemble a complete basic arc from each
//! candidate to the final tonic. Every successful attempt yields an
//! independent `Parse`; every failed candidate yields a failed `Parse`
//! carrying its reason, so sibling candidates are unaffected.
//!
//! ## Method catalog (primary lines)
//! The catalog is a strategy list tried in numbered order:
//! 0. an arc already runs candidate -> tonic
//! 1. fuse two adjacent falling passing arcs of matching degree
//! 2. fuse three
//! 3. take the longest arc from a fifth-degree candidate down to the third
//!    degree and search for a closing 2-1 step
//! 4. relocate the terminus of an arc that already ends on the tonic's
//!    degree so it literally ends on the final tonic
//! 5. re-scan from the candidate, ignoring the preliminary parse
//! 6. harmonic species: a composite chain of falling arcs joined degree to
//!    degree, closed by a final step, gated on the dominant span supplying
//!    scale degree 2
//! 7. relocate across a closing neighbor figure (opt-in via
//!    `integrate_final_neighbor`)
//!
//! New strategies slot into the list without touching the dispatch loop.
//!
//! ## Related Modules
//! - `parse` - The candidate object built here
//! - `prelim` - Supplies the preliminary state each candidate copies
//! - `rules`, `levels` - The stages that follow a successful build

use crate::arc::{self, Arc, ArcCategory, ArcKind};
use crate::config::{LineType, ParserConfig};
use crate::context::{Harmony, LineContext};
use crate::interval;
use crate::note::RuleName;
use crate::parse::{Parse, ParseState};
use crate::prelim::Preliminary;
use crate::scanner::{Scanner, SpanBoundary};

/// Everything one line type produced: zero or more candidate parses plus
/// any structural errors that apply to the line type as a whole.
#[derive(Debug)]
pub struct LineTypeOutcome {
    pub parses: Vec<Parse>,
    pub structural_errors: Vec<String>,
}

/// A basic-structure inference strategy.
struct Method {
    gate: fn(cand_value: i32, s1_value: i32, config: &ParserConfig) -> bool,
    search: fn(&mut Parse, usize, usize, &LineContext, &ParserConfig) -> Option<Vec<usize>>,
}

/// Generate and attempt all candidates for one line type.
pub fn build_candidates(
    prelim: &Preliminary,
    line_type: LineType,
    context: &LineContext,
    config: &ParserConfig,
) -> LineTypeOutcome {
    match line_type {
        LineType::Primary => build_primary(prelim, context, config),
        LineType::Bass => build_bass(prelim, context, config),
        LineType::Generic => build_generic(prelim),
    }
}

fn scanned_indices(prelim: &Preliminary) -> Vec<usize> {
    prelim
        .notes
        .iter()
        .filter(|n| n.is_scanned())
        .map(|n| n.index)
        .collect()
}

// ---- primary lines -----------------------------------------------------

fn build_primary(
    prelim: &Preliminary,
    context: &LineContext,
    config: &ParserConfig,
) -> LineTypeOutcome {
    let mut outcome = LineTypeOutcome {
        parses: Vec::new(),
        structural_errors: Vec::new(),
    };
    let scanned = scanned_indices(prelim);
    let Some(&s1) = scanned.last() else {
        outcome.structural_errors.push("The line is empty.".into());
        return outcome;
    };
    if prelim.notes[s1].csd.degree() != 0 {
        outcome
            .structural_errors
            .push("The line does not end on the tonic degree (S1).".into());
        return outcome;
    }
    let f = prelim.notes[s1].csd.value;
    let candidates: Vec<usize> = scanned
        .iter()
        .copied()
        .filter(|&idx| idx < s1 && [f + 2, f + 4, f + 7].contains(&prelim.notes[idx].csd.value))
        .collect();
    if candidates.is_empty() {
        outcome
            .structural_errors
            .push("No candidate for the primary upper-line head (S2) was found.".into());
        return outcome;
    }

    let methods = primary_methods();
    for cand in candidates {
        let cand_value = prelim.notes[cand].csd.value;
        let mut found = false;
        for (number, method) in methods.iter().enumerate() {
            if !(method.gate)(cand_value, f, config) {
                continue;
            }
            let mut parse = Parse::from_preliminary(prelim, LineType::Primary, s1);
            parse.method = number;
            parse.s2_index = Some(cand);
            if let Some(basic) = (method.search)(&mut parse, cand, s1, context, config) {
                establish(&mut parse, basic, Some(ArcKind::Passing { rising: false }));
                outcome.parses.push(parse);
                found = true;
            }
        }
        if !found {
            let mut parse = Parse::from_preliminary(prelim, LineType::Primary, s1);
            parse.s2_index = Some(cand);
            parse.errors.push(format!(
                "No basic step motion or composite step motion was found from the S2 candidate in measure {}.",
                prelim.notes[cand].measure
            ));
            parse.state = ParseState::Unbuilt;
            outcome.parses.push(parse);
        }
    }
    outcome
}

fn primary_methods() -> Vec<Method> {
    vec![
        Method {
            gate: |_, _, _| true,
            search: method_direct_arc,
        },
        Method {
            gate: |_, _, _| true,
            search: method_fuse_two,
        },
        Method {
            gate: |_, _, _| true,
            search: method_fuse_three,
        },
        Method {
            gate: |cand, f, _| cand == f + 4,
            search: method_fifth_line_closing_step,
        },
        Method {
            gate: |_, _, _| true,
            search: method_relocate_terminus,
        },
        Method {
            gate: |_, _, _| true,
            search: method_rescan_from_candidate,
        },
        Method {
            gate: |_, _, config| config.harmonic_species,
            search: method_harmonic_composite,
        },
        Method {
            gate: |_, _, config| config.integrate_final_neighbor,
            search: method_final_neighbor,
        },
    ]
}

fn is_falling_passing(a: &Arc) -> bool {
    matches!(a.kind, Some(ArcKind::Passing { rising: false }))
}

/// Method 0: an arc already runs candidate -> tonic.
fn method_direct_arc(
    parse: &mut Parse,
    cand: usize,
    s1: usize,
    _context: &LineContext,
    _config: &ParserConfig,
) -> Option<Vec<usize>> {
    parse
        .arcs
        .iter()
        .find(|a| a.start() == cand && a.end() == s1 && is_falling_passing(a))
        .map(|a| a.notes.clone())
}

/// Method 1: fuse two adjacent falling passing arcs whose degrees meet.
fn method_fuse_two(
    parse: &mut Parse,
    cand: usize,
    s1: usize,
    _context: &LineContext,
    _config: &ParserConfig,
) -> Option<Vec<usize>> {
    let i1 = parse
        .arcs
        .iter()
        .position(|a| a.start() == cand && is_falling_passing(a))?;
    let end1 = parse.arcs[i1].end();
    let i2 = parse.arcs.iter().position(|a| {
        a.end() == s1
            && is_falling_passing(a)
            && a.start() >= end1
            && parse.notes[a.start()].csd.value == parse.notes[end1].csd.value
    })?;
    if !arc::arc_merge(&mut parse.notes, &mut parse.arcs, i1, i2) {
        return None;
    }
    parse
        .arcs
        .iter()
        .find(|a| a.start() == cand && a.end() == s1)
        .map(|a| a.notes.clone())
}

/// Method 2: fuse a chain of three falling passing arcs.
fn method_fuse_three(
    parse: &mut Parse,
    cand: usize,
    s1: usize,
    _context: &LineContext,
    _config: &ParserConfig,
) -> Option<Vec<usize>> {
    let chain = find_falling_chain(parse, cand, parse.notes[s1].csd.value, 3)?;
    if chain.len() != 3 {
        return None;
    }
    let last_end = parse.arcs[*chain.last()?].end();
    if last_end != s1 {
        return None;
    }
    Some(fuse_chain(parse, &chain))
}

/// Method 3: a fifth-degree candidate's longest descent to the third
/// degree, closed by a separate 2-1 step.
fn method_fifth_line_closing_step(
    parse: &mut Parse,
    cand: usize,
    s1: usize,
    _context: &LineContext,
    _config: &ParserConfig,
) -> Option<Vec<usize>> {
    let f = parse.notes[s1].csd.value;
    let best = parse
        .arcs
        .iter()
        .filter(|a| {
            a.start() == cand && is_falling_passing(a) && parse.notes[a.end()].csd.value == f + 2
        })
        .max_by_key(|a| a.notes.len())?
        .clone();
    let closing = parse.notes.iter().find(|n| {
        n.is_scanned()
            && n.index > best.end()
            && n.index < s1
            && n.csd.value == f + 1
            && interval::is_diatonic_step(n, &parse.notes[s1])
    })?;
    let mut list = best.notes.clone();
    list.push(closing.index);
    list.push(s1);
    Some(list)
}

/// Method 4: relocate the terminus of an arc already ending on the tonic's
/// degree so it ends on the literal final tonic. Every note passed over
/// must itself restate the tonic.
fn method_relocate_terminus(
    parse: &mut Parse,
    cand: usize,
    s1: usize,
    _context: &LineContext,
    _config: &ParserConfig,
) -> Option<Vec<usize>> {
    let f = parse.notes[s1].csd.value;
    let pos = parse.arcs.iter().position(|a| {
        a.start() == cand
            && a.end() != s1
            && is_falling_passing(a)
            && parse.notes[a.end()].csd.value == f
            && parse.notes.iter().all(|n| {
                !n.is_scanned() || n.index <= a.end() || n.index >= s1 || n.csd.value == f
            })
    })?;
    relocate_terminus(parse, pos, s1)
}

/// Method 7: relocate the terminus across a closing neighbor figure — the
/// old terminus opens a neighbor arc that lands on the final tonic.
fn method_final_neighbor(
    parse: &mut Parse,
    cand: usize,
    s1: usize,
    _context: &LineContext,
    _config: &ParserConfig,
) -> Option<Vec<usize>> {
    let f = parse.notes[s1].csd.value;
    let pos = parse.arcs.iter().position(|a| {
        a.start() == cand
            && a.end() != s1
            && is_falling_passing(a)
            && parse.notes[a.end()].csd.value == f
            && parse.arcs.iter().any(|nb| {
                matches!(nb.kind, Some(ArcKind::Neighbor { .. }))
                    && nb.start() == a.end()
                    && nb.end() == s1
            })
    })?;
    relocate_terminus(parse, pos, s1)
}

fn relocate_terminus(parse: &mut Parse, pos: usize, s1: usize) -> Option<Vec<usize>> {
    let snapshot = parse.arcs[pos].clone();
    arc::remove_dependencies_from_arc(&mut parse.notes, &snapshot);
    let last = parse.arcs[pos].notes.len() - 1;
    parse.arcs[pos].notes[last] = s1;
    let rebuilt = parse.arcs[pos].clone();
    arc::add_dependencies_from_arc(&mut parse.notes, &rebuilt);
    Some(rebuilt.notes)
}

/// Method 5: re-scan from the candidate, ignoring the preliminary parse.
fn method_rescan_from_candidate(
    parse: &mut Parse,
    cand: usize,
    s1: usize,
    context: &LineContext,
    config: &ParserConfig,
) -> Option<Vec<usize>> {
    let mut temp_notes = parse.notes.clone();
    for n in &mut temp_notes {
        n.dependency = Default::default();
        n.rule = Default::default();
    }
    let mut temp_arcs = Vec::new();
    let mut temp_errors = Vec::new();
    let span: Vec<usize> = temp_notes
        .iter()
        .filter(|n| n.is_scanned() && n.index >= cand && n.index <= s1)
        .map(|n| n.index)
        .collect();
    let mut scanner = Scanner::new(
        &mut temp_notes,
        &mut temp_arcs,
        &mut temp_errors,
        Harmony::from_triad(&context.tonic_triad),
        config.species,
        false,
    );
    scanner.scan_span(&span, SpanBoundary::LineEnd);
    drop(scanner);
    if !temp_errors.is_empty() {
        return None;
    }
    let basic = temp_arcs
        .iter()
        .find(|a| a.start() == cand && a.end() == s1 && is_falling_passing(a))?
        .notes
        .clone();
    // clear the preliminary arcs the fresh reading contradicts
    let probe = Arc::basic(basic.clone(), Some(ArcKind::Passing { rising: false }));
    let mut i = 0;
    while i < parse.arcs.len() {
        if arc::arcs_conflict(&probe, &parse.arcs[i]) {
            arc::remove_arc(&mut parse.notes, &mut parse.arcs, i);
        } else {
            i += 1;
        }
    }
    Some(basic)
}

/// Method 6: harmonic-species composite chain (e.g. 8-6, 6-4, 4-2, 1),
/// valid only when the dominant span supplies the closing scale degree 2.
fn method_harmonic_composite(
    parse: &mut Parse,
    cand: usize,
    s1: usize,
    context: &LineContext,
    _config: &ParserConfig,
) -> Option<Vec<usize>> {
    let spans = context.harmonic_spans.as_ref()?;
    let f = parse.notes[s1].csd.value;
    let chain = find_falling_chain(parse, cand, f + 1, 4)?;
    let last_end = parse.arcs[*chain.last()?].end();
    if parse.notes[last_end].csd.value != f + 1 {
        return None;
    }
    // degree 2 must be supplied by the dominant span
    if parse.notes[last_end].offset < spans.offset_dominant {
        return None;
    }
    if !interval::is_diatonic_step(&parse.notes[last_end], &parse.notes[s1]) {
        return None;
    }
    let mut list = fuse_chain(parse, &chain);
    // re-open the fused arc to append the final tonic
    if let Some(pos) = parse.arcs.iter().position(|a| a.notes == list) {
        let snapshot = parse.arcs[pos].clone();
        arc::remove_dependencies_from_arc(&mut parse.notes, &snapshot);
        parse.arcs[pos].notes.push(s1);
        let rebuilt = parse.arcs[pos].clone();
        arc::add_dependencies_from_arc(&mut parse.notes, &rebuilt);
        list = rebuilt.notes;
    }
    Some(list)
}

/// Depth-first search for a chain of falling passing arcs starting at
/// `start`, joined degree to degree, ending on `target_value`. Returns arc
/// positions, at most `max_len` long.
fn find_falling_chain(
    parse: &Parse,
    start: usize,
    target_value: i32,
    max_len: usize,
) -> Option<Vec<usize>> {
    fn recurse(
        parse: &Parse,
        chain: &mut Vec<usize>,
        end_note: usize,
        target_value: i32,
        max_len: usize,
    ) -> bool {
        if parse.notes[end_note].csd.value == target_value {
            return true;
        }
        if chain.len() == max_len {
            return false;
        }
        for (pos, a) in parse.arcs.iter().enumerate() {
            if chain.contains(&pos) || !is_falling_passing(a) {
                continue;
            }
            if a.start() >= end_note
                && parse.notes[a.start()].csd.value == parse.notes[end_note].csd.value
            {
                chain.push(pos);
                if recurse(parse, chain, a.end(), target_value, max_len) {
                    return true;
                }
                chain.pop();
            }
        }
        false
    }

    let first = parse
        .arcs
        .iter()
        .position(|a| a.start() == start && is_falling_passing(a))?;
    let mut chain = vec![first];
    let end = parse.arcs[first].end();
    if recurse(parse, &mut chain, end, target_value, max_len) {
        Some(chain)
    } else {
        None
    }
}

/// Fuse a chain of arc positions into one falling passing arc, rebuilding
/// all dependency links.
fn fuse_chain(parse: &mut Parse, chain: &[usize]) -> Vec<usize> {
    let mut list: Vec<usize> = Vec::new();
    let mut positions: Vec<usize> = chain.to_vec();
    positions.sort_unstable();
    for &pos in positions.iter().rev() {
        let removed = arc::remove_arc(&mut parse.notes, &mut parse.arcs, pos);
        for n in removed.notes {
            if !list.contains(&n) {
                list.push(n);
            }
        }
    }
    list.sort_unstable();
    let fused = Arc {
        notes: list.clone(),
        category: ArcCategory::Secondary,
        kind: Some(ArcKind::Passing { rising: false }),
        level: None,
    };
    arc::add_dependencies_from_arc(&mut parse.notes, &fused);
    parse.arcs.push(fused);
    list
}

// ---- bass lines --------------------------------------------------------

fn build_bass(
    prelim: &Preliminary,
    context: &LineContext,
    config: &ParserConfig,
) -> LineTypeOutcome {
    let mut outcome = LineTypeOutcome {
        parses: Vec::new(),
        structural_errors: Vec::new(),
    };
    let scanned = scanned_indices(prelim);
    let (Some(&first), Some(&s1)) = (scanned.first(), scanned.last()) else {
        outcome.structural_errors.push("The line is empty.".into());
        return outcome;
    };
    if prelim.notes[s1].csd.degree() != 0 {
        outcome
            .structural_errors
            .push("The line does not end on the tonic degree (S1).".into());
        return outcome;
    }
    if prelim.notes[first].csd.degree() != 0 {
        outcome
            .structural_errors
            .push("The bass line does not begin on the tonic degree.".into());
        return outcome;
    }
    let candidates: Vec<usize> = scanned
        .iter()
        .copied()
        .filter(|&idx| idx > first && idx < s1 && prelim.notes[idx].csd.degree() == 4)
        .collect();
    if candidates.is_empty() {
        outcome
            .structural_errors
            .push("No candidate for the bass dominant pivot (S3) was found.".into());
        return outcome;
    }

    for s3 in candidates {
        let mut parse = Parse::from_preliminary(prelim, LineType::Bass, s1);
        parse.method = 0;
        parse.s2_index = Some(first);
        parse.s3_index = Some(s3);
        establish(&mut parse, vec![first, s3, s1], Some(ArcKind::Arpeggiation));
        outcome.parses.push(parse);

        if config.harmonic_species && context.harmonic_spans.is_some() {
            // a predominant pivot on scale degree 4, step-related to S3
            let s4_candidates: Vec<usize> = scanned_indices(prelim)
                .into_iter()
                .filter(|&idx| {
                    idx > first
                        && idx < s3
                        && prelim.notes[idx].csd.degree() == 3
                        && interval::is_diatonic_step(&prelim.notes[idx], &prelim.notes[s3])
                })
                .collect();
            for s4 in s4_candidates {
                let mut parse = Parse::from_preliminary(prelim, LineType::Bass, s1);
                parse.method = 1;
                parse.s2_index = Some(first);
                parse.s3_index = Some(s3);
                parse.s4_index = Some(s4);
                establish(
                    &mut parse,
                    vec![first, s4, s3, s1],
                    Some(ArcKind::Arpeggiation),
                );
                outcome.parses.push(parse);
            }
        }
    }
    outcome
}

// ---- generic lines -----------------------------------------------------

fn build_generic(prelim: &Preliminary) -> LineTypeOutcome {
    let mut outcome = LineTypeOutcome {
        parses: Vec::new(),
        structural_errors: Vec::new(),
    };
    let scanned = scanned_indices(prelim);
    let (Some(&first), Some(&s1)) = (scanned.first(), scanned.last()) else {
        outcome.structural_errors.push("The line is empty.".into());
        return outcome;
    };
    if first == s1 {
        outcome
            .structural_errors
            .push("The line has a single note and nothing to parse.".into());
        return outcome;
    }
    let mut parse = Parse::from_preliminary(prelim, LineType::Generic, s1);
    parse.s2_index = Some(first);
    // an arc already spanning the whole line becomes the basic directly
    let basic = parse
        .arcs
        .iter()
        .find(|a| a.start() == first && a.end() == s1)
        .map(|a| a.notes.clone())
        .unwrap_or_else(|| vec![first, s1]);
    let kind = if prelim.notes[first].csd.value == prelim.notes[s1].csd.value {
        Some(ArcKind::Repetition)
    } else {
        None
    };
    establish(&mut parse, basic, kind);
    outcome.parses.push(parse);
    outcome
}

// ---- shared ------------------------------------------------------------

/// Install `basic` as the parse's basic arc: purge preliminary arcs that
/// cross a basic boundary node without containing it, promote or insert
/// the basic arc, and assign the S rule labels.
pub fn establish(parse: &mut Parse, basic: Vec<usize>, kind: Option<ArcKind>) {
    let probe = Arc::basic(basic.clone(), kind);
    let mut i = 0;
    while i < parse.arcs.len() {
        let a = &parse.arcs[i];
        let crosses = basic
            .iter()
            .any(|&node| a.start() < node && node < a.end() && !a.contains(node));
        if a.notes != basic && (crosses || arc::arcs_conflict(&probe, a)) {
            arc::remove_arc(&mut parse.notes, &mut parse.arcs, i);
        } else {
            i += 1;
        }
    }
    if let Some(pos) = parse.arcs.iter().position(|a| a.notes == basic) {
        parse.arcs[pos].category = ArcCategory::Basic;
        if parse.arcs[pos].kind.is_none() {
            parse.arcs[pos].kind = kind;
        }
    } else {
        let a = Arc::basic(basic.clone(), kind);
        arc::add_dependencies_from_arc(&mut parse.notes, &a);
        parse.arcs.push(a);
    }

    match parse.line_type {
        LineType::Primary => {
            parse.notes[parse.s1_index].rule.name = Some(RuleName::S1);
            if let Some(s2) = parse.s2_index {
                parse.notes[s2].rule.name = Some(RuleName::S2);
            }
            parse.s3_indexes = basic[1..basic.len() - 1].to_vec();
            for &k in &parse.s3_indexes {
                parse.notes[k].rule.name = Some(RuleName::S3);
            }
        }
        LineType::Bass => {
            parse.notes[parse.s1_index].rule.name = Some(RuleName::S1);
            if let Some(s2) = parse.s2_index {
                parse.notes[s2].rule.name = Some(RuleName::S2);
            }
            for s in [parse.s3_index, parse.s4_index].into_iter().flatten() {
                parse.notes[s].rule.name = Some(RuleName::S3);
            }
        }
        LineType::Generic => {
            // a generic line's terminus is a structural head, not a tonic
            if let Some(s2) = parse.s2_index {
                parse.notes[s2].rule.name = Some(RuleName::S2);
            }
            parse.s3_index = Some(parse.s1_index);
            parse.notes[parse.s1_index].rule.name = Some(RuleName::S3);
        }
    }
    parse.arc_basic = Some(basic);
    parse.state = ParseState::BasicEstablished;
}

/// After the basic arc is fixed: open heads lying between consecutive
/// basic nodes become repetitions of the earlier node when their degree
/// matches and nothing else claims them.
pub fn attach_open_heads(parse: &mut Parse) {
    let Some(basic) = parse.arc_basic.clone() else {
        return;
    };
    for pair in basic.windows(2) {
        let (b1, b2) = (pair[0], pair[1]);
        for h in parse.open_heads.clone() {
            if h <= b1 || h >= b2 || parse.notes[h].rule.name.is_some() {
                continue;
            }
            let claimed = parse.arcs.iter().any(|a| a.contains(h));
            if claimed || parse.notes[h].csd.value != parse.notes[b1].csd.value {
                continue;
            }
            let rep = Arc::secondary(vec![b1, h], &parse.notes);
            if !arc::conflicts_with_any(&rep, &parse.arcs) {
                arc::add_dependencies_from_arc(&mut parse.notes, &rep);
                parse.arcs.push(rep);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Species;
    use crate::note::{Csd, Direction, Note};
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

    fn prelim_for(values: &[i32]) -> Preliminary {
        preliminary_parse(
            major_line(values),
            &LineContext::monotriadic(),
            &ParserConfig {
                species: Species::First,
                ..ParserConfig::default()
            },
        )
    }

    #[test]
    fn test_primary_direct_arc_method_zero() {
        // 3 2 1: the preliminary scan already built the full descent
        let prelim = prelim_for(&[2, 1, 0]);
        let outcome = build_candidates(
            &prelim,
            LineType::Primary,
            &LineContext::monotriadic(),
            &ParserConfig::default(),
        );
        let ok: Vec<_> = outcome
            .parses
            .iter()
            .filter(|p| p.state == ParseState::BasicEstablished)
            .collect();
        assert!(!ok.is_empty());
        let direct = ok.iter().find(|p| p.method == 0).expect("method 0 parse");
        assert_eq!(direct.arc_basic, Some(vec![0, 1, 2]));
        assert_eq!(direct.s3_indexes, vec![1]);
    }

    #[test]
    fn test_primary_rejects_line_off_tonic() {
        let prelim = prelim_for(&[2, 1]);
        let outcome = build_candidates(
            &prelim,
            LineType::Primary,
            &LineContext::monotriadic(),
            &ParserConfig::default(),
        );
        assert!(outcome.parses.is_empty());
        assert!(outcome.structural_errors[0].contains("does not end on the tonic degree (S1)"));
    }

    #[test]
    fn test_bass_arpeggiation() {
        // 1 5 1 with the dominant a fifth above
        let prelim = prelim_for(&[0, 4, 0]);
        let outcome = build_candidates(
            &prelim,
            LineType::Bass,
            &LineContext::monotriadic(),
            &ParserConfig::default(),
        );
        assert_eq!(outcome.parses.len(), 1);
        let p = &outcome.parses[0];
        assert_eq!(p.arc_basic, Some(vec![0, 1, 2]));
        assert_eq!(p.s3_index, Some(1));
    }

    #[test]
    fn test_bass_requires_tonic_endpoints() {
        let prelim = prelim_for(&[0, 4, 1]);
        let outcome = build_candidates(
            &prelim,
            LineType::Bass,
            &LineContext::monotriadic(),
            &ParserConfig::default(),
        );
        assert!(outcome.parses.is_empty());
        assert!(outcome.structural_errors[0].contains("does not end on the tonic degree (S1)"));
    }

    #[test]
    fn test_generic_basic_spans_whole_line() {
        let prelim = prelim_for(&[0, 2, 4, 2, 0]);
        let outcome = build_candidates(
            &prelim,
            LineType::Generic,
            &LineContext::monotriadic(),
            &ParserConfig::default(),
        );
        assert_eq!(outcome.parses.len(), 1);
        assert_eq!(outcome.parses[0].arc_basic, Some(vec![0, 4]));
    }

    #[test]
    fn test_final_neighbor_integration() {
        // 3 2 1 2 1: the closing tonic is decorated by an upper neighbor;
        // with integration enabled the descent relocates onto the final note
        let prelim = prelim_for(&[2, 1, 0, 1, 0]);
        let config = ParserConfig {
            integrate_final_neighbor: true,
            ..ParserConfig::default()
        };
        let outcome = build_candidates(
            &prelim,
            LineType::Primary,
            &LineContext::monotriadic(),
            &config,
        );
        let relocated = outcome
            .parses
            .iter()
            .find(|p| p.state == ParseState::BasicEstablished && p.arc_basic == Some(vec![0, 1, 4]));
        assert!(relocated.is_some(), "expected a relocated basic arc");
    }

    #[test]
    fn test_fuse_two_descents() {
        // 5 4 3 3 2 1: two falling passing arcs meet on the third degree
        let prelim = prelim_for(&[4, 3, 2, 2, 1, 0]);
        let outcome = build_candidates(
            &prelim,
            LineType::Primary,
            &LineContext::monotriadic(),
            &ParserConfig::default(),
        );
        let fused = outcome
            .parses
            .iter()
            .find(|p| p.state == ParseState::BasicEstablished && p.method == 1);
        assert!(fused.is_some(), "expected a method-1 parse");
        assert_eq!(
            fused.unwrap().arc_basic,
            Some(vec![0, 1, 2, 3, 4, 5])
        );
    }
}
