//! # Structural Levels
//!
//! Assigns a hierarchy depth to every note: the basic structure sits at
//! levels 0-2, and each arc consumed while filling the gaps between
//! already-leveled nodes pushes its members one level deeper. Spans no arc
//! explains are filled by a recursive insertion-tree search with
//! backtracking. Arc display levels are then derived by densely re-ranking
//! each arc's deepest member.
//!
//! ## Related Modules
//! - `parse` - Calls these stages when structural levels are requested
//! - `interval` - Permissibility checks on branch leaps and insertions

use crate::arc::ArcCategory;
use crate::config::ParserConfig;
use crate::interval;
use crate::parse::Parse;

/// Seed the basic-structure levels, then fill every span between leveled
/// nodes from the remaining arcs, branch by branch.
pub fn set_dependency_levels(parse: &mut Parse, _config: &ParserConfig) {
    parse.notes[parse.s1_index].rule.level = Some(0);
    if let Some(s2) = parse.s2_index {
        parse.notes[s2].rule.level = Some(1);
    }
    // a generic line's terminus doubles as S3; its level 0 stands
    for s in parse
        .s3_indexes
        .clone()
        .into_iter()
        .chain(parse.s3_index)
        .chain(parse.s4_index)
    {
        if parse.notes[s].rule.level.is_none() {
            parse.notes[s].rule.level = Some(2);
        }
    }
    if let Some(first) = parse.notes.iter().find(|n| n.is_scanned()) {
        let first = first.index;
        let in_basic = parse
            .arc_basic
            .as_ref()
            .map_or(false, |b| b.contains(&first));
        if !in_basic && parse.notes[first].rule.level.is_none() {
            parse.notes[first].rule.level = Some(3);
        }
    }

    let mut consumed: Vec<bool> = parse
        .arcs
        .iter()
        .map(|a| a.category == ArcCategory::Basic)
        .collect();
    loop {
        let spans = fillable_spans(parse);
        let mut progressed = false;
        for (l, r) in spans {
            if let Some(pos) = best_branch(parse, &consumed, l, r) {
                assign_from_arc(parse, pos, l, r);
                consumed[pos] = true;
                progressed = true;
                break;
            }
        }
        if !progressed {
            break;
        }
    }

    // spans no arc explains: nested single-note insertions
    for (l, r) in fillable_spans(parse) {
        let mut assigned = Vec::new();
        if !insert_recursive(parse, l, r, &mut assigned) {
            for idx in assigned {
                parse.notes[idx].rule.level = None;
            }
        }
    }
}

/// Gaps between consecutive leveled notes that still contain unleveled
/// real notes.
fn fillable_spans(parse: &Parse) -> Vec<(usize, usize)> {
    let anchors: Vec<usize> = parse
        .notes
        .iter()
        .filter(|n| n.is_scanned() && n.rule.level.is_some())
        .map(|n| n.index)
        .collect();
    anchors
        .windows(2)
        .map(|w| (w[0], w[1]))
        .filter(|&(l, r)| {
            parse
                .notes
                .iter()
                .any(|n| n.is_scanned() && n.index > l && n.index < r && n.rule.level.is_none())
        })
        .collect()
}

/// Pick the arc that best explains the span `(l, r)`, in strict preference
/// order: cross, right branch, left branch, inter branch.
fn best_branch(parse: &Parse, consumed: &[bool], l: usize, r: usize) -> Option<usize> {
    let eligible = |pos: usize| !consumed[pos] && parse.arcs[pos].category != ArcCategory::Basic;

    // cross: the arc spans exactly the two edges
    if let Some(pos) = (0..parse.arcs.len())
        .find(|&p| eligible(p) && parse.arcs[p].start() == l && parse.arcs[p].end() == r)
    {
        return Some(pos);
    }
    // right branch: anchored at the left edge, reaching inward
    if let Some(pos) = (0..parse.arcs.len())
        .filter(|&p| {
            eligible(p)
                && parse.arcs[p].start() == l
                && parse.arcs[p].end() < r
                && interval::is_permissible_span(
                    &parse.notes[parse.arcs[p].end()],
                    &parse.notes[r],
                )
        })
        .max_by_key(|&p| parse.arcs[p].notes.len())
    {
        return Some(pos);
    }
    // left branch: anchored at the right edge
    if let Some(pos) = (0..parse.arcs.len())
        .filter(|&p| {
            eligible(p)
                && parse.arcs[p].end() == r
                && parse.arcs[p].start() > l
                && interval::is_permissible_span(
                    &parse.notes[l],
                    &parse.notes[parse.arcs[p].start()],
                )
        })
        .max_by_key(|&p| parse.arcs[p].notes.len())
    {
        return Some(pos);
    }
    // inter branch: properly interior to the span
    (0..parse.arcs.len())
        .filter(|&p| eligible(p) && parse.arcs[p].start() > l && parse.arcs[p].end() < r)
        .max_by_key(|&p| parse.arcs[p].notes.len())
}

/// Unleveled termini sit one deeper than the deeper span edge; interiors
/// one deeper than the deeper terminus.
fn assign_from_arc(parse: &mut Parse, pos: usize, l: usize, r: usize) {
    let edge_max = parse.notes[l]
        .rule
        .level
        .unwrap_or(0)
        .max(parse.notes[r].rule.level.unwrap_or(0));
    let arc = parse.arcs[pos].clone();
    for t in [arc.start(), arc.end()] {
        if parse.notes[t].rule.level.is_none() {
            parse.notes[t].rule.level = Some(edge_max + 1);
        }
    }
    let terminal_max = parse.notes[arc.start()]
        .rule
        .level
        .unwrap_or(0)
        .max(parse.notes[arc.end()].rule.level.unwrap_or(0));
    for &n in arc.interior() {
        if parse.notes[n].rule.level.is_none() {
            parse.notes[n].rule.level = Some(terminal_max + 1);
        }
    }
}

fn permissible_insertion(parse: &Parse, l: usize, n: usize, r: usize) -> bool {
    let fits = |a: &crate::note::Note, b: &crate::note::Note| {
        interval::is_diatonic_step(a, b)
            || interval::is_consonant_skip(a, b)
            || interval::is_linear_unison(a, b)
    };
    fits(&parse.notes[l], &parse.notes[n]) && fits(&parse.notes[n], &parse.notes[r])
}

/// Insert the remaining notes of `(l, r)` one at a time into a level tree,
/// backtracking when a sub-span admits no permissible insertion.
fn insert_recursive(parse: &mut Parse, l: usize, r: usize, assigned: &mut Vec<usize>) -> bool {
    let interior: Vec<usize> = parse
        .notes
        .iter()
        .filter(|n| n.is_scanned() && n.index > l && n.index < r && n.rule.level.is_none())
        .map(|n| n.index)
        .collect();
    if interior.is_empty() {
        return true;
    }
    for &n in &interior {
        if !permissible_insertion(parse, l, n, r) {
            continue;
        }
        let level = parse.notes[l]
            .rule
            .level
            .unwrap_or(0)
            .max(parse.notes[r].rule.level.unwrap_or(0))
            + 1;
        parse.notes[n].rule.level = Some(level);
        let mark = assigned.len();
        assigned.push(n);
        if insert_recursive(parse, l, n, assigned) && insert_recursive(parse, n, r, assigned) {
            return true;
        }
        for k in assigned.drain(mark..) {
            parse.notes[k].rule.level = None;
        }
    }
    false
}

/// Each arc's raw level is its deepest member's level; raw levels are then
/// re-ranked into a dense 0..N ordering for display.
pub fn set_arc_levels(parse: &mut Parse) {
    let raw: Vec<Option<usize>> = parse
        .arcs
        .iter()
        .map(|a| {
            a.notes
                .iter()
                .filter_map(|&n| parse.notes[n].rule.level)
                .max()
        })
        .collect();
    let mut distinct: Vec<usize> = raw.iter().flatten().copied().collect();
    distinct.sort_unstable();
    distinct.dedup();
    for (arc, level) in parse.arcs.iter_mut().zip(raw) {
        arc.level = level.map(|v| distinct.iter().position(|&d| d == v).unwrap_or(0));
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{LineType, ParserConfig, Species};
    use crate::context::LineContext;
    use crate::note::{Csd, Direction, Note};
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

    #[test]
    fn test_basic_structure_levels() {
        // 3 4 3 2 1: a neighbor prefix before the basic descent
        let context = LineContext::monotriadic();
        let config = ParserConfig {
            species: Species::First,
            ..ParserConfig::default()
        };
        let prelim = preliminary_parse(major_line(&[2, 3, 2, 1, 0]), &context, &config);
        let outcome =
            crate::structure::build_candidates(&prelim, LineType::Primary, &context, &config);
        let mut parse = outcome
            .parses
            .into_iter()
            .find(|p| p.state == ParseState::BasicEstablished && p.s2_index == Some(2))
            .expect("a parse from the second S2 candidate");
        parse.perform(&context, &config);
        assert_eq!(parse.state, ParseState::Complete, "{:?}", parse.errors);
        assert_eq!(parse.notes[4].rule.level, Some(0));
        assert_eq!(parse.notes[2].rule.level, Some(1));
        assert_eq!(parse.notes[3].rule.level, Some(2));
        assert_eq!(parse.notes[0].rule.level, Some(3));
        assert_eq!(parse.notes[1].rule.level, Some(4));
    }

    #[test]
    fn test_level_zero_is_the_final_tonic() {
        let context = LineContext::monotriadic();
        let config = ParserConfig {
            species: Species::First,
            ..ParserConfig::default()
        };
        let prelim = preliminary_parse(major_line(&[2, 1, 0]), &context, &config);
        let outcome =
            crate::structure::build_candidates(&prelim, LineType::Primary, &context, &config);
        for mut parse in outcome.parses {
            if parse.state != ParseState::BasicEstablished {
                continue;
            }
            parse.perform(&context, &config);
            for n in &parse.notes {
                if n.rule.level == Some(0) {
                    assert_eq!(n.index, parse.s1_index);
                }
            }
        }
    }

    #[test]
    fn test_arc_levels_are_densely_ranked() {
        let context = LineContext::monotriadic();
        let config = ParserConfig {
            species: Species::First,
            ..ParserConfig::default()
        };
        let prelim = preliminary_parse(major_line(&[2, 3, 2, 1, 0]), &context, &config);
        let outcome =
            crate::structure::build_candidates(&prelim, LineType::Primary, &context, &config);
        let mut parse = outcome
            .parses
            .into_iter()
            .find(|p| p.state == ParseState::BasicEstablished)
            .expect("an established parse");
        parse.perform(&context, &config);
        let mut levels: Vec<usize> = parse.arcs.iter().filter_map(|a| a.level).collect();
        levels.sort_unstable();
        levels.dedup();
        for (expect, level) in levels.iter().enumerate() {
            assert_eq!(expect, *level);
        }
    }
}
