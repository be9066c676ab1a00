//! # Preliminary-Parse Orchestrator
//!
//! Species- and harmony-aware driver for the transition scanner. The
//! orchestrator partitions a line into scan spans, feeds each to the
//! scanner, and stitches the open-head/open-transition lists together so
//! unresolved material threads from one span into the next.
//!
//! ## Span plans
//! - Monotriadic first/second/fourth species: one global span against the
//!   tonic triad.
//! - Harmonic species: up to three spans (initial tonic / predominant /
//!   dominant and closing tonic), split at the context's offsets. Each
//!   span's buffer carries the first note of the next span as its final
//!   element so the boundary transition is classified (case 2H).
//! - Third/fifth species: a local scan per measure against the local
//!   harmony, followed by a global scan over the notes the local scans
//!   left structural; local arcs are then reconciled into the global
//!   context according to the configured options.
//!
//! ## Related Modules
//! - `scanner` - The engine each span is fed to
//! - `structure` - Consumes the preliminary state per candidate

use crate::arc::{self, Arc, ArcKind};
use crate::config::ParserConfig;
use crate::context::{Harmony, LineContext};
use crate::interval;
use crate::note::Note;
use crate::scanner::{Scanner, SpanBoundary};

/// The snapshot the basic-structure engine copies per candidate: the
/// annotated notes, the preliminary arcs, and the scanner's leftover
/// working memory.
#[derive(Debug, Clone)]
pub struct Preliminary {
    pub notes: Vec<Note>,
    pub arcs: Vec<Arc>,
    pub open_heads: Vec<usize>,
    pub open_transitions: Vec<usize>,
    pub local_insertions: Vec<usize>,
    pub errors: Vec<String>,
}

/// Run the preliminary parse for one line.
pub fn preliminary_parse(
    mut notes: Vec<Note>,
    context: &LineContext,
    config: &ParserConfig,
) -> Preliminary {
    let mut arcs: Vec<Arc> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    let scanned: Vec<usize> = notes
        .iter()
        .filter(|n| n.is_scanned())
        .map(|n| n.index)
        .collect();

    let mut open_heads: Vec<usize> = Vec::new();
    let mut open_transitions: Vec<usize> = Vec::new();
    let mut local_insertions: Vec<usize> = Vec::new();

    if config.species.has_local_elaborations() {
        let local_arc_start = arcs.len();
        run_local_scans(
            &mut notes,
            &mut arcs,
            &mut errors,
            &mut local_insertions,
            &scanned,
            context,
            config,
        );
        reconcile_local_arcs(&mut notes, &mut arcs, local_arc_start, config);
        let global_span = global_span_after_local(&notes, &arcs, &scanned, &local_insertions);
        let mut scanner = Scanner::new(
            &mut notes,
            &mut arcs,
            &mut errors,
            Harmony::from_triad(&context.tonic_triad),
            config.species,
            false,
        );
        scanner.scan_span(&global_span, SpanBoundary::LineEnd);
        scanner.close_line();
        open_heads = scanner.open_heads.clone();
        open_transitions = scanner.open_transitions.clone();
        local_insertions.extend(scanner.local_insertions.iter().copied());
    } else if config.harmonic_species && context.harmonic_spans.is_some() {
        run_harmonic_scans(
            &mut notes,
            &mut arcs,
            &mut errors,
            &mut open_heads,
            &mut open_transitions,
            &mut local_insertions,
            &scanned,
            context,
            config,
        );
    } else {
        let mut scanner = Scanner::new(
            &mut notes,
            &mut arcs,
            &mut errors,
            Harmony::from_triad(&context.tonic_triad),
            config.species,
            false,
        );
        scanner.scan_span(&scanned, SpanBoundary::LineEnd);
        scanner.close_line();
        open_heads = scanner.open_heads.clone();
        open_transitions = scanner.open_transitions.clone();
        local_insertions.extend(scanner.local_insertions.iter().copied());
    }

    Preliminary {
        notes,
        arcs,
        open_heads,
        open_transitions,
        local_insertions,
        errors,
    }
}

/// Harmonic species: split the scanned notes at the progression offsets
/// and scan each span against its own triad, threading the open lists.
#[allow(clippy::too_many_arguments)]
fn run_harmonic_scans(
    notes: &mut Vec<Note>,
    arcs: &mut Vec<Arc>,
    errors: &mut Vec<String>,
    open_heads: &mut Vec<usize>,
    open_transitions: &mut Vec<usize>,
    local_insertions: &mut Vec<usize>,
    scanned: &[usize],
    context: &LineContext,
    config: &ParserConfig,
) {
    let Some(spans) = context.harmonic_spans.as_ref() else {
        return;
    };
    let mut cut_offsets: Vec<(f64, &crate::context::Triad)> = Vec::new();
    if let Some(p) = spans.offset_predominant {
        cut_offsets.push((p, &context.predominant_triad));
    }
    cut_offsets.push((spans.offset_dominant, &context.dominant_triad));
    cut_offsets.push((spans.offset_closing_tonic, &context.tonic_triad));

    // partition: initial tonic span, then one span per cut offset
    let mut groups: Vec<(Vec<usize>, &crate::context::Triad)> =
        vec![(Vec::new(), &context.tonic_triad)];
    for &idx in scanned {
        let offset = notes[idx].offset;
        while let Some(&(cut, triad)) = cut_offsets.first() {
            if offset >= cut {
                cut_offsets.remove(0);
                groups.push((Vec::new(), triad));
            } else {
                break;
            }
        }
        if let Some(group) = groups.last_mut() {
            group.0.push(idx);
        }
    }
    groups.retain(|(g, _)| !g.is_empty());

    let count = groups.len();
    for (pos, (mut span, triad)) in groups.clone().into_iter().enumerate() {
        let boundary = if pos + 1 == count {
            SpanBoundary::LineEnd
        } else {
            // the next span's opening note rides along for the boundary case
            span.push(groups[pos + 1].0[0]);
            SpanBoundary::Harmonic
        };
        let mut scanner = Scanner::new(
            notes,
            arcs,
            errors,
            Harmony::from_triad(triad),
            config.species,
            false,
        );
        scanner.open_heads = std::mem::take(open_heads);
        scanner.open_transitions = std::mem::take(open_transitions);
        scanner.scan_span(&span, boundary);
        if pos + 1 == count {
            scanner.close_line();
        }
        *open_heads = scanner.open_heads.clone();
        *open_transitions = scanner.open_transitions.clone();
        local_insertions.extend(scanner.local_insertions.iter().copied());
    }
}

/// Third/fifth species: scan each measure against its local harmony.
fn run_local_scans(
    notes: &mut Vec<Note>,
    arcs: &mut Vec<Arc>,
    errors: &mut Vec<String>,
    local_insertions: &mut Vec<usize>,
    scanned: &[usize],
    context: &LineContext,
    config: &ParserConfig,
) {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &idx in scanned {
        match groups.last_mut() {
            Some(g) if notes[g[0]].measure == notes[idx].measure => g.push(idx),
            _ => groups.push(vec![idx]),
        }
    }
    let count = groups.len();
    for (pos, group) in groups.clone().into_iter().enumerate() {
        if group.len() < 2 {
            continue;
        }
        let mut span = group;
        let boundary = if pos + 1 == count {
            SpanBoundary::LineEnd
        } else {
            span.push(groups[pos + 1][0]);
            SpanBoundary::Local
        };
        let triad = context.local_harmony_at(notes[span[0]].offset).clone();
        let mut scanner = Scanner::new(
            notes,
            arcs,
            errors,
            Harmony::from_triad(&triad),
            config.species,
            true,
        );
        scanner.scan_span(&span, boundary);
        local_insertions.extend(scanner.local_insertions.iter().copied());
        // open material from a local scan is not threaded onward; whatever
        // failed to resolve locally is retried by the global scan
    }
}

/// Apply the configured local-arc reconciliation options.
fn reconcile_local_arcs(
    notes: &mut Vec<Note>,
    arcs: &mut Vec<Arc>,
    local_arc_start: usize,
    config: &ParserConfig,
) {
    if config.local_neighbors_only {
        let mut idx = local_arc_start;
        while idx < arcs.len() {
            let keep = matches!(
                arcs[idx].kind,
                Some(ArcKind::Neighbor { .. }) | Some(ArcKind::Repetition)
            );
            if keep {
                idx += 1;
            } else {
                arc::remove_arc(notes, arcs, idx);
            }
        }
    }
    if config.extend_local_arcs {
        extend_local_arcs(notes, arcs, local_arc_start);
    }
    if config.add_local_repetitions {
        add_local_repetitions(notes, arcs);
    }
}

/// Extend a local passing arc across its measure boundary when the global
/// line continues the same step motion.
fn extend_local_arcs(notes: &mut Vec<Note>, arcs: &mut [Arc], local_arc_start: usize) {
    for idx in local_arc_start..arcs.len() {
        if !arcs[idx].is_passing() {
            continue;
        }
        let end = arcs[idx].end();
        let next = end + 1;
        if next >= notes.len() || !notes[next].is_scanned() {
            continue;
        }
        let rising = matches!(arcs[idx].kind, Some(ArcKind::Passing { rising: true }));
        let continues = if rising {
            interval::is_step_up(&notes[end], &notes[next])
        } else {
            interval::is_step_down(&notes[end], &notes[next])
        };
        if continues {
            let mut arc = arcs[idx].clone();
            if arc::arc_extend(notes, &mut arc, next) {
                arcs[idx] = arc;
            }
        }
    }
}

/// Merge unattached same-degree notes in adjacent measures into repetition
/// arcs (a new repetition must not conflict with anything already built).
fn add_local_repetitions(notes: &mut Vec<Note>, arcs: &mut Vec<Arc>) {
    let unattached: Vec<usize> = notes
        .iter()
        .filter(|n| {
            n.is_scanned()
                && n.dependency.lefthead.is_none()
                && n.dependency.righthead.is_none()
                && !arcs.iter().any(|a| a.contains(n.index))
        })
        .map(|n| n.index)
        .collect();
    for pair in unattached.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if notes[a].csd.value == notes[b].csd.value
            && notes[b].measure == notes[a].measure + 1
        {
            let rep = Arc::secondary(vec![a, b], notes);
            if !arc::conflicts_with_any(&rep, arcs) {
                arc::add_dependencies_from_arc(notes, &rep);
                arcs.push(rep);
            }
        }
    }
}

/// The notes still structural after local scanning: everything not already
/// absorbed as the interior of a local arc and not set aside as a local
/// insertion.
fn global_span_after_local(
    notes: &[Note],
    arcs: &[Arc],
    scanned: &[usize],
    local_insertions: &[usize],
) -> Vec<usize> {
    scanned
        .iter()
        .copied()
        .filter(|&idx| {
            !local_insertions.contains(&idx)
                && !arcs.iter().any(|a| a.interior().contains(&idx))
        })
        .filter(|&idx| notes[idx].is_scanned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Species;
    use crate::context::{HarmonicSpans, Triad};
    use crate::note::{Csd, Direction, Note};

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
    fn test_single_global_span() {
        let notes = major_line(&[0, 1, 2, 1, 0]);
        let prelim = preliminary_parse(notes, &LineContext::monotriadic(), &ParserConfig::default());
        assert!(prelim.errors.is_empty(), "{:?}", prelim.errors);
        assert!(!prelim.arcs.is_empty());
    }

    #[test]
    fn test_harmonic_spans_partition() {
        // rising octave line: tonic span 1-5, then la (predominant),
        // ti (dominant), closing do
        let notes = major_line(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let mut context = LineContext::monotriadic();
        context.harmonic_spans = Some(HarmonicSpans {
            offset_predominant: Some(5.0),
            offset_dominant: 6.0,
            offset_closing_tonic: 7.0,
        });
        let config = ParserConfig {
            harmonic_species: true,
            ..ParserConfig::default()
        };
        let prelim = preliminary_parse(notes, &context, &config);
        // the line is stepwise throughout; every transition should resolve
        assert!(prelim.errors.is_empty(), "{:?}", prelim.errors);
    }

    #[test]
    fn test_local_scan_produces_local_arcs() {
        // measure 1: 1 2 3 (local passing), measure 2: tonic close
        let semis = [0, 2, 4, 5, 7, 9, 11];
        let values: [i32; 4] = [0, 1, 2, 0];
        let measures = [1, 1, 1, 2];
        let notes: Vec<Note> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let pitch = 12 * v.div_euclid(7) + semis[v.rem_euclid(7) as usize];
                Note::new(
                    i,
                    Csd::new(v, Direction::Bidirectional),
                    pitch,
                    measures[i],
                    1.0 + (i % 3) as f64,
                    i as f64,
                )
            })
            .collect();
        let config = ParserConfig {
            species: Species::Third,
            ..ParserConfig::default()
        };
        let mut context = LineContext::monotriadic();
        context.local_harmonies = vec![(0.0, Triad::tonic())];
        let prelim = preliminary_parse(notes, &context, &config);
        assert!(prelim.errors.is_empty(), "{:?}", prelim.errors);
        assert!(prelim.arcs.iter().any(|a| a.notes == vec![0, 1, 2]));
    }
}
