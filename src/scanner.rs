//! # Transition Scanner
//!
//! The shift-reduce engine at the heart of the parser. The scanner consumes
//! a buffer of note indices (earliest first), shifting one note at a time
//! onto a stack and classifying the transition between the stack top `i`
//! and the new buffer head `j` against the current harmony referent.
//!
//! ## Classification
//! Each transition computes harmonic membership of `i` and `j` plus the
//! interval relation between them (diatonic step, consonant skip, linear
//! unison, dissonant skip, compound leap) and dispatches to exactly one of
//! eleven cases, evaluated in a fixed priority order. The case set is a
//! tagged enum (`TransitionCase`) so the dispatch is exhaustive by
//! construction.
//!
//! ## Working memory
//! - **Open heads**: harmonically stable notes not yet fully resolved into
//!   an arc; candidate attachment points, most recent last.
//! - **Open transitions**: dissonant/nonharmonic notes awaiting a
//!   righthead; each one already carries a lefthead link, and chained
//!   transitions share a lefthead so the closing step can reconstruct the
//!   whole arc from the lefthead's dependents.
//!
//! ## Failure semantics
//! A case appends a human-readable error string and scanning continues;
//! errors never abort the scan. At line end, surviving open transitions
//! either become unresolved local-insertion markers (third/fifth species)
//! or raise an "unclosed transitions" error.
//!
//! ## Related Modules
//! - `arc` - Arc construction and the dependency bookkeeping used here
//! - `prelim` - Partitions the line into spans and drives the scanner
//! - `interval` - The interval predicates consulted by classification

use crate::arc::{self, Arc, ArcKind};
use crate::config::Species;
use crate::context::Harmony;
use crate::interval;
use crate::note::{Direction, Note, RuleName};

/// What lies beyond the last note of the span being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanBoundary {
    /// The span ends the line.
    LineEnd,
    /// The span's final buffer note opens the next harmonic span.
    Harmonic,
    /// The span's final buffer note opens the next local (measure) span.
    Local,
}

/// The eleven-way decision table for one transition. Variants are listed
/// in priority order; `classify` returns the first fully satisfied case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCase {
    /// 1: both notes harmonic, related by step, unison, or consonant skip.
    HarmonicAdjacency,
    /// 2/2H: step crossing into the next span, `j` last in buffer.
    SpanCrossing { harmonic: bool },
    /// 3: harmonic `i` steps to nonharmonic `j`.
    TransitionOpen,
    /// 4: nonharmonic `i` steps to harmonic `j`.
    TransitionClose,
    /// 5: nonharmonic `i` steps to nonharmonic `j`.
    TransitionChain,
    /// 6: nonharmonic `i` skips to harmonic `j`.
    SkipToHarmonic,
    /// 7: harmonic `i` skips to nonharmonic `j`.
    SkipFromHarmonic,
    /// 8: nonharmonic `i` skips to nonharmonic `j`.
    SkipBetweenNonharmonic,
    /// 9: linear unison between nonharmonic notes.
    NonharmonicUnison,
    /// 10: dissonant skip.
    DissonantSkip,
    /// 11: skip exceeding an octave.
    CompoundLeap,
}

/// Classify the transition from `i` to `j`.
pub fn classify(
    i: &Note,
    j: &Note,
    harmony: &Harmony,
    boundary: SpanBoundary,
    j_is_last: bool,
) -> TransitionCase {
    let hi = harmony.contains(i.csd);
    let hj = harmony.contains(j.csd);

    if interval::is_compound_leap(i, j) {
        return TransitionCase::CompoundLeap;
    }
    if interval::is_dissonant_skip(i, j) {
        return TransitionCase::DissonantSkip;
    }
    if interval::is_linear_unison(i, j) && !hi && !hj {
        return TransitionCase::NonharmonicUnison;
    }
    let step_or_unison = interval::is_diatonic_step(i, j) || interval::is_linear_unison(i, j);
    if step_or_unison {
        if hi && hj {
            return TransitionCase::HarmonicAdjacency;
        }
        if j_is_last && boundary != SpanBoundary::LineEnd {
            return TransitionCase::SpanCrossing {
                harmonic: boundary == SpanBoundary::Harmonic,
            };
        }
        return match (hi, hj) {
            (true, false) => TransitionCase::TransitionOpen,
            (false, true) => TransitionCase::TransitionClose,
            _ => TransitionCase::TransitionChain,
        };
    }
    // consonant skip; a skip onto a harmonic-span boundary note is judged
    // by the next span's harmony, so the note is simply held as a head
    if hi && !hj && j_is_last && boundary == SpanBoundary::Harmonic {
        return TransitionCase::HarmonicAdjacency;
    }
    match (hi, hj) {
        (true, true) => TransitionCase::HarmonicAdjacency,
        (false, true) => TransitionCase::SkipToHarmonic,
        (true, false) => TransitionCase::SkipFromHarmonic,
        (false, false) => TransitionCase::SkipBetweenNonharmonic,
    }
}

/// Directed-step test used by resolution searches: `a` must step to `b`
/// without contradicting `a`'s direction flag.
pub fn steps_into(a: &Note, b: &Note) -> bool {
    interval::is_diatonic_step(a, b)
        && match a.csd.direction {
            Direction::Ascending => b.csd.value > a.csd.value,
            Direction::Descending => b.csd.value < a.csd.value,
            Direction::Bidirectional => true,
        }
}

/// The shift-reduce scanning engine. Borrows the working note array, arc
/// list, and error sink; the open-head/open-transition lists live on the
/// scanner so the orchestrator can thread them between spans.
pub struct Scanner<'a> {
    pub notes: &'a mut Vec<Note>,
    pub arcs: &'a mut Vec<Arc>,
    pub errors: &'a mut Vec<String>,
    pub harmony: Harmony,
    species: Species,
    /// True while scanning a third/fifth-species local (measure) span.
    local: bool,
    pub open_heads: Vec<usize>,
    pub open_transitions: Vec<usize>,
    /// Third/fifth species: notes set aside as pending local insertions.
    pub local_insertions: Vec<usize>,
    /// Notes freed by case-7 arc demotion, available for reinterpretation.
    demoted: Vec<usize>,
}

impl<'a> Scanner<'a> {
    pub fn new(
        notes: &'a mut Vec<Note>,
        arcs: &'a mut Vec<Arc>,
        errors: &'a mut Vec<String>,
        harmony: Harmony,
        species: Species,
        local: bool,
    ) -> Self {
        Self {
            notes,
            arcs,
            errors,
            harmony,
            species,
            local,
            open_heads: Vec::new(),
            open_transitions: Vec::new(),
            local_insertions: Vec::new(),
            demoted: Vec::new(),
        }
    }

    /// Scan one span of note indices. The indices must be increasing and
    /// already filtered to scanned (non-tie-follower) notes; for span
    /// crossings the first note of the next span rides along as the final
    /// buffer element.
    pub fn scan_span(&mut self, span: &[usize], boundary: SpanBoundary) {
        if span.is_empty() {
            return;
        }
        let mut buffer: std::collections::VecDeque<usize> = span.iter().copied().collect();
        let mut stack: Vec<usize> = Vec::new();

        // Transitions threaded in from a previous span may be harmonic
        // under this span's referent; they become heads here.
        let promoted: Vec<usize> = self
            .open_transitions
            .iter()
            .copied()
            .filter(|&t| self.harmony.contains(self.notes[t].csd))
            .collect();
        for t in promoted {
            self.open_transitions.retain(|&x| x != t);
            self.detach_left(t);
            self.push_head(t);
        }

        // Seed the working memory from the opening note when nothing has
        // been threaded in from a previous span.
        if self.open_heads.is_empty() && self.open_transitions.is_empty() {
            let first = span[0];
            if self.harmony.contains(self.notes[first].csd) {
                self.open_heads.push(first);
            } else {
                self.open_transitions.push(first);
            }
        }

        while buffer.len() > 1 {
            let Some(i) = buffer.pop_front() else { break };
            stack.push(i);
            let Some(&j) = buffer.front() else { break };
            let case = classify(
                &self.notes[i],
                &self.notes[j],
                &self.harmony,
                boundary,
                buffer.len() == 1,
            );
            self.apply(case, i, j);
        }
    }

    /// End-of-line bookkeeping: any index still in open transitions is
    /// either tolerated as an unresolved local insertion (third/fifth
    /// species) or reported as an unclosed transition.
    pub fn close_line(&mut self) {
        if self.open_transitions.is_empty() {
            return;
        }
        if self.species.has_local_elaborations() {
            for t in std::mem::take(&mut self.open_transitions) {
                self.notes[t].rule.name = Some(RuleName::L0);
                self.local_insertions.push(t);
            }
        } else {
            let mut measures: Vec<usize> = self
                .open_transitions
                .iter()
                .map(|&t| self.notes[t].measure)
                .collect();
            measures.sort_unstable();
            measures.dedup();
            let list = measures
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.errors
                .push(format!("Unclosed transitions in measures {}.", list));
        }
    }

    fn apply(&mut self, case: TransitionCase, i: usize, j: usize) {
        match case {
            TransitionCase::HarmonicAdjacency => self.harmonic_adjacency(i, j),
            TransitionCase::SpanCrossing { harmonic } => self.span_crossing(i, j, harmonic),
            TransitionCase::TransitionOpen => self.transition_open(i, j),
            TransitionCase::TransitionClose => self.transition_close(i, j),
            TransitionCase::TransitionChain => self.transition_chain(i, j),
            TransitionCase::SkipToHarmonic => self.skip_to_harmonic(i, j),
            TransitionCase::SkipFromHarmonic => self.skip_from_harmonic(i, j),
            TransitionCase::SkipBetweenNonharmonic => self.skip_between_nonharmonic(i, j),
            TransitionCase::NonharmonicUnison => self.nonharmonic_unison(i, j),
            TransitionCase::DissonantSkip => {
                self.errors.push(format!(
                    "The leap from note {} to note {} in measure {} is a nongenerable leap.",
                    i, j, self.notes[j].measure
                ));
                self.push_head(j);
            }
            TransitionCase::CompoundLeap => {
                self.errors.push(format!(
                    "The leap from note {} to note {} in measure {} is larger than an octave.",
                    i, j, self.notes[j].measure
                ));
                self.push_head(j);
            }
        }
    }

    // ---- case actions -------------------------------------------------

    /// Case 1: both notes harmonic and consonantly related.
    fn harmonic_adjacency(&mut self, i: usize, j: usize) {
        if interval::is_same_degree(&self.notes[i], &self.notes[j]) {
            let rep = Arc::secondary(vec![i, j], self.notes);
            arc::add_dependencies_from_arc(self.notes, &rep);
            self.arcs.push(rep);
            self.push_head(j);
            return;
        }
        if interval::is_diatonic_step(&self.notes[i], &self.notes[j]) {
            if let Some(&t) = self.open_transitions.last() {
                if steps_into(&self.notes[t], &self.notes[j]) && self.close_transition(t, j) {
                    return;
                }
                // resolution failed: keep both as heads and halt the search
                self.push_head(j);
                return;
            }
        }
        self.push_head(j);
    }

    /// Case 2/2H: step crossing into the next span with `j` last in buffer.
    fn span_crossing(&mut self, i: usize, j: usize, harmonic: bool) {
        let candidate = self
            .open_transitions
            .iter()
            .rev()
            .copied()
            .find(|&t| steps_into(&self.notes[t], &self.notes[j]));
        let resolved = match candidate {
            Some(t) => self.close_transition(t, j),
            None => false,
        };
        if !resolved {
            if self.harmony.contains(self.notes[j].csd) {
                self.push_head(j);
            } else if interval::is_same_degree(&self.notes[i], &self.notes[j]) {
                // local suspension: the boundary note restates i into the
                // next span
                let rep = Arc::secondary(vec![i, j], self.notes);
                arc::add_dependencies_from_arc(self.notes, &rep);
                self.arcs.push(rep);
            } else {
                let lefthead = if self.harmony.contains(self.notes[i].csd) {
                    Some(i)
                } else {
                    self.notes[i].dependency.lefthead
                };
                self.open_transition_with(j, lefthead);
            }
        }
        // transitions left behind in this span (the boundary note itself
        // may legitimately carry over) fail the harmonic span
        if harmonic {
            let stragglers: Vec<usize> = self
                .open_transitions
                .iter()
                .copied()
                .filter(|&t| t < j)
                .collect();
            if !stragglers.is_empty() {
                self.report_unresolved_harmonic_span(&stragglers);
            }
        }
    }

    fn report_unresolved_harmonic_span(&mut self, stragglers: &[usize]) {
        let mut measures: Vec<usize> = stragglers
            .iter()
            .map(|&t| self.notes[t].measure)
            .collect();
        measures.sort_unstable();
        measures.dedup();
        let list = measures
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.errors.push(format!(
            "Unresolved transitions in the harmonic span ending at measure {}: measures {}.",
            measures.last().copied().unwrap_or(0),
            list
        ));
    }

    /// Case 3: harmonic `i` steps to nonharmonic `j` — open (or continue)
    /// a transition.
    fn transition_open(&mut self, i: usize, j: usize) {
        // a same-direction continuation of an existing open transition wins
        if let Some(t) = self
            .open_transitions
            .iter()
            .rev()
            .copied()
            .find(|&t| t != i && self.chain_continues(t, j))
        {
            let lefthead = self.notes[t].dependency.lefthead;
            self.open_transitions.retain(|&x| x != t);
            self.open_transition_with(j, lefthead);
            return;
        }
        if !self.open_heads.contains(&i) {
            self.open_heads.push(i);
        }
        self.open_transition_with(j, Some(i));
    }

    /// Case 4: nonharmonic `i` steps to harmonic `j` — close the transition.
    fn transition_close(&mut self, i: usize, j: usize) {
        let closer = if self.open_transitions.contains(&i) {
            Some(i)
        } else {
            self.open_transitions
                .iter()
                .rev()
                .copied()
                .find(|&t| steps_into(&self.notes[t], &self.notes[j]))
        };
        match closer {
            Some(t) if self.close_transition(t, j) => {
                if self.local && self.species.has_local_elaborations() {
                    let csd = self.notes[j].csd;
                    self.harmony.admit(csd);
                }
            }
            _ => {
                self.push_head(j);
            }
        }
    }

    /// Case 5: nonharmonic `i` steps to nonharmonic `j` — chain or reverse.
    fn transition_chain(&mut self, i: usize, j: usize) {
        if self.open_transitions.contains(&i) {
            if self.chain_continues(i, j) {
                let lefthead = self.notes[i].dependency.lefthead;
                self.open_transitions.retain(|&x| x != i);
                self.open_transition_with(j, lefthead);
                return;
            }
            // direction reversal: close i as a neighbor-shaped transition
            // when j returns to i's lefthead degree, then reopen j fresh
            if let Some(l) = self.notes[i].dependency.lefthead {
                if interval::is_same_degree(&self.notes[l], &self.notes[j]) {
                    let list = vec![l, i, j];
                    let arc = Arc::secondary(list, self.notes);
                    if !arc::conflicts_with_any(&arc, self.arcs) {
                        arc::add_dependencies_from_arc(self.notes, &arc);
                        self.arcs.push(arc);
                        self.open_transitions.retain(|&x| x != i);
                        self.open_transition_with(j, Some(l));
                        return;
                    }
                }
                // nested elaboration: j hangs from i itself
                self.open_transition_with(j, Some(i));
                return;
            }
        }
        self.errors.push(format!(
            "Non-generable succession of nonharmonic notes {}-{} in measure {}.",
            i, j, self.notes[j].measure
        ));
        self.open_transition_with(j, None);
    }

    /// Case 6: nonharmonic `i` skips to harmonic `j`.
    fn skip_to_harmonic(&mut self, i: usize, j: usize) {
        let attach = self
            .open_heads
            .iter()
            .rev()
            .copied()
            .find(|&h| h < i && interval::is_diatonic_step(&self.notes[h], &self.notes[i]));
        if let Some(h) = attach {
            // i becomes an incomplete neighbor of h
            let arc = Arc::secondary(vec![h, i], self.notes);
            self.detach_left(i);
            arc::add_dependencies_from_arc(self.notes, &arc);
            self.arcs.push(arc);
            self.open_transitions.retain(|&x| x != i);
        } else if self.species.has_local_elaborations() {
            self.open_transitions.retain(|&x| x != i);
            self.local_insertions.push(i);
        }
        // for other species i stays an open transition; the end-of-scan
        // check reports it if nothing ever closes it
        self.push_head(j);
    }

    /// Case 7: harmonic `i` skips to nonharmonic `j` — the reinterpretation
    /// case. The search order (continue a transition, step-connected open
    /// head, arc-terminal rescan, neighbor demotion, demoted independents)
    /// is fixed and deliberately not extended beyond what is listed here.
    fn skip_from_harmonic(&mut self, i: usize, j: usize) {
        if !self.open_heads.contains(&i) {
            self.open_heads.push(i);
        }
        // 1. continue an existing open transition into j
        if let Some(t) = self
            .open_transitions
            .iter()
            .rev()
            .copied()
            .find(|&t| self.chain_continues(t, j))
        {
            let lefthead = self.notes[t].dependency.lefthead;
            self.open_transitions.retain(|&x| x != t);
            self.open_transition_with(j, lefthead);
            return;
        }
        // 2. a step-connected open head becomes the lefthead
        if let Some(h) = self
            .open_heads
            .iter()
            .rev()
            .copied()
            .find(|&h| interval::is_diatonic_step(&self.notes[h], &self.notes[j]))
        {
            self.open_transition_with(j, Some(h));
            return;
        }
        // 3. reinterpretation search
        if self.reinterpret(j) {
            return;
        }
        if self.species.has_local_elaborations() {
            self.local_insertions.push(j);
        } else {
            self.errors.push(format!(
                "The succession from note {} to note {} in measure {} cannot be generated.",
                i, j, self.notes[j].measure
            ));
        }
    }

    /// Case 8: nonharmonic `i` skips to nonharmonic `j`.
    fn skip_between_nonharmonic(&mut self, i: usize, j: usize) {
        if self.species.has_local_elaborations() {
            self.open_transitions.retain(|&x| x != i);
            self.local_insertions.push(i);
            self.open_transition_with(j, None);
        } else {
            self.errors.push(format!(
                "The succession from note {} to note {} in measure {} cannot be generated.",
                i, j, self.notes[j].measure
            ));
            self.open_transition_with(j, None);
        }
    }

    /// Case 9: linear unison between nonharmonic notes.
    fn nonharmonic_unison(&mut self, i: usize, j: usize) {
        if self.notes[i].measure == self.notes[j].measure {
            let rep = Arc::secondary(vec![i, j], self.notes);
            arc::add_dependencies_from_arc(self.notes, &rep);
            self.arcs.push(rep);
            self.open_transitions.retain(|&x| x != i);
            self.open_transitions.push(j);
        } else {
            self.errors.push(format!(
                "Repetition of a non-tonic-triad pitch in measures {}-{}.",
                self.notes[i].measure, self.notes[j].measure
            ));
            self.open_transitions.retain(|&x| x != i);
            self.open_transition_with(j, self.notes[i].dependency.lefthead);
        }
    }

    // ---- shared machinery ---------------------------------------------

    fn push_head(&mut self, j: usize) {
        if !self.open_heads.contains(&j) {
            self.open_heads.push(j);
        }
    }

    /// Register `j` as an open transition hanging from `lefthead`.
    fn open_transition_with(&mut self, j: usize, lefthead: Option<usize>) {
        self.detach_left(j);
        if let Some(l) = lefthead {
            self.notes[j].dependency.lefthead = Some(l);
            if !self.notes[l].dependency.dependents.contains(&j) {
                self.notes[l].dependency.dependents.push(j);
            }
        }
        if !self.open_transitions.contains(&j) {
            self.open_transitions.push(j);
        }
    }

    fn detach_left(&mut self, j: usize) {
        if let Some(old) = self.notes[j].dependency.lefthead.take() {
            self.notes[old].dependency.dependents.retain(|&d| d != j);
        }
    }

    /// True when open transition `t` steps to `j` continuing the direction
    /// of `t`'s own approach from its lefthead.
    fn chain_continues(&self, t: usize, j: usize) -> bool {
        if !steps_into(&self.notes[t], &self.notes[j]) {
            return false;
        }
        match self.notes[t].dependency.lefthead {
            Some(l) => {
                let out = self.notes[t].csd.value - self.notes[l].csd.value;
                let next = self.notes[j].csd.value - self.notes[t].csd.value;
                out.signum() == next.signum()
            }
            None => true,
        }
    }

    /// Close open transition `t` onto righthead `right`, emitting a
    /// transition arc spanning the lefthead, all chained members, and the
    /// righthead. Migrates the chain by reading the lefthead's dependents.
    fn close_transition(&mut self, t: usize, right: usize) -> bool {
        let Some(l) = self.notes[t].dependency.lefthead else {
            return false;
        };
        let mut members: Vec<usize> = self.notes[l]
            .dependency
            .dependents
            .iter()
            .copied()
            .filter(|&k| {
                l < k
                    && k < right
                    && self.notes[k].dependency.lefthead == Some(l)
                    && self.notes[k].dependency.righthead.is_none()
                    && !self.harmony.contains(self.notes[k].csd)
            })
            .collect();
        if !members.contains(&t) {
            members.push(t);
        }
        members.sort_unstable();
        members.dedup();

        let mut list = vec![l];
        list.extend(members.iter().copied());
        list.push(right);
        let arc = Arc::secondary(list, self.notes);
        if arc::conflicts_with_any(&arc, self.arcs) {
            return false;
        }
        arc::add_dependencies_from_arc(self.notes, &arc);
        self.arcs.push(arc);
        self.open_transitions.retain(|&x| !members.contains(&x));
        // heads strictly inside the resolved arc are no longer reachable
        self.open_heads.retain(|&h| !(l < h && h < right));
        self.push_head(right);
        true
    }

    /// Case 7's documented reinterpretation search. Known-approximate; the
    /// order and scope are preserved from the original behavior.
    fn reinterpret(&mut self, j: usize) -> bool {
        // 3a. prior arc terminals
        for a_idx in (0..self.arcs.len()).rev() {
            for x in [self.arcs[a_idx].end(), self.arcs[a_idx].start()] {
                if x < j && interval::is_diatonic_step(&self.notes[x], &self.notes[j]) {
                    self.demote_arcs_covering(x, j);
                    self.open_transition_with(j, Some(x));
                    return true;
                }
            }
        }
        // 3b. previously-absorbed neighbor-arc elements
        for a_idx in (0..self.arcs.len()).rev() {
            if !matches!(self.arcs[a_idx].kind, Some(ArcKind::Neighbor { .. })) {
                continue;
            }
            let n = self.arcs[a_idx].interior()[0];
            if n < j && interval::is_diatonic_step(&self.notes[n], &self.notes[j]) {
                let removed = arc::remove_arc(self.notes, self.arcs, a_idx);
                let former_left = removed.start();
                self.open_transition_with(n, Some(former_left));
                self.demoted.push(n);
                self.open_transition_with(j, Some(n));
                return true;
            }
        }
        // 3c. previously-demoted independent notes
        for d in self.demoted.iter().rev().copied().collect::<Vec<_>>() {
            if d < j && interval::is_diatonic_step(&self.notes[d], &self.notes[j]) {
                self.open_transition_with(j, Some(d));
                return true;
            }
        }
        false
    }

    /// Remove every arc whose span strictly contains `x`, freeing its
    /// nonharmonic elements back into the open-transition list.
    fn demote_arcs_covering(&mut self, x: usize, limit: usize) {
        let mut idx = 0;
        while idx < self.arcs.len() {
            let covers = self.arcs[idx].start() < x && x < self.arcs[idx].end();
            let overlaps = self.arcs[idx].start() < limit
                && limit < self.arcs[idx].end()
                && x <= self.arcs[idx].start();
            if covers || overlaps {
                let removed = arc::remove_arc(self.notes, self.arcs, idx);
                for &k in removed.interior() {
                    if !self.harmony.contains(self.notes[k].csd) {
                        self.open_transition_with(k, Some(removed.start()));
                        self.demoted.push(k);
                    }
                }
            } else {
                idx += 1;
            }
        }
    }
}
