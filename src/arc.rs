//! # Arc Algebra
//!
//! Arcs are the dependency relations the parser builds: ordered, strictly
//! increasing sequences of note indices, at least two long. This module
//! owns their classification, the overlap/conflict tests, and the three
//! graph-editing primitives (merge, embed, extend), together with the
//! dependency add/remove operations that keep every touched note's
//! lefthead/righthead/dependents in agreement with the arcs that contain it.
//!
//! ## Invariants
//! - Arc note lists are strictly increasing and have length >= 2.
//! - No two arcs in a working set overlap (cross without nesting); they may
//!   nest or share an endpoint.
//! - A note's lefthead/righthead always name notes that are members of an
//!   arc containing this note; removing an arc clears them, re-adding
//!   restores them.
//!
//! ## Related Modules
//! - `note` - The dependency fields written here
//! - `scanner` - Creates arcs during transition scanning
//! - `structure` - Merges/extends arcs while assembling the basic arc

use crate::interval;
use crate::note::{Direction, Note};

/// Whether an arc belongs to the basic structure or elaborates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcCategory {
    Basic,
    Secondary,
}

/// Classified shape of an arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcKind {
    /// Two notes, equal scale degree.
    Repetition,
    /// Three notes, step out and step back to the starting degree.
    Neighbor { upper: bool },
    /// A monotonic chain of diatonic steps between different endpoints.
    Passing { rising: bool },
    /// Bass-line basic arc: tonic - dominant - tonic.
    Arpeggiation,
}

impl ArcKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArcKind::Repetition => "repetition",
            ArcKind::Neighbor { upper: true } => "upper neighbor",
            ArcKind::Neighbor { upper: false } => "lower neighbor",
            ArcKind::Passing { rising: true } => "rising passing",
            ArcKind::Passing { rising: false } => "falling passing",
            ArcKind::Arpeggiation => "arpeggiation",
        }
    }
}

/// A dependency arc over note indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub notes: Vec<usize>,
    pub category: ArcCategory,
    pub kind: Option<ArcKind>,
    /// Display rank assigned after leveling (0 = most fundamental).
    pub level: Option<usize>,
}

impl Arc {
    /// A secondary arc, classified immediately from the note array.
    pub fn secondary(notes_list: Vec<usize>, notes: &[Note]) -> Self {
        debug_assert!(notes_list.len() >= 2);
        debug_assert!(notes_list.windows(2).all(|w| w[0] < w[1]));
        let kind = classify_arc(notes, &notes_list);
        Self {
            notes: notes_list,
            category: ArcCategory::Secondary,
            kind,
            level: None,
        }
    }

    /// The basic arc of a parse.
    pub fn basic(notes_list: Vec<usize>, kind: Option<ArcKind>) -> Self {
        debug_assert!(notes_list.len() >= 2);
        Self {
            notes: notes_list,
            category: ArcCategory::Basic,
            kind,
            level: None,
        }
    }

    pub fn start(&self) -> usize {
        self.notes[0]
    }

    pub fn end(&self) -> usize {
        self.notes[self.notes.len() - 1]
    }

    pub fn interior(&self) -> &[usize] {
        &self.notes[1..self.notes.len() - 1]
    }

    pub fn contains(&self, index: usize) -> bool {
        self.notes.contains(&index)
    }

    /// True when `index` is the first or last element.
    pub fn is_terminal(&self, index: usize) -> bool {
        self.start() == index || self.end() == index
    }

    pub fn is_passing(&self) -> bool {
        matches!(self.kind, Some(ArcKind::Passing { .. }))
    }

    pub fn is_repetition(&self) -> bool {
        matches!(self.kind, Some(ArcKind::Repetition))
    }

    /// Reclassify after a structural edit.
    pub fn reclassify(&mut self, notes: &[Note]) {
        if self.category == ArcCategory::Secondary {
            self.kind = classify_arc(notes, &self.notes);
        }
    }
}

/// Classify an index list against the note array.
///
/// Neighbor classification checks that the return direction is compatible
/// with the end note's direction flag: a note marked strictly ascending
/// cannot close a falling return, and vice versa.
pub fn classify_arc(notes: &[Note], list: &[usize]) -> Option<ArcKind> {
    if list.len() == 2 {
        let (a, b) = (&notes[list[0]], &notes[list[1]]);
        if interval::is_same_degree(a, b) {
            return Some(ArcKind::Repetition);
        }
    }
    if list.len() == 3 {
        let (a, m, b) = (&notes[list[0]], &notes[list[1]], &notes[list[2]]);
        if interval::is_diatonic_step(a, m)
            && interval::is_diatonic_step(m, b)
            && interval::is_same_degree(a, b)
        {
            let upper = m.csd.value > a.csd.value;
            let compatible = match b.csd.direction {
                Direction::Bidirectional => true,
                Direction::Ascending => !upper,
                Direction::Descending => upper,
            };
            if compatible {
                return Some(ArcKind::Neighbor { upper });
            }
        }
    }
    if list.len() >= 3 {
        let rising = list
            .windows(2)
            .all(|w| interval::is_step_up(&notes[w[0]], &notes[w[1]]));
        let falling = list
            .windows(2)
            .all(|w| interval::is_step_down(&notes[w[0]], &notes[w[1]]));
        if rising || falling {
            return Some(ArcKind::Passing { rising });
        }
    }
    None
}

/// Conflict test between two arcs.
///
/// Congruent spans always conflict, as do spans that cross without nesting.
/// When one span contains the other (possibly sharing an endpoint), the
/// pair conflicts only if an interior node of the outer arc falls strictly
/// inside the inner span; proper nesting is permitted.
pub fn arcs_conflict(a: &Arc, b: &Arc) -> bool {
    let (a0, an) = (a.start(), a.end());
    let (b0, bn) = (b.start(), b.end());
    if a0 == b0 && an == bn {
        return true;
    }
    if (a0 < b0 && b0 < an && an < bn) || (b0 < a0 && a0 < bn && bn < an) {
        return true;
    }
    let (outer, inner) = if a0 <= b0 && bn <= an {
        (a, b)
    } else if b0 <= a0 && an <= bn {
        (b, a)
    } else {
        return false;
    };
    outer
        .interior()
        .iter()
        .any(|&n| inner.start() < n && n < inner.end())
}

/// True if `candidate` conflicts with any arc in `arcs`.
pub fn conflicts_with_any(candidate: &Arc, arcs: &[Arc]) -> bool {
    arcs.iter().any(|a| arcs_conflict(candidate, a))
}

/// Install the dependency links implied by an arc. A two-note arc gives its
/// second note a lefthead only (the repetition relation); longer arcs give
/// every interior note both heads.
pub fn add_dependencies_from_arc(notes: &mut [Note], arc: &Arc) {
    if arc.notes.len() == 2 {
        let (head, dep) = (arc.notes[0], arc.notes[1]);
        notes[dep].dependency.lefthead = Some(head);
        if !notes[head].dependency.dependents.contains(&dep) {
            notes[head].dependency.dependents.push(dep);
        }
        return;
    }
    let (left, right) = (arc.start(), arc.end());
    for &k in arc.interior() {
        notes[k].dependency.lefthead = Some(left);
        notes[k].dependency.righthead = Some(right);
        if !notes[left].dependency.dependents.contains(&k) {
            notes[left].dependency.dependents.push(k);
        }
        if !notes[right].dependency.dependents.contains(&k) {
            notes[right].dependency.dependents.push(k);
        }
    }
}

/// Remove the dependency links implied by an arc, leaving links installed
/// by other arcs untouched.
pub fn remove_dependencies_from_arc(notes: &mut [Note], arc: &Arc) {
    if arc.notes.len() == 2 {
        let (head, dep) = (arc.notes[0], arc.notes[1]);
        if notes[dep].dependency.lefthead == Some(head) {
            notes[dep].dependency.lefthead = None;
        }
        notes[head].dependency.dependents.retain(|&d| d != dep);
        return;
    }
    let (left, right) = (arc.start(), arc.end());
    for &k in arc.interior() {
        if notes[k].dependency.lefthead == Some(left) {
            notes[k].dependency.lefthead = None;
        }
        if notes[k].dependency.righthead == Some(right) {
            notes[k].dependency.righthead = None;
        }
        notes[left].dependency.dependents.retain(|&d| d != k);
        notes[right].dependency.dependents.retain(|&d| d != k);
    }
}

/// Detach a single note from the dependency graph entirely.
pub fn clear_dependencies(notes: &mut [Note], index: usize) {
    if let Some(head) = notes[index].dependency.lefthead.take() {
        notes[head].dependency.dependents.retain(|&d| d != index);
    }
    if let Some(head) = notes[index].dependency.righthead.take() {
        notes[head].dependency.dependents.retain(|&d| d != index);
    }
    let dependents = std::mem::take(&mut notes[index].dependency.dependents);
    for d in dependents {
        if notes[d].dependency.lefthead == Some(index) {
            notes[d].dependency.lefthead = None;
        }
        if notes[d].dependency.righthead == Some(index) {
            notes[d].dependency.righthead = None;
        }
    }
}

/// Delete an arc by position, clearing its dependency links first.
pub fn remove_arc(notes: &mut [Note], arcs: &mut Vec<Arc>, arc_index: usize) -> Arc {
    let arc = arcs.remove(arc_index);
    remove_dependencies_from_arc(notes, &arc);
    arc
}

/// Fuse two passing arcs moving in the same direction where `a1`'s terminal
/// degree matches `a2`'s initial degree. `a2`'s non-duplicate elements are
/// spliced onto `a1` and `a2` is deleted; dependencies are removed for both
/// and re-derived for the fused arc.
///
/// Returns false (and changes nothing) when the precondition fails.
pub fn arc_merge(notes: &mut [Note], arcs: &mut Vec<Arc>, i1: usize, i2: usize) -> bool {
    if i1 == i2 {
        return false;
    }
    let (d1, d2) = match (arcs[i1].kind, arcs[i2].kind) {
        (Some(ArcKind::Passing { rising: r1 }), Some(ArcKind::Passing { rising: r2 })) => (r1, r2),
        _ => return false,
    };
    if d1 != d2 {
        return false;
    }
    let end1 = arcs[i1].end();
    let start2 = arcs[i2].start();
    if notes[end1].csd.value != notes[start2].csd.value {
        return false;
    }

    let a2 = arcs[i2].clone();
    remove_dependencies_from_arc(notes, &a2);
    let a1_snapshot = arcs[i1].clone();
    remove_dependencies_from_arc(notes, &a1_snapshot);

    let fused: Vec<usize> = {
        let mut list = arcs[i1].notes.clone();
        for &n in &a2.notes {
            if !list.contains(&n) {
                list.push(n);
            }
        }
        list.sort_unstable();
        list
    };
    arcs[i1].notes = fused;
    arcs[i1].kind = Some(ArcKind::Passing { rising: d1 });
    let rebuilt = arcs[i1].clone();
    add_dependencies_from_arc(notes, &rebuilt);
    arcs.remove(i2);
    true
}

/// Absorb a two-note repetition into an adjacent passing arc by relocating
/// the passing arc's matching edge node to the repetition's outer note.
///
/// The repetition must touch the passing arc at one edge with an equal
/// scale degree: `[h, i] + [i, ..]` relocates the start to `h`;
/// `[.., i] + [i, j]` relocates the end to `j`. Returns false when the
/// arcs are not in that configuration.
pub fn arc_embed(notes: &mut [Note], arcs: &mut Vec<Arc>, passing: usize, repetition: usize) -> bool {
    if passing == repetition || !arcs[passing].is_passing() || !arcs[repetition].is_repetition() {
        return false;
    }
    let (rep_start, rep_end) = (arcs[repetition].start(), arcs[repetition].end());
    let snapshot = arcs[passing].clone();
    if rep_end == snapshot.start() {
        remove_dependencies_from_arc(notes, &snapshot);
        arcs[passing].notes[0] = rep_start;
        let rebuilt = arcs[passing].clone();
        add_dependencies_from_arc(notes, &rebuilt);
        true
    } else if rep_start == snapshot.end() {
        remove_dependencies_from_arc(notes, &snapshot);
        let last = arcs[passing].notes.len() - 1;
        arcs[passing].notes[last] = rep_end;
        let rebuilt = arcs[passing].clone();
        add_dependencies_from_arc(notes, &rebuilt);
        true
    } else {
        false
    }
}

/// Lengthen an arc by one boundary note and rebuild its dependency links.
/// The new index must fall strictly before the arc's start or strictly
/// after its end.
pub fn arc_extend(notes: &mut [Note], arc: &mut Arc, index: usize) -> bool {
    if arc.contains(index) {
        return false;
    }
    let snapshot = arc.clone();
    if index < arc.start() {
        remove_dependencies_from_arc(notes, &snapshot);
        arc.notes.insert(0, index);
    } else if index > arc.end() {
        remove_dependencies_from_arc(notes, &snapshot);
        arc.notes.push(index);
    } else {
        return false;
    }
    arc.reclassify(notes);
    add_dependencies_from_arc(notes, arc);
    true
}
