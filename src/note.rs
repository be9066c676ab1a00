//! # Note Model
//!
//! This module defines the index-addressed note records that the parser
//! annotates while building a line's dependency structure.
//!
//! ## Type Hierarchy
//! ```text
//! Note
//!   ├── index: usize (position in line, the stable key for all cross-refs)
//!   ├── csd: Csd (continuous scale degree + melodic direction)
//!   ├── pitch: i32 (semitones above the line's reference; supplies quality)
//!   ├── tie: TieRole (None | Start | Continue | Stop)
//!   ├── measure / beat / offset (numeric position, used by preferences)
//!   ├── dependency: Dependency (lefthead, righthead, dependents)
//!   ├── rule: RuleSlot (name + structural level)
//!   └── parenthesis: bool (unsupported/independent insertion marker)
//! ```
//!
//! ## Key Concepts
//!
//! ### Continuous scale degree (csd)
//! A diatonic scale-degree measure that is continuous across octaves:
//! value 0 is the reference tonic, 7 the tonic an octave up, -1 the leading
//! tone below. Degree-class tests use `value mod 7` (Euclidean, so negative
//! values land in 0..7). The `direction` flag records whether the note was
//! approached as part of an ascending, descending, or direction-neutral
//! motion; neighbor classification consults it.
//!
//! ### Dependency fields
//! `lefthead`/`righthead` always name notes that are themselves members of
//! an arc containing this note as interior or terminal. The arc algebra in
//! `arc` is the only writer; every arc insertion/removal keeps these fields
//! consistent.
//!
//! ## Related Modules
//! - `arc` - Writes the dependency fields
//! - `scanner` - Reads csd/pitch through the `interval` predicates
//! - `levels` - Writes `rule.level`

use serde::Deserialize;

/// Melodic direction attached to a continuous scale degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
    #[default]
    Bidirectional,
}

/// Continuous scale degree: value 0 = reference tonic, continuous across
/// octaves (7 = tonic an octave higher, -1 = leading tone below).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Csd {
    pub value: i32,
    pub direction: Direction,
}

impl Csd {
    pub fn new(value: i32, direction: Direction) -> Self {
        Self { value, direction }
    }

    /// Degree class in 0..7; membership tests always use this.
    pub fn degree(&self) -> i32 {
        self.value.rem_euclid(7)
    }

    /// Display label "1".."7", with octave ticks for values outside 0..7
    /// (e.g. value 7 in a major line is "8" conventionally written "1'").
    pub fn label(&self) -> String {
        let class = self.degree() + 1;
        let octaves = (self.value - self.degree()) / 7;
        match octaves {
            0 => format!("{}", class),
            n if n > 0 => format!("{}{}", class, "'".repeat(n as usize)),
            n => format!("{}{}", class, ",".repeat((-n) as usize)),
        }
    }
}

/// Role of a note within a tie group. Only `None` and `Start` notes take
/// part in syntactic scanning; `Continue`/`Stop` notes inherit their tie
/// head's level for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieRole {
    #[default]
    None,
    Start,
    Continue,
    Stop,
}

/// Mutable dependency annotations written by the arc algebra.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependency {
    pub lefthead: Option<usize>,
    pub righthead: Option<usize>,
    pub dependents: Vec<usize>,
}

/// Syntactic role labels assigned during rule assignment.
///
/// S labels mark basic-structure notes, E labels triad-member elaborations,
/// L labels non-triad (local) elaborations. `L0` marks an unresolved local
/// insertion tolerated only in third/fifth species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleName {
    S1,
    S2,
    S3,
    E1,
    E2,
    E3,
    E4,
    L0,
    L1,
    L2,
    L3,
}

impl RuleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleName::S1 => "S1",
            RuleName::S2 => "S2",
            RuleName::S3 => "S3",
            RuleName::E1 => "E1",
            RuleName::E2 => "E2",
            RuleName::E3 => "E3",
            RuleName::E4 => "E4",
            RuleName::L0 => "L0",
            RuleName::L1 => "L1",
            RuleName::L2 => "L2",
            RuleName::L3 => "L3",
        }
    }
}

/// Rule label and structural depth (level 0 = most fundamental).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleSlot {
    pub name: Option<RuleName>,
    pub level: Option<usize>,
}

/// One note of the line. Immutable pitch/timing facts plus the two mutable
/// annotation blocks the parser writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub index: usize,
    pub csd: Csd,
    pub pitch: i32,
    pub tie: TieRole,
    pub measure: usize,
    pub beat: f64,
    pub offset: f64,
    pub dependency: Dependency,
    pub rule: RuleSlot,
    pub parenthesis: bool,
}

impl Note {
    pub fn new(index: usize, csd: Csd, pitch: i32, measure: usize, beat: f64, offset: f64) -> Self {
        Self {
            index,
            csd,
            pitch,
            tie: TieRole::None,
            measure,
            beat,
            offset,
            dependency: Dependency::default(),
            rule: RuleSlot::default(),
            parenthesis: false,
        }
    }

    /// True for notes that take part in syntactic scanning (tie followers
    /// are display-only).
    pub fn is_scanned(&self) -> bool {
        matches!(self.tie, TieRole::None | TieRole::Start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_class_wraps_octaves() {
        assert_eq!(Csd::new(0, Direction::Bidirectional).degree(), 0);
        assert_eq!(Csd::new(7, Direction::Bidirectional).degree(), 0);
        assert_eq!(Csd::new(9, Direction::Bidirectional).degree(), 2);
        assert_eq!(Csd::new(-1, Direction::Bidirectional).degree(), 6);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Csd::new(4, Direction::Bidirectional).label(), "5");
        assert_eq!(Csd::new(7, Direction::Bidirectional).label(), "1'");
        assert_eq!(Csd::new(-1, Direction::Bidirectional).label(), "7,");
    }

    #[test]
    fn test_tie_followers_not_scanned() {
        let mut n = Note::new(0, Csd::new(0, Direction::Bidirectional), 0, 1, 1.0, 0.0);
        assert!(n.is_scanned());
        n.tie = TieRole::Continue;
        assert!(!n.is_scanned());
    }
}
