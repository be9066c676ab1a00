//! # Line Context
//!
//! The harmonic frame a line is parsed against: the referent triads, the
//! harmonic-span boundaries for harmonic species, and the per-offset local
//! harmonies for third/fifth species.
//!
//! The context is caller-supplied and read-only during parsing; the only
//! harmony object the scanner mutates is its own working `Harmony`, which
//! may grow as third/fifth-species local consonances are admitted.

use std::collections::BTreeSet;

use crate::note::Csd;

/// A triad as a set of degree classes (0..7). Membership is tested by
/// degree class, so any octave of a chord tone counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triad {
    degrees: BTreeSet<i32>,
}

impl Triad {
    pub fn new(degrees: impl IntoIterator<Item = i32>) -> Self {
        Self {
            degrees: degrees.into_iter().map(|d| d.rem_euclid(7)).collect(),
        }
    }

    /// The tonic triad: degrees 1, 3, 5.
    pub fn tonic() -> Self {
        Self::new([0, 2, 4])
    }

    /// The dominant triad: degrees 5, 7, 2.
    pub fn dominant() -> Self {
        Self::new([4, 6, 1])
    }

    /// The subdominant triad, the usual predominant: degrees 4, 6, 1.
    pub fn predominant() -> Self {
        Self::new([3, 5, 0])
    }

    pub fn contains(&self, csd: Csd) -> bool {
        self.degrees.contains(&csd.degree())
    }

    pub fn contains_degree(&self, degree: i32) -> bool {
        self.degrees.contains(&degree.rem_euclid(7))
    }
}

/// The scanner's working referent: a triad plus any degrees admitted during
/// a local scan (third/fifth species case 4 grows the local harmony when a
/// transition resolves onto a new consonance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harmony {
    degrees: BTreeSet<i32>,
}

impl Harmony {
    pub fn from_triad(triad: &Triad) -> Self {
        Self {
            degrees: (0..7).filter(|d| triad.contains_degree(*d)).collect(),
        }
    }

    pub fn contains(&self, csd: Csd) -> bool {
        self.degrees.contains(&csd.degree())
    }

    pub fn admit(&mut self, csd: Csd) {
        self.degrees.insert(csd.degree());
    }
}

/// Offsets partitioning a harmonic-species line into its progression spans.
/// A span runs from one boundary offset up to (not including) the next.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicSpans {
    pub offset_predominant: Option<f64>,
    pub offset_dominant: f64,
    pub offset_closing_tonic: f64,
}

/// Everything the parser needs to know about a line's harmonic environment.
#[derive(Debug, Clone)]
pub struct LineContext {
    pub tonic_triad: Triad,
    pub predominant_triad: Triad,
    pub dominant_triad: Triad,
    /// Present only when parsing harmonic species.
    pub harmonic_spans: Option<HarmonicSpans>,
    /// Third/fifth species: local harmony per group-start offset, sorted by
    /// offset. Lookup returns the harmony whose offset is the greatest one
    /// not exceeding the query.
    pub local_harmonies: Vec<(f64, Triad)>,
}

impl LineContext {
    /// A monotriadic context: every span is the tonic triad.
    pub fn monotriadic() -> Self {
        Self {
            tonic_triad: Triad::tonic(),
            predominant_triad: Triad::predominant(),
            dominant_triad: Triad::dominant(),
            harmonic_spans: None,
            local_harmonies: Vec::new(),
        }
    }

    /// Local harmony in effect at `offset`, falling back to the tonic triad
    /// when no local harmony has been supplied.
    pub fn local_harmony_at(&self, offset: f64) -> &Triad {
        self.local_harmonies
            .iter()
            .rev()
            .find(|(start, _)| *start <= offset)
            .map(|(_, t)| t)
            .unwrap_or(&self.tonic_triad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{Csd, Direction};

    fn csd(value: i32) -> Csd {
        Csd::new(value, Direction::Bidirectional)
    }

    #[test]
    fn test_triad_membership_by_degree_class() {
        let tonic = Triad::tonic();
        assert!(tonic.contains(csd(0)));
        assert!(tonic.contains(csd(7)));
        assert!(tonic.contains(csd(-3))); // degree class 4
        assert!(!tonic.contains(csd(1)));
    }

    #[test]
    fn test_harmony_grows() {
        let mut h = Harmony::from_triad(&Triad::tonic());
        assert!(!h.contains(csd(5)));
        h.admit(csd(5));
        assert!(h.contains(csd(5)));
        assert!(h.contains(csd(12))); // same degree class, octave up
    }

    #[test]
    fn test_local_harmony_lookup() {
        let mut ctx = LineContext::monotriadic();
        ctx.local_harmonies = vec![(0.0, Triad::tonic()), (4.0, Triad::dominant())];
        assert!(ctx.local_harmony_at(2.0).contains(csd(0)));
        assert!(ctx.local_harmony_at(4.0).contains(csd(6)));
        assert!(ctx.local_harmony_at(9.5).contains(csd(6)));
    }
}
