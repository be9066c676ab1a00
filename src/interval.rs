//! # Interval Predicates
//!
//! Pure functions answering step/skip/unison/consonance questions about
//! pairs of notes.
//!
//! ## Quality from two integers
//! A note carries its continuous scale degree (generic size) and a chromatic
//! pitch in semitones (exact size). Quality falls out of the pair: a fourth
//! spanning 5 semitones is perfect, one spanning 6 is augmented. The
//! predicates here never consult key or spelling; those live outside the
//! core.
//!
//! ## Linear consonance
//! The melodically consonant skips are the minor/major third (3, 4), the
//! perfect fourth (5), the perfect fifth (7), the minor/major sixth (8, 9),
//! and the octave (12). Everything else within the octave is a dissonant
//! skip; anything beyond the octave is a compound leap.

use crate::note::Note;

/// Generic (diatonic) interval size: 0 = unison, 1 = step, 2 = third, ...
pub fn generic(a: &Note, b: &Note) -> i32 {
    (b.csd.value - a.csd.value).abs()
}

/// Exact interval size in semitones.
pub fn semitones(a: &Note, b: &Note) -> i32 {
    (b.pitch - a.pitch).abs()
}

/// A diatonic step: generic second of one or two semitones.
pub fn is_diatonic_step(a: &Note, b: &Note) -> bool {
    generic(a, b) == 1 && matches!(semitones(a, b), 1 | 2)
}

/// A directed diatonic step upward from `a` to `b`.
pub fn is_step_up(a: &Note, b: &Note) -> bool {
    is_diatonic_step(a, b) && b.csd.value > a.csd.value
}

/// A directed diatonic step downward from `a` to `b`.
pub fn is_step_down(a: &Note, b: &Note) -> bool {
    is_diatonic_step(a, b) && b.csd.value < a.csd.value
}

/// A linear unison: same scale degree, same pitch.
pub fn is_linear_unison(a: &Note, b: &Note) -> bool {
    generic(a, b) == 0 && semitones(a, b) == 0
}

/// True when the two notes sit on the same continuous scale degree.
pub fn is_same_degree(a: &Note, b: &Note) -> bool {
    a.csd.value == b.csd.value
}

/// A melodically consonant skip within the octave.
pub fn is_consonant_skip(a: &Note, b: &Note) -> bool {
    generic(a, b) >= 2 && matches!(semitones(a, b), 3 | 4 | 5 | 7 | 8 | 9 | 12)
}

/// A skip within the octave that is not a linear consonance (tritone,
/// seventh, or any augmented/diminished size).
pub fn is_dissonant_skip(a: &Note, b: &Note) -> bool {
    generic(a, b) >= 2 && !is_compound_leap(a, b) && !is_consonant_skip(a, b)
}

/// A leap exceeding the octave.
pub fn is_compound_leap(a: &Note, b: &Note) -> bool {
    semitones(a, b) > 12 || generic(a, b) > 7
}

/// Interval permissible as the outer leap of a leveling branch: a step or
/// any linear consonance.
pub fn is_permissible_span(a: &Note, b: &Note) -> bool {
    is_diatonic_step(a, b) || is_linear_unison(a, b) || is_consonant_skip(a, b)
}
