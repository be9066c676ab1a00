//! # Line Input
//!
//! YAML front end for the parser: a `LineInput` document names the
//! species, the optional harmonic-span layout, the parser options, and
//! the notes of the line. `into_parts` converts it into the note arena,
//! context, and configuration the core consumes.
//!
//! ## Related Modules
//! - `note`, `context`, `config` - The core types this deserializes into
//! - `error` - Input failures

use serde::Deserialize;

use crate::config::{LineType, ParserConfig, Species};
use crate::context::{HarmonicSpans, LineContext, Triad};
use crate::error::CantusError;
use crate::note::{Csd, Direction, Note, TieRole};

fn default_true() -> bool {
    true
}

fn default_beat() -> f64 {
    1.0
}

/// One note of the input line.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteInput {
    /// Continuous scale degree value (0 = tonic, continuous across
    /// octaves).
    pub value: i32,
    #[serde(default)]
    pub direction: Direction,
    /// Chromatic pitch in semitones from the tonic.
    pub pitch: i32,
    pub measure: usize,
    #[serde(default = "default_beat")]
    pub beat: f64,
    pub offset: f64,
    #[serde(default)]
    pub tie: TieRole,
}

/// Harmonic span layout for the harmonic species.
#[derive(Debug, Clone, Deserialize)]
pub struct SpanInput {
    #[serde(default)]
    pub predominant: Option<f64>,
    pub dominant: f64,
    pub closing_tonic: f64,
}

/// Referent triads as degree-class lists. Any omitted triad keeps its
/// diatonic default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriadInput {
    #[serde(default)]
    pub tonic: Option<Vec<i32>>,
    #[serde(default)]
    pub predominant: Option<Vec<i32>>,
    #[serde(default)]
    pub dominant: Option<Vec<i32>>,
}

/// A local harmony taking effect at `offset`, for third/fifth species.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalHarmonyInput {
    pub offset: f64,
    pub degrees: Vec<i32>,
}

/// A full line document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineInput {
    pub species: Species,
    #[serde(default)]
    pub harmonic_species: bool,
    #[serde(default)]
    pub spans: Option<SpanInput>,
    #[serde(default)]
    pub triads: TriadInput,
    /// Per-offset local harmonies for third/fifth species; each entry is in
    /// effect from its offset until the next.
    #[serde(default)]
    pub local_harmonies: Vec<LocalHarmonyInput>,
    /// Restrict parsing to these line types; all three when absent.
    #[serde(default)]
    pub line_types: Option<Vec<LineType>>,
    pub notes: Vec<NoteInput>,
    #[serde(default = "default_true")]
    pub select_preferred_parses: bool,
    #[serde(default = "default_true")]
    pub get_structural_levels: bool,
    #[serde(default)]
    pub local_neighbors_only: bool,
    #[serde(default = "default_true")]
    pub extend_local_arcs: bool,
    #[serde(default = "default_true")]
    pub add_local_repetitions: bool,
    #[serde(default)]
    pub integrate_final_neighbor: bool,
}

impl LineInput {
    pub fn from_yaml(source: &str) -> Result<Self, CantusError> {
        let input: LineInput = serde_yaml::from_str(source)?;
        if input.notes.is_empty() {
            return Err(CantusError::Note {
                index: 0,
                message: "the line has no notes".into(),
            });
        }
        if input.harmonic_species && input.spans.is_none() {
            return Err(CantusError::Note {
                index: 0,
                message: "harmonic species requires a span layout".into(),
            });
        }
        Ok(input)
    }

    /// Split the document into the pieces the parser consumes.
    pub fn into_parts(self) -> (Vec<Note>, LineContext, ParserConfig, Vec<LineType>) {
        let notes = self
            .notes
            .iter()
            .enumerate()
            .map(|(index, n)| {
                let mut note = Note::new(
                    index,
                    Csd::new(n.value, n.direction),
                    n.pitch,
                    n.measure,
                    n.beat,
                    n.offset,
                );
                note.tie = n.tie;
                note
            })
            .collect();
        let mut context = LineContext::monotriadic();
        if let Some(degrees) = self.triads.tonic {
            context.tonic_triad = Triad::new(degrees);
        }
        if let Some(degrees) = self.triads.predominant {
            context.predominant_triad = Triad::new(degrees);
        }
        if let Some(degrees) = self.triads.dominant {
            context.dominant_triad = Triad::new(degrees);
        }
        if let Some(spans) = self.spans {
            context.harmonic_spans = Some(HarmonicSpans {
                offset_predominant: spans.predominant,
                offset_dominant: spans.dominant,
                offset_closing_tonic: spans.closing_tonic,
            });
        }
        let mut local_harmonies: Vec<(f64, Triad)> = self
            .local_harmonies
            .into_iter()
            .map(|h| (h.offset, Triad::new(h.degrees)))
            .collect();
        local_harmonies.sort_by(|a, b| a.0.total_cmp(&b.0));
        context.local_harmonies = local_harmonies;
        let config = ParserConfig {
            species: self.species,
            harmonic_species: self.harmonic_species,
            select_preferred_parses: self.select_preferred_parses,
            get_structural_levels: self.get_structural_levels,
            local_neighbors_only: self.local_neighbors_only,
            extend_local_arcs: self.extend_local_arcs,
            add_local_repetitions: self.add_local_repetitions,
            integrate_final_neighbor: self.integrate_final_neighbor,
        };
        let line_types = self
            .line_types
            .unwrap_or_else(|| vec![LineType::Primary, LineType::Bass, LineType::Generic]);
        (notes, context, config, line_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document() {
        let source = "\
species: first
notes:
  - { value: 2, pitch: 4, measure: 1, offset: 0.0 }
  - { value: 1, pitch: 2, measure: 2, offset: 1.0 }
  - { value: 0, pitch: 0, measure: 3, offset: 2.0 }
";
        let input = LineInput::from_yaml(source).expect("valid document");
        let (notes, _context, config, line_types) = input.into_parts();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[2].csd.value, 0);
        assert_eq!(config.species, Species::First);
        assert_eq!(line_types.len(), 3);
    }

    #[test]
    fn test_empty_line_rejected() {
        let source = "species: first\nnotes: []\n";
        assert!(LineInput::from_yaml(source).is_err());
    }

    #[test]
    fn test_harmonic_species_requires_spans() {
        let source = "\
species: first
harmonic_species: true
notes:
  - { value: 0, pitch: 0, measure: 1, offset: 0.0 }
";
        assert!(LineInput::from_yaml(source).is_err());
    }

    #[test]
    fn test_local_harmonies_sorted_and_applied() {
        let source = "\
species: third
local_harmonies:
  - { offset: 4.0, degrees: [4, 6, 1] }
  - { offset: 0.0, degrees: [0, 2, 4] }
notes:
  - { value: 0, pitch: 0, measure: 1, offset: 0.0 }
  - { value: 1, pitch: 2, measure: 2, offset: 4.0 }
";
        let input = LineInput::from_yaml(source).expect("valid document");
        let (_, context, _, _) = input.into_parts();
        assert_eq!(context.local_harmonies.len(), 2);
        assert!(context.local_harmonies[0].0 < context.local_harmonies[1].0);
        assert!(context.local_harmony_at(5.0).contains_degree(6));
    }

    #[test]
    fn test_span_layout_parses() {
        let source = "\
species: first
harmonic_species: true
spans: { dominant: 6.0, closing_tonic: 7.0 }
line_types: [bass]
notes:
  - { value: 0, pitch: 0, measure: 1, offset: 0.0 }
  - { value: 4, pitch: 7, measure: 2, offset: 6.0 }
  - { value: 0, pitch: 0, measure: 3, offset: 7.0 }
";
        let input = LineInput::from_yaml(source).expect("valid document");
        let (_, context, _, line_types) = input.into_parts();
        assert!(context.harmonic_spans.is_some());
        assert_eq!(line_types, vec![LineType::Bass]);
    }
}
