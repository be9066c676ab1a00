//! # Parser Configuration
//!
//! Species selection, line types, and the named option flags.
//!
//! The original design kept these as module-level mutable flags; here they
//! are an explicit configuration struct passed into the orchestrator so that
//! candidate evaluation is deterministic and parallel-safe.

use serde::Deserialize;

/// The five species of counterpoint exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    #[default]
    First,
    Second,
    Third,
    Fourth,
    Fifth,
}

impl Species {
    /// Third and fifth species admit local insertions and run the two-level
    /// local/global scan.
    pub fn has_local_elaborations(&self) -> bool {
        matches!(self, Species::Third | Species::Fifth)
    }
}

/// Which structural role a line is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Primary,
    Bass,
    Generic,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Primary => "primary",
            LineType::Bass => "bass",
            LineType::Generic => "generic",
        }
    }
}

/// Full parser configuration for one line.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub species: Species,
    /// Referent harmony progresses tonic → predominant → dominant → tonic.
    pub harmonic_species: bool,
    /// Apply preference rules across surviving parses.
    pub select_preferred_parses: bool,
    /// Compute structural levels (leveling can be skipped for a quick
    /// well-formedness check).
    pub get_structural_levels: bool,
    /// Restrict local (per-measure) arcs to neighbor shapes.
    pub local_neighbors_only: bool,
    /// Allow local arcs to extend into the global context.
    pub extend_local_arcs: bool,
    /// Merge unattached same-degree local heads into repetition arcs.
    pub add_local_repetitions: bool,
    /// Fold a final upper/lower neighbor into the closing structure.
    pub integrate_final_neighbor: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            species: Species::First,
            harmonic_species: false,
            select_preferred_parses: true,
            get_structural_levels: true,
            local_neighbors_only: false,
            extend_local_arcs: true,
            add_local_repetitions: true,
            integrate_final_neighbor: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_elaboration_species() {
        assert!(Species::Third.has_local_elaborations());
        assert!(Species::Fifth.has_local_elaborations());
        assert!(!Species::First.has_local_elaborations());
        assert!(!Species::Fourth.has_local_elaborations());
    }
}
