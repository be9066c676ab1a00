//! Integration tests for the cantus parser
//!
//! Exercises the full pipeline from note input to collected parses:
//! line-type candidates, basic-structure inference, rule assignment,
//! leveling, and the collector's filtering and preferences.

use cantus::{
    parse_line, parse_line_as, Csd, Direction, LineContext, LineInput, LineType, Note,
    ParserConfig, Species,
};

/// Build a line of bidirectional notes in a major key from csd values,
/// one note per measure.
fn major_line(values: &[i32]) -> Vec<Note> {
    let semis = [0, 2, 4, 5, 7, 9, 11];
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let pitch = 12 * v.div_euclid(7) + semis[v.rem_euclid(7) as usize];
            Note::new(
                i,
                Csd::new(v, Direction::Bidirectional),
                pitch,
                i + 1,
                1.0,
                i as f64,
            )
        })
        .collect()
}

fn first_species() -> ParserConfig {
    ParserConfig {
        species: Species::First,
        ..ParserConfig::default()
    }
}

#[test]
fn test_generic_triad_line_parses() {
    // do mi sol mi do: every note consonant with the tonic triad
    let notes = major_line(&[0, 2, 4, 2, 0]);
    let result = parse_line_as(
        notes,
        &LineContext::monotriadic(),
        &first_species(),
        &[LineType::Generic],
    );
    assert!(result.is_parsed(), "errors: {:?}", result.errors);
    assert_eq!(result.parses.len(), 1);
    let parse = &result.parses[0];
    assert_eq!(parse.arc_basic, Some(vec![0, 4]));
    assert!(parse.errors.is_empty());
}

#[test]
fn test_primary_descent_found_by_direct_method() {
    // 5 4 3 2 1: the preliminary scan leaves a passing arc 3 2 1 which
    // method 0 adopts wholesale for the third-degree candidate
    let notes = major_line(&[4, 3, 2, 1, 0]);
    let config = ParserConfig {
        select_preferred_parses: false,
        ..first_species()
    };
    let result = parse_line_as(
        notes,
        &LineContext::monotriadic(),
        &config,
        &[LineType::Primary],
    );
    assert!(result.is_parsed(), "errors: {:?}", result.errors);
    let direct = result
        .parses
        .iter()
        .find(|p| p.method == 0)
        .expect("a method-0 parse");
    assert_eq!(direct.arc_basic, Some(vec![2, 3, 4]));
    assert_eq!(direct.s3_indexes, vec![3]);
}

#[test]
fn test_fifth_line_fusion() {
    // 5 4 3 3 2 1: the descent is split by a repeated third degree and
    // must be fused into one composite basic arc
    let notes = major_line(&[4, 3, 2, 2, 1, 0]);
    let config = ParserConfig {
        select_preferred_parses: false,
        ..first_species()
    };
    let result = parse_line_as(
        notes,
        &LineContext::monotriadic(),
        &config,
        &[LineType::Primary],
    );
    assert!(result.is_parsed(), "errors: {:?}", result.errors);
    assert!(result
        .parses
        .iter()
        .any(|p| p.arc_basic == Some(vec![0, 1, 2, 3, 4, 5])));
}

#[test]
fn test_bass_line_must_end_on_tonic() {
    let notes = major_line(&[0, 4, 1]);
    let result = parse_line_as(
        notes,
        &LineContext::monotriadic(),
        &first_species(),
        &[LineType::Bass],
    );
    assert!(!result.is_parsed());
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.contains("does not end on the tonic degree (S1)")),
        "errors: {:?}",
        result.errors
    );
}

#[test]
fn test_dissonant_skip_excludes_the_line() {
    // fa to ti is an augmented fourth
    let mut notes = major_line(&[0, 3, 6, 0]);
    notes[3].csd = Csd::new(7, Direction::Bidirectional);
    notes[3].pitch = 12;
    let result = parse_line(notes, &LineContext::monotriadic(), &first_species());
    assert!(!result.is_parsed());
    assert!(
        result.errors.iter().any(|e| e.contains("nongenerable leap")),
        "errors: {:?}",
        result.errors
    );
}

#[test]
fn test_unresolved_local_insertion_excludes_the_line() {
    // third species: the fa in measure 1 never resolves by step
    let mut notes = major_line(&[0, 3, 1, 0]);
    for (i, n) in notes.iter_mut().enumerate() {
        n.measure = if i < 3 { 1 } else { 2 };
    }
    let config = ParserConfig {
        species: Species::Third,
        ..ParserConfig::default()
    };
    let result = parse_line(notes, &LineContext::monotriadic(), &config);
    assert!(!result.is_parsed());
    assert!(
        result.errors.iter().any(|e| e.contains("not resolved")),
        "errors: {:?}",
        result.errors
    );
}

#[test]
fn test_harmonic_species_bass_arpeggiation() {
    use cantus::HarmonicSpans;

    let mut notes = major_line(&[0, 4, 0]);
    for (i, n) in notes.iter_mut().enumerate() {
        n.offset = i as f64;
    }
    let mut context = LineContext::monotriadic();
    context.harmonic_spans = Some(HarmonicSpans {
        offset_predominant: None,
        offset_dominant: 1.0,
        offset_closing_tonic: 2.0,
    });
    let config = ParserConfig {
        harmonic_species: true,
        ..first_species()
    };
    let result = parse_line_as(notes, &context, &config, &[LineType::Bass]);
    assert!(result.is_parsed(), "errors: {:?}", result.errors);
    let parse = &result.parses[0];
    assert_eq!(parse.arc_basic, Some(vec![0, 1, 2]));
    assert_eq!(parse.s3_index, Some(1));
}

#[test]
fn test_bass_preference_keeps_the_onbeat_pivot() {
    // two dominant pivots; only the second falls on the beat
    let mut notes = major_line(&[0, 4, 4, 0]);
    notes[1].beat = 2.0;
    let result = parse_line_as(
        notes,
        &LineContext::monotriadic(),
        &first_species(),
        &[LineType::Bass],
    );
    assert!(result.is_parsed(), "errors: {:?}", result.errors);
    assert_eq!(result.parses.len(), 1);
    assert_eq!(result.parses[0].s3_index, Some(2));
}

#[test]
fn test_structural_levels_follow_the_basic_structure() {
    let notes = major_line(&[2, 1, 0]);
    let config = first_species();
    let result = parse_line_as(
        notes,
        &LineContext::monotriadic(),
        &config,
        &[LineType::Primary],
    );
    assert!(result.is_parsed(), "errors: {:?}", result.errors);
    let parse = &result.parses[0];
    assert_eq!(parse.notes[2].rule.level, Some(0));
    assert_eq!(parse.notes[0].rule.level, Some(1));
    assert_eq!(parse.notes[1].rule.level, Some(2));
}

#[test]
fn test_full_pipeline_from_yaml() {
    let source = "\
species: first
notes:
  - { value: 2, pitch: 4, measure: 1, offset: 0.0 }
  - { value: 1, pitch: 2, measure: 2, offset: 1.0 }
  - { value: 0, pitch: 0, measure: 3, offset: 2.0 }
";
    let input = LineInput::from_yaml(source).expect("valid document");
    let (notes, context, config, line_types) = input.into_parts();
    let result = parse_line_as(notes, &context, &config, &line_types);
    assert!(result.is_parsed(), "errors: {:?}", result.errors);
    assert!(result
        .parses
        .iter()
        .any(|p| p.line_type == LineType::Primary));
}

#[test]
fn test_final_arc_set_has_no_conflicts() {
    use cantus::arc::arcs_conflict;

    let notes = major_line(&[4, 3, 2, 1, 0]);
    let result = parse_line_as(
        notes,
        &LineContext::monotriadic(),
        &first_species(),
        &[LineType::Primary],
    );
    assert!(result.is_parsed(), "errors: {:?}", result.errors);
    for parse in &result.parses {
        for (i, a1) in parse.arcs.iter().enumerate() {
            for a2 in parse.arcs.iter().skip(i + 1) {
                assert!(
                    !arcs_conflict(a1, a2),
                    "conflicting arcs {:?} and {:?}",
                    a1.notes,
                    a2.notes
                );
            }
        }
    }
}
