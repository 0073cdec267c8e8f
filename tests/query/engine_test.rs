//! Integration tests for the facet engine over a compiled checklist.
//!
//! The record set is the shared species fixture:
//!
//! | # | taxon          | habitat        | wingspan |
//! |---|----------------|----------------|----------|
//! | 0 | Rosa gallica   | forest, meadow | 30, 32   |
//! | 1 | Rosa canina    | forest         | 12       |
//! | 2 | Daucus carota  | meadow         | 8        |
//! | 3 | Prunus spinosa | hedge, forest  |          |

#[path = "../common/mod.rs"]
mod common;

use std::collections::BTreeMap;

use herbarium::query::{FacetEngine, FacetGroup, Operator, QueryError};

fn engine() -> FacetEngine {
    let checklist = common::compile(&common::workbook())
        .into_result()
        .expect("base project compiles");
    FacetEngine::from_checklist(&checklist, "en").expect("english data")
}

fn counts(pairs: &[(&str, usize)]) -> BTreeMap<String, usize> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

// ============================================================================
// Results and Ancestors
// ============================================================================

#[test]
fn test_empty_query_returns_every_entry() {
    let engine = engine();
    assert_eq!(engine.matched(), &[0, 1, 2, 3]);
    assert_eq!(engine.current_results().len(), 4);
    assert!(engine.current_results().iter().all(|row| !row.is_synthesized()));
}

#[test]
fn test_rank_and_text_query_adds_synthesized_ancestors() {
    let mut engine = engine();
    engine
        .set_selection(FacetGroup::Taxa, "family", ["Rosaceae"])
        .unwrap();
    engine.set_free_text("gallica");

    assert_eq!(engine.matched(), &[0]);
    let rows = engine.current_results();
    let names: Vec<Vec<&str>> = rows.iter().map(|row| row.entry.rank_names()).collect();
    assert_eq!(
        names,
        vec![
            vec!["Rosaceae"],
            vec!["Rosaceae", "Rosa"],
            vec!["Rosaceae", "Rosa", "Rosa gallica"],
        ]
    );
    assert_eq!(rows.iter().filter(|row| row.is_synthesized()).count(), 2);
    assert_eq!(rows[2].index, Some(0));
}

#[test]
fn test_shared_ancestors_are_emitted_once() {
    let mut engine = engine();
    engine.set_selection(FacetGroup::Data, "habitat", ["forest"]).unwrap();

    assert_eq!(engine.matched(), &[0, 1, 3]);
    let synthesized: Vec<Vec<&str>> = engine
        .current_results()
        .iter()
        .filter(|row| row.is_synthesized())
        .map(|row| row.entry.rank_names())
        .collect();
    assert_eq!(
        synthesized,
        vec![
            vec!["Rosaceae"],
            vec!["Rosaceae", "Rosa"],
            vec!["Rosaceae", "Prunus"],
        ]
    );
}

#[test]
fn test_clear_returns_full_set() {
    let mut engine = engine();
    engine.set_selection(FacetGroup::Data, "habitat", ["hedge"]).unwrap();
    engine.set_free_text("spinosa");
    assert_eq!(engine.matched(), &[3]);

    engine.clear();
    assert_eq!(engine.matched(), &[0, 1, 2, 3]);
    assert_eq!(engine.free_text(), "");
    assert!(engine.facets().all(|facet| !facet.is_active()));
}

// ============================================================================
// Free Text
// ============================================================================

#[test]
fn test_free_text_ignores_case_and_diacritics() {
    let mut engine = engine();
    engine.set_free_text("CANÍNA");
    assert_eq!(engine.matched(), &[1]);
}

#[test]
fn test_free_text_searches_text_leaves_not_markdown() {
    let mut engine = engine();
    engine.set_free_text("hedge");
    // Rosa canina mentions hedges only in its markdown notes.
    assert_eq!(engine.matched(), &[3]);
}

#[test]
fn test_free_text_matches_at_word_start() {
    let mut engine = engine();
    engine.set_free_text("allica");
    assert!(engine.matched().is_empty());
}

// ============================================================================
// Numeric Facets
// ============================================================================

#[test]
fn test_between_is_inclusive() {
    let mut engine = engine();
    engine
        .set_numeric("size.wingspan", Operator::Between, 10.0, Some(30.0))
        .unwrap();
    assert_eq!(engine.matched(), &[0, 1]);
}

#[test]
fn test_around_uses_tolerance_window() {
    let mut engine = engine();
    engine
        .set_numeric("size.wingspan#", Operator::Around, 10.0, Some(2.0))
        .unwrap();
    assert_eq!(engine.matched(), &[1, 2]);

    engine
        .set_numeric("size.wingspan#", Operator::Around, 10.0, Some(-1.0))
        .unwrap();
    assert!(engine.matched().is_empty());
}

#[test]
fn test_single_threshold_operators() {
    let mut engine = engine();
    engine
        .set_numeric("size.wingspan", Operator::Greater, 30.0, None)
        .unwrap();
    assert_eq!(engine.matched(), &[0]);

    engine
        .set_numeric("size.wingspan", Operator::Equal, 8.0, None)
        .unwrap();
    assert_eq!(engine.matched(), &[2]);
}

#[test]
fn test_two_threshold_operator_requires_second_value() {
    let mut engine = engine();
    let result = engine.set_numeric("size.wingspan", Operator::Between, 10.0, None);
    assert!(matches!(result, Err(QueryError::MissingThreshold(Operator::Between))));
    assert_eq!(engine.matched(), &[0, 1, 2, 3]);
}

#[test]
fn test_numeric_range_narrows_with_matches() {
    let mut engine = engine();
    let range = engine.numeric_range("size.wingspan").unwrap();
    assert_eq!((range.min, range.max), (Some(8.0), Some(32.0)));

    engine
        .set_selection(FacetGroup::Taxa, "family", ["Rosaceae"])
        .unwrap();
    let range = engine.numeric_range("size.wingspan").unwrap();
    assert_eq!((range.min, range.max), (Some(8.0), Some(32.0)));
    assert_eq!((range.possible_min, range.possible_max), (Some(12.0), Some(32.0)));
}

// ============================================================================
// Facet Kinds
// ============================================================================

#[test]
fn test_kind_mismatches_are_rejected() {
    let mut engine = engine();
    assert!(matches!(
        engine.set_selection(FacetGroup::Data, "size.wingspan", ["12"]),
        Err(QueryError::KindMismatch { .. })
    ));
    assert!(matches!(
        engine.set_numeric("habitat", Operator::Equal, 1.0, None),
        Err(QueryError::KindMismatch { .. })
    ));
    assert!(matches!(
        engine.numeric_range("habitat"),
        Err(QueryError::KindMismatch { .. })
    ));
}

#[test]
fn test_unknown_facet() {
    let mut engine = engine();
    assert!(matches!(
        engine.set_selection(FacetGroup::Data, "colour", ["red"]),
        Err(QueryError::UnknownFacet(_))
    ));
    assert!(matches!(
        engine.set_selection(FacetGroup::Taxa, "habitat", ["forest"]),
        Err(QueryError::UnknownFacet(_))
    ));
}

#[test]
fn test_unknown_language() {
    let checklist = common::compile(&common::workbook()).into_result().unwrap();
    assert!(matches!(
        FacetEngine::from_checklist(&checklist, "fr"),
        Err(QueryError::UnknownLanguage(_))
    ));
}

// ============================================================================
// Possible Values
// ============================================================================

#[test]
fn test_possible_values_follow_other_facets() {
    let mut engine = engine();
    assert_eq!(
        engine.currently_possible(FacetGroup::Data, "habitat").unwrap(),
        &counts(&[("forest", 3), ("hedge", 1), ("meadow", 2)])
    );

    engine
        .set_selection(FacetGroup::Taxa, "family", ["Rosaceae"])
        .unwrap();
    assert_eq!(
        engine.currently_possible(FacetGroup::Data, "habitat").unwrap(),
        &counts(&[("forest", 3), ("hedge", 1), ("meadow", 1)])
    );
    assert_eq!(
        engine.currently_possible(FacetGroup::Taxa, "genus").unwrap(),
        &counts(&[("Prunus", 1), ("Rosa", 2)])
    );
    assert_eq!(engine.facet(FacetGroup::Data, "habitat").unwrap().all.len(), 3);
}

#[test]
fn test_held_open_facet_keeps_its_values() {
    let mut engine = engine();
    engine.hold_open(FacetGroup::Taxa, "family").unwrap();
    engine
        .set_selection(FacetGroup::Taxa, "family", ["Apiaceae"])
        .unwrap();
    assert_eq!(
        engine.currently_possible(FacetGroup::Taxa, "family").unwrap(),
        &counts(&[("Apiaceae", 1), ("Rosaceae", 3)])
    );

    engine
        .set_selection(FacetGroup::Taxa, "family", ["Apiaceae", "Rosaceae"])
        .unwrap();
    assert_eq!(engine.matched(), &[0, 1, 2, 3]);

    engine.release();
    assert_eq!(
        engine.currently_possible(FacetGroup::Taxa, "family").unwrap(),
        &counts(&[("Apiaceae", 1), ("Rosaceae", 3)])
    );
}

#[test]
fn test_impossible_selections_are_pruned() {
    let mut engine = engine();
    engine
        .set_selection(FacetGroup::Data, "habitat", ["meadow", "hedge"])
        .unwrap();
    assert_eq!(engine.matched(), &[0, 2, 3]);

    engine
        .set_selection(FacetGroup::Taxa, "family", ["Apiaceae"])
        .unwrap();
    assert_eq!(engine.matched(), &[2]);
    let selected: Vec<&String> = engine
        .facet(FacetGroup::Data, "habitat")
        .unwrap()
        .selected
        .iter()
        .collect();
    assert_eq!(selected, vec!["meadow"]);
}

#[test]
fn test_selections_survive_an_empty_result() {
    let mut original = engine();
    original
        .set_selection(FacetGroup::Taxa, "family", ["Apiaceae"])
        .unwrap();
    original
        .set_selection(FacetGroup::Taxa, "genus", ["Rosa"])
        .unwrap();
    assert!(original.current_results().is_empty());

    let json = original.serialize_query().unwrap();
    assert_eq!(json, r#"{"taxa":{"family":["Apiaceae"],"genus":["Rosa"]}}"#);

    let mut reloaded = engine();
    assert!(reloaded.load_query(&json).is_loaded());
    assert!(reloaded.current_results().is_empty());
    assert_eq!(reloaded.serialize_query().unwrap(), json);

    original.set_free_text("rosa");
    assert!(original.matched().is_empty());
    assert!(original.facet(FacetGroup::Taxa, "family").unwrap().is_active());
    assert!(original.facet(FacetGroup::Taxa, "genus").unwrap().is_active());
}

// ============================================================================
// Query Composition
// ============================================================================

#[test]
fn test_adding_constraints_never_grows_the_match_set() {
    let mut engine = engine();
    let mut previous: Vec<usize> = engine.matched().to_vec();

    engine.set_selection(FacetGroup::Data, "habitat", ["forest"]).unwrap();
    let step: Vec<usize> = engine.matched().to_vec();
    assert!(step.iter().all(|idx| previous.contains(idx)));
    previous = step;

    engine
        .set_selection(FacetGroup::Taxa, "genus", ["Rosa"])
        .unwrap();
    let step: Vec<usize> = engine.matched().to_vec();
    assert!(step.iter().all(|idx| previous.contains(idx)));
    previous = step;

    engine
        .set_numeric("size.wingspan", Operator::LesserEqual, 20.0, None)
        .unwrap();
    let step: Vec<usize> = engine.matched().to_vec();
    assert!(step.iter().all(|idx| previous.contains(idx)));
    assert_eq!(step, vec![1]);
}

#[test]
fn test_values_within_one_facet_are_alternatives() {
    let mut engine = engine();
    engine
        .set_selection(FacetGroup::Taxa, "genus", ["Daucus", "Prunus"])
        .unwrap();
    assert_eq!(engine.matched(), &[2, 3]);
}

#[test]
fn test_clear_facet_returns_it_to_idle() {
    let mut engine = engine();
    engine
        .set_selection(FacetGroup::Taxa, "genus", ["Daucus"])
        .unwrap();
    engine.clear_facet(FacetGroup::Taxa, "genus").unwrap();
    assert_eq!(engine.matched(), &[0, 1, 2, 3]);
    assert!(!engine.facet(FacetGroup::Taxa, "genus").unwrap().is_active());
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn test_returning_to_a_query_hits_the_cache() {
    let mut engine = engine();
    engine
        .set_selection(FacetGroup::Taxa, "family", ["Rosaceae"])
        .unwrap();
    engine.set_free_text("canina");
    engine.set_free_text("");

    assert_eq!(engine.cache().hits(), 1);
    assert_eq!(engine.cache().len(), 2);
    assert_eq!(engine.matched(), &[0, 1, 3]);
}

#[test]
fn test_selection_order_does_not_change_cache_key() {
    let mut engine = engine();
    engine
        .set_selection(FacetGroup::Data, "habitat", ["meadow", "forest"])
        .unwrap();
    engine
        .set_selection(FacetGroup::Data, "habitat", ["forest", "meadow"])
        .unwrap();
    assert_eq!(engine.cache().hits(), 1);
}

#[test]
fn test_cache_hit_restores_possible_values() {
    let mut engine = engine();
    engine
        .set_selection(FacetGroup::Taxa, "family", ["Rosaceae"])
        .unwrap();
    let possible = engine
        .currently_possible(FacetGroup::Data, "habitat")
        .unwrap()
        .clone();
    let range = engine.numeric_range("size.wingspan").unwrap();

    engine.set_free_text("canina");
    engine.set_free_text("");

    assert_eq!(engine.cache().hits(), 1);
    assert_eq!(
        engine.currently_possible(FacetGroup::Data, "habitat").unwrap(),
        &possible
    );
    assert_eq!(engine.numeric_range("size.wingspan").unwrap(), range);
}

#[test]
fn test_cache_hit_recomputes_facet_that_was_held_open() {
    let mut engine = engine();
    engine.hold_open(FacetGroup::Taxa, "family").unwrap();
    engine
        .set_selection(FacetGroup::Taxa, "genus", ["Rosa"])
        .unwrap();
    assert_eq!(
        engine.currently_possible(FacetGroup::Taxa, "family").unwrap(),
        &counts(&[("Apiaceae", 1), ("Rosaceae", 3)])
    );

    // Same query again, now served from the cache.
    engine.release();
    assert_eq!(engine.cache().hits(), 1);
    assert_eq!(
        engine.currently_possible(FacetGroup::Taxa, "family").unwrap(),
        &counts(&[("Rosaceae", 2)])
    );
}
