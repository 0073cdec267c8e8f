//! Integration tests for the end-to-end workbook → checklist compilation.
//!
//! These tests cover the phase gating (validation, schema, extraction), the
//! shape of the compiled JSON document and its reproducibility.

#[path = "../common/mod.rs"]
mod common;

use std::collections::BTreeMap;

use herbarium::compile::readers::{TaxonReader, TextReader};
use herbarium::compile::{self, CompileError, ReaderRegistry};
use herbarium::diagnostics::{Diagnostic, Severity};
use herbarium::model::{CompiledChecklist, FacetKind, Value};
use herbarium::query::{FacetEngine, FacetGroup};
use herbarium::schema::Formatting;
use herbarium::table::RawTable;
use serde_json::json;

fn compiled() -> CompiledChecklist {
    common::compile(&common::workbook())
        .into_result()
        .expect("base project compiles")
}

// ============================================================================
// Document Shape
// ============================================================================

#[test]
fn test_entry_carries_rank_names_only() {
    let checklist = RawTable::from_strings(&[
        ["Family", "Genus", "Species"],
        ["Rosaceae", "Rosa", "Rosa gallica"],
    ]);
    let output = common::compile(&common::workbook_with(checklist));
    let checklist = output.into_result().unwrap();

    let entry = &checklist.per_language["en"].entries[0];
    assert_eq!(
        serde_json::to_value(entry).unwrap(),
        json!({
            "t": [{"name": "Rosaceae"}, {"name": "Rosa"}, {"name": "Rosa gallica"}],
            "d": {}
        })
    );
}

#[test]
fn test_entry_data_tree() {
    let checklist = compiled();
    let gallica = &checklist.per_language["en"].entries[0];
    assert_eq!(
        serde_json::to_value(gallica).unwrap(),
        json!({
            "t": [{"name": "Rosaceae"}, {"name": "Rosa"}, {"name": "Rosa gallica"}],
            "d": {
                "habitat": ["forest", "meadow"],
                "notes": "Gallic rose",
                "size": {"wingspan": [30.0, 32.0]}
            }
        })
    );
}

#[test]
fn test_general_section() {
    let checklist = compiled();
    let general = serde_json::to_value(&checklist.general).unwrap();
    assert_eq!(general["lastUpdate"], "2024-05-01T12:00:00Z");
    assert_eq!(general["defaultLanguage"], "en");
    assert_eq!(general["languages"], json!([{"code": "en", "name": "English"}]));
    assert_eq!(general["assets"], json!([]));
    assert!(general.get("bibliographySource").is_none());
}

#[test]
fn test_display_and_facet_metadata() {
    let checklist = compiled();
    let en = &checklist.per_language["en"];

    let ranks: Vec<&str> = en.display_meta.ranks.iter().map(|r| r.column.as_str()).collect();
    assert_eq!(ranks, vec!["family", "genus", "species"]);
    assert!(en.display_meta.ranks[1].italicize);
    assert_eq!(en.display_meta.date_format, "%Y-%m-%d");
    assert_eq!(en.display_meta.data["notes"].formatting, Formatting::Markdown);

    let taxa: Vec<(&str, Option<usize>)> = en
        .facet_meta
        .taxa
        .iter()
        .map(|(address, meta)| (address.as_str(), meta.depth))
        .collect();
    assert_eq!(
        taxa,
        vec![("family", Some(0)), ("genus", Some(1)), ("species", Some(2))]
    );

    let data: Vec<(&str, FacetKind)> = en
        .facet_meta
        .data
        .iter()
        .map(|(address, meta)| (address.as_str(), meta.kind))
        .collect();
    assert_eq!(
        data,
        vec![("habitat#", FacetKind::Text), ("size.wingspan#", FacetKind::Numeric)]
    );
}

#[test]
fn test_customization_reaches_display_meta() {
    let customization = RawTable::from_strings(&[
        ["Item", "Value"],
        ["Checklist name", "Flora of the Hills"],
        ["Color theme", "forestgreen"],
        ["Bibliography", "sources.bib"],
    ]);
    let workbook = common::workbook().with_table("Customization", customization);
    let checklist = common::compile(&workbook).into_result().unwrap();

    let meta = &checklist.per_language["en"].display_meta;
    assert_eq!(meta.checklist_name.as_deref(), Some("Flora of the Hills"));
    assert_eq!(meta.color_theme.as_deref(), Some("forestgreen"));
    assert_eq!(
        checklist.general.bibliography_source.as_deref(),
        Some("sources.bib")
    );
}

// ============================================================================
// Reproducibility
// ============================================================================

#[test]
fn test_compilation_is_byte_identical_for_fixed_now() {
    let first = compiled().to_json_pretty().unwrap();
    let second = compiled().to_json_pretty().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_compiled_json_reads_back() {
    let checklist = compiled();
    let json = checklist.to_json_pretty().unwrap();
    let parsed = CompiledChecklist::from_json_str(&json).unwrap();
    assert_eq!(parsed, checklist);
}

#[test]
fn test_objects_shaped_like_leaves_read_back() {
    let data = RawTable::from_strings(&[
        ["Column name", "Search category title", "Formatting"],
        ["reference", "", ""],
        ["reference.source", "Source", "text"],
        ["reference.title", "", "text"],
    ]);
    let rows = RawTable::from_strings(&[
        ["Family", "Genus", "Species", "reference.source", "reference.title"],
        ["Rosaceae", "Rosa", "Rosa gallica", "Flora Europaea", "Vol 2"],
    ]);
    let workbook = common::workbook_with(rows).with_table("Data definition", data);
    let checklist = common::compile(&workbook).into_result().unwrap();

    let json = checklist.to_json_pretty().unwrap();
    let parsed = CompiledChecklist::from_json_str(&json).unwrap();
    assert_eq!(parsed, checklist);
    assert_eq!(
        parsed.per_language["en"].entries[0].data["reference"],
        Value::Object(BTreeMap::from([
            ("source".to_string(), Value::Text("Flora Europaea".to_string())),
            ("title".to_string(), Value::Text("Vol 2".to_string())),
        ]))
    );

    let mut engine = FacetEngine::from_checklist(&parsed, "en").unwrap();
    assert_eq!(
        engine
            .currently_possible(FacetGroup::Data, "reference.source")
            .unwrap()
            .get("Flora Europaea"),
        Some(&1)
    );
    engine.set_free_text("europaea");
    assert_eq!(engine.matched(), &[0]);
}

#[test]
fn test_structured_leaves_read_back() {
    let data = RawTable::from_strings(&[
        ["Column name", "Formatting"],
        ["photo", "image"],
        ["host", "taxon"],
    ]);
    let rows = RawTable::from_strings(&[
        ["Family", "Genus", "Species", "photo.source", "photo.title", "host.name", "host.authority"],
        ["Rosaceae", "Rosa", "Rosa gallica", "a.jpg", "Flower", "Apis mellifera", "L."],
    ]);
    let workbook = common::workbook_with(rows).with_table("Data definition", data);
    let checklist = common::compile(&workbook).into_result().unwrap();

    let parsed = CompiledChecklist::from_json_str(&checklist.to_json_pretty().unwrap()).unwrap();
    let data = &parsed.per_language["en"].entries[0].data;
    assert!(matches!(data["photo"], Value::Media(_)));
    assert!(matches!(data["host"], Value::Taxon(_)));
    assert_eq!(parsed, checklist);
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_every_entry_has_a_contiguous_rank_prefix() {
    let rows = [
        ["Rosaceae", "", ""],
        ["Rosaceae", "Rosa", ""],
        ["Rosaceae", "Rosa", "Rosa canina"],
        ["Apiaceae", "Daucus", "Daucus carota"],
    ];
    let mut cells = vec![["Family", "Genus", "Species"]];
    cells.extend(rows);
    let checklist = common::compile(&common::workbook_with(RawTable::from_strings(&cells)))
        .into_result()
        .unwrap();

    let entries = &checklist.per_language["en"].entries;
    assert_eq!(entries.len(), rows.len());
    for (entry, row) in entries.iter().zip(rows) {
        let expected: Vec<&str> = row.iter().copied().take_while(|cell| !cell.is_empty()).collect();
        assert!(!expected.is_empty());
        assert_eq!(entry.rank_names(), expected);
    }
}

#[test]
fn test_every_language_has_the_same_rows() {
    let languages = RawTable::from_strings(&[
        ["Code", "Name", "Fallback language"],
        ["en", "English", ""],
        ["cs", "Čeština", "en"],
    ]);
    let rows = RawTable::from_strings(&[
        ["Family", "Genus", "Species", "notes", "notes:cs"],
        ["Rosaceae", "Rosa", "Rosa canina", "Dog rose", "Růže šípková"],
        ["Apiaceae", "Daucus", "Daucus carota", "Wild carrot", ""],
    ]);
    let workbook = common::workbook_with(rows).with_table("Supported languages", languages);
    let checklist = common::compile(&workbook).into_result().unwrap();

    let en = &checklist.per_language["en"].entries;
    let cs = &checklist.per_language["cs"].entries;
    assert_eq!(en.len(), cs.len());
    assert_eq!(cs[0].data["notes"], Value::Text("Růže šípková".to_string()));
    assert_eq!(en[0].data["notes"], Value::Text("Dog rose".to_string()));
    assert!(cs[1].data.get("notes").is_none());
}

// ============================================================================
// Phase Gating
// ============================================================================

#[test]
fn test_validation_errors_withhold_extraction() {
    let data = RawTable::from_strings(&[["Column name", "Formatting"], ["notes", "sparkly"]]);
    let checklist = RawTable::from_strings(&[
        ["Family", "Genus", "Species"],
        ["Rosaceae", "", "Rosa gallica"],
    ]);
    let workbook = common::workbook_with(checklist).with_table("Data definition", data);
    let output = common::compile(&workbook);

    assert!(output.checklist.is_none());
    assert!(output.has_errors());
    // The rank gap is never seen because extraction did not run.
    assert!(output.diagnostics.iter().all(|d| !d.message.contains("gap")));
    assert!(matches!(
        output.into_result(),
        Err(CompileError::Errors { count: 1, .. })
    ));
}

#[test]
fn test_critical_diagnostic_stops_compilation() {
    let output = common::compile(&common::schema_workbook());
    assert!(output.checklist.is_none());
    assert_eq!(output.diagnostics.len(), 1);
    assert!(matches!(output.into_result(), Err(CompileError::Critical(_))));
}

#[test]
fn test_extraction_errors_keep_checklist_but_fail_result() {
    let checklist = RawTable::from_strings(&[
        ["Family", "Genus", "Species"],
        ["Rosaceae", "Rosa", "Rosa canina"],
        ["", "Rosa", "Rosa gallica"],
    ]);
    let output = common::compile(&common::workbook_with(checklist));

    assert!(output.checklist.is_some());
    assert!(output.has_errors());
    assert!(output.into_result().is_err());
}

#[test]
fn test_validate_skips_extraction() {
    let checklist = RawTable::from_strings(&[
        ["Family", "Genus", "Species"],
        ["Rosaceae", "", "Rosa gallica"],
    ]);
    let workbook = common::workbook_with(checklist);
    let mut sink: Vec<Diagnostic> = Vec::new();
    let diagnostics = compile::validate(&workbook, &common::options(), &mut sink);

    assert!(diagnostics.is_empty());
    assert!(sink.is_empty());
}

#[test]
fn test_formatting_without_reader_is_reported() {
    let mut registry = ReaderRegistry::new();
    registry.register(Box::new(TaxonReader));
    registry.register(Box::new(TextReader::new(Formatting::Text)));
    registry.register(Box::new(TextReader::new(Formatting::Markdown)));

    let mut sink: Vec<Diagnostic> = Vec::new();
    let output = compile::compile_with(&common::workbook(), &common::options(), &registry, &mut sink);

    assert!(output.checklist.is_none());
    let errors: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("'number'"));
    assert!(errors[0].message.contains("'size.wingspan#'"));
}
