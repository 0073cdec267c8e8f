//! Integration tests for the schema integrity pass and the manual checks.
//!
//! Each test starts from the shared base project and swaps in one schema
//! table with a specific defect.

#[path = "../common/mod.rs"]
mod common;

use herbarium::diagnostics::{DiagnosticLog, Severity};
use herbarium::schema::{self, Formatting, Hidden, Placement};
use herbarium::table::{RawTable, Workbook};

fn ui_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn run(workbook: &Workbook) -> (Option<schema::Validated>, DiagnosticLog) {
    let mut log = DiagnosticLog::new();
    let validated = schema::validate(workbook, common::CHECKLIST, &ui_languages(), &mut log);
    (validated, log)
}

fn badges(background: &'static str) -> RawTable {
    RawTable::from_strings(&[
        [
            "Column name",
            "Contains text",
            "Background color",
            "Border color",
            "Text color",
        ],
        ["habitat#", "forest", background, "", "white"],
    ])
}

// ============================================================================
// Baseline
// ============================================================================

#[test]
fn test_base_project_is_clean() {
    let (validated, log) = run(&common::workbook());
    assert!(validated.is_some());
    assert!(log.is_empty(), "unexpected diagnostics: {:?}", log.entries());
}

#[test]
fn test_schema_is_built_per_language() {
    let workbook = common::workbook();
    let (validated, mut log) = run(&workbook);
    let schema = schema::build(&workbook, &validated.unwrap(), &mut log);

    let en = schema.language("en").unwrap();
    assert_eq!(en.ranks.len(), 3);
    assert_eq!(en.ranks[0].address, "family");
    assert_eq!(en.data_addresses(), vec!["habitat#", "size", "size.wingspan#", "notes"]);

    let wingspan = en.data_column("size.wingspan2").unwrap();
    assert_eq!(wingspan.formatting, Formatting::Number);
    assert_eq!(wingspan.facet_category.as_deref(), Some("Wingspan"));
    assert_eq!(en.data_column("size").unwrap().placement, Some(Placement::Details));
}

// ============================================================================
// Required Tables
// ============================================================================

#[test]
fn test_missing_required_table_is_critical() {
    let workbook = Workbook::new()
        .with_table("Supported languages", common::languages())
        .with_table("Data definition", common::data_definition())
        .with_table(common::CHECKLIST, common::species_rows());
    let (validated, log) = run(&workbook);

    assert!(validated.is_none());
    assert_eq!(log.len(), 1);
    assert_eq!(log.entries()[0].severity, Severity::Critical);
    assert!(log.entries()[0].message.contains("Taxa definition"));
}

#[test]
fn test_missing_checklist_table_is_critical() {
    let (validated, log) = run(&common::schema_workbook());
    assert!(validated.is_none());
    assert!(log.has_critical());
}

#[test]
fn test_table_names_match_case_insensitively() {
    let workbook = Workbook::new()
        .with_table("SUPPORTED LANGUAGES", common::languages())
        .with_table("taxa definition", common::taxa_definition())
        .with_table("Data Definition", common::data_definition())
        .with_table("Checklist", common::species_rows());
    let (validated, log) = run(&workbook);
    assert!(validated.is_some());
    assert!(!log.has_errors());
}

// ============================================================================
// Content Classes
// ============================================================================

#[test]
fn test_invalid_css_color_is_one_error() {
    let workbook = common::workbook().with_table("Badges", badges("notacolor"));
    let (_, log) = run(&workbook);

    let errors: Vec<_> = log.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("notacolor"));
    assert!(errors[0].message.contains("CSS color"));
}

#[test]
fn test_valid_css_colors_pass() {
    for color in ["#fff", "rebeccapurple", "rgb(10, 20, 30)", "#12345678"] {
        let workbook = common::workbook().with_table("Badges", badges(color));
        let (_, log) = run(&workbook);
        assert!(!log.has_errors(), "{} rejected: {:?}", color, log.entries());
    }
}

#[test]
fn test_unknown_formatting_is_rejected() {
    let data = RawTable::from_strings(&[
        ["Column name", "Formatting"],
        ["notes", "sparkly"],
    ]);
    let workbook = common::workbook().with_table("Data definition", data);
    let (_, log) = run(&workbook);

    let errors: Vec<_> = log.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("'sparkly'"));
    assert!(errors[0].message.contains("row 2"));
}

#[test]
fn test_invalid_customization_value() {
    let customization = RawTable::from_strings(&[
        ["Item", "Value"],
        ["Checklist name", "Flora of the Hills"],
        ["Color theme", "notacolor"],
        ["Date format", "%d. %m. %Y"],
    ]);
    let workbook = common::workbook().with_table("Customization", customization);
    let (_, log) = run(&workbook);

    let errors: Vec<_> = log.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Color theme"));
}

// ============================================================================
// Duplicates
// ============================================================================

#[test]
fn test_duplicate_column_name_is_reported() {
    let data = RawTable::from_strings(&[
        ["Column name", "Title"],
        ["notes", "Notes"],
        ["Notes", "More notes"],
    ]);
    let workbook = common::workbook().with_table("Data definition", data);
    let (_, log) = run(&workbook);

    let errors: Vec<_> = log.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("more than once"));
}

#[test]
fn test_empty_search_categories_may_repeat() {
    let data = RawTable::from_strings(&[
        ["Column name", "Search category title"],
        ["notes", ""],
        ["remarks", ""],
        ["habitat#", "Habitat"],
        ["biotope#", "Habitat"],
    ]);
    let workbook = common::workbook().with_table("Data definition", data);
    let (_, log) = run(&workbook);

    let errors: Vec<_> = log.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("'Habitat'"));
}

// ============================================================================
// Manual Checks
// ============================================================================

#[test]
fn test_placement_on_nested_column_is_an_error() {
    let data = RawTable::from_strings(&[
        ["Column name", "Placement", "Hidden"],
        ["size", "", ""],
        ["size.wingspan#", "left", "no"],
    ]);
    let workbook = common::workbook().with_table("Data definition", data);
    let (_, log) = run(&workbook);

    let errors: Vec<_> = log.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("top-level"));
}

#[test]
fn test_hidden_column_has_illegal_attribute_cleared() {
    let data = RawTable::from_strings(&[
        ["Column name", "Placement", "Hidden"],
        ["size", "", ""],
        ["size.wingspan#", "left", "yes"],
    ]);
    let workbook = common::workbook().with_table("Data definition", data);
    let (validated, mut log) = run(&workbook);

    assert!(!log.has_errors());
    assert_eq!(log.warnings().count(), 1);

    let schema = schema::build(&workbook, &validated.unwrap(), &mut log);
    let wingspan = schema.language("en").unwrap().data_column("size.wingspan#").unwrap();
    assert_eq!(wingspan.placement, None);
    assert_eq!(wingspan.hidden, Hidden::Yes);
}

#[test]
fn test_undeclared_parent_is_a_gap() {
    let data = RawTable::from_strings(&[["Column name"], ["size.wingspan#"]]);
    let workbook = common::workbook().with_table("Data definition", data);
    let (_, log) = run(&workbook);

    let errors: Vec<_> = log.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("requires 'size'"));
}

#[test]
fn test_badge_for_undeclared_column() {
    let badges = RawTable::from_strings(&[
        ["Column name", "Contains text"],
        ["colour", "red"],
    ]);
    let workbook = common::workbook().with_table("Badges", badges);
    let (_, log) = run(&workbook);

    let errors: Vec<_> = log.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("'colour'"));
}

// ============================================================================
// Languages
// ============================================================================

#[test]
fn test_language_without_interface_needs_fallback() {
    let languages = RawTable::from_strings(&[
        ["Code", "Name", "Fallback language"],
        ["en", "English", ""],
        ["cs", "Čeština", ""],
    ]);
    let workbook = common::workbook().with_table("Supported languages", languages);
    let (validated, log) = run(&workbook);

    assert!(validated.is_some());
    assert!(!log.has_errors());
    let warnings: Vec<_> = log.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("'cs'"));
}

#[test]
fn test_localized_titles_resolve_per_language() {
    let languages = RawTable::from_strings(&[
        ["Code", "Name", "Fallback language"],
        ["en", "English", ""],
        ["cs", "Čeština", "en"],
    ]);
    let data = RawTable::from_strings(&[
        ["Column name", "Title", "Title:cs"],
        ["notes", "Notes", "Poznámky"],
    ]);
    let workbook = common::workbook()
        .with_table("Supported languages", languages)
        .with_table("Data definition", data);
    let (validated, mut log) = run(&workbook);
    assert!(log.is_empty(), "unexpected diagnostics: {:?}", log.entries());

    let schema = schema::build(&workbook, &validated.unwrap(), &mut log);
    let cs = schema.language("cs").unwrap();
    assert_eq!(cs.data_column("notes").unwrap().title, "Poznámky");
    assert_eq!(
        schema.language("en").unwrap().data_column("notes").unwrap().title,
        "Notes"
    );
}
