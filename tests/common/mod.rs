//! Shared workbook fixtures for the integration tests.
//!
//! The base project has three ranks (Family, Genus, Species) and four data
//! columns: a repeated `habitat#` facet, a `size` object holding a repeated
//! numeric `wingspan#` facet, and free `notes`.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use herbarium::compile::{CompileOptions, CompileOutput};
use herbarium::diagnostics::{Diagnostic, Severity};
use herbarium::table::{RawTable, Workbook};

pub const CHECKLIST: &str = "checklist";

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn options() -> CompileOptions {
    CompileOptions::default().with_now(fixed_now())
}

pub fn languages() -> RawTable {
    RawTable::from_strings(&[
        ["Code", "Name", "Fallback language"],
        ["en", "English", ""],
    ])
}

pub fn taxa_definition() -> RawTable {
    RawTable::from_strings(&[
        ["Column name", "Taxon name", "Order by", "Italicize"],
        ["Family", "Family", "", ""],
        ["Genus", "Genus", "alphabet", "yes"],
        ["Species", "Species", "", "yes"],
    ])
}

pub fn data_definition() -> RawTable {
    RawTable::from_strings(&[
        [
            "Column name",
            "Title",
            "Search category title",
            "Search category order",
            "Subitems separator",
            "Formatting",
            "Template",
            "Placement",
            "Hidden",
        ],
        ["habitat#", "Habitat", "Habitat", "", "comma", "text", "", "", ""],
        ["size", "Size", "", "", "", "", "", "details", ""],
        ["size.wingspan#", "Wingspan", "Wingspan", "", "", "number", "", "", ""],
        ["notes", "Notes", "", "", "", "markdown", "", "bottom", ""],
    ])
}

pub fn species_rows() -> RawTable {
    RawTable::from_strings(&[
        [
            "Family",
            "Genus",
            "Species",
            "habitat1",
            "habitat2",
            "size.wingspan1",
            "size.wingspan2",
            "notes",
        ],
        ["Rosaceae", "Rosa", "Rosa gallica", "forest", "meadow", "30", "32", "Gallic rose"],
        ["Rosaceae", "Rosa", "Rosa canina", "forest", "", "12", "", "Dog rose of hedges"],
        ["Apiaceae", "Daucus", "Daucus carota", "meadow", "", "8", "", "Wild carrot"],
        ["Rosaceae", "Prunus", "Prunus spinosa", "hedge", "forest", "", "", "Blackthorn"],
    ])
}

/// The schema tables without a checklist table.
pub fn schema_workbook() -> Workbook {
    Workbook::new()
        .with_table("Supported languages", languages())
        .with_table("Taxa definition", taxa_definition())
        .with_table("Data definition", data_definition())
}

/// The base project with the given checklist rows.
pub fn workbook_with(checklist: RawTable) -> Workbook {
    schema_workbook().with_table(CHECKLIST, checklist)
}

/// The base project with the species rows.
pub fn workbook() -> Workbook {
    workbook_with(species_rows())
}

pub fn compile(workbook: &Workbook) -> CompileOutput {
    let mut sink: Vec<Diagnostic> = Vec::new();
    herbarium::compile(workbook, &options(), &mut sink)
}

pub fn errors(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
    diagnostics
        .iter()
        .filter(|d| d.severity >= Severity::Error)
        .collect()
}

pub fn warnings(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .collect()
}
