//! Schema & integrity engine.
//!
//! The project schema lives in a handful of spreadsheet tables
//! ([`tables::SCHEMA_TABLES`]). Each declared column carries an
//! [`IntegrityRule`] that is evaluated against every row:
//!
//! ```text
//! raw tables ──▶ per-cell pass ──▶ manual checks ──▶ Schema
//!                (integrity.rs)    (checks.rs)       (definition.rs)
//! ```
//!
//! The first two steps form the validation phase; building the typed
//! [`Schema`] is the post-processing phase and only runs when validation
//! recorded no error.

pub mod checks;
pub mod definition;
pub mod integrity;
pub mod rules;
pub mod tables;

pub use definition::{
    Attribute, BadgeRule, Clearings, ColumnDefinition, ColumnRole, Customization, Formatting,
    Hidden, Language, LanguageSchema, Languages, MapDefinition, Placement, RankOptions,
    RankOrder, Schema, Separator, UnknownVariant,
};
pub use rules::{ContentClass, DuplicatePolicy, IntegrityRule};

use crate::diagnostics::DiagnosticLog;
use crate::table::Workbook;

/// Outcome of the validation phase.
#[derive(Debug, Clone)]
pub struct Validated {
    pub languages: Languages,
    pub clearings: Clearings,
}

/// Run the per-cell pass followed by the manual checks.
///
/// Returns `None` when a critical diagnostic stopped the pass. The manual
/// checks still run after per-cell errors so that both sets are reported
/// together.
pub fn validate(
    workbook: &Workbook,
    checklist_table: &str,
    ui_languages: &[String],
    log: &mut DiagnosticLog,
) -> Option<Validated> {
    let languages = integrity::check_tables(workbook, checklist_table, log)?;
    let clearings = checks::run(workbook, &languages, ui_languages, log);
    Some(Validated {
        languages,
        clearings,
    })
}

/// Build the typed schema from validated tables.
pub fn build(workbook: &Workbook, validated: &Validated, log: &mut DiagnosticLog) -> Schema {
    definition::build(workbook, &validated.languages, &validated.clearings, log)
}
