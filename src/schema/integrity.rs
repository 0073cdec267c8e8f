//! Per-cell integrity pass over the schema tables.
//!
//! Every declared column of every present table is checked row by row, once
//! per supported language for multilingual columns:
//!
//! 1. emptiness (after substituting the declared default)
//! 2. content class
//! 3. duplicate policy, scanned against the whole column
//!
//! A missing required table is critical and stops the pass; everything else
//! is an error and the pass continues so the whole set is reported at once.

use std::collections::HashMap;

use tracing::debug;

use crate::diagnostics::{fill, templates, DiagnosticLog};
use crate::table::Workbook;

use super::definition::Languages;
use super::rules::DuplicatePolicy;
use super::tables::{ColumnSpec, TableReader, TableSpec, SCHEMA_TABLES, SUPPORTED_LANGUAGES};

/// Run the per-cell pass. Returns the supported languages unless a critical
/// diagnostic was recorded.
pub fn check_tables(
    workbook: &Workbook,
    checklist_table: &str,
    log: &mut DiagnosticLog,
) -> Option<Languages> {
    for spec in SCHEMA_TABLES {
        if spec.required && workbook.table(spec.name).is_none() {
            log.critical(fill(templates::MISSING_TABLE, &[spec.name]));
            return None;
        }
    }
    if workbook.table(checklist_table).is_none() {
        log.critical(fill(templates::MISSING_TABLE, &[checklist_table]));
        return None;
    }

    let languages = Languages::read(workbook).unwrap_or_default();
    if languages.is_empty() {
        log.critical(fill(templates::NO_LANGUAGES, &[SUPPORTED_LANGUAGES.name]));
        return None;
    }

    for spec in SCHEMA_TABLES {
        if let Some(table) = workbook.table(spec.name) {
            let reader = TableReader::new(spec, table, languages.default_code());
            check_table(&reader, &languages, log);
        }
    }

    debug!(
        languages = languages.list.len(),
        diagnostics = log.len(),
        "schema tables checked"
    );
    Some(languages)
}

fn check_table(reader: &TableReader<'_>, languages: &Languages, log: &mut DiagnosticLog) {
    let spec = reader.spec();
    for column in spec.columns {
        if !reader.has_column(column.name) {
            // Columns with a default or optional content may be left out.
            if !column.rule.allow_empty && column.rule.default.is_none() {
                log.error(fill(templates::MISSING_COLUMN, &[column.name, spec.name]));
            }
            continue;
        }
        if column.rule.multilingual {
            for language in languages.codes() {
                check_column(reader, spec, column, language, log);
            }
        } else {
            check_column(reader, spec, column, languages.default_code(), log);
        }
    }
}

fn check_column(
    reader: &TableReader<'_>,
    spec: &TableSpec,
    column: &ColumnSpec,
    language: &str,
    log: &mut DiagnosticLog,
) {
    let rule = &column.rule;
    // Lower-cased value -> (first spelling, occurrences)
    let mut seen: HashMap<String, (String, usize)> = HashMap::new();

    for row in reader.rows() {
        let value = reader.value(row, column.name, language);
        let row_number = (row + 2).to_string();

        if value.is_empty() {
            if !rule.allow_empty {
                log.error(fill(
                    templates::EMPTY_VALUE,
                    &[column.name, spec.name, &row_number],
                ));
            }
        } else if !rule.content.accepts(&value) {
            log.error(fill(
                templates::INVALID_VALUE,
                &[
                    &value,
                    column.name,
                    spec.name,
                    &rule.content.describe(),
                    &row_number,
                ],
            ));
        }

        let counts = match rule.duplicates {
            DuplicatePolicy::Allowed => false,
            DuplicatePolicy::Disallowed => true,
            DuplicatePolicy::DisallowedExceptEmpty => !value.is_empty(),
        };
        if counts {
            seen.entry(value.to_lowercase())
                .or_insert_with(|| (value.clone(), 0))
                .1 += 1;
        }
    }

    let mut duplicates: Vec<&String> = seen
        .values()
        .filter(|(_, count)| *count > 1)
        .map(|(spelling, _)| spelling)
        .collect();
    duplicates.sort();
    for value in duplicates {
        log.error(fill(
            templates::DUPLICATE_VALUE,
            &[value, column.name, spec.name],
        ));
    }
}
