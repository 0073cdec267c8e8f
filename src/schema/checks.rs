//! Cross-cutting checks that run after the per-cell pass.
//!
//! - every supported language resolves to an interface language
//! - presentation attributes sit on addresses of the right shape
//! - every address implied by a declared address is declared too
//! - customization values have the expected shape

use std::collections::HashSet;

use chrono::format::{Item, StrftimeItems};

use crate::diagnostics::{fill, templates, DiagnosticLog};
use crate::path::{self, AddressClass};
use crate::table::Workbook;

use super::definition::{Attribute, Clearings, Formatting, Hidden, Languages};
use super::rules::ContentClass;
use super::tables::{
    columns::*, TableReader, TableSpec, BADGES, CUSTOMIZATION, DATA_CODES, DATA_DEFINITION, MAPS,
};

/// Run the manual checks. Returns the attributes to clear on hidden columns.
pub fn run(
    workbook: &Workbook,
    languages: &Languages,
    ui_languages: &[String],
    log: &mut DiagnosticLog,
) -> Clearings {
    check_languages(languages, ui_languages, log);
    check_customization(workbook, languages, log);

    let Some(table) = workbook.table(DATA_DEFINITION.name) else {
        return Clearings::new();
    };
    let reader = TableReader::new(&DATA_DEFINITION, table, languages.default_code());
    let known: Vec<String> = reader
        .rows()
        .map(|row| path::normalize(&reader.value(row, COLUMN_NAME, languages.default_code())))
        .filter(|a| !a.is_empty())
        .collect();

    let clearings = check_presentation(&reader, languages, &known, log);
    check_gaps(&known, log);
    for spec in [&BADGES, &DATA_CODES, &MAPS] {
        check_references(workbook, spec, languages, &known, log);
    }
    clearings
}

fn check_languages(languages: &Languages, ui_languages: &[String], log: &mut DiagnosticLog) {
    let available = |code: &str| ui_languages.iter().any(|ui| ui.eq_ignore_ascii_case(code));
    for language in &languages.list {
        let resolved = available(&language.code)
            || language.fallback.as_deref().is_some_and(available);
        if !resolved {
            log.warning(fill(templates::UNRESOLVED_LANGUAGE, &[&language.code]));
        }
    }
}

fn check_customization(workbook: &Workbook, languages: &Languages, log: &mut DiagnosticLog) {
    let Some(table) = workbook.table(CUSTOMIZATION.name) else {
        return;
    };
    let reader = TableReader::new(&CUSTOMIZATION, table, languages.default_code());
    for row in reader.rows() {
        let item = reader.value(row, ITEM, languages.default_code());
        for language in languages.codes() {
            let value = reader.value(row, VALUE, language);
            if value.is_empty() {
                continue;
            }
            let valid = match item.to_lowercase().as_str() {
                "color theme" => ContentClass::CssColor.accepts(&value),
                "bibliography" => ContentClass::Filename(&["bib"]).accepts(&value),
                "date format" => is_date_format(&value),
                _ => true,
            };
            if !valid {
                log.error(fill(templates::INVALID_CUSTOMIZATION, &[&item, &value]));
            }
        }
    }
}

/// Whether `pattern` is a usable strftime pattern.
pub fn is_date_format(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

struct Rule {
    attribute: Attribute,
    allowed: fn(&str, &AddressClass) -> bool,
    reason: &'static str,
}

fn root_only(_: &str, class: &AddressClass) -> bool {
    class.is_root
}

fn leaf_only(_: &str, class: &AddressClass) -> bool {
    class.is_leaf
}

fn has_sub_items(address: &str, class: &AddressClass) -> bool {
    class.has_children || path::is_repeated(address)
}

const PRESENTATION_RULES: &[Rule] = &[
    Rule {
        attribute: Attribute::Placement,
        allowed: root_only,
        reason: "placement is only allowed on top-level columns",
    },
    Rule {
        attribute: Attribute::Template,
        allowed: leaf_only,
        reason: "templates are only allowed on columns without sub-columns",
    },
    Rule {
        attribute: Attribute::Formatting,
        allowed: leaf_only,
        reason: "badges are only allowed on columns without sub-columns",
    },
    Rule {
        attribute: Attribute::Separator,
        allowed: has_sub_items,
        reason: "a separator needs sub-items to separate",
    },
];

fn check_presentation(
    reader: &TableReader<'_>,
    languages: &Languages,
    known: &[String],
    log: &mut DiagnosticLog,
) -> Clearings {
    let default = languages.default_code();
    let mut clearings = Clearings::new();

    for row in reader.rows() {
        let address = path::normalize(&reader.value(row, COLUMN_NAME, default));
        if address.is_empty() {
            continue;
        }
        let class = path::classify(known, &address);
        let hidden = reader.value(row, HIDDEN, default).parse::<Hidden>() == Ok(Hidden::Yes);

        for rule in PRESENTATION_RULES {
            let present = match rule.attribute {
                Attribute::Template => languages
                    .codes()
                    .any(|lang| !reader.raw(row, TEMPLATE, lang).is_empty()),
                Attribute::Formatting => {
                    reader.value(row, FORMATTING, default).parse::<Formatting>()
                        == Ok(Formatting::Badge)
                }
                other => !reader.raw(row, other.column(), default).is_empty(),
            };
            if !present || (rule.allowed)(&address, &class) {
                continue;
            }
            if hidden {
                log.warning(fill(
                    templates::CLEARED_ATTRIBUTE,
                    &[rule.attribute.column(), &address, rule.reason],
                ));
                clearings.insert((address.clone(), rule.attribute));
            } else {
                log.error(fill(
                    templates::ILLEGAL_ATTRIBUTE,
                    &[rule.attribute.column(), &address, rule.reason],
                ));
            }
        }
    }
    clearings
}

fn check_gaps(known: &[String], log: &mut DiagnosticLog) {
    let declared: HashSet<&str> = known.iter().map(String::as_str).collect();
    for address in known {
        for parent in path::intermediate_addresses(address) {
            if !declared.contains(parent.as_str()) {
                log.error(fill(
                    templates::MISSING_PARENT,
                    &[address, &parent, DATA_DEFINITION.name],
                ));
            }
        }
    }
}

fn check_references(
    workbook: &Workbook,
    spec: &'static TableSpec,
    languages: &Languages,
    known: &[String],
    log: &mut DiagnosticLog,
) {
    let Some(table) = workbook.table(spec.name) else {
        return;
    };
    let reader = TableReader::new(spec, table, languages.default_code());
    for row in reader.rows() {
        let address = path::normalize(&reader.value(row, COLUMN_NAME, languages.default_code()));
        if !address.is_empty() && !known.contains(&address) {
            log.error(fill(templates::UNKNOWN_REFERENCE, &[&address, spec.name]));
        }
    }
}
