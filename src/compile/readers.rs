//! Leaf readers: one per formatting.
//!
//! A reader turns the cells of one concrete header address into a typed
//! [`Value`]. Most readers take a single cell; taxon and media readers also
//! accept a `.name`/`.authority` or `.source`/`.title` column pair.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{Days, NaiveDate};
use regex::Regex;

use crate::diagnostics::{fill, templates, DiagnosticLog};
use crate::model::{MediaItem, RegionSet, TaxonName, Value};
use crate::schema::{ColumnDefinition, Formatting, Schema};
use crate::table::{Cell, HeaderIndex, RawTable};

/// Input formats accepted for dates typed as text.
const DATE_INPUTS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d. %m. %Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Cells of one checklist row, resolved through the localized header lookup.
pub struct RowCells<'a> {
    table: &'a RawTable,
    index: &'a HeaderIndex,
    row: usize,
    language: &'a str,
    default_language: &'a str,
}

impl<'a> RowCells<'a> {
    pub fn new(
        table: &'a RawTable,
        index: &'a HeaderIndex,
        row: usize,
        language: &'a str,
        default_language: &'a str,
    ) -> Self {
        Self {
            table,
            index,
            row,
            language,
            default_language,
        }
    }

    /// One-based row number as the user sees it, header included.
    pub fn row_number(&self) -> usize {
        self.row + 2
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// The non-empty cell under `column`.
    pub fn cell(&self, column: &str) -> Option<&'a Cell> {
        let cell = self.table.cell(self.row, self.position(column)?);
        (!cell.is_empty()).then_some(cell)
    }

    /// Trimmed, non-empty text under `column`.
    pub fn text(&self, column: &str) -> Option<String> {
        self.cell(column).map(Cell::text)
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.index
            .find_localized(column, self.language, self.default_language)
    }
}

/// Everything a reader needs to read one leaf.
pub struct LeafContext<'a> {
    pub cells: &'a RowCells<'a>,
    pub column: &'a ColumnDefinition,
    /// Concrete header address, e.g. `size.wingspan2`.
    pub header: &'a str,
    pub date_format: &'a str,
    pub region_pattern: Option<&'a Regex>,
}

impl LeafContext<'_> {
    /// Replace `value` through the column's data codes, if it has any.
    fn decode(&self, value: String, log: &mut DiagnosticLog) -> String {
        if self.column.data_codes.is_empty() {
            return value;
        }
        match self.column.data_codes.get(&value) {
            Some(replacement) => replacement.clone(),
            None => {
                log.warning(fill(templates::UNKNOWN_DATA_CODE, &[&value, self.header]));
                value
            }
        }
    }
}

/// Converts the cells of one leaf into a typed value.
pub trait LeafReader {
    fn formatting(&self) -> Formatting;

    /// Read the leaf at `ctx.header`. Returns `None` when it is empty.
    fn read(&self, ctx: &LeafContext<'_>, log: &mut DiagnosticLog) -> Option<Value> {
        let cell = ctx.cells.cell(ctx.header)?;
        self.coerce(cell, ctx, log)
    }

    /// Coerce a single cell. Also used for the items of a `|`-separated base column.
    fn coerce(&self, cell: &Cell, ctx: &LeafContext<'_>, log: &mut DiagnosticLog)
        -> Option<Value>;
}

// ============================================================================
// Readers
// ============================================================================

/// Text-like leaves: `text`, `custom`, `markdown`, `badge`.
pub struct TextReader {
    formatting: Formatting,
}

impl TextReader {
    pub fn new(formatting: Formatting) -> Self {
        Self { formatting }
    }
}

impl LeafReader for TextReader {
    fn formatting(&self) -> Formatting {
        self.formatting
    }

    fn coerce(&self, cell: &Cell, ctx: &LeafContext<'_>, log: &mut DiagnosticLog) -> Option<Value> {
        let raw = match cell {
            Cell::Text(s) => s.as_str().to_string(),
            other => other.text(),
        };
        let text = match self.formatting {
            Formatting::Markdown => sanitize_markdown(&raw),
            _ => sanitize_text(&raw),
        };
        if text.is_empty() {
            return None;
        }
        Some(Value::Text(ctx.decode(text, log)))
    }
}

pub struct NumberReader;

impl LeafReader for NumberReader {
    fn formatting(&self) -> Formatting {
        Formatting::Number
    }

    fn coerce(&self, cell: &Cell, ctx: &LeafContext<'_>, log: &mut DiagnosticLog) -> Option<Value> {
        let parsed = match cell {
            Cell::Number(n) => Some(*n),
            other => other.text().parse::<f64>().ok(),
        };
        match parsed {
            Some(n) if n.is_finite() => Some(Value::Number(n)),
            _ => {
                log.error(fill(templates::NOT_A_NUMBER, &[&cell.text(), ctx.header]));
                None
            }
        }
    }
}

pub struct DateReader;

impl LeafReader for DateReader {
    fn formatting(&self) -> Formatting {
        Formatting::Date
    }

    fn coerce(&self, cell: &Cell, ctx: &LeafContext<'_>, log: &mut DiagnosticLog) -> Option<Value> {
        let date = match cell {
            Cell::Date { date } => Some(*date),
            Cell::Number(serial) => serial_date(*serial),
            Cell::Text(text) => parse_date_text(text.trim()),
            Cell::Empty => return None,
        };
        match date {
            Some(date) => Some(Value::Text(format_date(date, ctx.date_format))),
            None => {
                let text = cell.text();
                log.warning(fill(templates::UNPARSEABLE_DATE, &[&text, ctx.header]));
                Some(Value::Text(text))
            }
        }
    }
}

pub struct TaxonReader;

impl LeafReader for TaxonReader {
    fn formatting(&self) -> Formatting {
        Formatting::Taxon
    }

    fn read(&self, ctx: &LeafContext<'_>, log: &mut DiagnosticLog) -> Option<Value> {
        if let Some(cell) = ctx.cells.cell(ctx.header) {
            return self.coerce(cell, ctx, log);
        }
        let name = ctx.cells.text(&format!("{}.name", ctx.header))?;
        let authority = ctx
            .cells
            .text(&format!("{}.authority", ctx.header))
            .unwrap_or_default();
        Some(Value::Taxon(TaxonName {
            name: sanitize_text(&name),
            authority: sanitize_text(&authority),
        }))
    }

    fn coerce(&self, cell: &Cell, _: &LeafContext<'_>, _: &mut DiagnosticLog) -> Option<Value> {
        let name = sanitize_text(&cell.text());
        (!name.is_empty()).then(|| {
            Value::Taxon(TaxonName {
                name,
                authority: String::new(),
            })
        })
    }
}

/// `image` and `sound` leaves.
pub struct MediaReader {
    formatting: Formatting,
}

impl MediaReader {
    pub fn new(formatting: Formatting) -> Self {
        Self { formatting }
    }
}

impl LeafReader for MediaReader {
    fn formatting(&self) -> Formatting {
        self.formatting
    }

    fn read(&self, ctx: &LeafContext<'_>, log: &mut DiagnosticLog) -> Option<Value> {
        if let Some(cell) = ctx.cells.cell(ctx.header) {
            return self.coerce(cell, ctx, log);
        }
        let source = ctx.cells.text(&format!("{}.source", ctx.header))?;
        let title = ctx
            .cells
            .text(&format!("{}.title", ctx.header))
            .unwrap_or_default();
        Some(Value::Media(MediaItem {
            source,
            title: sanitize_text(&title),
        }))
    }

    fn coerce(&self, cell: &Cell, _: &LeafContext<'_>, _: &mut DiagnosticLog) -> Option<Value> {
        let source = cell.text();
        (!source.is_empty()).then(|| {
            Value::Media(MediaItem {
                source,
                title: String::new(),
            })
        })
    }
}

/// `code[:status]` tokens separated by commas, semicolons or spaces.
pub struct MapRegionsReader;

impl LeafReader for MapRegionsReader {
    fn formatting(&self) -> Formatting {
        Formatting::MapRegions
    }

    fn coerce(&self, cell: &Cell, ctx: &LeafContext<'_>, log: &mut DiagnosticLog) -> Option<Value> {
        let text = cell.text();
        let mut set = RegionSet::default();
        for token in text
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let (code, status) = match token.split_once(':') {
                Some((code, status)) => (code.trim(), status.trim()),
                None => (token, ""),
            };
            if code.is_empty() {
                continue;
            }
            if let Some(pattern) = ctx.region_pattern {
                if !pattern.is_match(code) {
                    log.warning(fill(templates::UNKNOWN_REGION, &[code, ctx.header]));
                }
            }
            let status = if status.is_empty() {
                String::new()
            } else {
                ctx.decode(status.to_string(), log)
            };
            set.regions.insert(code.to_string(), status);
        }
        (!set.regions.is_empty()).then_some(Value::Regions(set))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Maps each formatting to the reader that handles it.
#[derive(Default)]
pub struct ReaderRegistry {
    readers: HashMap<Formatting, Box<dyn LeafReader>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a reader for every built-in formatting.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for formatting in [
            Formatting::Text,
            Formatting::Custom,
            Formatting::Markdown,
            Formatting::Badge,
        ] {
            registry.register(Box::new(TextReader::new(formatting)));
        }
        registry.register(Box::new(NumberReader));
        registry.register(Box::new(DateReader));
        registry.register(Box::new(TaxonReader));
        registry.register(Box::new(MediaReader::new(Formatting::Image)));
        registry.register(Box::new(MediaReader::new(Formatting::Sound)));
        registry.register(Box::new(MapRegionsReader));
        registry
    }

    /// Register a reader, replacing any previous one for the same formatting.
    pub fn register(&mut self, reader: Box<dyn LeafReader>) {
        self.readers.insert(reader.formatting(), reader);
    }

    pub fn get(&self, formatting: Formatting) -> Option<&dyn LeafReader> {
        self.readers.get(&formatting).map(|reader| reader.as_ref())
    }

    /// Report every declared formatting that has no reader.
    pub fn check_coverage(&self, schema: &Schema, log: &mut DiagnosticLog) {
        for language in schema.per_language.values() {
            for column in language.ranks.iter().chain(&language.data) {
                if self.get(column.formatting).is_none() {
                    log.error(fill(
                        templates::UNREGISTERED_FORMATTING,
                        &[column.formatting.as_str(), &column.address],
                    ));
                }
            }
        }
    }
}

// ============================================================================
// Coercion helpers
// ============================================================================

/// Trim, drop control characters and escape line breaks as `\n`.
pub fn sanitize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    for ch in unified.trim().chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Markdown keeps its line breaks.
fn sanitize_markdown(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .chars()
        .filter(|c| *c == '\n' || *c == '\t' || !c.is_control())
        .collect()
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    DATE_INPUTS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(text, pattern).ok())
}

/// Spreadsheet serial day numbers count from 1899-12-30.
fn serial_date(serial: f64) -> Option<NaiveDate> {
    if serial < 1.0 || serial.fract() != 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial as u64))
}

/// Format with `pattern`, falling back to ISO when the pattern cannot render.
pub fn format_date(date: NaiveDate, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_err() {
        return date.format("%Y-%m-%d").to_string();
    }
    out
}
