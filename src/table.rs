//! Raw tabular input handed over by the spreadsheet reader.
//!
//! A [`Workbook`] maps table names to [`RawTable`]s: rectangular arrays of
//! cells with the header row first. The binary container format is never
//! parsed here.
//!
//! Header names are matched case-insensitively and may carry a language
//! suffix (`Title:fr`). [`HeaderIndex::find_localized`] implements the
//! fallback used for every localized read:
//!
//! ```text
//! <name>:<lang>  →  <name>  →  <name>:<default lang>
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Separator between a header name and its language code.
pub const LANGUAGE_SUFFIX: char = ':';

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Date { date: NaiveDate },
}

impl Cell {
    /// Cell content as trimmed text. Integral numbers print without a fraction.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Date { date } => date.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Date { .. } => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Print a number the way a spreadsheet user typed it.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A rectangular table of cells, header row first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTable {
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a table from string literals. Empty strings become empty cells.
    pub fn from_strings<R: AsRef<[&'static str]>>(rows: &[R]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.as_ref().iter().map(|s| Cell::from(*s)).collect())
                .collect(),
        }
    }

    /// Header names, trimmed.
    pub fn headers(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.iter().map(Cell::text).collect())
            .unwrap_or_default()
    }

    /// Rows below the header.
    pub fn data_rows(&self) -> &[Vec<Cell>] {
        if self.rows.is_empty() {
            &[]
        } else {
            &self.rows[1..]
        }
    }

    /// Cell at (data row, column); out-of-range reads are empty.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.data_rows()
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    pub fn row_count(&self) -> usize {
        self.data_rows().len()
    }

    pub fn header_index(&self) -> HeaderIndex {
        HeaderIndex::new(&self.headers())
    }
}

/// Case-insensitive lookup from header name to column position.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            let key = header.trim().to_lowercase();
            if !key.is_empty() {
                // First occurrence wins.
                positions.entry(key).or_insert(idx);
            }
        }
        Self { positions }
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.positions.get(&name.trim().to_lowercase()).copied()
    }

    /// Resolve `name` for `lang`, falling back to the bare name and then to
    /// the default language.
    pub fn find_localized(&self, name: &str, lang: &str, default_lang: &str) -> Option<usize> {
        self.find(&localized_name(name, lang))
            .or_else(|| self.find(name))
            .or_else(|| self.find(&localized_name(name, default_lang)))
    }

    /// Whether the bare name or any language variant of it exists.
    pub fn has_any_variant(&self, name: &str) -> bool {
        let base = name.trim().to_lowercase();
        let suffixed = format!("{}{}", base, LANGUAGE_SUFFIX);
        self.positions
            .keys()
            .any(|key| *key == base || key.starts_with(&suffixed))
    }

    /// Header names (lower-case, language suffix removed).
    pub fn base_names(&self) -> impl Iterator<Item = &str> {
        self.positions
            .keys()
            .map(|key| key.split(LANGUAGE_SUFFIX).next().unwrap_or(key))
    }
}

/// `name:lang`
pub fn localized_name(name: &str, lang: &str) -> String {
    format!("{}{}{}", name, LANGUAGE_SUFFIX, lang)
}

/// All raw tables of one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workbook {
    tables: BTreeMap<String, RawTable>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn insert(&mut self, name: impl Into<String>, table: RawTable) {
        self.tables.insert(name.into(), table);
    }

    pub fn with_table(mut self, name: impl Into<String>, table: RawTable) -> Self {
        self.insert(name, table);
        self
    }

    /// Look a table up by name, ignoring case.
    pub fn table(&self, name: &str) -> Option<&RawTable> {
        self.tables.get(name).or_else(|| {
            self.tables
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, table)| table)
        })
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}
