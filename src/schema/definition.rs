//! Typed column definitions built from validated schema tables.
//!
//! This is the second compilation phase. It only runs once the integrity
//! pass recorded no errors, so list values parse and required cells are
//! present; anything that still fails to parse is reported and skipped.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{fill, templates, DiagnosticLog};
use crate::path;
use crate::table::Workbook;

use super::tables::{
    columns::*, TableReader, BADGES, CUSTOMIZATION, DATA_CODES, DATA_DEFINITION, MAPS,
    SUPPORTED_LANGUAGES, TAXA_DEFINITION,
};

// ============================================================================
// Enumerated attributes
// ============================================================================

/// Error returned when an enumerated schema value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(if s.eq_ignore_ascii_case($text) {
                    return Ok($name::$variant);
                })+
                Err(UnknownVariant { kind: $kind, value: s.to_string() })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

keyword_enum!(
    /// How a leaf value is read from its cells and presented.
    Formatting, "formatting" {
        Text => "text",
        Custom => "custom",
        Markdown => "markdown",
        Number => "number",
        Date => "date",
        Taxon => "taxon",
        Image => "image",
        Sound => "sound",
        Badge => "badge",
        MapRegions => "map regions",
    }
);

impl Formatting {
    /// Whether values of this formatting feed the free-text search blob.
    pub fn is_searchable_text(&self) -> bool {
        matches!(self, Formatting::Text | Formatting::Custom)
    }

    /// Whether the leaf is a media reference with `.source`/`.title` cells.
    pub fn is_media(&self) -> bool {
        matches!(self, Formatting::Image | Formatting::Sound)
    }
}

keyword_enum!(
    /// Display zone of a top-level data column.
    Placement, "placement" {
        Top => "top",
        Left => "left",
        Middle => "middle",
        Right => "right",
        Bottom => "bottom",
        Details => "details",
    }
);

keyword_enum!(
    /// How sub-items of a compound column are joined for display.
    Separator, "separator" {
        BulletList => "bullet list",
        NumberedList => "numbered list",
        UnmarkedList => "unmarked list",
        Space => "space",
        Comma => "comma",
    }
);

keyword_enum!(
    /// Visibility of a data column. `data` hides it from display but keeps
    /// it searchable.
    Hidden, "hidden flag" {
        No => "no",
        Yes => "yes",
        Data => "data",
    }
);

keyword_enum!(
    /// Ordering of values within a rank.
    RankOrder, "rank order" {
        AsEntered => "as entered",
        Alphabet => "alphabet",
    }
);

// ============================================================================
// Definitions
// ============================================================================

/// A supported content language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

/// Supported languages, the first one being the project default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Languages {
    pub list: Vec<Language>,
}

impl Languages {
    /// Code of the default language.
    pub fn default_code(&self) -> &str {
        self.list.first().map(|l| l.code.as_str()).unwrap_or_default()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.list.iter().map(|l| l.code.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Read the languages table. Blank codes are skipped.
    pub fn read(workbook: &Workbook) -> Option<Self> {
        let table = workbook.table(SUPPORTED_LANGUAGES.name)?;
        let reader = TableReader::new(&SUPPORTED_LANGUAGES, table, "");
        let list = reader
            .rows()
            .filter_map(|row| {
                let code = reader.value(row, CODE, "").to_lowercase();
                if code.is_empty() {
                    return None;
                }
                let fallback = reader.value(row, FALLBACK, "").to_lowercase();
                Some(Language {
                    code,
                    name: reader.value(row, NAME, ""),
                    fallback: (!fallback.is_empty()).then_some(fallback),
                })
            })
            .collect();
        Some(Self { list })
    }
}

/// Whether a column names a taxon rank or a data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Taxon,
    Data,
}

/// Styling applied to badge values containing a given text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRule {
    pub contains: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Map attached to a `map regions` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDefinition {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_pattern: Option<String>,
}

/// Rank-only options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankOptions {
    pub order_by: RankOrder,
    pub italicize: bool,
}

/// One declared column, as seen in one language.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Normalized address.
    pub address: String,
    pub role: ColumnRole,
    pub formatting: Formatting,
    pub title: String,
    pub placement: Option<Placement>,
    pub separator: Option<Separator>,
    pub template: Option<String>,
    pub hidden: Hidden,
    /// Facet category title; the column is a facet when set.
    pub facet_category: Option<String>,
    pub facet_order: Vec<String>,
    pub badges: Vec<BadgeRule>,
    /// Code → replacement in this language.
    pub data_codes: BTreeMap<String, String>,
    pub map: Option<MapDefinition>,
    pub rank: Option<RankOptions>,
}

impl ColumnDefinition {
    pub fn is_repeated(&self) -> bool {
        path::is_repeated(&self.address)
    }
}

/// Project-wide settings from the customization table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Customization {
    pub checklist_name: Option<String>,
    pub about: Option<String>,
    pub color_theme: Option<String>,
    pub date_format: Option<String>,
    pub bibliography: Option<String>,
}

/// Column definitions resolved for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageSchema {
    pub language: String,
    /// Rank columns, outermost first.
    pub ranks: Vec<ColumnDefinition>,
    /// Data columns in declaration order.
    pub data: Vec<ColumnDefinition>,
    pub customization: Customization,
}

impl LanguageSchema {
    pub fn data_column(&self, address: &str) -> Option<&ColumnDefinition> {
        let address = path::normalize(address);
        self.data.iter().find(|c| c.address == address)
    }

    /// Normalized addresses of every data column.
    pub fn data_addresses(&self) -> Vec<String> {
        self.data.iter().map(|c| c.address.clone()).collect()
    }
}

/// The compiled schema: languages plus per-language definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub languages: Languages,
    pub per_language: BTreeMap<String, LanguageSchema>,
}

impl Schema {
    pub fn default_language(&self) -> &str {
        self.languages.default_code()
    }

    pub fn language(&self, code: &str) -> Option<&LanguageSchema> {
        self.per_language.get(code)
    }
}

/// Presentation attributes that the manual checks may clear on hidden columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Placement,
    Template,
    Formatting,
    Separator,
}

impl Attribute {
    pub fn column(&self) -> &'static str {
        match self {
            Attribute::Placement => PLACEMENT,
            Attribute::Template => TEMPLATE,
            Attribute::Formatting => FORMATTING,
            Attribute::Separator => SEPARATOR,
        }
    }
}

/// Attributes cleared by the manual checks, keyed by normalized address.
pub type Clearings = HashSet<(String, Attribute)>;

// ============================================================================
// Building
// ============================================================================

/// Build per-language definitions from the schema tables.
pub fn build(
    workbook: &Workbook,
    languages: &Languages,
    clearings: &Clearings,
    log: &mut DiagnosticLog,
) -> Schema {
    let mut per_language = BTreeMap::new();
    for language in languages.codes() {
        let schema = SchemaBuilder {
            workbook,
            language,
            default_language: languages.default_code(),
            clearings,
        }
        .build(log);
        per_language.insert(language.to_string(), schema);
    }
    Schema {
        languages: languages.clone(),
        per_language,
    }
}

struct SchemaBuilder<'a> {
    workbook: &'a Workbook,
    language: &'a str,
    default_language: &'a str,
    clearings: &'a Clearings,
}

impl SchemaBuilder<'_> {
    fn build(&self, log: &mut DiagnosticLog) -> LanguageSchema {
        LanguageSchema {
            language: self.language.to_string(),
            ranks: self.ranks(log),
            data: self.data(log),
            customization: self.customization(),
        }
    }

    fn reader(&self, spec: &'static super::tables::TableSpec) -> Option<TableReader<'_>> {
        self.workbook
            .table(spec.name)
            .map(|table| TableReader::new(spec, table, self.default_language))
    }

    fn ranks(&self, log: &mut DiagnosticLog) -> Vec<ColumnDefinition> {
        let Some(reader) = self.reader(&TAXA_DEFINITION) else {
            return Vec::new();
        };
        let mut ranks = Vec::new();
        for row in reader.rows() {
            let column = reader.value(row, COLUMN_NAME, self.language);
            let order_by = parse_or_report::<RankOrder>(&reader.value(row, ORDER_BY, self.language), log)
                .unwrap_or(RankOrder::AsEntered);
            let italicize = reader.value(row, ITALICIZE, self.language).eq_ignore_ascii_case("yes");
            let title = reader.value(row, TAXON_NAME, self.language);
            ranks.push(ColumnDefinition {
                address: column.to_lowercase(),
                role: ColumnRole::Taxon,
                formatting: Formatting::Taxon,
                facet_category: Some(title.clone()),
                title,
                placement: None,
                separator: None,
                template: None,
                hidden: Hidden::No,
                facet_order: Vec::new(),
                badges: Vec::new(),
                data_codes: BTreeMap::new(),
                map: None,
                rank: Some(RankOptions { order_by, italicize }),
            });
        }
        ranks
    }

    fn data(&self, log: &mut DiagnosticLog) -> Vec<ColumnDefinition> {
        let Some(reader) = self.reader(&DATA_DEFINITION) else {
            return Vec::new();
        };
        let badges = self.badges();
        let codes = self.data_codes();
        let maps = self.maps();

        let mut columns = Vec::new();
        for row in reader.rows() {
            let address = path::normalize(&reader.value(row, COLUMN_NAME, self.language));
            let cleared = |attribute: Attribute| self.clearings.contains(&(address.clone(), attribute));
            let text = |column: &str| non_empty(reader.value(row, column, self.language));

            let formatting = if cleared(Attribute::Formatting) {
                Formatting::Text
            } else {
                parse_or_report(&reader.value(row, FORMATTING, self.language), log)
                    .unwrap_or(Formatting::Text)
            };
            let placement = match text(PLACEMENT) {
                Some(value) if !cleared(Attribute::Placement) => parse_or_report(&value, log),
                _ => None,
            };
            let separator = match text(SEPARATOR) {
                Some(value) if !cleared(Attribute::Separator) => parse_or_report(&value, log),
                _ => None,
            };
            let template = text(TEMPLATE).filter(|_| !cleared(Attribute::Template));
            let hidden = parse_or_report(&reader.value(row, HIDDEN, self.language), log)
                .unwrap_or(Hidden::No);
            let facet_order = text(SEARCH_ORDER)
                .map(|order| {
                    order
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            columns.push(ColumnDefinition {
                title: text(TITLE).unwrap_or_else(|| path::key(&address)),
                facet_category: text(SEARCH_CATEGORY),
                badges: badges.get(&address).cloned().unwrap_or_default(),
                data_codes: codes.get(&address).cloned().unwrap_or_default(),
                map: maps.get(&address).cloned(),
                address,
                role: ColumnRole::Data,
                formatting,
                placement,
                separator,
                template,
                hidden,
                facet_order,
                rank: None,
            });
        }
        columns
    }

    fn badges(&self) -> BTreeMap<String, Vec<BadgeRule>> {
        let mut out: BTreeMap<String, Vec<BadgeRule>> = BTreeMap::new();
        let Some(reader) = self.reader(&BADGES) else {
            return out;
        };
        for row in reader.rows() {
            let address = path::normalize(&reader.value(row, COLUMN_NAME, self.language));
            out.entry(address).or_default().push(BadgeRule {
                contains: reader.value(row, CONTAINS_TEXT, self.language),
                background: non_empty(reader.value(row, BACKGROUND, self.language)),
                border: non_empty(reader.value(row, BORDER, self.language)),
                text: non_empty(reader.value(row, TEXT_COLOR, self.language)),
            });
        }
        out
    }

    fn data_codes(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut out: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let Some(reader) = self.reader(&DATA_CODES) else {
            return out;
        };
        for row in reader.rows() {
            let address = path::normalize(&reader.value(row, COLUMN_NAME, self.language));
            out.entry(address).or_default().insert(
                reader.value(row, CODE, self.language),
                reader.value(row, REPLACEMENT, self.language),
            );
        }
        out
    }

    fn maps(&self) -> BTreeMap<String, MapDefinition> {
        let mut out = BTreeMap::new();
        let Some(reader) = self.reader(&MAPS) else {
            return out;
        };
        for row in reader.rows() {
            let address = path::normalize(&reader.value(row, COLUMN_NAME, self.language));
            out.insert(
                address,
                MapDefinition {
                    source: reader.value(row, MAP_SOURCE, self.language),
                    url: non_empty(reader.value(row, SOURCE_URL, self.language)),
                    region_pattern: non_empty(reader.value(row, REGION_PATTERN, self.language)),
                },
            );
        }
        out
    }

    fn customization(&self) -> Customization {
        let mut out = Customization::default();
        let Some(reader) = self.reader(&CUSTOMIZATION) else {
            return out;
        };
        for row in reader.rows() {
            let item = reader.value(row, ITEM, self.language);
            let value = non_empty(reader.value(row, VALUE, self.language));
            match item.to_lowercase().as_str() {
                "checklist name" => out.checklist_name = value,
                "about section" => out.about = value,
                "color theme" => out.color_theme = value,
                "date format" => out.date_format = value,
                "bibliography" => out.bibliography = value,
                _ => {}
            }
        }
        out
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_or_report<T>(value: &str, log: &mut DiagnosticLog) -> Option<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log.error(fill(templates::UNKNOWN_KEYWORD, &[err.kind, &err.value]));
            None
        }
    }
}
