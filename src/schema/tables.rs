//! The declared schema tables and their per-column rules.

use crate::table::{HeaderIndex, RawTable};

use super::rules::{ContentClass, IntegrityRule};

/// A declared column of a schema table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub rule: IntegrityRule,
}

/// A declared schema table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    /// A missing required table is critical.
    pub required: bool,
    pub columns: &'static [ColumnSpec],
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

pub const FORMATTINGS: &[&str] = &[
    "text",
    "custom",
    "markdown",
    "number",
    "date",
    "taxon",
    "image",
    "sound",
    "badge",
    "map regions",
];

pub const PLACEMENTS: &[&str] = &["top", "left", "middle", "right", "bottom", "details"];

pub const SEPARATORS: &[&str] = &[
    "bullet list",
    "numbered list",
    "unmarked list",
    "space",
    "comma",
];

pub const CUSTOMIZATION_ITEMS: &[&str] = &[
    "Checklist name",
    "About section",
    "Color theme",
    "Date format",
    "Bibliography",
];

pub mod columns {
    pub const CODE: &str = "Code";
    pub const NAME: &str = "Name";
    pub const FALLBACK: &str = "Fallback language";
    pub const ITEM: &str = "Item";
    pub const VALUE: &str = "Value";
    pub const COLUMN_NAME: &str = "Column name";
    pub const TAXON_NAME: &str = "Taxon name";
    pub const ORDER_BY: &str = "Order by";
    pub const ITALICIZE: &str = "Italicize";
    pub const TITLE: &str = "Title";
    pub const SEARCH_CATEGORY: &str = "Search category title";
    pub const SEARCH_ORDER: &str = "Search category order";
    pub const SEPARATOR: &str = "Subitems separator";
    pub const FORMATTING: &str = "Formatting";
    pub const TEMPLATE: &str = "Template";
    pub const PLACEMENT: &str = "Placement";
    pub const HIDDEN: &str = "Hidden";
    pub const CONTAINS_TEXT: &str = "Contains text";
    pub const BACKGROUND: &str = "Background color";
    pub const BORDER: &str = "Border color";
    pub const TEXT_COLOR: &str = "Text color";
    pub const REPLACEMENT: &str = "Replacement";
    pub const MAP_SOURCE: &str = "Map source";
    pub const SOURCE_URL: &str = "Source URL";
    pub const REGION_PATTERN: &str = "Region pattern";
}

use columns::*;

pub const SUPPORTED_LANGUAGES: TableSpec = TableSpec {
    name: "Supported languages",
    required: true,
    columns: &[
        ColumnSpec {
            name: CODE,
            rule: IntegrityRule::of(ContentClass::Text).required().unique(),
        },
        ColumnSpec {
            name: NAME,
            rule: IntegrityRule::of(ContentClass::Text).required(),
        },
        ColumnSpec {
            name: FALLBACK,
            rule: IntegrityRule::of(ContentClass::Text),
        },
    ],
};

pub const CUSTOMIZATION: TableSpec = TableSpec {
    name: "Customization",
    required: false,
    columns: &[
        ColumnSpec {
            name: ITEM,
            rule: IntegrityRule::of(ContentClass::List(CUSTOMIZATION_ITEMS))
                .required()
                .unique(),
        },
        ColumnSpec {
            name: VALUE,
            rule: IntegrityRule::of(ContentClass::Text).multilingual(),
        },
    ],
};

pub const TAXA_DEFINITION: TableSpec = TableSpec {
    name: "Taxa definition",
    required: true,
    columns: &[
        ColumnSpec {
            name: COLUMN_NAME,
            rule: IntegrityRule::of(ContentClass::ColumnName).required().unique(),
        },
        ColumnSpec {
            name: TAXON_NAME,
            rule: IntegrityRule::of(ContentClass::Text).required().multilingual(),
        },
        ColumnSpec {
            name: ORDER_BY,
            rule: IntegrityRule::of(ContentClass::List(&["as entered", "alphabet"]))
                .default_value("as entered"),
        },
        ColumnSpec {
            name: ITALICIZE,
            rule: IntegrityRule::of(ContentClass::List(&["yes", "no"])).default_value("no"),
        },
    ],
};

pub const DATA_DEFINITION: TableSpec = TableSpec {
    name: "Data definition",
    required: true,
    columns: &[
        ColumnSpec {
            name: COLUMN_NAME,
            rule: IntegrityRule::of(ContentClass::Address).required().unique(),
        },
        ColumnSpec {
            name: TITLE,
            rule: IntegrityRule::of(ContentClass::Text).multilingual(),
        },
        ColumnSpec {
            name: SEARCH_CATEGORY,
            rule: IntegrityRule::of(ContentClass::Text)
                .unique_except_empty()
                .multilingual(),
        },
        ColumnSpec {
            name: SEARCH_ORDER,
            rule: IntegrityRule::of(ContentClass::Text).multilingual(),
        },
        ColumnSpec {
            name: SEPARATOR,
            rule: IntegrityRule::of(ContentClass::List(SEPARATORS)),
        },
        ColumnSpec {
            name: FORMATTING,
            rule: IntegrityRule::of(ContentClass::List(FORMATTINGS)).default_value("text"),
        },
        ColumnSpec {
            name: TEMPLATE,
            rule: IntegrityRule::of(ContentClass::Text).multilingual(),
        },
        ColumnSpec {
            name: PLACEMENT,
            rule: IntegrityRule::of(ContentClass::List(PLACEMENTS)),
        },
        ColumnSpec {
            name: HIDDEN,
            rule: IntegrityRule::of(ContentClass::List(&["yes", "no", "data"])).default_value("no"),
        },
    ],
};

pub const BADGES: TableSpec = TableSpec {
    name: "Badges",
    required: false,
    columns: &[
        ColumnSpec {
            name: COLUMN_NAME,
            rule: IntegrityRule::of(ContentClass::Address).required(),
        },
        ColumnSpec {
            name: CONTAINS_TEXT,
            rule: IntegrityRule::of(ContentClass::Text).required().multilingual(),
        },
        ColumnSpec {
            name: BACKGROUND,
            rule: IntegrityRule::of(ContentClass::CssColor),
        },
        ColumnSpec {
            name: BORDER,
            rule: IntegrityRule::of(ContentClass::CssColor),
        },
        ColumnSpec {
            name: TEXT_COLOR,
            rule: IntegrityRule::of(ContentClass::CssColor),
        },
    ],
};

pub const DATA_CODES: TableSpec = TableSpec {
    name: "Data codes",
    required: false,
    columns: &[
        ColumnSpec {
            name: COLUMN_NAME,
            rule: IntegrityRule::of(ContentClass::Address).required(),
        },
        ColumnSpec {
            name: CODE,
            rule: IntegrityRule::of(ContentClass::Text).required(),
        },
        ColumnSpec {
            name: REPLACEMENT,
            rule: IntegrityRule::of(ContentClass::Text).required().multilingual(),
        },
    ],
};

pub const MAPS: TableSpec = TableSpec {
    name: "Maps",
    required: false,
    columns: &[
        ColumnSpec {
            name: COLUMN_NAME,
            rule: IntegrityRule::of(ContentClass::Address).required().unique(),
        },
        ColumnSpec {
            name: MAP_SOURCE,
            rule: IntegrityRule::of(ContentClass::Filename(&["svg"])).required(),
        },
        ColumnSpec {
            name: SOURCE_URL,
            rule: IntegrityRule::of(ContentClass::Url),
        },
        ColumnSpec {
            name: REGION_PATTERN,
            rule: IntegrityRule::of(ContentClass::Regex),
        },
    ],
};

/// Every schema table, in checking order. Languages come first because the
/// other tables are read per language.
pub const SCHEMA_TABLES: &[TableSpec] = &[
    SUPPORTED_LANGUAGES,
    CUSTOMIZATION,
    TAXA_DEFINITION,
    DATA_DEFINITION,
    BADGES,
    DATA_CODES,
    MAPS,
];

/// Reads cells of a schema table by declared column name.
///
/// Multilingual columns resolve through [`HeaderIndex::find_localized`];
/// declared defaults replace empty cells.
pub struct TableReader<'a> {
    spec: &'static TableSpec,
    table: &'a RawTable,
    index: HeaderIndex,
    default_language: String,
}

impl<'a> TableReader<'a> {
    pub fn new(spec: &'static TableSpec, table: &'a RawTable, default_language: &str) -> Self {
        Self {
            spec,
            table,
            index: table.header_index(),
            default_language: default_language.to_string(),
        }
    }

    pub fn spec(&self) -> &'static TableSpec {
        self.spec
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Whether the column exists, in any language variant for multilingual columns.
    pub fn has_column(&self, column: &str) -> bool {
        match self.spec.column(column) {
            Some(spec) if spec.rule.multilingual => self.index.has_any_variant(column),
            _ => self.index.find(column).is_some(),
        }
    }

    /// Rows where every cell is empty are ignored everywhere.
    pub fn is_blank_row(&self, row: usize) -> bool {
        self.table
            .data_rows()
            .get(row)
            .map_or(true, |cells| cells.iter().all(|c| c.is_empty()))
    }

    /// Cell text without default substitution.
    pub fn raw(&self, row: usize, column: &str, language: &str) -> String {
        let multilingual = self
            .spec
            .column(column)
            .is_some_and(|spec| spec.rule.multilingual);
        let position = if multilingual {
            self.index
                .find_localized(column, language, &self.default_language)
        } else {
            self.index.find(column)
        };
        position
            .map(|col| self.table.cell(row, col).text())
            .unwrap_or_default()
    }

    /// Cell text with the declared default applied to empty cells.
    pub fn value(&self, row: usize, column: &str, language: &str) -> String {
        let raw = self.raw(row, column, language);
        if raw.is_empty() {
            if let Some(default) = self.spec.column(column).and_then(|c| c.rule.default) {
                return default.to_string();
            }
        }
        raw
    }

    /// Non-blank row positions.
    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.row_count()).filter(|row| !self.is_blank_row(*row))
    }
}
