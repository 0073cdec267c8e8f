//! Row extraction: checklist rows to compiled entries, one language at a time.
//!
//! Every declared data address is walked one segment at a time against the
//! checklist headers:
//!
//! ```text
//! size            ──▶ object { wingspan: [..] }
//! size.wingspan#  ──▶ probes size.wingspan1, size.wingspan2, ... (or splits
//!                     a `size.wingspan` base column on `|`)
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;
use tracing::debug;

use crate::diagnostics::{fill, templates, DiagnosticLog};
use crate::model::{Entry, RankNode, Value};
use crate::path::{self, REPEAT_MARKER, SEPARATOR};
use crate::schema::{ColumnDefinition, LanguageSchema};
use crate::table::{Cell, HeaderIndex, RawTable};

use super::readers::{LeafContext, ReaderRegistry, RowCells};

/// Separator between the items of a repeated field typed into one cell.
pub const ITEM_SEPARATOR: char = '|';

/// Per-run extraction settings.
#[derive(Debug, Clone)]
pub struct EtlOptions {
    pub date_format: String,
    pub media_probe_limit: usize,
}

/// Header names of the checklist table, lower-cased, language suffix removed.
struct ColumnLayout {
    names: HashSet<String>,
    normalized: HashSet<String>,
}

impl ColumnLayout {
    fn new(index: &HeaderIndex) -> Self {
        let names: HashSet<String> = index.base_names().map(String::from).collect();
        let normalized = names.iter().map(|name| path::normalize(name)).collect();
        Self { names, normalized }
    }

    /// Whether `header` exists as a column or as the prefix of a column pair.
    fn has_prefix(&self, header: &str) -> bool {
        let dotted = format!("{}{}", header, SEPARATOR);
        self.names
            .iter()
            .any(|name| name == header || name.starts_with(&dotted))
    }

    /// Whether any header feeds the normalized leaf `address`.
    fn covers(&self, address: &str) -> bool {
        let base = address.trim_end_matches(REPEAT_MARKER);
        let dotted = format!("{}{}", address, SEPARATOR);
        self.normalized
            .iter()
            .any(|name| name == address || name == base || name.starts_with(&dotted))
    }
}

/// Extract the entries of one language.
pub fn extract(
    table: &RawTable,
    table_name: &str,
    schema: &LanguageSchema,
    default_language: &str,
    registry: &ReaderRegistry,
    options: &EtlOptions,
    log: &mut DiagnosticLog,
) -> Vec<Entry> {
    let extractor = Extractor::new(table, schema, default_language, registry, options);
    extractor.check_headers(table_name, log);

    let mut entries = Vec::new();
    for row in 0..table.row_count() {
        if let Some(entry) = extractor.row(row, log) {
            entries.push(entry);
        }
    }
    debug!(
        language = %schema.language,
        rows = table.row_count(),
        entries = entries.len(),
        "checklist rows extracted"
    );
    entries
}

struct Extractor<'a> {
    table: &'a RawTable,
    schema: &'a LanguageSchema,
    default_language: &'a str,
    registry: &'a ReaderRegistry,
    index: HeaderIndex,
    layout: ColumnLayout,
    date_format: String,
    media_probe_limit: usize,
    region_patterns: HashMap<String, Regex>,
    /// Parent address ("" for top level) to its declared children.
    children: HashMap<String, Vec<&'a ColumnDefinition>>,
}

impl<'a> Extractor<'a> {
    fn new(
        table: &'a RawTable,
        schema: &'a LanguageSchema,
        default_language: &'a str,
        registry: &'a ReaderRegistry,
        options: &EtlOptions,
    ) -> Self {
        let index = table.header_index();
        let layout = ColumnLayout::new(&index);

        let mut children: HashMap<String, Vec<&ColumnDefinition>> = HashMap::new();
        for column in &schema.data {
            let parent = path::parent(&column.address).unwrap_or_default();
            children.entry(parent).or_default().push(column);
        }

        let region_patterns = schema
            .data
            .iter()
            .filter_map(|column| {
                let pattern = column.map.as_ref()?.region_pattern.as_deref()?;
                let regex = Regex::new(&format!("^(?:{})$", pattern)).ok()?;
                Some((column.address.clone(), regex))
            })
            .collect();

        Self {
            table,
            schema,
            default_language,
            registry,
            index,
            layout,
            date_format: schema
                .customization
                .date_format
                .clone()
                .unwrap_or_else(|| options.date_format.clone()),
            media_probe_limit: options.media_probe_limit,
            region_patterns,
            children,
        }
    }

    /// Rank columns must exist; a missing data column only loses its values.
    fn check_headers(&self, table_name: &str, log: &mut DiagnosticLog) {
        for rank in &self.schema.ranks {
            if !self.layout.covers(&rank.address) {
                log.error(fill(
                    templates::MISSING_CHECKLIST_COLUMN,
                    &[&rank.address, table_name],
                ));
            }
        }
        for column in &self.schema.data {
            if !self.is_compound(column) && !self.layout.covers(&column.address) {
                log.warning(fill(
                    templates::MISSING_CHECKLIST_COLUMN,
                    &[&column.address, table_name],
                ));
            }
        }
    }

    fn is_compound(&self, column: &ColumnDefinition) -> bool {
        self.children.contains_key(&column.address)
    }

    fn row(&self, row: usize, log: &mut DiagnosticLog) -> Option<Entry> {
        let is_blank = self
            .table
            .data_rows()
            .get(row)
            .map_or(true, |cells| cells.iter().all(Cell::is_empty));
        if is_blank {
            return None;
        }

        let cells = RowCells::new(
            self.table,
            &self.index,
            row,
            &self.schema.language,
            self.default_language,
        );
        let ranks = self.ranks(&cells, log)?;
        let data = self.read_children("", "", &cells, log);
        Some(Entry { ranks, data })
    }

    /// The row's classification, or `None` when the row must be skipped.
    fn ranks(&self, cells: &RowCells<'_>, log: &mut DiagnosticLog) -> Option<Vec<RankNode>> {
        let mut found: Vec<Option<RankNode>> = Vec::with_capacity(self.schema.ranks.len());
        for rank in &self.schema.ranks {
            let value = self.read_leaf(rank, &rank.address, cells, log);
            found.push(match value {
                Some(Value::Taxon(taxon)) => Some(RankNode {
                    name: taxon.name,
                    authority: taxon.authority,
                }),
                _ => None,
            });
        }

        let filled = found.iter().take_while(|rank| rank.is_some()).count();
        if found[filled..].iter().any(Option::is_some) {
            log.error(fill(
                templates::NON_CONTIGUOUS_RANKS,
                &[
                    &cells.row_number().to_string(),
                    &self.schema.ranks[filled].title,
                ],
            ));
            return None;
        }
        if filled == 0 {
            log.error(fill(templates::NO_TAXON, &[&cells.row_number().to_string()]));
            return None;
        }
        Some(found.into_iter().flatten().collect())
    }

    fn read_children(
        &self,
        parent: &str,
        prefix: &str,
        cells: &RowCells<'_>,
        log: &mut DiagnosticLog,
    ) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        let Some(columns) = self.children.get(parent) else {
            return out;
        };
        for column in columns {
            let key = path::key(&column.address);
            let header = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, SEPARATOR, key)
            };
            let value = if column.is_repeated() {
                self.read_list(column, &header, cells, log)
            } else {
                self.read_single(column, &header, cells, log)
            };
            if let Some(value) = value {
                out.insert(key, value);
            }
        }
        out
    }

    fn read_single(
        &self,
        column: &ColumnDefinition,
        header: &str,
        cells: &RowCells<'_>,
        log: &mut DiagnosticLog,
    ) -> Option<Value> {
        if self.is_compound(column) {
            let object = self.read_children(&column.address, header, cells, log);
            return (!object.is_empty()).then_some(Value::Object(object));
        }
        self.read_leaf(column, header, cells, log)
    }

    fn read_leaf(
        &self,
        column: &ColumnDefinition,
        header: &str,
        cells: &RowCells<'_>,
        log: &mut DiagnosticLog,
    ) -> Option<Value> {
        let reader = self.registry.get(column.formatting)?;
        let ctx = self.context(column, header, cells);
        reader.read(&ctx, log)
    }

    /// Items of a repeated field.
    ///
    /// A base column wins over numbered columns. Numbered columns are probed
    /// until one is missing; media columns probe every suffix up to the
    /// configured limit. Empty interior items are dropped and reported.
    fn read_list(
        &self,
        column: &ColumnDefinition,
        header: &str,
        cells: &RowCells<'_>,
        log: &mut DiagnosticLog,
    ) -> Option<Value> {
        let compound = self.is_compound(column);
        if !compound && cells.has_column(header) {
            return self.split_base_column(column, header, cells, log);
        }

        let media = !compound && column.formatting.is_media();
        let limit = if media {
            self.media_probe_limit
        } else {
            usize::MAX
        };

        let mut items = Vec::new();
        let mut skipped: Option<usize> = None;
        for position in 1..=limit {
            let item_header = format!("{}{}", header, position);
            if !self.layout.has_prefix(&item_header) {
                if media {
                    continue;
                }
                break;
            }
            match self.read_single(column, &item_header, cells, log) {
                Some(value) => {
                    if let Some(gap) = skipped.take() {
                        log.error(fill(
                            templates::NON_CONTIGUOUS_ARRAY,
                            &[
                                &cells.row_number().to_string(),
                                &column.address,
                                &gap.to_string(),
                            ],
                        ));
                    }
                    items.push(value);
                }
                None => {
                    skipped.get_or_insert(position);
                }
            }
        }
        (!items.is_empty()).then_some(Value::List(items))
    }

    fn split_base_column(
        &self,
        column: &ColumnDefinition,
        header: &str,
        cells: &RowCells<'_>,
        log: &mut DiagnosticLog,
    ) -> Option<Value> {
        let reader = self.registry.get(column.formatting)?;
        let raw = cells.text(header)?;
        let ctx = self.context(column, header, cells);
        let items: Vec<Value> = raw
            .split(ITEM_SEPARATOR)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .filter_map(|piece| reader.coerce(&Cell::Text(piece.to_string()), &ctx, log))
            .collect();
        (!items.is_empty()).then_some(Value::List(items))
    }

    fn context<'c>(
        &'c self,
        column: &'c ColumnDefinition,
        header: &'c str,
        cells: &'c RowCells<'c>,
    ) -> LeafContext<'c> {
        LeafContext {
            cells,
            column,
            header,
            date_format: &self.date_format,
            region_pattern: self.region_patterns.get(&column.address),
        }
    }
}
