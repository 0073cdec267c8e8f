//! The compiled checklist: the interchange document shared with the rest of
//! the application.
//!
//! ```text
//! CompiledChecklist
//! ├── general        lastUpdate, defaultLanguage, languages, assets, bibliographySource
//! └── perLanguage
//!     └── <lang>     displayMeta, facetMeta, entries[]
//! ```
//!
//! Field names and nesting are a compatibility surface: the JSON produced
//! here is persisted and consumed by other tools.

mod value;

pub use value::{nodes_at, Leaves, MediaItem, RegionSet, TaxonName, Value};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{
    BadgeRule, Formatting, Hidden, Language, MapDefinition, Placement, RankOrder, Separator,
};

/// The whole compiled dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledChecklist {
    pub general: General,
    pub per_language: BTreeMap<String, LanguageData>,
}

impl CompiledChecklist {
    pub fn language(&self, code: &str) -> Option<&LanguageData> {
        self.per_language.get(code)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Language-independent information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct General {
    pub last_update: DateTime<Utc>,
    pub default_language: String,
    pub languages: Vec<Language>,
    /// Every file referenced by the data, sorted and de-duplicated.
    pub assets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibliography_source: Option<String>,
}

/// Everything compiled for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageData {
    pub display_meta: DisplayMeta,
    pub facet_meta: FacetCatalogue,
    pub entries: Vec<Entry>,
}

/// Presentation settings consumed by the rendering layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_theme: Option<String>,
    /// Pattern the compiled dates were formatted with.
    pub date_format: String,
    pub ranks: Vec<RankMeta>,
    pub data: BTreeMap<String, DataMeta>,
}

/// Display settings of a rank column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankMeta {
    pub column: String,
    pub title: String,
    pub order_by: RankOrder,
    pub italicize: bool,
}

/// Display settings of a data column, keyed by normalized address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMeta {
    pub title: String,
    pub formatting: Formatting,
    pub hidden: Hidden,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<Separator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<BadgeRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MapDefinition>,
}

/// Shape of the values a facet filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetKind {
    Text,
    Numeric,
    MapRegions,
}

impl FacetKind {
    pub fn for_formatting(formatting: Formatting) -> Self {
        match formatting {
            Formatting::Number => FacetKind::Numeric,
            Formatting::MapRegions => FacetKind::MapRegions,
            _ => FacetKind::Text,
        }
    }
}

/// Definition of one facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetMeta {
    pub category: String,
    pub kind: FacetKind,
    /// Position in the rank hierarchy, for rank facets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    /// Custom value order; values not listed follow alphabetically.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<BadgeRule>,
}

/// Facets of one language, split by what they filter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FacetCatalogue {
    pub taxa: BTreeMap<String, FacetMeta>,
    pub data: BTreeMap<String, FacetMeta>,
}

/// One rank of an entry's classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub authority: String,
}

impl RankNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authority: String::new(),
        }
    }
}

/// One compiled row of the checklist.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entry {
    /// Classification from the outermost rank down to the entry's own.
    #[serde(rename = "t")]
    pub ranks: Vec<RankNode>,
    #[serde(rename = "d", default)]
    pub data: BTreeMap<String, Value>,
}

impl Entry {
    /// Nodes stored at `address`, lists expanded.
    pub fn nodes_at(&self, address: &str) -> Vec<&Value> {
        nodes_at(&self.data, address)
    }

    /// Every leaf reachable from `address`.
    pub fn leaves_at<'a>(&'a self, address: &str) -> impl Iterator<Item = &'a Value> + 'a {
        self.nodes_at(address).into_iter().flat_map(Value::leaves)
    }

    /// Rank names only.
    pub fn rank_names(&self) -> Vec<&str> {
        self.ranks.iter().map(|r| r.name.as_str()).collect()
    }
}
