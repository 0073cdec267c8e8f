//! Per-facet state.
//!
//! A facet is idle until a value is selected or a numeric operator is set,
//! and returns to idle when cleared.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Entry, FacetKind, FacetMeta};

use super::saved::NumericSelection;

/// Whether a facet filters on ranks or on data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetGroup {
    Taxa,
    Data,
}

impl fmt::Display for FacetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetGroup::Taxa => write!(f, "taxa"),
            FacetGroup::Data => write!(f, "data"),
        }
    }
}

/// Identifies a facet within an engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacetId {
    pub group: FacetGroup,
    pub address: String,
}

impl FacetId {
    pub fn new(group: FacetGroup, address: &str) -> Self {
        Self {
            group,
            address: crate::path::normalize(address),
        }
    }

    /// The address without repeat markers, as written in saved queries.
    pub fn plain_address(&self) -> String {
        self.address.replace(crate::path::REPEAT_MARKER, "")
    }
}

impl fmt::Display for FacetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.address)
    }
}

/// Bounds of a numeric facet over all entries and over the current matches.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub possible_min: Option<f64>,
    pub possible_max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacetState {
    pub id: FacetId,
    pub kind: FacetKind,
    pub category: String,
    /// Rank depth, for rank facets.
    pub depth: Option<usize>,
    pub order: Vec<String>,
    /// Value → number of entries carrying it, over every entry.
    pub all: BTreeMap<String, usize>,
    /// Value → number of matching entries carrying it.
    pub possible: BTreeMap<String, usize>,
    pub selected: BTreeSet<String>,
    pub numeric: Option<NumericSelection>,
    pub range: NumericRange,
}

impl FacetState {
    /// A facet with its `all` counts and bounds computed over `entries`.
    pub fn new(id: FacetId, meta: &FacetMeta, entries: &[Entry]) -> Self {
        let mut state = Self {
            id,
            kind: meta.kind,
            category: meta.category.clone(),
            depth: meta.depth,
            order: meta.order.clone(),
            all: BTreeMap::new(),
            possible: BTreeMap::new(),
            selected: BTreeSet::new(),
            numeric: None,
            range: NumericRange::default(),
        };
        state.all = state.count(entries.iter());
        state.possible = state.all.clone();
        let (min, max) = state.bounds(entries.iter());
        state.range = NumericRange {
            min,
            max,
            possible_min: min,
            possible_max: max,
        };
        state
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == FacetKind::Numeric
    }

    pub fn is_active(&self) -> bool {
        !self.selected.is_empty() || self.numeric.is_some()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.numeric = None;
    }

    /// Distinct keys `entry` contributes to this facet.
    pub fn keys_of(&self, entry: &Entry) -> BTreeSet<String> {
        match (self.id.group, self.depth) {
            (FacetGroup::Taxa, Some(depth)) => entry
                .ranks
                .get(depth)
                .map(|rank| rank.name.clone())
                .into_iter()
                .collect(),
            (FacetGroup::Taxa, None) => BTreeSet::new(),
            (FacetGroup::Data, _) => entry
                .leaves_at(&self.id.address)
                .flat_map(|leaf| leaf.facet_keys())
                .collect(),
        }
    }

    pub fn numbers_of<'e>(&self, entry: &'e Entry) -> impl Iterator<Item = f64> + 'e {
        entry
            .leaves_at(&self.id.address)
            .filter_map(|leaf| leaf.as_number())
    }

    /// Whether `entry` passes this facet. Idle facets pass everything.
    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(numeric) = &self.numeric {
            return self.numbers_of(entry).any(|n| numeric.matches(n));
        }
        if self.selected.is_empty() {
            return true;
        }
        self.keys_of(entry)
            .iter()
            .any(|key| self.selected.contains(key))
    }

    /// Recompute `possible` and the possible bounds over `entries`.
    pub fn recompute<'e>(&mut self, entries: impl Iterator<Item = &'e Entry>) {
        if self.is_numeric() {
            let (min, max) = self.bounds(entries);
            self.range.possible_min = min;
            self.range.possible_max = max;
        } else {
            self.possible = self.count(entries);
        }
    }

    /// Drop selected values that are no longer possible. Returns how many went.
    pub fn prune(&mut self) -> usize {
        let before = self.selected.len();
        let possible = &self.possible;
        self.selected.retain(|value| possible.contains_key(value));
        before - self.selected.len()
    }

    /// Possible values in display order: the custom order first, then the
    /// rest alphabetically.
    pub fn ordered_possible(&self) -> Vec<(&str, usize)> {
        let mut out: Vec<(&str, usize)> = self
            .order
            .iter()
            .filter_map(|value| {
                self.possible
                    .get_key_value(value)
                    .map(|(key, count)| (key.as_str(), *count))
            })
            .collect();
        out.extend(
            self.possible
                .iter()
                .filter(|(key, _)| !self.order.contains(*key))
                .map(|(key, count)| (key.as_str(), *count)),
        );
        out
    }

    fn count<'e>(&self, entries: impl Iterator<Item = &'e Entry>) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        if self.is_numeric() {
            return counts;
        }
        for entry in entries {
            for key in self.keys_of(entry) {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts
    }

    fn bounds<'e>(&self, entries: impl Iterator<Item = &'e Entry>) -> (Option<f64>, Option<f64>) {
        if !self.is_numeric() {
            return (None, None);
        }
        entries
            .flat_map(|entry| self.numbers_of(entry))
            .fold((None, None), |(min, max): (Option<f64>, Option<f64>), n| {
                (
                    Some(min.map_or(n, |m| m.min(n))),
                    Some(max.map_or(n, |m| m.max(n))),
                )
            })
    }
}
