//! The facet engine: selections in, filtered entries and possible values out.
//!
//! Every mutation re-runs the query:
//!
//! ```text
//! selections ──▶ cache lookup ──▶ filter ──▶ add ancestors ──▶ results
//!                     │                           │
//!                     └──── hit ──────────────────┤
//!                                                 ▼
//!          recompute possible, or restore it on a hit (except held-open)
//!                                                 │
//!                                                 ▼
//!                                   prune (only when something matched)
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::config::QuerySettings;
use crate::model::{CompiledChecklist, Entry, LanguageData, RankNode};
use crate::path;

use super::cache::{CachedQuery, FacetSnapshot, QueryCache};
use super::facet::{FacetGroup, FacetId, FacetState, NumericRange};
use super::key::query_key;
use super::operator::Operator;
use super::saved::{NumericSelection, SavedQuery, Selection};
use super::text::{fold, TextMatcher};
use super::{QueryError, QueryResult};

/// One row of the result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Position in the record set, `None` for a synthesized ancestor.
    pub index: Option<usize>,
    pub entry: Entry,
}

impl ResultRow {
    pub fn is_synthesized(&self) -> bool {
        self.index.is_none()
    }

    fn synthesized(ranks: &[RankNode]) -> Self {
        Self {
            index: None,
            entry: Entry {
                ranks: ranks.to_vec(),
                data: BTreeMap::new(),
            },
        }
    }
}

/// How [`FacetEngine::load_query`] ended.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    /// The input was rejected and the empty query is now active.
    FellBack(QueryError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded)
    }
}

pub struct FacetEngine {
    entries: Vec<Entry>,
    /// Folded search text per entry.
    blobs: Vec<String>,
    /// Rank-name prefix to the first entry carrying exactly that classification.
    prefixes: HashMap<Vec<String>, usize>,
    facets: BTreeMap<FacetId, FacetState>,
    text: String,
    held_open: Option<FacetId>,
    cache: QueryCache,
    cache_enabled: bool,
    matched: Vec<usize>,
    results: Vec<ResultRow>,
}

impl FacetEngine {
    /// Build an engine over one language's record set.
    pub fn new(data: &LanguageData) -> Self {
        Self::with_settings(data, &QuerySettings::default())
    }

    pub fn with_settings(data: &LanguageData, settings: &QuerySettings) -> Self {
        let mut engine = Self {
            entries: Vec::new(),
            blobs: Vec::new(),
            prefixes: HashMap::new(),
            facets: BTreeMap::new(),
            text: String::new(),
            held_open: None,
            cache: QueryCache::new(),
            cache_enabled: settings.cache_enabled,
            matched: Vec::new(),
            results: Vec::new(),
        };
        engine.load(data);
        engine
    }

    /// Build an engine over `language` of a compiled checklist.
    pub fn from_checklist(checklist: &CompiledChecklist, language: &str) -> QueryResult<Self> {
        let data = checklist
            .language(language)
            .ok_or_else(|| QueryError::UnknownLanguage(language.to_string()))?;
        Ok(Self::new(data))
    }

    /// Replace the record set. Rebuilds every facet, drops all selections
    /// and clears the cache.
    pub fn load(&mut self, data: &LanguageData) {
        self.entries = data.entries.clone();

        let known: Vec<&String> = data.display_meta.data.keys().collect();
        let searchable: Vec<&str> = data
            .display_meta
            .data
            .iter()
            .filter(|(address, meta)| {
                meta.formatting.is_searchable_text() && path::classify(&known, address).is_leaf
            })
            .map(|(address, _)| address.as_str())
            .collect();
        self.blobs = self
            .entries
            .iter()
            .map(|entry| search_blob(entry, &searchable))
            .collect();

        self.prefixes.clear();
        for (idx, entry) in self.entries.iter().enumerate() {
            let names: Vec<String> = entry.ranks.iter().map(|r| r.name.clone()).collect();
            self.prefixes.entry(names).or_insert(idx);
        }

        self.facets.clear();
        let groups = [
            (FacetGroup::Taxa, &data.facet_meta.taxa),
            (FacetGroup::Data, &data.facet_meta.data),
        ];
        for (group, metas) in groups {
            for (address, meta) in metas {
                let id = FacetId::new(group, address);
                let state = FacetState::new(id.clone(), meta, &self.entries);
                self.facets.insert(id, state);
            }
        }

        self.text.clear();
        self.held_open = None;
        self.cache.clear();
        debug!(
            entries = self.entries.len(),
            facets = self.facets.len(),
            "facet engine loaded"
        );
        self.run();
    }

    // ------------------------------------------------------------------------
    // Selections
    // ------------------------------------------------------------------------

    /// Replace the selected values of a text or region facet.
    pub fn set_selection<I, S>(&mut self, group: FacetGroup, address: &str, values: I) -> QueryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let facet = self.facet_mut(group, address)?;
        if facet.is_numeric() {
            return Err(QueryError::KindMismatch {
                facet: facet.id.to_string(),
                expected: "a value facet",
            });
        }
        facet.selected = values
            .into_iter()
            .map(Into::into)
            .filter(|v: &String| !v.is_empty())
            .collect();
        self.run();
        Ok(())
    }

    /// Set the comparator of a numeric data facet.
    pub fn set_numeric(
        &mut self,
        address: &str,
        operator: Operator,
        threshold1: f64,
        threshold2: Option<f64>,
    ) -> QueryResult<()> {
        let selection = NumericSelection {
            operator,
            threshold1,
            threshold2,
        };
        self.apply_numeric(address, selection)?;
        self.run();
        Ok(())
    }

    /// Return one facet to idle.
    pub fn clear_facet(&mut self, group: FacetGroup, address: &str) -> QueryResult<()> {
        self.facet_mut(group, address)?.clear();
        self.run();
        Ok(())
    }

    pub fn set_free_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.run();
    }

    /// Drop every selection and the free text.
    pub fn clear(&mut self) {
        self.reset();
        self.run();
    }

    /// Keep `possible` of this facet frozen while the user picks values in it.
    pub fn hold_open(&mut self, group: FacetGroup, address: &str) -> QueryResult<()> {
        let id = self.facet(group, address)?.id.clone();
        self.held_open = Some(id);
        Ok(())
    }

    /// Stop holding a facet open and refresh its possible values.
    pub fn release(&mut self) {
        if self.held_open.take().is_some() {
            self.run();
        }
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    /// Matches and their ancestors, in table order.
    pub fn current_results(&self) -> &[ResultRow] {
        &self.results
    }

    /// Indices of the entries matching the query itself.
    pub fn matched(&self) -> &[usize] {
        &self.matched
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn currently_possible(
        &self,
        group: FacetGroup,
        address: &str,
    ) -> QueryResult<&BTreeMap<String, usize>> {
        Ok(&self.facet(group, address)?.possible)
    }

    pub fn numeric_range(&self, address: &str) -> QueryResult<NumericRange> {
        let facet = self.facet(FacetGroup::Data, address)?;
        if !facet.is_numeric() {
            return Err(QueryError::KindMismatch {
                facet: facet.id.to_string(),
                expected: "a numeric facet",
            });
        }
        Ok(facet.range)
    }

    /// Look a facet up by its address, with or without repeat markers.
    pub fn facet(&self, group: FacetGroup, address: &str) -> QueryResult<&FacetState> {
        let id = self.resolve(group, address)?;
        self.facets
            .get(&id)
            .ok_or_else(|| QueryError::UnknownFacet(id.to_string()))
    }

    pub fn facets(&self) -> impl Iterator<Item = &FacetState> {
        self.facets.values()
    }

    pub fn free_text(&self) -> &str {
        &self.text
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    // ------------------------------------------------------------------------
    // Saved queries
    // ------------------------------------------------------------------------

    /// The active query as a saved query.
    pub fn saved_query(&self) -> SavedQuery {
        let mut query = SavedQuery {
            text: self.text.trim().to_string(),
            ..SavedQuery::default()
        };
        for facet in self.facets.values().filter(|f| f.is_active()) {
            let address = facet.id.plain_address();
            match (facet.id.group, &facet.numeric) {
                (FacetGroup::Taxa, _) => {
                    query
                        .taxa
                        .insert(address, facet.selected.iter().cloned().collect());
                }
                (FacetGroup::Data, Some(numeric)) => {
                    query.data.insert(address, Selection::Numeric(*numeric));
                }
                (FacetGroup::Data, None) => {
                    query.data.insert(
                        address,
                        Selection::Values(facet.selected.iter().cloned().collect()),
                    );
                }
            }
        }
        query
    }

    pub fn serialize_query(&self) -> QueryResult<String> {
        self.saved_query().to_json()
    }

    pub fn serialize_query_for_url(&self) -> QueryResult<String> {
        self.saved_query().to_url()
    }

    /// Replace the active query with a saved one.
    ///
    /// Malformed input, or input naming facets this record set does not
    /// have, activates the empty query instead.
    pub fn load_query(&mut self, json: &str) -> LoadOutcome {
        let outcome = SavedQuery::from_json(json).and_then(|query| self.apply(query));
        self.finish_load(outcome)
    }

    pub fn load_query_from_url(&mut self, encoded: &str) -> LoadOutcome {
        let outcome = SavedQuery::from_url(encoded).and_then(|query| self.apply(query));
        self.finish_load(outcome)
    }

    fn finish_load(&mut self, outcome: QueryResult<()>) -> LoadOutcome {
        let outcome = match outcome {
            Ok(()) => LoadOutcome::Loaded,
            Err(err) => {
                warn!(error = %err, "saved query rejected, using the empty query");
                self.reset();
                LoadOutcome::FellBack(err)
            }
        };
        self.run();
        outcome
    }

    fn apply(&mut self, query: SavedQuery) -> QueryResult<()> {
        self.reset();
        for (address, values) in query.taxa {
            let facet = self.facet_mut(FacetGroup::Taxa, &address)?;
            facet.selected = values.into_iter().filter(|v| !v.is_empty()).collect();
        }
        for (address, selection) in query.data {
            match selection {
                Selection::Numeric(numeric) => self.apply_numeric(&address, numeric)?,
                Selection::Values(values) => {
                    let facet = self.facet_mut(FacetGroup::Data, &address)?;
                    if facet.is_numeric() {
                        return Err(QueryError::KindMismatch {
                            facet: facet.id.to_string(),
                            expected: "a value facet",
                        });
                    }
                    facet.selected = values.into_iter().filter(|v| !v.is_empty()).collect();
                }
            }
        }
        self.text = query.text;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    fn resolve(&self, group: FacetGroup, address: &str) -> QueryResult<FacetId> {
        let id = FacetId::new(group, address);
        if self.facets.contains_key(&id) {
            return Ok(id);
        }
        let plain = id.plain_address();
        self.facets
            .keys()
            .find(|candidate| candidate.group == group && candidate.plain_address() == plain)
            .cloned()
            .ok_or_else(|| QueryError::UnknownFacet(id.to_string()))
    }

    fn facet_mut(&mut self, group: FacetGroup, address: &str) -> QueryResult<&mut FacetState> {
        let id = self.resolve(group, address)?;
        self.facets
            .get_mut(&id)
            .ok_or_else(|| QueryError::UnknownFacet(id.to_string()))
    }

    fn apply_numeric(&mut self, address: &str, selection: NumericSelection) -> QueryResult<()> {
        if selection.operator.needs_second_threshold() && selection.threshold2.is_none() {
            return Err(QueryError::MissingThreshold(selection.operator));
        }
        let facet = self.facet_mut(FacetGroup::Data, address)?;
        if !facet.is_numeric() {
            return Err(QueryError::KindMismatch {
                facet: facet.id.to_string(),
                expected: "a numeric facet",
            });
        }
        facet.selected.clear();
        facet.numeric = Some(selection);
        Ok(())
    }

    fn reset(&mut self) {
        for facet in self.facets.values_mut() {
            facet.clear();
        }
        self.text.clear();
        self.held_open = None;
    }

    fn run(&mut self) {
        let query = self.saved_query();
        if query.is_empty() {
            self.matched = (0..self.entries.len()).collect();
            self.results = self
                .entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| ResultRow {
                    index: Some(idx),
                    entry: entry.clone(),
                })
                .collect();
            self.refresh_facets();
            return;
        }

        let key = if self.cache_enabled {
            query_key(&query).ok()
        } else {
            None
        };
        if let Some(cached) = key.as_deref().and_then(|k| self.cache.get(k)) {
            debug!(matched = cached.matched.len(), "query cache hit");
            self.matched = cached.matched.clone();
            self.results = cached.results.clone();
            let snapshot = cached.facets.clone();
            self.restore_possible(&snapshot);
            self.prune();
            return;
        }

        self.matched = self.filter();
        self.results = self.with_ancestors(&self.matched);
        debug!(
            matched = self.matched.len(),
            results = self.results.len(),
            "query evaluated"
        );
        self.refresh_possible();
        if let Some(key) = key {
            let cached = CachedQuery {
                matched: self.matched.clone(),
                results: self.results.clone(),
                facets: self.snapshot(),
            };
            self.cache.insert(key, cached);
        }
        self.prune();
    }

    fn refresh_facets(&mut self) {
        self.refresh_possible();
        self.prune();
    }

    /// Recompute possible values from the matched set, except for the
    /// held-open facet.
    fn refresh_possible(&mut self) {
        let matched: Vec<&Entry> = self.matched.iter().map(|&idx| &self.entries[idx]).collect();
        for (id, facet) in self.facets.iter_mut() {
            if self.held_open.as_ref() == Some(id) {
                continue;
            }
            facet.recompute(matched.iter().copied());
        }
    }

    /// Like [`Self::refresh_possible`], but takes facet values from a cache
    /// snapshot where it has them.
    fn restore_possible(&mut self, snapshot: &BTreeMap<FacetId, FacetSnapshot>) {
        let matched: Vec<&Entry> = self.matched.iter().map(|&idx| &self.entries[idx]).collect();
        for (id, facet) in self.facets.iter_mut() {
            if self.held_open.as_ref() == Some(id) {
                continue;
            }
            match snapshot.get(id) {
                Some(saved) => {
                    facet.possible = saved.possible.clone();
                    facet.range = saved.range;
                }
                None => facet.recompute(matched.iter().copied()),
            }
        }
    }

    /// Drop selected values no matched entry carries.
    ///
    /// With no matches every value is impossible; pruning then would empty
    /// the selections and leave results that no longer follow from them.
    fn prune(&mut self) {
        if self.matched.is_empty() {
            return;
        }
        for (id, facet) in self.facets.iter_mut() {
            if self.held_open.as_ref() == Some(id) || facet.is_numeric() {
                continue;
            }
            let dropped = facet.prune();
            if dropped > 0 {
                debug!(facet = %id, dropped, "pruned impossible selections");
            }
        }
    }

    /// Facet values as just recomputed. The held-open facet is left out
    /// because its values were not.
    fn snapshot(&self) -> BTreeMap<FacetId, FacetSnapshot> {
        self.facets
            .iter()
            .filter(|(id, _)| self.held_open.as_ref() != Some(*id))
            .map(|(id, facet)| {
                let snapshot = FacetSnapshot {
                    possible: facet.possible.clone(),
                    range: facet.range,
                };
                (id.clone(), snapshot)
            })
            .collect()
    }

    fn filter(&self) -> Vec<usize> {
        let matcher = TextMatcher::new(&self.text);
        let active: Vec<&FacetState> = self.facets.values().filter(|f| f.is_active()).collect();
        (0..self.entries.len())
            .filter(|&idx| {
                let entry = &self.entries[idx];
                active.iter().all(|facet| facet.matches(entry))
                    && matcher
                        .as_ref()
                        .map_or(true, |m| m.matches(&self.blobs[idx]))
            })
            .collect()
    }

    /// Add the ancestors of every match, in table order.
    ///
    /// Ancestors with a row of their own are taken from the record set.
    /// Missing ones are synthesized from the rank prefix and placed right
    /// before their first descendant.
    fn with_ancestors(&self, matched: &[usize]) -> Vec<ResultRow> {
        let mut included: BTreeSet<usize> = matched.iter().copied().collect();
        let mut missing: HashSet<Vec<String>> = HashSet::new();
        for &idx in matched {
            let names = rank_names(&self.entries[idx].ranks);
            for depth in 1..names.len() {
                let prefix = names[..depth].to_vec();
                match self.prefixes.get(&prefix) {
                    Some(&ancestor) => {
                        included.insert(ancestor);
                    }
                    None => {
                        missing.insert(prefix);
                    }
                }
            }
        }

        let mut emitted: HashSet<Vec<String>> = HashSet::new();
        let mut rows = Vec::with_capacity(included.len() + missing.len());
        for idx in included {
            let entry = &self.entries[idx];
            let names = rank_names(&entry.ranks);
            for depth in 1..names.len() {
                let prefix = names[..depth].to_vec();
                if missing.contains(&prefix) && emitted.insert(prefix) {
                    rows.push(ResultRow::synthesized(&entry.ranks[..depth]));
                }
            }
            rows.push(ResultRow {
                index: Some(idx),
                entry: entry.clone(),
            });
        }
        rows
    }
}

fn rank_names(ranks: &[RankNode]) -> Vec<String> {
    ranks.iter().map(|r| r.name.clone()).collect()
}

/// Folded text an entry is searched by: rank names and authorities plus
/// every text leaf at the given addresses.
fn search_blob(entry: &Entry, addresses: &[&str]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for rank in &entry.ranks {
        parts.push(rank.name.clone());
        if !rank.authority.is_empty() {
            parts.push(rank.authority.clone());
        }
    }
    for address in addresses {
        parts.extend(entry.leaves_at(address).filter_map(|leaf| leaf.search_text()));
    }
    fold(&parts.join(" "))
}
