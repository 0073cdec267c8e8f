//! Typed values stored in an entry's data tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::path::{self, Segment};
use crate::table::format_number;

/// A taxon name with its authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaxonName {
    pub name: String,
    pub authority: String,
}

/// A reference to an image or sound file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaItem {
    pub source: String,
    pub title: String,
}

/// Region codes mapped to their status (empty when none was given).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSet {
    pub regions: BTreeMap<String, String>,
}

/// A node of the data tree.
///
/// Leaves are numbers, text, taxon pairs, media pairs and region sets;
/// lists come from repeated addresses and objects from nested ones.
///
/// In JSON, structured leaves carry a `"$type"` key. Object keys are address
/// segments, which never start with `$`, so a nested object can never be
/// read back as a leaf.
///
/// ```json
/// {"$type": "taxon", "name": "Rosa canina", "authority": "L."}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ValueRepr")]
pub enum Value {
    Number(f64),
    Text(String),
    List(Vec<Value>),
    Taxon(TaxonName),
    Media(MediaItem),
    Regions(RegionSet),
    Object(BTreeMap<String, Value>),
}

#[derive(Serialize)]
#[serde(tag = "$type", rename_all = "lowercase")]
enum LeafRef<'a> {
    Taxon(&'a TaxonName),
    Media(&'a MediaItem),
    Regions(&'a RegionSet),
}

#[derive(Deserialize)]
#[serde(tag = "$type", rename_all = "lowercase")]
enum Leaf {
    Taxon(TaxonName),
    Media(MediaItem),
    Regions(RegionSet),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Number(f64),
    Text(String),
    List(Vec<Value>),
    Leaf(Leaf),
    Object(BTreeMap<String, Value>),
}

impl From<ValueRepr> for Value {
    fn from(repr: ValueRepr) -> Self {
        match repr {
            ValueRepr::Number(n) => Value::Number(n),
            ValueRepr::Text(s) => Value::Text(s),
            ValueRepr::List(items) => Value::List(items),
            ValueRepr::Leaf(Leaf::Taxon(taxon)) => Value::Taxon(taxon),
            ValueRepr::Leaf(Leaf::Media(media)) => Value::Media(media),
            ValueRepr::Leaf(Leaf::Regions(set)) => Value::Regions(set),
            ValueRepr::Object(children) => Value::Object(children),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Taxon(taxon) => LeafRef::Taxon(taxon).serialize(serializer),
            Value::Media(media) => LeafRef::Media(media).serialize(serializer),
            Value::Regions(set) => LeafRef::Regions(set).serialize(serializer),
            Value::Object(children) => children.serialize(serializer),
        }
    }
}

impl Value {
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Object(_))
    }

    /// Lazily walk every leaf below (and including) this node, depth first.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Keys this leaf contributes to a text or region facet.
    pub fn facet_keys(&self) -> Vec<String> {
        match self {
            Value::Number(n) => vec![format_number(*n)],
            Value::Text(s) => vec![s.clone()],
            Value::Taxon(taxon) => vec![taxon.name.clone()],
            Value::Media(media) if !media.title.is_empty() => vec![media.title.clone()],
            Value::Media(media) => vec![media.source.clone()],
            Value::Regions(set) => set.regions.keys().cloned().collect(),
            Value::List(_) | Value::Object(_) => Vec::new(),
        }
    }

    /// Text this leaf contributes to the free-text search blob.
    pub fn search_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Taxon(taxon) if taxon.authority.is_empty() => Some(taxon.name.clone()),
            Value::Taxon(taxon) => Some(format!("{} {}", taxon.name, taxon.authority)),
            Value::Media(media) => Some(media.title.clone()),
            Value::Regions(_) | Value::List(_) | Value::Object(_) => None,
        }
    }
}

/// Depth-first iterator over leaf values.
///
/// Holds only the pending nodes; calling [`Value::leaves`] again restarts
/// the walk.
pub struct Leaves<'a> {
    stack: Vec<&'a Value>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Value::List(items) => self.stack.extend(items.iter().rev()),
                Value::Object(children) => self.stack.extend(children.values().rev()),
                leaf => return Some(leaf),
            }
        }
        None
    }
}

/// Nodes found at `address` inside a data tree.
///
/// Lists met on the way are expanded, so `habit#.name` yields the `name`
/// of every habit item.
pub fn nodes_at<'a>(tree: &'a BTreeMap<String, Value>, address: &str) -> Vec<&'a Value> {
    let segments = path::segments(address);
    let mut current: Vec<&Value> = Vec::new();

    for (idx, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Name(name) if idx == 0 => {
                current.extend(tree.get(name));
            }
            Segment::Name(name) => {
                current = current
                    .into_iter()
                    .flat_map(|node| match node {
                        Value::List(items) => items.iter().collect::<Vec<_>>(),
                        other => vec![other],
                    })
                    .filter_map(|node| match node {
                        Value::Object(children) => children.get(name),
                        _ => None,
                    })
                    .collect();
            }
            Segment::Repeat => {
                current = current
                    .into_iter()
                    .flat_map(|node| match node {
                        Value::List(items) => items.iter().collect::<Vec<_>>(),
                        other => vec![other],
                    })
                    .collect();
            }
        }
    }
    current
}
