//! Saved queries: the JSON form of a facet selection.
//!
//! ```json
//! {"taxa":{"family":["Rosaceae"]},"data":{"habitat":["forest"],"size":{"operator":"between","threshold1":1,"threshold2":5}},"text":"gallica"}
//! ```
//!
//! Empty parts are omitted. The URL form is the same JSON in unpadded
//! URL-safe base64.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::operator::Operator;
use super::{QueryError, QueryResult};

/// An active numeric comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NumericSelection {
    pub operator: Operator,
    pub threshold1: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold2: Option<f64>,
}

impl NumericSelection {
    pub fn matches(&self, value: f64) -> bool {
        self.operator
            .matches(value, self.threshold1, self.threshold2)
    }
}

/// Selection of one data facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Values(Vec<String>),
    Numeric(NumericSelection),
}

/// Every active selection plus the free text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SavedQuery {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub taxa: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Selection>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl SavedQuery {
    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty() && self.data.is_empty() && self.text.trim().is_empty()
    }

    pub fn to_json(&self) -> QueryResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> QueryResult<Self> {
        serde_json::from_str(json).map_err(|err| QueryError::MalformedQuery(err.to_string()))
    }

    pub fn to_url(&self) -> QueryResult<String> {
        Ok(URL_SAFE_NO_PAD.encode(self.to_json()?))
    }

    pub fn from_url(encoded: &str) -> QueryResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|err| QueryError::MalformedQuery(err.to_string()))?;
        let json =
            String::from_utf8(bytes).map_err(|err| QueryError::MalformedQuery(err.to_string()))?;
        Self::from_json(&json)
    }
}
