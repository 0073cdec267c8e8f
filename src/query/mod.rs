//! Facet/query engine over a compiled record set.
//!
//! A query is the conjunction of
//!
//! - rank facets: the entry's rank name at the facet's depth is selected
//! - data facets: any leaf at the facet's address is selected, or satisfies
//!   the numeric comparator
//! - free text: the folded text occurs at a word start in the entry's
//!   search blob
//!
//! Results are memoized under a canonical key ([`key::query_key`]) and the
//! active query can be saved as JSON or as a URL-safe token.

pub mod cache;
pub mod engine;
pub mod facet;
pub mod key;
pub mod operator;
pub mod saved;
pub mod text;

pub use engine::{FacetEngine, LoadOutcome, ResultRow};
pub use facet::{FacetGroup, FacetId, FacetState, NumericRange};
pub use operator::Operator;
pub use saved::{NumericSelection, SavedQuery, Selection};

/// Errors returned by the query engine.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Unknown facet: {0}")]
    UnknownFacet(String),

    #[error("Facet {facet} is not {expected}")]
    KindMismatch {
        facet: String,
        expected: &'static str,
    },

    #[error("Operator '{0}' needs a second threshold")]
    MissingThreshold(Operator),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Failed to serialize query: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type QueryResult<T> = Result<T, QueryError>;
