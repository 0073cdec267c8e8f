//! # Herbarium
//!
//! Compiles spreadsheet-authored taxonomic checklists into a multilingual
//! record store and searches it by facets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Workbook (raw tables of cells)              │
//! │  (schema tables + the checklist table)                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema: integrity pass, manual checks]
//! ┌─────────────────────────────────────────────────────────┐
//! │            Schema (per-language column definitions)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compile: row extraction, catalogue]
//! ┌─────────────────────────────────────────────────────────┐
//! │        CompiledChecklist (entries, facets, display)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query]
//! ┌─────────────────────────────────────────────────────────┐
//! │              FacetEngine (filtered result rows)          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Addresses ([`path`]) name columns and record fields throughout; problems
//! in user content are reported as [`diagnostics`], never as panics.

pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod model;
pub mod path;
pub mod query;
pub mod schema;
pub mod table;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{compile, CompileError, CompileOptions, CompileOutput};
    pub use crate::config::Settings;
    pub use crate::diagnostics::{Diagnostic, DiagnosticLog, DiagnosticSink, Severity, TracingSink};
    pub use crate::model::{CompiledChecklist, Entry, RankNode, Value};
    pub use crate::query::{
        FacetEngine, FacetGroup, LoadOutcome, Operator, QueryError, QueryResult, SavedQuery,
    };
    pub use crate::table::{Cell, RawTable, Workbook};
}

// Also export at crate root for convenience
pub use compile::{compile, CompileOptions};
pub use model::CompiledChecklist;
pub use query::FacetEngine;
pub use table::Workbook;
