//! End-to-end compilation from a workbook to a [`CompiledChecklist`].
//!
//! ```text
//! Workbook → validate → build schema → extract rows → CompiledChecklist
//!            (phase 1)  (phase 2)      (phase 3)
//! ```
//!
//! Each phase only runs when the previous ones recorded no error. A critical
//! diagnostic stops everything at once.
//!
//! # Example
//!
//! ```ignore
//! use herbarium::compile::{compile, CompileOptions};
//! use herbarium::diagnostics::TracingSink;
//!
//! let workbook = Workbook::from_json_str(&std::fs::read_to_string("flora.json")?)?;
//! let output = compile(&workbook, &CompileOptions::default(), &mut TracingSink);
//! let checklist = output.into_result()?;
//! println!("{}", checklist.to_json_pretty()?);
//! ```

pub mod catalogue;
pub mod etl;
pub mod readers;

pub use etl::{EtlOptions, ITEM_SEPARATOR};
pub use readers::{LeafContext, LeafReader, ReaderRegistry, RowCells};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::CompileSettings;
use crate::diagnostics::{fill, templates, Diagnostic, DiagnosticLog, DiagnosticSink, Severity};
use crate::model::{CompiledChecklist, General, LanguageData};
use crate::schema::{self, Schema};
use crate::table::Workbook;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that withhold the compiled output.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Compilation stopped: {0}")]
    Critical(String),

    #[error("Compilation reported {count} error(s), first: {first}")]
    Errors { count: usize, first: String },
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Timestamp written as `lastUpdate`. Fix it for reproducible output.
    pub now: DateTime<Utc>,

    /// Name of the table holding the checklist rows.
    pub checklist_table: String,

    /// Interface languages available to resolve content languages against.
    pub ui_languages: Vec<String>,

    /// Date pattern used when the project does not customize one.
    pub date_format: String,

    /// Highest numeric suffix probed for repeated media columns.
    pub media_probe_limit: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from_settings(&CompileSettings::default())
    }
}

impl CompileOptions {
    pub fn from_settings(settings: &CompileSettings) -> Self {
        Self {
            now: Utc::now(),
            checklist_table: settings.checklist_table.clone(),
            ui_languages: settings.ui_languages.clone(),
            date_format: settings.date_format.clone(),
            media_probe_limit: settings.media_probe_limit,
        }
    }

    /// Set the compilation timestamp.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Set the checklist table name.
    pub fn with_checklist_table(mut self, name: impl Into<String>) -> Self {
        self.checklist_table = name.into();
        self
    }

    fn etl(&self) -> EtlOptions {
        EtlOptions {
            date_format: self.date_format.clone(),
            media_probe_limit: self.media_probe_limit,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result of a compilation run.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// Present once extraction ran, even if it reported errors.
    pub checklist: Option<CompiledChecklist>,

    /// Every retained diagnostic, in the order recorded.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity >= Severity::Error)
    }

    /// The checklist, unless any error or critical diagnostic was recorded.
    pub fn into_result(self) -> CompileResult<CompiledChecklist> {
        if let Some(critical) = self
            .diagnostics
            .iter()
            .find(|d| d.severity == Severity::Critical)
        {
            return Err(CompileError::Critical(critical.message.clone()));
        }
        let mut errors = self
            .diagnostics
            .iter()
            .filter(|d| d.severity >= Severity::Error);
        if let Some(first) = errors.next() {
            return Err(CompileError::Errors {
                count: errors.count() + 1,
                first: first.message.clone(),
            });
        }
        self.checklist
            .ok_or_else(|| CompileError::Critical("no checklist was produced".to_string()))
    }
}

// ============================================================================
// Compilation Functions
// ============================================================================

/// Run the validation and schema phases only.
pub fn validate(
    workbook: &Workbook,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> Vec<Diagnostic> {
    let mut log = DiagnosticLog::new();
    let registry = ReaderRegistry::standard();
    prepare(workbook, options, &registry, &mut log);
    log.emit(sink);
    log.into_vec()
}

/// Compile a workbook with the built-in readers.
pub fn compile(
    workbook: &Workbook,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> CompileOutput {
    compile_with(workbook, options, &ReaderRegistry::standard(), sink)
}

/// Compile a workbook with a caller-supplied reader registry.
pub fn compile_with(
    workbook: &Workbook,
    options: &CompileOptions,
    registry: &ReaderRegistry,
    sink: &mut dyn DiagnosticSink,
) -> CompileOutput {
    let mut log = DiagnosticLog::new();
    let checklist = prepare(workbook, options, registry, &mut log)
        .and_then(|schema| assemble(workbook, &schema, registry, options, &mut log));

    info!(
        compiled = checklist.is_some(),
        diagnostics = log.len(),
        errors = log.errors().count(),
        "compilation finished"
    );
    log.emit(sink);
    CompileOutput {
        checklist,
        diagnostics: log.into_vec(),
    }
}

/// Phases 1 and 2. Returns the schema when no error was recorded.
fn prepare(
    workbook: &Workbook,
    options: &CompileOptions,
    registry: &ReaderRegistry,
    log: &mut DiagnosticLog,
) -> Option<Schema> {
    let validated = schema::validate(
        workbook,
        &options.checklist_table,
        &options.ui_languages,
        log,
    )?;
    if log.has_errors() {
        debug!(diagnostics = log.len(), "validation failed, schema not built");
        return None;
    }

    let schema = schema::build(workbook, &validated, log);
    registry.check_coverage(&schema, log);
    if log.has_errors() {
        debug!(diagnostics = log.len(), "schema post-processing failed");
        return None;
    }
    Some(schema)
}

/// Phase 3.
fn assemble(
    workbook: &Workbook,
    schema: &Schema,
    registry: &ReaderRegistry,
    options: &CompileOptions,
    log: &mut DiagnosticLog,
) -> Option<CompiledChecklist> {
    let Some(table) = workbook.table(&options.checklist_table) else {
        log.critical(fill(templates::MISSING_TABLE, &[&options.checklist_table]));
        return None;
    };
    let etl_options = options.etl();

    let mut per_language = BTreeMap::new();
    for (code, language) in &schema.per_language {
        let entries = etl::extract(
            table,
            &options.checklist_table,
            language,
            schema.default_language(),
            registry,
            &etl_options,
            log,
        );
        per_language.insert(
            code.clone(),
            LanguageData {
                display_meta: catalogue::display_meta(language, &options.date_format),
                facet_meta: catalogue::facet_catalogue(language),
                entries,
            },
        );
    }

    let bibliography_source = schema
        .language(schema.default_language())
        .and_then(|language| language.customization.bibliography.clone());

    Some(CompiledChecklist {
        general: General {
            last_update: options.now,
            default_language: schema.default_language().to_string(),
            languages: schema.languages.list.clone(),
            assets: catalogue::collect_assets(schema, &per_language),
            bibliography_source,
        },
        per_language,
    })
}
