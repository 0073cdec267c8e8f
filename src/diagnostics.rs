//! Diagnostics produced while checking and compiling a checklist.
//!
//! Three severities are used:
//!
//! - **warning**: a cosmetic or metadata inconsistency; processing continues
//!   and the affected value passes through unchanged.
//! - **error**: content violates a declared rule; the current pass keeps going
//!   so every correctable problem is reported at once, but later compilation
//!   phases are withheld.
//! - **critical**: the schema itself is unreadable; compilation halts.
//!
//! Messages are built from the templates in [`templates`], whose positional
//! placeholders (`{0}`, `{1}`, ...) are filled by [`fill`]. Localizing the
//! template text is left to whoever consumes the diagnostics.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagnostic severity level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Processing continues, value passed through.
    Warning,
    /// A declared rule is violated; later phases are withheld.
    Error,
    /// The schema is unreadable; compilation halts.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        write!(f, "{}", level)
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Receiver for diagnostics, supplied by the caller.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: &Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

/// Sink that forwards every diagnostic to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!("{}", diagnostic.message),
            Severity::Error | Severity::Critical => tracing::error!(
                severity = %diagnostic.severity,
                "{}",
                diagnostic.message
            ),
        }
    }
}

/// Ordered, de-duplicated diagnostic log.
///
/// Entries are unique by `(severity, message)`. Only the first critical
/// diagnostic is retained.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
    seen: HashSet<(Severity, String)>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. Returns `false` when it was dropped as a duplicate.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        if diagnostic.severity == Severity::Critical && self.has_critical() {
            return false;
        }
        let key = (diagnostic.severity, diagnostic.message.clone());
        if !self.seen.insert(key) {
            return false;
        }
        self.entries.push(diagnostic);
        true
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::warning(message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::error(message));
    }

    pub fn critical(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::critical(message));
    }

    /// True once any error or critical diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity >= Severity::Error)
    }

    pub fn has_critical(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == Severity::Critical)
    }

    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity >= Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hand every retained diagnostic to `sink`, in order.
    pub fn emit(&self, sink: &mut dyn DiagnosticSink) {
        for diagnostic in &self.entries {
            sink.report(diagnostic);
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// Replace `{0}`, `{1}`, ... in `template` with the matching argument.
pub fn fill(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    for (idx, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{}}}", idx), arg);
    }
    out
}

/// Message templates used by the schema engine and the compiler.
pub mod templates {
    pub const MISSING_TABLE: &str = "Table '{0}' is missing from the workbook";
    pub const MISSING_COLUMN: &str = "Column '{0}' is missing in table '{1}'";
    pub const EMPTY_VALUE: &str = "Column '{0}' in table '{1}' must not be empty (row {2})";
    pub const INVALID_VALUE: &str =
        "Value '{0}' in column '{1}' of table '{2}' is not a valid {3} (row {4})";
    pub const DUPLICATE_VALUE: &str =
        "Value '{0}' appears more than once in column '{1}' of table '{2}'";
    pub const NO_LANGUAGES: &str = "Table '{0}' declares no supported language";
    pub const UNRESOLVED_LANGUAGE: &str =
        "Language '{0}' has no interface translation and no usable fallback language";
    pub const ILLEGAL_ATTRIBUTE: &str = "'{0}' cannot be used on '{1}': {2}";
    pub const CLEARED_ATTRIBUTE: &str =
        "'{0}' was ignored on hidden column '{1}': {2}";
    pub const MISSING_PARENT: &str =
        "Column '{0}' requires '{1}' to be declared in table '{2}'";
    pub const UNKNOWN_KEYWORD: &str = "Unknown {0} '{1}'";
    pub const UNKNOWN_REFERENCE: &str =
        "Column '{0}' in table '{1}' does not refer to a declared data column";
    pub const INVALID_CUSTOMIZATION: &str = "Customization item '{0}' has an invalid value '{1}'";
    pub const UNREGISTERED_FORMATTING: &str = "No reader is registered for formatting '{0}' used by '{1}'";
    pub const MISSING_CHECKLIST_COLUMN: &str = "Column '{0}' is declared but missing in table '{1}'";
    pub const NON_CONTIGUOUS_RANKS: &str = "Row {0} has a gap between its taxon ranks ('{1}' is empty)";
    pub const NO_TAXON: &str = "Row {0} has data but no taxon name";
    pub const NON_CONTIGUOUS_ARRAY: &str =
        "Row {0}: items of '{1}' are not contiguous, empty item {2} was skipped";
    pub const NOT_A_NUMBER: &str = "Value '{0}' in '{1}' is not a number";
    pub const UNPARSEABLE_DATE: &str = "Value '{0}' in '{1}' is not a recognizable date";
    pub const UNKNOWN_DATA_CODE: &str = "Value '{0}' in '{1}' has no data code replacement";
    pub const UNKNOWN_REGION: &str = "Region '{0}' in '{1}' does not match the region pattern of its map";
}
