//! Herbarium CLI - Compile checklist workbooks and query the result
//!
//! Usage:
//!   herbarium validate [workbook.json]
//!   herbarium compile [workbook.json] [--output <file>] [--now <rfc3339>]
//!   herbarium query <checklist.json> [--language <code>] [--text <text>] [--saved <json> | --url <token>]
//!
//! Examples:
//!   herbarium validate flora.json
//!   herbarium compile flora.json --output checklist.json
//!   herbarium query checklist.json --saved '{"data":{"habitat":["forest"]}}'

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use herbarium::compile::{self, CompileOptions};
use herbarium::config::Settings;
use herbarium::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use herbarium::model::CompiledChecklist;
use herbarium::query::{FacetEngine, LoadOutcome};
use herbarium::table::Workbook;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "herbarium")]
#[command(about = "Herbarium - Compile taxonomic checklists and search them by facets")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to HERBARIUM_CONFIG, ./herbarium.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a workbook's schema tables without compiling rows
    Validate {
        /// Workbook JSON file (defaults to input.workbook from the settings)
        file: Option<PathBuf>,
    },

    /// Compile a workbook to checklist JSON
    Compile {
        /// Workbook JSON file (defaults to input.workbook from the settings)
        file: Option<PathBuf>,

        /// Write the checklist here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Timestamp recorded as lastUpdate (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Run a query against a compiled checklist
    Query {
        /// Compiled checklist JSON file
        file: PathBuf,

        /// Content language (defaults to the checklist's default language)
        #[arg(short, long)]
        language: Option<String>,

        /// Saved query JSON
        #[arg(long, conflicts_with = "url")]
        saved: Option<String>,

        /// Saved query in its URL form
        #[arg(long)]
        url: Option<String>,

        /// Free text to search for
        #[arg(short, long)]
        text: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "names")]
        format: OutputFormat,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// One line per result, ranks joined by " > "
    Names,
    /// Result entries as JSON
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("HERBARIUM_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Validate { file } => cmd_validate(&settings, file),
        Commands::Compile { file, output, now } => cmd_compile(&settings, file, output, now),
        Commands::Query {
            file,
            language,
            saved,
            url,
            text,
            format,
        } => cmd_query(&settings, file, language, saved, url, text, format),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, herbarium::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn read_workbook(settings: &Settings, file: Option<PathBuf>) -> Result<Workbook, String> {
    let file = match file {
        Some(file) => file,
        None => settings
            .input
            .resolved_workbook()
            .map_err(|e| e.to_string())?
            .ok_or("No workbook given and input.workbook is not set")?,
    };
    let source = fs::read_to_string(&file)
        .map_err(|e| format!("Error reading file '{}': {}", file.display(), e))?;
    Workbook::from_json_str(&source)
        .map_err(|e| format!("Error parsing workbook '{}': {}", file.display(), e))
}

/// Writes every reported diagnostic on its own line. This is the only place
/// the CLI prints diagnostics.
struct PrintSink<W: Write> {
    out: W,
}

impl<W: Write> PrintSink<W> {
    fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> DiagnosticSink for PrintSink<W> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        // Nothing useful to do when stderr itself is gone.
        let _ = writeln!(self.out, "  {}", diagnostic);
    }
}

fn cmd_validate(settings: &Settings, file: Option<PathBuf>) -> ExitCode {
    let workbook = match read_workbook(settings, file) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = CompileOptions::from_settings(&settings.compile);
    let diagnostics = compile::validate(&workbook, &options, &mut PrintSink::new(io::stderr()));
    let failed = diagnostics.iter().any(|d| d.severity >= Severity::Error);
    if failed {
        return ExitCode::FAILURE;
    }
    println!("OK: workbook is valid");
    ExitCode::SUCCESS
}

fn cmd_compile(
    settings: &Settings,
    file: Option<PathBuf>,
    output: Option<PathBuf>,
    now: Option<DateTime<Utc>>,
) -> ExitCode {
    let workbook = match read_workbook(settings, file) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut options = CompileOptions::from_settings(&settings.compile);
    if let Some(now) = now {
        options = options.with_now(now);
    }

    let result = compile::compile(&workbook, &options, &mut PrintSink::new(io::stderr()));

    let checklist = match result.into_result() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let json = match checklist.to_json_pretty() {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error serializing checklist: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = fs::write(&path, json) {
                eprintln!("Error writing '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
        None => println!("{}", json),
    }
    ExitCode::SUCCESS
}

fn cmd_query(
    settings: &Settings,
    file: PathBuf,
    language: Option<String>,
    saved: Option<String>,
    url: Option<String>,
    text: Option<String>,
    format: OutputFormat,
) -> ExitCode {
    let checklist = match fs::read_to_string(&file)
        .map_err(|e| e.to_string())
        .and_then(|s| CompiledChecklist::from_json_str(&s).map_err(|e| e.to_string()))
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading checklist '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let language = language.unwrap_or_else(|| checklist.general.default_language.clone());
    let Some(data) = checklist.language(&language) else {
        eprintln!("Language '{}' is not in the checklist", language);
        return ExitCode::FAILURE;
    };
    let mut engine = FacetEngine::with_settings(data, &settings.query);

    let outcome = match (saved, url) {
        (Some(json), _) => Some(engine.load_query(&json)),
        (None, Some(token)) => Some(engine.load_query_from_url(&token)),
        (None, None) => None,
    };
    if let Some(LoadOutcome::FellBack(e)) = &outcome {
        eprintln!("Warning: saved query ignored: {}", e);
    }
    if let Some(text) = text {
        engine.set_free_text(&text);
    }

    let rows = engine.current_results();
    match format {
        OutputFormat::Names => {
            for row in rows {
                let marker = if row.is_synthesized() { "  (ancestor)" } else { "" };
                println!("{}{}", row.entry.rank_names().join(" > "), marker);
            }
        }
        OutputFormat::Json => {
            let entries: Vec<_> = rows.iter().map(|row| &row.entry).collect();
            match serde_json::to_string_pretty(&entries) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing results: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }
    eprintln!("{} matching entries, {} rows", engine.matched().len(), rows.len());
    ExitCode::SUCCESS
}
