//! TOML-based configuration for herbarium.
//!
//! Supports a config file (herbarium.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [compile]
//! ui_languages = ["en", "fr", "cs"]
//! date_format = "%d. %m. %Y"
//! checklist_table = "checklist"
//! media_probe_limit = 50
//!
//! [query]
//! cache_enabled = true
//!
//! [input]
//! workbook = "${HOME}/checklists/flora.json"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Compilation settings.
    pub compile: CompileSettings,

    /// Query engine settings.
    pub query: QuerySettings,

    /// Input locations.
    pub input: InputSettings,
}

/// Compilation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompileSettings {
    /// Interface languages the application ships translations for.
    pub ui_languages: Vec<String>,

    /// Date pattern used when the project does not customize one.
    pub date_format: String,

    /// Name of the table holding the checklist rows.
    pub checklist_table: String,

    /// Highest numeric suffix probed for repeated media columns.
    pub media_probe_limit: usize,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            ui_languages: vec!["en".to_string()],
            date_format: "%Y-%m-%d".to_string(),
            checklist_table: "checklist".to_string(),
            media_probe_limit: 50,
        }
    }
}

/// Query engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Memoize query results.
    pub cache_enabled: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
        }
    }
}

/// Input locations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InputSettings {
    /// Default workbook JSON file (supports ${ENV_VAR} expansion).
    pub workbook: Option<String>,
}

impl InputSettings {
    /// Get the workbook path with environment variables expanded.
    pub fn resolved_workbook(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.workbook
            .as_deref()
            .map(|path| expand_env_vars(path).map(PathBuf::from))
            .transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `HERBARIUM_CONFIG`
    /// 2. `./herbarium.toml`
    /// 3. `~/.config/herbarium/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("HERBARIUM_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("herbarium.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("herbarium").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.compile.checklist_table.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "compile.checklist_table must not be empty".to_string(),
            ));
        }
        if self.compile.media_probe_limit == 0 {
            return Err(SettingsError::InvalidConfig(
                "compile.media_probe_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
