//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSCRUB_CONFIG` (environment variable)
//! 2. `~/.config/mailscrub/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailscrub\config.toml` (Windows)
//! 3. Built-in defaults, when no file exists (an unreadable or invalid file
//!    is a configuration error)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrubError};
use crate::export::ExportOptions;
use crate::parser::pst::readpst::DEFAULT_READPST;
use crate::parser::DEFAULT_MAX_NESTING_DEPTH;
use crate::pipeline::PipelineOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Name dictionary locations.
    pub names: NamesConfig,
    /// Parsing and parallelism.
    pub pipeline: PipelineConfig,
    /// Name redaction output layout.
    pub redaction: RedactionConfig,
    /// Outlook archive extraction.
    pub pst: PstConfig,
    /// Output directory layout.
    pub output: OutputConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override directory for the log file.
    pub log_dir: Option<PathBuf>,
}

/// Name dictionary files, one name per line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamesConfig {
    pub first_names: Option<PathBuf>,
    pub last_names: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker threads (0 = one per CPU, 1 = sequential).
    pub jobs: usize,
    /// Maximum depth of messages embedded in messages.
    pub max_nesting_depth: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Prefix every surviving token with a space, as older output did.
    pub legacy_leading_space: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PstConfig {
    /// Path to libpst's `readpst`.
    pub readpst_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write into a fresh `email-parser-output-<timestamp>` directory.
    pub timestamped_run_dir: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl Default for PstConfig {
    fn default() -> Self {
        Self {
            readpst_path: PathBuf::from(DEFAULT_READPST),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            timestamped_run_dir: true,
        }
    }
}

impl Config {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            jobs: self.pipeline.jobs,
            max_nesting_depth: self.pipeline.max_nesting_depth,
            readpst_path: self.pst.readpst_path.clone(),
            legacy_leading_space: self.redaction.legacy_leading_space,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            timestamped_run_dir: self.output.timestamped_run_dir,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration from [`config_file_path`], or the defaults when no
/// file exists there.
pub fn load_config() -> Result<Config> {
    match config_file_path() {
        Some(path) if path.exists() => read_config(&path),
        _ => Ok(Config::default()),
    }
}

/// Read and parse one config file. Unreadable or invalid files are
/// configuration errors rather than silently ignored.
pub fn read_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ScrubError::Configuration(format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = toml::from_str::<Config>(&contents).map_err(|e| {
        ScrubError::Configuration(format!("invalid config {}: {e}", path.display()))
    })?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSCRUB_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailscrub").join("config.toml"))
}

/// Directory the log file is written to.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailscrub")
}
