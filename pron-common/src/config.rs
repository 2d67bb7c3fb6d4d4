//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration lives in a single TOML file. Every section is
//! optional; missing keys fall back to built-in defaults defined here.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`PRON_ROOT_FOLDER`, `PRON_SPEECH_KEY`, ...)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory / file name used under the platform config and data dirs
pub const APP_DIR_NAME: &str = "pron-coach";

/// Database file created inside the root folder
pub const DATABASE_FILE_NAME: &str = "pron-coach.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Root folder holding the profile database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path; overrides `<root_folder>/pron-coach.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Speech engine connection settings
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Scoring and aggregation settings
    #[serde(default)]
    pub assessment: AssessmentConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Speech engine connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechConfig {
    /// Subscription key (prefer `PRON_SPEECH_KEY` over storing it here)
    #[serde(default)]
    pub key: Option<String>,

    /// Service region, e.g. "eastus"
    #[serde(default)]
    pub region: Option<String>,

    /// Recognition language
    #[serde(default = "default_language")]
    pub language: String,

    /// Upper bound on a single engine call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            key: None,
            region: None,
            language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Scoring and aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentConfig {
    /// Word accuracy below this value counts as a mispronunciation (0-100)
    #[serde(default = "default_threshold")]
    pub mispronunciation_threshold: f64,

    /// Number of confusion candidates retained per phoneme
    #[serde(default = "default_top_k")]
    pub confusion_top_k: usize,

    /// Number of assessments kept in a learner's history (0 disables history)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Best-N alternative phonemes requested from the engine
    #[serde(default = "default_nbest_phoneme_count")]
    pub nbest_phoneme_count: u8,

    /// Phoneme alphabet ("IPA" or "SAPI")
    #[serde(default = "default_phoneme_alphabet")]
    pub phoneme_alphabet: String,

    /// Native score scale of the engine ("percent" for 0-100, "unit" for 0-1)
    #[serde(default = "default_score_scale")]
    pub score_scale: String,

    /// Request prosody assessment from the engine
    #[serde(default = "default_true")]
    pub enable_prosody: bool,

    /// Request miscue (omission/insertion) detection from the engine
    #[serde(default = "default_true")]
    pub enable_miscue: bool,

    /// Attempts made when a profile save hits a version conflict
    #[serde(default = "default_merge_attempts")]
    pub merge_retry_attempts: u32,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            mispronunciation_threshold: default_threshold(),
            confusion_top_k: default_top_k(),
            history_limit: default_history_limit(),
            nbest_phoneme_count: default_nbest_phoneme_count(),
            phoneme_alphabet: default_phoneme_alphabet(),
            score_scale: default_score_scale(),
            enable_prosody: true,
            enable_miscue: true,
            merge_retry_attempts: default_merge_attempts(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_threshold() -> f64 {
    60.0
}

fn default_top_k() -> usize {
    5
}

fn default_history_limit() -> usize {
    20
}

fn default_nbest_phoneme_count() -> u8 {
    5
}

fn default_phoneme_alphabet() -> String {
    "IPA".to_string()
}

fn default_score_scale() -> String {
    "percent".to_string()
}

fn default_true() -> bool {
    true
}

fn default_merge_attempts() -> u32 {
    3
}

impl TomlConfig {
    /// Resolve the database path: explicit path, else `<root>/pron-coach.db`
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME))
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let a = &self.assessment;
        if !(0.0..=100.0).contains(&a.mispronunciation_threshold) {
            return Err(Error::Config(format!(
                "assessment.mispronunciation_threshold must be within 0-100, got {}",
                a.mispronunciation_threshold
            )));
        }
        if a.confusion_top_k == 0 {
            return Err(Error::Config(
                "assessment.confusion_top_k must be at least 1".to_string(),
            ));
        }
        if a.merge_retry_attempts == 0 {
            return Err(Error::Config(
                "assessment.merge_retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.speech.timeout_secs == 0 {
            return Err(Error::Config(
                "speech.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load and validate a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    debug!(path = %path.display(), "Loaded TOML configuration");
    Ok(config)
}

/// Load configuration from an explicit path, the default location, or built-in defaults
///
/// An explicitly supplied path must exist; the default location is optional.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_toml_config(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => load_toml_config(&path),
        _ => Ok(TomlConfig::default()),
    }
}

/// Write configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config value
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./pron_coach_data"))
}
