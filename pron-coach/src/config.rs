//! Configuration resolution for pron-coach
//!
//! Turns the shared [`TomlConfig`] plus environment into the concrete
//! settings each component is constructed with.
//!
//! Speech credentials resolve ENV → TOML so keys need not be written to disk.

use pron_common::config::{
    default_config_path, resolve_root_folder, write_toml_config, TomlConfig,
};
use pron_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::aggregator::AggregatorConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::parser::ScoreScale;

pub const ROOT_FOLDER_ENV: &str = "PRON_ROOT_FOLDER";
pub const SPEECH_KEY_ENV: &str = "PRON_SPEECH_KEY";
pub const SPEECH_REGION_ENV: &str = "PRON_SPEECH_REGION";

/// Resolve the speech subscription key
///
/// **Priority:** ENV (`PRON_SPEECH_KEY`) → TOML `[speech] key`
pub fn resolve_speech_key(toml_config: &TomlConfig) -> Result<String> {
    resolve_setting(
        "Speech subscription key",
        SPEECH_KEY_ENV,
        toml_config.speech.key.as_deref(),
    )
    .ok_or_else(|| {
        Error::Config(format!(
            "Speech subscription key not configured. Please configure using one of:\n\
             1. Environment: {}=your-key-here\n\
             2. TOML config: [speech] key = \"your-key\"",
            SPEECH_KEY_ENV
        ))
    })
}

/// Resolve the speech service region
///
/// **Priority:** ENV (`PRON_SPEECH_REGION`) → TOML `[speech] region`
pub fn resolve_speech_region(toml_config: &TomlConfig) -> Result<String> {
    resolve_setting(
        "Speech region",
        SPEECH_REGION_ENV,
        toml_config.speech.region.as_deref(),
    )
    .ok_or_else(|| {
        Error::Config(format!(
            "Speech region not configured. Set {} or [speech] region in the TOML config",
            SPEECH_REGION_ENV
        ))
    })
}

fn resolve_setting(label: &str, env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment and TOML config. Using environment (highest priority).",
            label
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", label);
        return Some(value);
    }

    toml_value.map(|value| {
        info!("{} loaded from TOML config", label);
        value.to_string()
    })
}

/// Validate a credential value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Profile database location: `database_path` if set, else `<root>/pron-coach.db`
pub fn resolve_database_path(cli_root: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    let root = resolve_root_folder(cli_root, ROOT_FOLDER_ENV, toml_config);
    toml_config.database_path(&root)
}

/// Component settings derived from the TOML config
#[derive(Debug, Clone, PartialEq)]
pub struct CoachConfig {
    pub aggregator: AggregatorConfig,
    pub orchestrator: OrchestratorConfig,
    pub score_scale: ScoreScale,
    pub merge_attempts: u32,
}

impl CoachConfig {
    pub fn from_toml(toml_config: &TomlConfig) -> Result<Self> {
        toml_config.validate()?;

        let assessment = &toml_config.assessment;
        let score_scale = assessment
            .score_scale
            .parse::<ScoreScale>()
            .map_err(Error::Config)?;

        Ok(Self {
            aggregator: AggregatorConfig::from(assessment),
            orchestrator: OrchestratorConfig::from_config(&toml_config.speech, assessment)?,
            score_scale,
            merge_attempts: assessment.merge_retry_attempts,
        })
    }
}

/// Write a default configuration file for the user to edit
///
/// Targets `explicit` when given, else the platform config location. An
/// existing file is only replaced when `force` is set.
pub fn init_config_file(explicit: Option<&Path>, force: bool) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path().ok_or_else(|| {
            Error::Config("No platform config directory; pass --config".to_string())
        })?,
    };

    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists; use --force to overwrite",
            path.display()
        )));
    }

    write_toml_config(&TomlConfig::default(), &path)?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(path)
}
