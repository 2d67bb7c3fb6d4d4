//! pron-coach - Pronunciation assessment CLI
//!
//! Scores a recording against its reference text, merges the result into the
//! learner's profile, and reports where the learner keeps struggling.
//!
//! Subcommands:
//! - `assess`: send a WAV file to the speech engine and record the result
//! - `ingest`: record a previously captured engine payload (no engine call)
//! - `profile`: show a learner's weakest phonemes and trouble words
//! - `init-config`: write a default configuration file to edit

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pron_common::config::{load_or_default, LoggingConfig};
use pron_coach::config::{
    init_config_file, resolve_database_path, resolve_speech_key, resolve_speech_region,
    CoachConfig,
};
use pron_coach::{
    AssessmentOrchestrator, AssessmentOutcome, AssessmentPipeline, AssessmentRequest,
    AzureSpeechClient, Granularity, LearnerProfile, PerformanceAggregator, ProfileService,
    ResultParser, SqliteProfileStore,
};

/// Command-line arguments for pron-coach
#[derive(Parser, Debug)]
#[command(name = "pron-coach")]
#[command(about = "Pronunciation assessment and learner progress tracking")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "PRON_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the profile database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a WAV recording and merge it into the learner's profile
    Assess {
        #[arg(short, long)]
        learner: String,

        /// Text the learner was asked to read
        #[arg(short, long)]
        text: String,

        /// WAV file (16 kHz mono PCM)
        audio: PathBuf,

        /// phoneme, word or full-text
        #[arg(short, long, default_value = "phoneme")]
        granularity: Granularity,

        /// Override the configured engine timeout
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the result without updating the profile
        #[arg(long)]
        dry_run: bool,
    },

    /// Merge a captured engine payload (detailed JSON result) into a profile
    Ingest {
        #[arg(short, long)]
        learner: String,

        /// Engine JSON payload file
        payload: PathBuf,

        /// Recognized text; defaults to the payload's DisplayText
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Show a learner's profile, or list learners when none is given
    Profile {
        #[arg(short, long)]
        learner: Option<String>,

        /// Entries shown per section
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Phonemes with fewer attempts are left out of the weakest list
        #[arg(long, default_value = "1")]
        min_attempts: u32,

        /// Print the full profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file (to --config or the platform location)
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { force } = args.command {
        let path = init_config_file(args.config.as_deref(), force)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let toml_config =
        load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&toml_config.logging)?;

    let coach_config =
        CoachConfig::from_toml(&toml_config).context("Invalid configuration values")?;

    let db_path = resolve_database_path(args.root_folder.as_deref(), &toml_config);
    info!("Database: {}", db_path.display());

    let pool = pron_coach::db::init_database_pool(&db_path)
        .await
        .context("Failed to open profile database")?;

    let profiles = ProfileService::new(
        Arc::new(SqliteProfileStore::new(pool)),
        PerformanceAggregator::new(coach_config.aggregator.clone()),
    );
    let parser = ResultParser::new(coach_config.score_scale);

    match args.command {
        Command::Assess {
            learner,
            text,
            audio,
            granularity,
            timeout_secs,
            dry_run,
        } => {
            let key = resolve_speech_key(&toml_config)?;
            let region = resolve_speech_region(&toml_config)?;
            let engine = AzureSpeechClient::new(key, &region)?;
            let orchestrator =
                AssessmentOrchestrator::new(Arc::new(engine), coach_config.orchestrator.clone());
            let pipeline = AssessmentPipeline::new(orchestrator, parser, profiles)
                .with_merge_attempts(coach_config.merge_attempts);

            let audio_bytes = std::fs::read(&audio)
                .with_context(|| format!("Failed to read audio file {}", audio.display()))?;

            let mut request = AssessmentRequest::new(learner, audio_bytes, text, granularity);
            if let Some(secs) = timeout_secs {
                request = request.with_timeout(Duration::from_secs(secs));
            }

            let cancel = cancel_on_ctrl_c();
            if dry_run {
                let result = pipeline.assess(&request, &cancel).await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let outcome = pipeline.assess_and_record(&request, &cancel).await?;
                print_outcome(&outcome, coach_config.aggregator.mispronunciation_threshold);
            }
        }

        Command::Ingest {
            learner,
            payload,
            text,
        } => {
            let pipeline = AssessmentPipeline::offline(parser, profiles)
                .with_merge_attempts(coach_config.merge_attempts);
            let payload_json = read_payload(&payload)?;
            let outcome = pipeline
                .ingest(&learner, &payload_json, text.as_deref())
                .await?;
            print_outcome(&outcome, coach_config.aggregator.mispronunciation_threshold);
        }

        Command::Profile {
            learner,
            limit,
            min_attempts,
            json,
        } => match learner {
            None => {
                for id in profiles.learners().await? {
                    println!("{}", id);
                }
            }
            Some(learner) => match profiles.profile(&learner).await? {
                None => warn!(learner_id = %learner, "No profile recorded for learner"),
                Some(profile) if json => println!("{}", serde_json::to_string_pretty(&profile)?),
                Some(profile) => print_profile(&profile, limit, min_attempts),
            },
        },

        // Handled before configuration is loaded
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

/// RUST_LOG wins; otherwise the configured level. Logs go to the configured
/// file when set, else stderr.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (stderr_layer, file_layer) = match &logging.file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Token canceled on Ctrl+C so an in-flight engine call is abandoned cleanly
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, canceling assessment");
            child.cancel();
        }
    });
    token
}

fn read_payload(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file {}", path.display()))
}

fn print_outcome(outcome: &AssessmentOutcome, threshold: f64) {
    let result = &outcome.result;
    println!("Recognized:    {}", result.recognized_text);
    println!(
        "Accuracy {:.1}  Fluency {:.1}  Pronunciation {:.1}",
        result.accuracy_score, result.fluency_score, result.pronunciation_score
    );
    for word in result.mispronounced_words(threshold) {
        println!(
            "  {:<16} {:>5.1}  {:?}",
            word.word, word.accuracy_score, word.error_type
        );
    }
    println!(
        "Profile '{}': {} assessments recorded",
        outcome.profile.learner_id, outcome.profile.total_assessments
    );
}

fn print_profile(profile: &LearnerProfile, limit: usize, min_attempts: u32) {
    println!(
        "Learner '{}': {} assessments since {}",
        profile.learner_id,
        profile.total_assessments,
        profile.created_at.format("%Y-%m-%d")
    );

    println!("Weakest phonemes:");
    for entry in profile.weakest_phonemes(limit, min_attempts) {
        let confusions: Vec<String> = entry
            .common_confusions
            .iter()
            .map(|c| format!("{} x{}", c.phoneme, c.frequency))
            .collect();
        println!(
            "  /{}/ avg {:.1} over {} attempts  heard as: {}",
            entry.phoneme,
            entry.average_accuracy,
            entry.total_attempts,
            if confusions.is_empty() {
                "-".to_string()
            } else {
                confusions.join(", ")
            }
        );
    }

    println!("Trouble words:");
    for word in profile.top_trouble_words(limit) {
        println!(
            "  {:<16} x{}  last {}",
            word.word,
            word.frequency,
            word.last_encountered.format("%Y-%m-%d %H:%M")
        );
    }
}
