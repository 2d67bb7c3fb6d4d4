//! pron-coach library interface
//!
//! Pronunciation assessment pipeline: a speech engine scores a recording,
//! the parser turns the engine payload into an [`AssessmentResult`], and the
//! aggregator folds it into the learner's longitudinal [`LearnerProfile`].

pub mod aggregator;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod pipeline;
pub mod services;
pub mod store;

pub use crate::aggregator::{AggregatorConfig, PerformanceAggregator};
pub use crate::engine::{AzureSpeechClient, EngineOutcome, Granularity, SpeechEngine};
pub use crate::error::{AssessError, AssessResult};
pub use crate::models::{AssessmentResult, LearnerProfile};
pub use crate::orchestrator::{AssessmentOrchestrator, AssessmentRequest, OrchestratorConfig};
pub use crate::parser::{ResultParser, ScoreScale};
pub use crate::pipeline::{AssessmentOutcome, AssessmentPipeline};
pub use crate::services::ProfileService;
pub use crate::store::{InMemoryProfileStore, ProfileStore, SqliteProfileStore, StoredProfile};
