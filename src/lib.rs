//! Support Signal - staff-in-the-loop student support scoring
//!
//! Support Signal turns weekly per-student indicators (grades, absences,
//! tardies, discipline events, truancy days) into an explainable 0-100
//! support signal through a deterministic pipeline: guardrails → table
//! adaptation → context calibration → normalization → weighting → recency
//! aggregation → explanation.
//!
//! The score is decision support for staff. It never uses protected
//! attributes or PII: the guardrails strip such columns before any value
//! reaches the engine.
//!
//! ## Modules
//!
//! - **Scoring**: [`ScoreComposer`] and the batch helpers in [`pipeline`]
//! - **Explanations**: [`ExplanationBuilder`] compares a student to a school benchmark
//! - **Features**: [`FeatureBuilder`] summarizes recent raw values

pub mod config;
pub mod context;
pub mod error;
pub mod explain;
pub mod features;
pub mod guardrails;
pub mod normalizer;
pub mod pipeline;
pub mod recency;
pub mod schema;
pub mod scoring;
pub mod types;

pub use config::{ScoringConfig, WeightConfig};
pub use error::ComputeError;
pub use explain::{ExplanationBuilder, ExplanationReport, IndicatorExplanation, DISCLAIMER};
pub use features::{FeatureBuilder, StudentFeatures};
pub use guardrails::GuardrailResult;
pub use pipeline::{prepare_students, score_students, Assessment, SupportEngine};
pub use scoring::ScoreComposer;

// Schema exports
pub use schema::{RawTable, TableAdapter};

// Domain types
pub use types::{
    Anchors, BenchmarkTable, Metric, SchoolBenchmark, ScoredRow, ScoredSeries, StudentRecord,
    StudentSeries,
};

/// Engine version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "support-signal";
