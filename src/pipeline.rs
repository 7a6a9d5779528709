//! Pipeline orchestration
//!
//! This module provides the public API for Support Signal. It runs the full
//! path from a raw student table to scores and explanation reports:
//!
//! 1. Guardrails - remove protected/PII columns, reject missing required columns
//! 2. TableAdapter - parse records and split them into sorted per-student series
//! 3. ScoreComposer - calibrate, normalize, weight and recency-aggregate
//! 4. ExplanationBuilder - rank indicators and summarize recent changes
//!
//! Every call is independent: the engine only holds the read-only benchmark
//! table, so one engine can be shared across threads.

use crate::config::ScoringConfig;
use crate::error::ComputeError;
use crate::explain::{ExplanationBuilder, ExplanationReport};
use crate::guardrails::{self, GuardrailResult};
use crate::schema::{RawTable, TableAdapter};
use crate::scoring::ScoreComposer;
use crate::types::{BenchmarkTable, ScoredSeries, StudentSeries};
use serde::Serialize;

/// Student data that passed the guardrails
#[derive(Debug, Clone)]
pub struct PreparedStudents {
    pub guardrails: GuardrailResult,
    pub series: Vec<StudentSeries>,
}

impl PreparedStudents {
    /// The series for one student
    pub fn student(&self, student_id: i64) -> Result<&StudentSeries, ComputeError> {
        self.series
            .iter()
            .find(|s| s.student_id() == student_id)
            .ok_or(ComputeError::StudentNotFound(student_id))
    }
}

/// Score plus report for one student
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub scored: ScoredSeries,
    pub report: ExplanationReport,
}

/// Run guardrails and parse a raw student table into per-student series
pub fn prepare_students(raw: &RawTable) -> Result<PreparedStudents, ComputeError> {
    let (cleaned, guardrails) = guardrails::enforce(raw)?;
    let records = TableAdapter::student_records(&cleaned)?;
    let series = TableAdapter::student_series(records)?;

    tracing::info!(
        rows = raw.len(),
        students = series.len(),
        removed = guardrails.columns_to_drop().len(),
        "prepared student data"
    );

    Ok(PreparedStudents { guardrails, series })
}

/// Score every student in a raw table with one config
pub fn score_students(
    raw: &RawTable,
    config: &ScoringConfig,
) -> Result<Vec<ScoredSeries>, ComputeError> {
    config.validate()?;
    let prepared = prepare_students(raw)?;
    prepared
        .series
        .iter()
        .map(|series| ScoreComposer::score(series, config))
        .collect()
}

/// Scoring and explanation engine bound to a benchmark table
#[derive(Debug, Clone, Default)]
pub struct SupportEngine {
    benchmarks: BenchmarkTable,
}

impl SupportEngine {
    pub fn new(benchmarks: BenchmarkTable) -> Self {
        Self { benchmarks }
    }

    /// Build an engine from a raw benchmark table
    pub fn from_table(raw: &RawTable) -> Result<Self, ComputeError> {
        Ok(Self::new(TableAdapter::benchmark_table(raw)?))
    }

    pub fn benchmarks(&self) -> &BenchmarkTable {
        &self.benchmarks
    }

    /// Copy of `config` calibrated against the given school
    pub fn config_for_school(
        &self,
        config: &ScoringConfig,
        school_id: i64,
    ) -> Result<ScoringConfig, ComputeError> {
        let school = self.benchmarks.get(school_id)?;
        Ok(config.clone().with_school(school.clone()))
    }

    /// Score one series, optionally calibrated against a school
    pub fn score(
        &self,
        series: &StudentSeries,
        config: &ScoringConfig,
        school_id: Option<i64>,
    ) -> Result<ScoredSeries, ComputeError> {
        match school_id {
            Some(id) => ScoreComposer::score(series, &self.config_for_school(config, id)?),
            None => ScoreComposer::score(series, config),
        }
    }

    /// Score a student against a school and explain the result.
    ///
    /// The report school also calibrates the score, so the benchmark context in
    /// the report is the one that shaped the number. An unknown school fails
    /// before anything is scored.
    pub fn assess(
        &self,
        series: &StudentSeries,
        config: &ScoringConfig,
        school_id: i64,
        top_k: usize,
    ) -> Result<Assessment, ComputeError> {
        let scored = self.score(series, config, Some(school_id))?;
        let report =
            ExplanationBuilder::from_scored(series, &scored, &self.benchmarks, school_id, top_k)?;

        Ok(Assessment { scored, report })
    }

    /// Full path from a raw student table to one student's assessment
    pub fn assess_student(
        &self,
        raw: &RawTable,
        config: &ScoringConfig,
        student_id: i64,
        school_id: i64,
        top_k: usize,
    ) -> Result<Assessment, ComputeError> {
        let prepared = prepare_students(raw)?;
        self.assess(prepared.student(student_id)?, config, school_id, top_k)
    }
}
