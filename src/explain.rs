//! Explanations
//!
//! Builds the human-readable side of a report: which indicators stand out
//! against the school's benchmarks, and what changed in the latest week
//! compared with the student's own history.

use crate::error::ComputeError;
use crate::types::{
    BenchmarkTable, Direction, Metric, ScoredSeries, SchoolBenchmark, StudentRecord,
    StudentSeries,
};
use serde::{Deserialize, Serialize};

/// Fixed disclaimer attached to every report
pub const DISCLAIMER: &str = "Staff-in-the-loop decision support only. \
This tool does not diagnose students, does not automate decisions, \
and does not predict outcomes. Use for supportive check-ins only.";

/// Default number of indicators in a report
pub const DEFAULT_TOP_K: usize = 5;

/// Changes smaller than this (in raw units) are treated as noise
pub const CHANGE_NOISE_THRESHOLD: f64 = 0.25;

/// Maximum number of "what changed" sentences
pub const MAX_CHANGES: usize = 3;

/// Concern assigned to a grade ratio of zero or below
const MAX_CONCERN: f64 = 999.0;

const INSUFFICIENT_HISTORY: &str = "Not enough history to compute recent change.";
const NO_MAJOR_CHANGES: &str = "No major recent changes detected.";

/// Order in which recent changes are checked and reported
const CHANGE_ORDER: [Metric; 5] = [
    Metric::Absences,
    Metric::Tardies,
    Metric::DisciplineEvents,
    Metric::TruancyDays,
    Metric::Grades,
];

/// One indicator compared against the school benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorExplanation {
    pub indicator: Metric,
    pub direction: Direction,
    pub student_value: Option<f64>,
    pub school_benchmark: Option<f64>,
    /// student / benchmark, rounded to 2 decimals (0 when the benchmark is 0 or absent)
    pub relative_to_school: f64,
    pub message: String,
}

impl IndicatorExplanation {
    /// Ranking key; larger means more concerning
    pub fn concern(&self) -> f64 {
        if self.student_value.is_none() {
            return 0.0;
        }
        match self.direction {
            Direction::HigherIsWorse => self.relative_to_school,
            Direction::LowerIsWorse if self.relative_to_school > 0.0 => {
                1.0 / self.relative_to_school
            }
            Direction::LowerIsWorse => MAX_CONCERN,
        }
    }
}

/// Benchmark fields consulted while explaining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkValues {
    pub chronic_absenteeism_pct: Option<f64>,
    pub truancy_rate_pct: Option<f64>,
    pub chronic_truancy_pct: Option<f64>,
    pub discipline_incidents_per_100: Option<f64>,
    pub academic_avg_pct: Option<f64>,
    pub graduation_rate_pct: Option<f64>,
}

/// The school context a report was built against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkContextUsed {
    pub school_id: i64,
    pub school_name: String,
    pub benchmarks: BenchmarkValues,
}

/// Full advisory report for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationReport {
    pub score: f64,
    pub supportive_check_in_recommended: bool,
    pub top_contributing_indicators: Vec<IndicatorExplanation>,
    pub what_changed_recently: Vec<String>,
    pub benchmark_context_used: BenchmarkContextUsed,
    pub disclaimer: String,
}

impl ExplanationReport {
    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Explanation builder
pub struct ExplanationBuilder;

impl ExplanationBuilder {
    /// Look up the school and build a report.
    ///
    /// An unknown `school_id` fails the whole request; no partial report is
    /// produced.
    pub fn generate_report(
        series: &StudentSeries,
        benchmarks: &BenchmarkTable,
        school_id: i64,
        score: f64,
        recommended: bool,
        top_k: usize,
    ) -> Result<ExplanationReport, ComputeError> {
        let school = benchmarks.get(school_id)?;
        Ok(Self::build(series, school, score, recommended, top_k))
    }

    /// Build a report from a scoring result
    pub fn from_scored(
        series: &StudentSeries,
        scored: &ScoredSeries,
        benchmarks: &BenchmarkTable,
        school_id: i64,
        top_k: usize,
    ) -> Result<ExplanationReport, ComputeError> {
        Self::generate_report(
            series,
            benchmarks,
            school_id,
            scored.support_signal,
            scored.needs_supportive_check_in,
            top_k,
        )
    }

    /// Build a report against an already resolved school row
    pub fn build(
        series: &StudentSeries,
        school: &SchoolBenchmark,
        score: f64,
        recommended: bool,
        top_k: usize,
    ) -> ExplanationReport {
        ExplanationReport {
            score,
            supportive_check_in_recommended: recommended,
            top_contributing_indicators: Self::top_contributing_indicators(
                series.latest(),
                school,
                top_k,
            ),
            what_changed_recently: Self::recent_changes(series),
            benchmark_context_used: Self::benchmark_context(school),
            disclaimer: DISCLAIMER.to_string(),
        }
    }

    /// Rank the latest week's indicators by concern relative to the school.
    ///
    /// Ties keep insertion order (absences, truancy, discipline, grades).
    pub fn top_contributing_indicators(
        latest: &StudentRecord,
        school: &SchoolBenchmark,
        top_k: usize,
    ) -> Vec<IndicatorExplanation> {
        let count_benchmarks = [
            (Metric::Absences, school.chronic_absenteeism_pct),
            (Metric::TruancyDays, school.chronic_truancy_pct),
            (Metric::DisciplineEvents, school.discipline_incidents_per_100),
        ];

        let mut indicators: Vec<IndicatorExplanation> = count_benchmarks
            .into_iter()
            .map(|(metric, benchmark)| count_indicator(metric, latest.value(metric), benchmark))
            .collect();
        indicators.push(grade_indicator(latest.value(Metric::Grades), school.academic_avg()));

        // Stable sort, descending concern
        indicators.sort_by(|a, b| b.concern().total_cmp(&a.concern()));
        indicators.truncate(top_k);
        indicators
    }

    /// Compare the latest week with the mean of all prior weeks
    pub fn recent_changes(series: &StudentSeries) -> Vec<String> {
        let records = series.records();
        if records.len() < 2 {
            return vec![INSUFFICIENT_HISTORY.to_string()];
        }

        let (latest, prior) = (series.latest(), &records[..records.len() - 1]);

        let changes: Vec<String> = CHANGE_ORDER
            .iter()
            .filter_map(|metric| change_message(*metric, latest, prior))
            .take(MAX_CHANGES)
            .collect();

        if changes.is_empty() {
            vec![NO_MAJOR_CHANGES.to_string()]
        } else {
            changes
        }
    }

    /// The benchmark fields a report consults
    pub fn benchmark_context(school: &SchoolBenchmark) -> BenchmarkContextUsed {
        BenchmarkContextUsed {
            school_id: school.school_id,
            school_name: school.school_name.clone(),
            benchmarks: BenchmarkValues {
                chronic_absenteeism_pct: school.chronic_absenteeism_pct,
                truancy_rate_pct: school.truancy_rate_pct,
                chronic_truancy_pct: school.chronic_truancy_pct,
                discipline_incidents_per_100: school.discipline_incidents_per_100,
                academic_avg_pct: school.academic_avg().map(round2),
                graduation_rate_pct: school.graduation_rate_pct,
            },
        }
    }
}

fn count_indicator(
    metric: Metric,
    student: Option<f64>,
    benchmark: Option<f64>,
) -> IndicatorExplanation {
    let ratio = round2(ratio(student, benchmark));
    let message = match student {
        Some(value) => format!(
            "{metric} is {}× the school benchmark ({} vs {}).",
            decimal(ratio),
            decimal(round2(value)),
            display(benchmark)
        ),
        None => format!(
            "{metric} has no value for the latest week (school benchmark {}).",
            display(benchmark)
        ),
    };

    IndicatorExplanation {
        indicator: metric,
        direction: Direction::HigherIsWorse,
        student_value: student,
        school_benchmark: benchmark,
        relative_to_school: ratio,
        message,
    }
}

fn grade_indicator(student: Option<f64>, academic_avg: Option<f64>) -> IndicatorExplanation {
    let benchmark = academic_avg.map(round2);
    let ratio = round2(ratio(student, academic_avg));
    let message = match student {
        Some(value) => format!(
            "grades are {}× the school academic benchmark ({} vs {}).",
            decimal(ratio),
            decimal(round2(value)),
            display(benchmark)
        ),
        None => format!(
            "grades have no value for the latest week (school academic benchmark {}).",
            display(benchmark)
        ),
    };

    IndicatorExplanation {
        indicator: Metric::Grades,
        direction: Direction::LowerIsWorse,
        student_value: student,
        school_benchmark: benchmark,
        relative_to_school: ratio,
        message,
    }
}

fn change_message(metric: Metric, latest: &StudentRecord, prior: &[StudentRecord]) -> Option<String> {
    let latest_value = latest.value(metric)?;
    let prior_values: Vec<f64> = prior.iter().filter_map(|r| r.value(metric)).collect();
    if prior_values.is_empty() {
        return None;
    }

    let prior_avg = prior_values.iter().sum::<f64>() / prior_values.len() as f64;
    let diff = latest_value - prior_avg;
    if diff.abs() < CHANGE_NOISE_THRESHOLD {
        return None;
    }

    let direction = if diff > 0.0 { "increased" } else { "decreased" };
    let worse = match metric.direction() {
        Direction::HigherIsWorse => diff > 0.0,
        Direction::LowerIsWorse => diff < 0.0,
    };
    let impact = if worse {
        "which may signal increased support need"
    } else {
        "which may signal improvement"
    };

    Some(format!(
        "{} {direction} recently (latest {latest_value:.1} vs prior avg {prior_avg:.1}), {impact}.",
        metric.label()
    ))
}

fn ratio(student: Option<f64>, benchmark: Option<f64>) -> f64 {
    match (student, benchmark) {
        (Some(s), Some(b)) if b != 0.0 && b.is_finite() => s / b,
        _ => 0.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn display(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| decimal(round2(v)))
}

/// Whole numbers keep one decimal ("8.0"); others print in shortest form ("22.5")
fn decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
