//! Core data types for Support Signal
//!
//! These types flow through the scoring pipeline:
//! StudentRecord → StudentSeries → MetricValues (signals/contributions) → ScoredSeries

use crate::error::ComputeError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Metrics
// ============================================================================

/// Weekly behavioral metrics tracked per student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Grades,
    Absences,
    Tardies,
    DisciplineEvents,
    TruancyDays,
}

impl Metric {
    /// All metrics in column order
    pub const ALL: [Metric; 5] = [
        Metric::Grades,
        Metric::Absences,
        Metric::Tardies,
        Metric::DisciplineEvents,
        Metric::TruancyDays,
    ];

    /// Count metrics (everything except grades), normalized with a linear ramp
    pub const COUNTS: [Metric; 4] = [
        Metric::Absences,
        Metric::Tardies,
        Metric::DisciplineEvents,
        Metric::TruancyDays,
    ];

    /// Column name used in student tables
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Grades => "grades",
            Metric::Absences => "absences",
            Metric::Tardies => "tardies",
            Metric::DisciplineEvents => "discipline_events",
            Metric::TruancyDays => "truancy_days",
        }
    }

    /// Human-readable label for explanation sentences
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Grades => "Grades",
            Metric::Absences => "Absences",
            Metric::Tardies => "Tardies",
            Metric::DisciplineEvents => "Discipline events",
            Metric::TruancyDays => "Truancy days",
        }
    }

    /// Which direction of the raw value indicates more concern
    pub fn direction(&self) -> Direction {
        match self {
            Metric::Grades => Direction::LowerIsWorse,
            _ => Direction::HigherIsWorse,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of concern for an indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsWorse,
    LowerIsWorse,
}

// ============================================================================
// Input records
// ============================================================================

/// One student-week of behavioral data.
///
/// Metric values are optional: an empty or unparseable cell is carried as `None`
/// and treated as neutral (zero concern) by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: i64,
    pub week_date: NaiveDate,
    pub grades: Option<f64>,
    pub absences: Option<f64>,
    pub tardies: Option<f64>,
    pub discipline_events: Option<f64>,
    pub truancy_days: Option<f64>,
}

impl StudentRecord {
    /// Raw value for a metric, if present
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Grades => self.grades,
            Metric::Absences => self.absences,
            Metric::Tardies => self.tardies,
            Metric::DisciplineEvents => self.discipline_events,
            Metric::TruancyDays => self.truancy_days,
        }
        .filter(|v| v.is_finite())
    }
}

/// School-level benchmark row, looked up by `school_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolBenchmark {
    pub school_id: i64,
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub chronic_absenteeism_pct: Option<f64>,
    #[serde(default)]
    pub truancy_rate_pct: Option<f64>,
    #[serde(default)]
    pub chronic_truancy_pct: Option<f64>,
    #[serde(default)]
    pub discipline_incidents_per_100: Option<f64>,
    #[serde(default)]
    pub graduation_rate_pct: Option<f64>,
    #[serde(default)]
    pub math_achievement_pct: Option<f64>,
    #[serde(default)]
    pub ela_achievement_pct: Option<f64>,
    #[serde(default)]
    pub science_achievement_pct: Option<f64>,
}

impl SchoolBenchmark {
    /// Mean of the available math/ELA/science achievement percentages
    pub fn academic_avg(&self) -> Option<f64> {
        let values: Vec<f64> = [
            self.math_achievement_pct,
            self.ela_achievement_pct,
            self.science_achievement_pct,
        ]
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();

        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

/// Immutable set of school benchmarks keyed by `school_id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BenchmarkRows")]
pub struct BenchmarkTable {
    schools: Vec<SchoolBenchmark>,
}

/// Unchecked wire form; deserialization goes through `BenchmarkTable::from_rows`
#[derive(Deserialize)]
struct BenchmarkRows {
    schools: Vec<SchoolBenchmark>,
}

impl TryFrom<BenchmarkRows> for BenchmarkTable {
    type Error = ComputeError;

    fn try_from(rows: BenchmarkRows) -> Result<Self, Self::Error> {
        BenchmarkTable::from_rows(rows.schools)
    }
}

impl BenchmarkTable {
    /// Build a table, rejecting duplicate school ids
    pub fn from_rows(schools: Vec<SchoolBenchmark>) -> Result<Self, ComputeError> {
        for (i, school) in schools.iter().enumerate() {
            if schools[..i].iter().any(|s| s.school_id == school.school_id) {
                return Err(ComputeError::DuplicateSchool(school.school_id));
            }
        }
        Ok(Self { schools })
    }

    /// Look up a school; an unknown id is an error
    pub fn get(&self, school_id: i64) -> Result<&SchoolBenchmark, ComputeError> {
        self.schools
            .iter()
            .find(|s| s.school_id == school_id)
            .ok_or(ComputeError::SchoolNotFound(school_id))
    }

    pub fn schools(&self) -> &[SchoolBenchmark] {
        &self.schools
    }

    pub fn len(&self) -> usize {
        self.schools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }
}

// ============================================================================
// Student series
// ============================================================================

/// A single student's records, sorted ascending by `week_date`.
///
/// Construction enforces the series invariants: non-empty, one student,
/// unique week dates. The recency aggregator relies on this ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSeries {
    student_id: i64,
    records: Vec<StudentRecord>,
}

impl StudentSeries {
    /// Sort records by week and validate the series
    pub fn from_records(mut records: Vec<StudentRecord>) -> Result<Self, ComputeError> {
        let first = records.first().ok_or(ComputeError::EmptySeries)?;
        let student_id = first.student_id;

        if let Some(other) = records.iter().find(|r| r.student_id != student_id) {
            return Err(ComputeError::MixedStudents(student_id, other.student_id));
        }

        records.sort_by_key(|r| r.week_date);

        for pair in records.windows(2) {
            if pair[0].week_date == pair[1].week_date {
                return Err(ComputeError::DuplicateWeek {
                    student_id,
                    week_date: pair[1].week_date,
                });
            }
        }

        Ok(Self {
            student_id,
            records,
        })
    }

    pub fn student_id(&self) -> i64 {
        self.student_id
    }

    /// Records, oldest first
    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    /// Most recent record
    pub fn latest(&self) -> &StudentRecord {
        // Non-empty by construction
        &self.records[self.records.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw values of one metric across the series (oldest first)
    pub fn values(&self, metric: Metric) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.value(metric)).collect()
    }
}

// ============================================================================
// Derived values
// ============================================================================

/// One f64 per metric (signals, contributions, features)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub grades: f64,
    pub absences: f64,
    pub tardies: f64,
    pub discipline_events: f64,
    pub truancy_days: f64,
}

impl MetricValues {
    /// Build values by evaluating `f` for each metric
    pub fn from_fn(mut f: impl FnMut(Metric) -> f64) -> Self {
        Self {
            grades: f(Metric::Grades),
            absences: f(Metric::Absences),
            tardies: f(Metric::Tardies),
            discipline_events: f(Metric::DisciplineEvents),
            truancy_days: f(Metric::TruancyDays),
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Grades => self.grades,
            Metric::Absences => self.absences,
            Metric::Tardies => self.tardies,
            Metric::DisciplineEvents => self.discipline_events,
            Metric::TruancyDays => self.truancy_days,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Grades => self.grades = value,
            Metric::Absences => self.absences = value,
            Metric::Tardies => self.tardies = value,
            Metric::DisciplineEvents => self.discipline_events = value,
            Metric::TruancyDays => self.truancy_days = value,
        }
    }

    pub fn sum(&self) -> f64 {
        Metric::ALL.iter().map(|m| self.get(*m)).sum()
    }
}

/// Raw-value thresholds at which a count metric's concern reaches 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchors {
    pub tardies: f64,
    pub absences: f64,
    pub truancy_days: f64,
    pub discipline_events: f64,
}

impl Default for Anchors {
    fn default() -> Self {
        Self {
            tardies: 5.0,
            absences: 5.0,
            truancy_days: 3.0,
            discipline_events: 3.0,
        }
    }
}

impl Anchors {
    /// Anchor for a count metric; grades are not anchored
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Grades => None,
            Metric::Absences => Some(self.absences),
            Metric::Tardies => Some(self.tardies),
            Metric::DisciplineEvents => Some(self.discipline_events),
            Metric::TruancyDays => Some(self.truancy_days),
        }
    }
}

// ============================================================================
// Scoring output
// ============================================================================

/// A student-week with every intermediate value used in scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRow {
    #[serde(flatten)]
    pub record: StudentRecord,
    /// Per-metric 0-1 concern signals for this week
    pub signals: MetricValues,
    /// signal * weight for this week
    pub contributions: MetricValues,
    /// Recency-weighted contribution over the whole series
    pub overall_contributions: MetricValues,
    /// Diagnostic sum of this week's contributions
    pub row_signal: f64,
    pub support_signal: f64,
    pub needs_supportive_check_in: bool,
    pub anchors: Anchors,
    pub context_multiplier: f64,
}

/// Scoring result for one student series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSeries {
    pub student_id: i64,
    /// School whose benchmarks calibrated the score, if any
    pub school_id: Option<i64>,
    pub rows: Vec<ScoredRow>,
    /// Normalized recency weights, oldest first
    pub recency_weights: Vec<f64>,
    pub overall_contributions: MetricValues,
    /// Score before the context multiplier (0-100)
    pub base_score: f64,
    /// Final support-likelihood signal (0-100)
    pub support_signal: f64,
    pub needs_supportive_check_in: bool,
    pub threshold: f64,
    pub anchors: Anchors,
    pub context_multiplier: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(student_id: i64, day: u32) -> StudentRecord {
        StudentRecord {
            student_id,
            week_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            grades: Some(80.0),
            absences: Some(1.0),
            tardies: Some(0.0),
            discipline_events: Some(0.0),
            truancy_days: Some(0.0),
        }
    }

    #[test]
    fn test_series_sorts_by_week() {
        let series =
            StudentSeries::from_records(vec![record(4, 15), record(4, 1), record(4, 8)]).unwrap();

        let days: Vec<u32> = series
            .records()
            .iter()
            .map(|r| chrono::Datelike::day(&r.week_date))
            .collect();
        assert_eq!(days, vec![1, 8, 15]);
        assert_eq!(series.latest().week_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(series.student_id(), 4);
    }

    #[test]
    fn test_series_rejects_empty() {
        let result = StudentSeries::from_records(Vec::new());
        assert!(matches!(result, Err(ComputeError::EmptySeries)));
    }

    #[test]
    fn test_series_rejects_duplicate_week() {
        let result = StudentSeries::from_records(vec![record(4, 8), record(4, 8)]);
        assert!(matches!(result, Err(ComputeError::DuplicateWeek { student_id: 4, .. })));
    }

    #[test]
    fn test_series_rejects_mixed_students() {
        let result = StudentSeries::from_records(vec![record(4, 1), record(5, 8)]);
        assert!(matches!(result, Err(ComputeError::MixedStudents(4, 5))));
    }

    #[test]
    fn test_record_value_ignores_nan() {
        let mut r = record(1, 1);
        r.grades = Some(f64::NAN);
        assert_eq!(r.value(Metric::Grades), None);
        assert_eq!(r.value(Metric::Absences), Some(1.0));
    }

    #[test]
    fn test_academic_avg_uses_available_subjects() {
        let school = SchoolBenchmark {
            school_id: 1006,
            school_name: "Lincoln High".to_string(),
            chronic_absenteeism_pct: None,
            truancy_rate_pct: None,
            chronic_truancy_pct: None,
            discipline_incidents_per_100: None,
            graduation_rate_pct: None,
            math_achievement_pct: Some(40.0),
            ela_achievement_pct: Some(60.0),
            science_achievement_pct: None,
        };
        assert!((school.academic_avg().unwrap() - 50.0).abs() < 1e-9);

        let empty = SchoolBenchmark {
            math_achievement_pct: None,
            ela_achievement_pct: None,
            ..school
        };
        assert_eq!(empty.academic_avg(), None);
    }

    #[test]
    fn test_benchmark_lookup() {
        let school = SchoolBenchmark {
            school_id: 1006,
            school_name: "Riverside High".to_string(),
            chronic_absenteeism_pct: Some(20.0),
            truancy_rate_pct: None,
            chronic_truancy_pct: None,
            discipline_incidents_per_100: None,
            graduation_rate_pct: None,
            math_achievement_pct: None,
            ela_achievement_pct: None,
            science_achievement_pct: None,
        };
        let table = BenchmarkTable::from_rows(vec![school.clone()]).unwrap();

        assert_eq!(table.get(1006).unwrap().school_name, "Riverside High");
        assert!(matches!(table.get(9999), Err(ComputeError::SchoolNotFound(9999))));

        let duplicate = BenchmarkTable::from_rows(vec![school.clone(), school]);
        assert!(matches!(duplicate, Err(ComputeError::DuplicateSchool(1006))));
    }

    #[test]
    fn test_deserialized_benchmarks_reject_duplicates() {
        let json = r#"{"schools":[
            {"school_id":1006,"school_name":"Riverside High"},
            {"school_id":1006,"school_name":"Riverside Annex"}
        ]}"#;
        let err = serde_json::from_str::<BenchmarkTable>(json).unwrap_err();
        assert!(err.to_string().contains("Duplicate school_id 1006"));

        let rows: BenchmarkRows = serde_json::from_str(json).unwrap();
        assert!(matches!(
            BenchmarkTable::try_from(rows),
            Err(ComputeError::DuplicateSchool(1006))
        ));

        let single = r#"{"schools":[{"school_id":1006,"school_name":"Riverside High"}]}"#;
        let table: BenchmarkTable = serde_json::from_str(single).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_default_anchors() {
        let anchors = Anchors::default();
        assert_eq!(anchors.get(Metric::Tardies), Some(5.0));
        assert_eq!(anchors.get(Metric::Absences), Some(5.0));
        assert_eq!(anchors.get(Metric::TruancyDays), Some(3.0));
        assert_eq!(anchors.get(Metric::DisciplineEvents), Some(3.0));
        assert_eq!(anchors.get(Metric::Grades), None);
    }
}
