//! Standalone recency features
//!
//! Summarizes a student series as one recency-weighted raw value per metric,
//! without normalization or weighting. Useful for displaying "where the
//! student is lately" next to the score.

use crate::error::ComputeError;
use crate::recency::RecencyWeights;
use crate::types::{Metric, StudentSeries};
use serde::{Deserialize, Serialize};

/// Recency-weighted raw values.
///
/// A metric with no recorded value anywhere in the series is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentFeatures {
    pub student_id: i64,
    pub periods: usize,
    pub grades_recent: Option<f64>,
    pub absences_recent: Option<f64>,
    pub tardies_recent: Option<f64>,
    pub discipline_recent: Option<f64>,
    pub truancy_recent: Option<f64>,
}

impl StudentFeatures {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Grades => self.grades_recent,
            Metric::Absences => self.absences_recent,
            Metric::Tardies => self.tardies_recent,
            Metric::DisciplineEvents => self.discipline_recent,
            Metric::TruancyDays => self.truancy_recent,
        }
    }
}

/// Feature builder for the standalone feature mode
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Build recency features; `decay_rate` must lie strictly between 0 and 1
    pub fn build(series: &StudentSeries, decay_rate: f64) -> Result<StudentFeatures, ComputeError> {
        if !(decay_rate > 0.0 && decay_rate < 1.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "decay_rate is {decay_rate}, must be strictly between 0 and 1"
            )));
        }

        let weights = RecencyWeights::new(series.len(), decay_rate);
        let recent = |metric: Metric| weights.dot_present(&series.values(metric));

        Ok(StudentFeatures {
            student_id: series.student_id(),
            periods: series.len(),
            grades_recent: recent(Metric::Grades)?,
            absences_recent: recent(Metric::Absences)?,
            tardies_recent: recent(Metric::Tardies)?,
            discipline_recent: recent(Metric::DisciplineEvents)?,
            truancy_recent: recent(Metric::TruancyDays)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StudentRecord;
    use chrono::NaiveDate;

    fn record(day: u32, grades: Option<f64>, absences: f64) -> StudentRecord {
        StudentRecord {
            student_id: 7,
            week_date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            grades,
            absences: Some(absences),
            tardies: Some(2.0),
            discipline_events: Some(0.0),
            truancy_days: None,
        }
    }

    #[test]
    fn test_features_weight_recent_weeks() {
        let series = StudentSeries::from_records(vec![
            record(1, Some(90.0), 0.0),
            record(8, Some(70.0), 4.0),
        ])
        .unwrap();

        let features = FeatureBuilder::build(&series, 0.5).unwrap();

        // weights 1/3, 2/3
        assert!((features.grades_recent.unwrap() - (90.0 / 3.0 + 70.0 * 2.0 / 3.0)).abs() < 1e-9);
        assert!((features.absences_recent.unwrap() - 8.0 / 3.0).abs() < 1e-9);
        assert!((features.tardies_recent.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(features.truancy_recent, None);
        assert_eq!(features.periods, 2);
    }

    #[test]
    fn test_missing_cells_skipped() {
        let series = StudentSeries::from_records(vec![
            record(1, Some(80.0), 1.0),
            record(8, None, 1.0),
        ])
        .unwrap();

        let features = FeatureBuilder::build(&series, 0.85).unwrap();
        assert!((features.get(Metric::Grades).unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_decay_rejected() {
        let series = StudentSeries::from_records(vec![record(1, Some(80.0), 1.0)]).unwrap();
        assert!(matches!(
            FeatureBuilder::build(&series, 1.5),
            Err(ComputeError::InvalidConfig(_))
        ));
    }
}
