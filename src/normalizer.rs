//! Signal normalization
//!
//! Maps raw weekly metrics onto bounded 0-1 concern values:
//! - Grades invert against a 0-100 scale
//! - Count metrics ramp linearly from 0 up to their anchor
//! - Missing or non-finite values are neutral (0 concern), not maximal concern

use crate::types::{Anchors, Metric, MetricValues, StudentRecord};

/// Lower end of the count-metric ramp
pub const GOOD_LOW: f64 = 0.0;

/// Normalizer for converting raw student records to concern signals
pub struct Normalizer;

impl Normalizer {
    /// Concern signals for one record using the given anchors
    pub fn normalize(record: &StudentRecord, anchors: &Anchors) -> MetricValues {
        MetricValues::from_fn(|metric| match anchors.get(metric) {
            Some(bad_high) => count_concern(record.value(metric), GOOD_LOW, bad_high),
            None => grade_concern(record.value(Metric::Grades)),
        })
    }
}

/// Grade concern: `(100 - grade) / 100` after clamping the grade to 0-100
pub fn grade_concern(grade: Option<f64>) -> f64 {
    match grade.filter(|g| g.is_finite()) {
        Some(g) => (100.0 - g.clamp(0.0, 100.0)).clamp(0.0, 100.0) / 100.0,
        None => 0.0,
    }
}

/// Linear ramp from `good_low` (0 concern) to `bad_high` (full concern).
///
/// A degenerate ramp (`bad_high <= good_low`) yields 0.
pub fn count_concern(value: Option<f64>, good_low: f64, bad_high: f64) -> f64 {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return 0.0;
    };
    if bad_high.is_nan() || bad_high <= good_low {
        return 0.0;
    }
    ((v - good_low) / (bad_high - good_low)).clamp(0.0, 1.0)
}
