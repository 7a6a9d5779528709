//! School-context calibration
//!
//! A school's benchmark row shifts how a student's raw metrics are read:
//! anchors for absences, truancy and discipline move with the school's own
//! rates, and a climate multiplier rescales the final score. Without a school
//! context the calibrator returns the fixed default anchors and a multiplier of
//! exactly 1.0.

use crate::types::{Anchors, SchoolBenchmark};
use serde::{Deserialize, Serialize};

/// Lower bound for any calibrated anchor
pub const ANCHOR_MIN: f64 = 2.0;
/// Upper bound for any calibrated anchor
pub const ANCHOR_MAX: f64 = 10.0;

/// Multiplier range around neutral
pub const MULTIPLIER_MIN: f64 = 0.85;
pub const MULTIPLIER_MAX: f64 = 1.15;
const MULTIPLIER_SPAN: f64 = 0.30;

// Climate component weights and normalizers
const ABSENTEEISM_WEIGHT: f64 = 0.35;
const ABSENTEEISM_SCALE: f64 = 50.0;
const TRUANCY_WEIGHT: f64 = 0.35;
const TRUANCY_SCALE: f64 = 50.0;
const DISCIPLINE_WEIGHT: f64 = 0.20;
const DISCIPLINE_SCALE: f64 = 80.0;
const GRADUATION_GAP_WEIGHT: f64 = 0.10;
const GRADUATION_GAP_SCALE: f64 = 50.0;

/// Anchors and multiplier derived from an optional school context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchoolCalibration {
    pub anchors: Anchors,
    /// Weighted school-need score in 0-1 (0 without context)
    pub climate: f64,
    pub multiplier: f64,
}

impl Default for SchoolCalibration {
    fn default() -> Self {
        Self {
            anchors: Anchors::default(),
            climate: 0.0,
            multiplier: 1.0,
        }
    }
}

/// Context calibrator
pub struct ContextCalibrator;

impl ContextCalibrator {
    /// Calibrate against a school row, or fall back to defaults
    pub fn calibrate(school: Option<&SchoolBenchmark>) -> SchoolCalibration {
        match school {
            Some(school) => {
                let climate = climate_score(school);
                SchoolCalibration {
                    anchors: anchors_for(school),
                    climate,
                    multiplier: multiplier_for(climate),
                }
            }
            None => SchoolCalibration::default(),
        }
    }
}

/// Benchmark-derived anchors.
///
/// Tardies have no school benchmark and keep the default anchor; a missing
/// benchmark field keeps that metric's default too.
pub fn anchors_for(school: &SchoolBenchmark) -> Anchors {
    let defaults = Anchors::default();

    Anchors {
        tardies: defaults.tardies,
        absences: calibrated_anchor(school.chronic_absenteeism_pct, 2.5, 15.0)
            .unwrap_or(defaults.absences),
        truancy_days: calibrated_anchor(school.truancy_rate_pct, 2.0, 15.0)
            .unwrap_or(defaults.truancy_days),
        discipline_events: calibrated_anchor(school.discipline_incidents_per_100, 2.0, 20.0)
            .unwrap_or(defaults.discipline_events),
    }
}

/// Weighted school-need score; each component is clamped to 0-1 before weighting
pub fn climate_score(school: &SchoolBenchmark) -> f64 {
    let absenteeism = component(school.chronic_absenteeism_pct, ABSENTEEISM_SCALE);
    let truancy = component(school.truancy_rate_pct, TRUANCY_SCALE);
    let discipline = component(school.discipline_incidents_per_100, DISCIPLINE_SCALE);
    let graduation_gap = component(
        school.graduation_rate_pct.map(|g| 100.0 - g),
        GRADUATION_GAP_SCALE,
    );

    ABSENTEEISM_WEIGHT * absenteeism
        + TRUANCY_WEIGHT * truancy
        + DISCIPLINE_WEIGHT * discipline
        + GRADUATION_GAP_WEIGHT * graduation_gap
}

/// Map a climate score onto the 0.85-1.15 multiplier range
pub fn multiplier_for(climate: f64) -> f64 {
    (MULTIPLIER_MIN + climate * MULTIPLIER_SPAN).clamp(MULTIPLIER_MIN, MULTIPLIER_MAX)
}

fn calibrated_anchor(rate: Option<f64>, base: f64, divisor: f64) -> Option<f64> {
    rate.filter(|r| r.is_finite())
        .map(|r| (base + r / divisor).clamp(ANCHOR_MIN, ANCHOR_MAX))
}

fn component(value: Option<f64>, scale: f64) -> f64 {
    value
        .filter(|v| v.is_finite())
        .map(|v| (v / scale).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}
