//! Scoring configuration
//!
//! Staff-tunable settings passed by value into every scoring call. Partial JSON
//! documents overlay the defaults; validation runs before a config is accepted.

use crate::error::ComputeError;
use crate::types::{Metric, SchoolBenchmark};
use serde::{Deserialize, Serialize};

/// Default review cutoff (0-100)
pub const DEFAULT_THRESHOLD: f64 = 75.0;

/// Default recency decay (higher = older weeks keep more weight)
pub const DEFAULT_DECAY_RATE: f64 = 0.85;

/// Allowed range for any single weight
pub const WEIGHT_MIN: f64 = 0.05;
pub const WEIGHT_MAX: f64 = 0.50;

/// Allowed distance of the weight sum from 1.00
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

// Absorbs float noise when a sum lands exactly on the tolerance edge
const EPSILON: f64 = 1e-9;

/// Human-set metric weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightConfig {
    pub grades: f64,
    pub absences: f64,
    pub tardies: f64,
    pub discipline_events: f64,
    pub truancy_days: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            grades: 0.30,
            absences: 0.25,
            tardies: 0.15,
            discipline_events: 0.20,
            truancy_days: 0.10,
        }
    }
}

impl WeightConfig {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Grades => self.grades,
            Metric::Absences => self.absences,
            Metric::Tardies => self.tardies,
            Metric::DisciplineEvents => self.discipline_events,
            Metric::TruancyDays => self.truancy_days,
        }
    }

    pub fn total(&self) -> f64 {
        Metric::ALL.iter().map(|m| self.get(*m)).sum()
    }

    /// Check bounds and sum; the error names the offending metric or the sum
    pub fn validate(&self) -> Result<(), ComputeError> {
        for metric in Metric::ALL {
            let w = self.get(metric);
            if !w.is_finite() || w < WEIGHT_MIN - EPSILON || w > WEIGHT_MAX + EPSILON {
                return Err(ComputeError::InvalidWeights(format!(
                    "weight for {metric} is {w}, must be between {WEIGHT_MIN:.2} and {WEIGHT_MAX:.2}"
                )));
            }
        }

        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE + EPSILON {
            return Err(ComputeError::InvalidWeights(format!(
                "weights sum to {total:.2}, must sum to 1.00"
            )));
        }

        Ok(())
    }
}

/// Settings for one scoring request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Review cutoff on the 0-100 support signal
    pub threshold: f64,
    /// Recency decay strength, strictly between 0 and 1
    pub decay_rate: f64,
    pub weights: WeightConfig,
    /// School benchmark row used for calibration, if any
    pub school_context: Option<SchoolBenchmark>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            decay_rate: DEFAULT_DECAY_RATE,
            weights: WeightConfig::default(),
            school_context: None,
        }
    }
}

impl ScoringConfig {
    /// Parse a (possibly partial) JSON config and validate it
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: ScoringConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_school(mut self, school: SchoolBenchmark) -> Self {
        self.school_context = Some(school);
        self
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(ComputeError::InvalidConfig(format!(
                "threshold is {}, must be between 0 and 100",
                self.threshold
            )));
        }
        if !(self.decay_rate > 0.0 && self.decay_rate < 1.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "decay_rate is {}, must be strictly between 0 and 1",
                self.decay_rate
            )));
        }
        self.weights.validate()
    }
}
