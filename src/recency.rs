//! Recency aggregation
//!
//! Exponential down-weighting of older periods. For a series of length `n`
//! (oldest first) the i-th period gets raw weight `decay_rate^(n - 1 - i)`, so
//! the latest period has raw weight 1. Weights are then normalized to sum to 1.
//!
//! Callers must pass series sorted oldest to newest; nothing here re-sorts.

use crate::error::ComputeError;

/// Normalized recency weights for one series length
#[derive(Debug, Clone, PartialEq)]
pub struct RecencyWeights {
    weights: Vec<f64>,
}

impl RecencyWeights {
    /// Build weights for `n` periods. `n == 0` gives an empty set.
    pub fn new(n: usize, decay_rate: f64) -> Self {
        let raw: Vec<f64> = (0..n)
            .map(|i| decay_rate.powi((n - 1 - i) as i32))
            .collect();
        let total: f64 = raw.iter().sum();

        let weights = if total > 0.0 && total.is_finite() {
            raw.iter().map(|w| w / total).collect()
        } else {
            // Degenerate decay; fall back to uniform
            vec![1.0 / n as f64; n]
        };

        Self { weights }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.weights
    }

    /// Weighted dot product with a series of the same length
    pub fn dot(&self, values: &[f64]) -> Result<f64, ComputeError> {
        if values.is_empty() {
            return Err(ComputeError::EmptySeries);
        }
        if values.len() != self.weights.len() {
            return Err(ComputeError::WeightLengthMismatch {
                values: values.len(),
                weights: self.weights.len(),
            });
        }
        Ok(values.iter().zip(&self.weights).map(|(v, w)| v * w).sum())
    }

    /// Weighted mean over the present values only.
    ///
    /// Weights of missing periods are dropped and the rest renormalized.
    /// Returns `None` when no period has a value.
    pub fn dot_present(&self, values: &[Option<f64>]) -> Result<Option<f64>, ComputeError> {
        if values.is_empty() {
            return Err(ComputeError::EmptySeries);
        }
        if values.len() != self.weights.len() {
            return Err(ComputeError::WeightLengthMismatch {
                values: values.len(),
                weights: self.weights.len(),
            });
        }

        let (sum, weight) = values
            .iter()
            .zip(&self.weights)
            .filter_map(|(v, w)| v.filter(|v| v.is_finite()).map(|v| (v * w, *w)))
            .fold((0.0, 0.0), |(s, t), (vw, w)| (s + vw, t + w));

        if weight > 0.0 {
            Ok(Some(sum / weight))
        } else {
            Ok(None)
        }
    }
}

/// Recency-weighted value of a complete series
pub fn recency_weighted(values: &[f64], decay_rate: f64) -> Result<f64, ComputeError> {
    RecencyWeights::new(values.len(), decay_rate).dot(values)
}
