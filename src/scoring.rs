//! Score composition
//!
//! Turns a sorted student series into a 0-100 support signal:
//!
//! 1. Calibrate anchors and the context multiplier from the school context
//! 2. Normalize each week into concern signals
//! 3. Weight each signal (`contribution = signal * weight`)
//! 4. Recency-weight each metric's contribution series into one overall value
//! 5. `base = sum(overall) / sum(weights) * 100`, clamped to 0-100
//! 6. `support_signal = base * multiplier`, clamped to 0-100
//! 7. Recommend a check-in when `support_signal >= threshold`
//!
//! Every intermediate value is kept on the output for transparency.

use crate::config::ScoringConfig;
use crate::context::ContextCalibrator;
use crate::error::ComputeError;
use crate::normalizer::Normalizer;
use crate::recency::RecencyWeights;
use crate::types::{Metric, MetricValues, ScoredRow, ScoredSeries, StudentSeries};

/// Score composer
pub struct ScoreComposer;

impl ScoreComposer {
    /// Score one student series.
    ///
    /// The config is validated first; invalid weights are rejected, never
    /// silently corrected.
    pub fn score(
        series: &StudentSeries,
        config: &ScoringConfig,
    ) -> Result<ScoredSeries, ComputeError> {
        config.validate()?;

        let calibration = ContextCalibrator::calibrate(config.school_context.as_ref());
        let weights = &config.weights;

        let signals: Vec<MetricValues> = series
            .records()
            .iter()
            .map(|record| Normalizer::normalize(record, &calibration.anchors))
            .collect();

        let contributions: Vec<MetricValues> = signals
            .iter()
            .map(|s| MetricValues::from_fn(|metric| s.get(metric) * weights.get(metric)))
            .collect();

        let recency = RecencyWeights::new(series.len(), config.decay_rate);
        let overall_contributions = overall_contributions(&contributions, &recency)?;

        let total_weight = weights.total();
        let base_score = if total_weight > 0.0 {
            (overall_contributions.sum() / total_weight * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let support_signal = (base_score * calibration.multiplier).clamp(0.0, 100.0);
        let needs_supportive_check_in = needs_check_in(support_signal, config.threshold);

        tracing::debug!(
            student_id = series.student_id(),
            periods = series.len(),
            base_score,
            multiplier = calibration.multiplier,
            support_signal,
            needs_supportive_check_in,
            "scored student series"
        );

        let rows = series
            .records()
            .iter()
            .zip(signals)
            .zip(contributions)
            .map(|((record, signals), contributions)| ScoredRow {
                record: record.clone(),
                signals,
                contributions,
                overall_contributions,
                row_signal: contributions.sum(),
                support_signal,
                needs_supportive_check_in,
                anchors: calibration.anchors,
                context_multiplier: calibration.multiplier,
            })
            .collect();

        Ok(ScoredSeries {
            student_id: series.student_id(),
            school_id: config.school_context.as_ref().map(|s| s.school_id),
            rows,
            recency_weights: recency.into_vec(),
            overall_contributions,
            base_score,
            support_signal,
            needs_supportive_check_in,
            threshold: config.threshold,
            anchors: calibration.anchors,
            context_multiplier: calibration.multiplier,
        })
    }
}

/// A check-in is recommended at or above the threshold
pub fn needs_check_in(support_signal: f64, threshold: f64) -> bool {
    support_signal >= threshold
}

fn overall_contributions(
    contributions: &[MetricValues],
    recency: &RecencyWeights,
) -> Result<MetricValues, ComputeError> {
    let mut overall = MetricValues::default();
    for metric in Metric::ALL {
        let column: Vec<f64> = contributions.iter().map(|c| c.get(metric)).collect();
        overall.set(metric, recency.dot(&column)?);
    }
    Ok(overall)
}
