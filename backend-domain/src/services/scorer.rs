use crate::entities::{Detection, EntityState, PopulationBaselines, RuntimeConfig};
use crate::services::BatchEntity;

/// Standard deviations this close to zero make z-scores meaningless.
const MIN_STD_DEV: f64 = 0.01;

pub const SIGNAL_HEADSHOT_RATIO: &str = "THRESHOLD_HEADSHOT";

/// Compares updated entity statistics against a baseline and emits
/// detections. Runs once per touched entity after the whole batch has been
/// accumulated.
///
/// The baseline is the entity's own rolling mean/variance unless a
/// population baseline was supplied for the metric.
#[derive(Debug, Clone)]
pub struct AnomalyScorer {
    zscore_threshold: f64,
    min_samples: u64,
    headshot_threshold: f64,
    risk_decay_factor: f64,
    risk_severity_weight: f64,
    baselines: PopulationBaselines,
}

impl AnomalyScorer {
    pub fn new(config: &RuntimeConfig, baselines: PopulationBaselines) -> Self {
        Self {
            zscore_threshold: config.zscore_threshold,
            min_samples: config.min_samples_for_scoring,
            headshot_threshold: config.headshot_interesting_threshold,
            risk_decay_factor: config.risk_decay_factor,
            risk_severity_weight: config.risk_severity_weight,
            baselines,
        }
    }

    /// At most one detection per (entity, metric) per batch; repeated
    /// triggers are coalesced to the highest-magnitude score.
    pub fn score_entity(&self, entry: &BatchEntity, now: i64) -> Vec<Detection> {
        let mut detections = Vec::new();
        let state = &entry.state;

        for (metric, values) in &entry.observed {
            let Some(stats) = state.metric(metric) else {
                continue;
            };
            if stats.samples < self.min_samples {
                continue;
            }

            let (mean, std_dev) = match self.baselines.get(metric) {
                Some(baseline) => (baseline.mean, baseline.std_dev),
                None => (stats.mean, stats.std_dev()),
            };
            if std_dev < MIN_STD_DEV {
                continue;
            }

            let mut extreme: Option<f64> = None;
            for value in values {
                let z = (value - mean) / std_dev;
                if z.abs() > self.zscore_threshold
                    && extreme.map(|e: f64| z.abs() > e.abs()).unwrap_or(true)
                {
                    extreme = Some(z);
                }
            }

            if let Some(z) = extreme {
                detections.push(Detection::new(
                    &state.owner,
                    &state.player_id,
                    metric,
                    z,
                    self.zscore_threshold,
                    now,
                    entry.last_event_id.clone(),
                    format!(
                        "{metric} z-score {z:.2} exceeds threshold {:.1} (mean {mean:.3}, stddev {std_dev:.3})",
                        self.zscore_threshold
                    ),
                ));
            }
        }

        if let Some(detection) = self.score_headshot_ratio(entry, now) {
            detections.push(detection);
        }

        detections
    }

    /// Lifetime headshot ratio above the configured threshold is flagged
    /// outright, independent of the z-score path.
    fn score_headshot_ratio(&self, entry: &BatchEntity, now: i64) -> Option<Detection> {
        let state = &entry.state;
        if state.total_hits < self.min_samples {
            return None;
        }
        let ratio = state.headshot_ratio();
        if ratio <= self.headshot_threshold {
            return None;
        }
        Some(Detection::new(
            &state.owner,
            &state.player_id,
            SIGNAL_HEADSHOT_RATIO,
            ratio * 100.0,
            self.headshot_threshold * 100.0,
            now,
            entry.last_event_id.clone(),
            format!(
                "headshot ratio {:.1}% exceeds {:.0}% threshold",
                ratio * 100.0,
                self.headshot_threshold * 100.0
            ),
        ))
    }

    /// Folds this batch's detections into the decayed risk accumulation.
    pub fn apply_risk(&self, state: &mut EntityState, detections: &[Detection]) {
        for detection in detections {
            let severity = detection.severity(self.risk_severity_weight);
            state.risk_score = (state.risk_score * self.risk_decay_factor + severity).min(100.0);
        }
    }
}
