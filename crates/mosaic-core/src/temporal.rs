//! Exponential recency weighting of source results.

use chrono::{DateTime, Utc};

use crate::types::TemporalConfig;

/// Compute the temporal weight of a result.
///
/// `weight = exp(-decay_rate * min(1, age / max_age))`, with age clamped to
/// zero for future timestamps. A missing timestamp is treated as fresh
/// (weight 1), matching the policy that sources which cannot date their data
/// are not penalized for it.
pub fn temporal_weight(
    timestamp: Option<DateTime<Utc>>,
    reference: DateTime<Utc>,
    config: &TemporalConfig,
) -> f64 {
    let age_secs = timestamp
        .map(|t| (reference - t).num_milliseconds() as f64 / 1000.0)
        .unwrap_or(0.0)
        .max(0.0);

    let normalized_age = if config.max_age_secs > 0.0 {
        (age_secs / config.max_age_secs).min(1.0)
    } else if age_secs > 0.0 {
        1.0
    } else {
        0.0
    };

    (-config.decay_rate * normalized_age).exp()
}
