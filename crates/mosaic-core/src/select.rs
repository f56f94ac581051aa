//! Source selection: scoring and deterministic ranking of candidates.

use ordered_float::OrderedFloat;

use crate::error::{MosaicError, MosaicResult};
use crate::types::Source;

/// Score one source for a request.
///
/// `reliability x dataTypeFactor x errorPenalty / max(cost, 0.1)
/// / max(latency_ms / 1000, 0.1)`. The data-type factor only applies when the
/// request names data types: 1.2 on any overlap with the source's set, 0.5
/// otherwise. The error penalty floors at 0.5 so a noisy history degrades a
/// source without eliminating it.
pub fn source_score(source: &Source, data_types: &[String]) -> f64 {
    let data_type_factor = if data_types.is_empty() {
        1.0
    } else if data_types.iter().any(|t| source.data_types.contains(t)) {
        1.2
    } else {
        0.5
    };

    let error_penalty = (1.0 - source.error_rate() * 0.5).max(0.5);
    let cost_divisor = source.cost.max(0.1);
    let latency_divisor = (source.latency_ms / 1000.0).max(0.1);

    source.reliability * data_type_factor * error_penalty / cost_divisor / latency_divisor
}

/// Rank enabled candidates by score and return up to `max_sources` ids.
///
/// Ties break by source id ascending, so the ranking is reproducible across
/// runs regardless of input order.
pub fn select_sources(
    candidates: &[Source],
    data_types: &[String],
    max_sources: usize,
) -> MosaicResult<Vec<String>> {
    let mut scored: Vec<(f64, &str)> = candidates
        .iter()
        .filter(|source| source.enabled)
        .map(|source| (source_score(source, data_types), source.id.as_str()))
        .collect();

    scored.sort_by(|a, b| {
        OrderedFloat(b.0)
            .cmp(&OrderedFloat(a.0))
            .then_with(|| a.1.cmp(b.1))
    });

    let selected: Vec<String> = scored
        .into_iter()
        .take(max_sources)
        .map(|(_, id)| id.to_string())
        .collect();

    if selected.is_empty() {
        return Err(MosaicError::NoSuitableSources);
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str, reliability: f64) -> Source {
        Source::new(id, id)
            .with_reliability(reliability)
            .with_latency_ms(1000.0)
            .with_cost(1.0)
            .with_data_types(["x"])
    }

    #[test]
    fn test_ranking_by_reliability_is_deterministic() {
        let sources = vec![source("b", 0.6), source("c", 0.3), source("a", 0.9)];
        let data_types = vec!["x".to_string()];

        for _ in 0..10 {
            let selected = select_sources(&sources, &data_types, 2).unwrap();
            assert_eq!(selected, vec!["a", "b"]);
        }
    }

    #[test]
    fn test_tie_break_by_id() {
        let sources = vec![source("z", 0.7), source("a", 0.7), source("m", 0.7)];
        let selected = select_sources(&sources, &[], 3).unwrap();
        assert_eq!(selected, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_data_type_mismatch_halves_factor() {
        let matching = source("a", 0.8);
        let other = source("b", 0.8).with_data_types(["y"]);
        let requested = vec!["x".to_string()];
        assert!(source_score(&matching, &requested) > source_score(&other, &requested));
        // no requested types: factor is neutral and scores are equal
        assert_eq!(source_score(&matching, &[]), source_score(&other, &[]));
    }

    #[test]
    fn test_error_penalty_floors_at_half() {
        let mut noisy = source("a", 1.0);
        noisy.access_count = 10;
        noisy.error_count = 100;
        let clean = source("b", 1.0);
        let ratio = source_score(&noisy, &[]) / source_score(&clean, &[]);
        assert!((ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_sources_excluded() {
        let sources = vec![source("a", 0.9).with_enabled(false)];
        let err = select_sources(&sources, &[], 5).unwrap_err();
        assert!(matches!(err, MosaicError::NoSuitableSources));
    }

    #[test]
    fn test_cost_and_latency_divisors_floored() {
        let cheap = source("a", 0.5).with_cost(0.0).with_latency_ms(0.0);
        // divisors floor at 0.1 each
        let expected = 0.5 * 1.2 / 0.1 / 0.1;
        assert!((source_score(&cheap, &["x".to_string()]) - expected).abs() < 1e-9);
    }
}
