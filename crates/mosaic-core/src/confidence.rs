//! Per-source confidence scoring.

use serde_json::Value;

use crate::conflict::FusionInput;
use crate::types::value::is_meaningful;

/// Completeness of a payload.
///
/// Arrays count as complete when non-empty; objects score the fraction of
/// members carrying meaningful values; scalars count as complete unless null.
pub fn completeness(data: &Value) -> f64 {
    match data {
        Value::Array(items) => {
            if items.is_empty() {
                0.0
            } else {
                1.0
            }
        }
        Value::Object(map) => {
            if map.is_empty() {
                return 0.0;
            }
            let meaningful = map.values().filter(|v| is_meaningful(v)).count();
            meaningful as f64 / map.len() as f64
        }
        Value::Null => 0.0,
        _ => 1.0,
    }
}

/// Confidence in one source's contribution:
/// `clamp01(reliability x temporal_weight x completeness x (1 - error_rate))`.
pub fn source_confidence(input: &FusionInput) -> f64 {
    let error_rate = input.source.error_rate();
    (input.source.reliability
        * input.temporal_weight
        * completeness(&input.result.data)
        * (1.0 - error_rate))
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Source, SourceResult};
    use serde_json::json;

    fn input(reliability: f64, data: Value, weight: f64) -> FusionInput {
        FusionInput {
            source: Source::new("s1", "one").with_reliability(reliability),
            result: SourceResult::new("s1", data),
            temporal_weight: weight,
        }
    }

    #[test]
    fn test_completeness_object_ratio() {
        let data = json!({"a": 1, "b": null, "c": "", "d": "ok"});
        assert!((completeness(&data) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_completeness_arrays_and_scalars() {
        assert_eq!(completeness(&json!([])), 0.0);
        assert_eq!(completeness(&json!([1, 2])), 1.0);
        assert_eq!(completeness(&json!(null)), 0.0);
        assert_eq!(completeness(&json!(0)), 1.0);
        assert_eq!(completeness(&json!({})), 0.0);
    }

    #[test]
    fn test_confidence_product() {
        let fusion_input = input(0.8, json!({"a": 1, "b": 2}), 0.5);
        assert!((source_confidence(&fusion_input) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_clamped_with_error_history() {
        let mut fusion_input = input(1.0, json!({"a": 1}), 1.0);
        // more errors than successes pushes (1 - error_rate) negative
        fusion_input.source.access_count = 2;
        fusion_input.source.error_count = 10;
        assert_eq!(source_confidence(&fusion_input), 0.0);
    }

    #[test]
    fn test_confidence_in_unit_interval() {
        for reliability in [0.0, 0.3, 1.0] {
            for weight in [0.0, 0.5, 1.0] {
                let c = source_confidence(&input(reliability, json!({"a": 1}), weight));
                assert!((0.0..=1.0).contains(&c));
            }
        }
    }
}
