//! Conflict resolution strategies.
//!
//! A closed set of strategies, parsed from the request's strategy name.
//! An unknown name is a configuration error that fails the whole fusion;
//! an error inside a resolver degrades to the first candidate's value and is
//! logged, never surfaced.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MosaicError;

use super::{Candidate, Conflict};

/// Resolved value for one conflicted field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub value: Value,
    /// Strategy that actually produced the value. May differ from the
    /// requested strategy when a fallback applied.
    pub strategy_used: String,
    /// Consensus support ratio (agreeing candidates / total), when relevant.
    pub support: Option<f64>,
}

/// Named conflict-resolution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Confidence-weighted mean of numeric candidates.
    WeightedAverage,
    /// Candidate with the highest confidence.
    MostConfident,
    /// Candidate with the latest timestamp.
    MostRecent,
    /// Value held by the most candidates.
    Consensus,
}

impl ResolutionStrategy {
    /// Strategy name as it appears in requests.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WeightedAverage => "weighted_average",
            Self::MostConfident => "most_confident",
            Self::MostRecent => "most_recent",
            Self::Consensus => "consensus",
        }
    }

    /// Collapse a conflict into one value.
    ///
    /// Deterministic: ties break by lowest source id. Internal failures
    /// (for example a zero confidence mass) degrade to the first candidate.
    pub fn resolve(&self, conflict: &Conflict) -> Resolution {
        match self.try_resolve(conflict) {
            Some(resolution) => resolution,
            None => {
                tracing::warn!(
                    field = %conflict.field,
                    strategy = self.name(),
                    "resolver degraded to first candidate"
                );
                Resolution {
                    value: conflict.candidates[0].value.clone(),
                    strategy_used: "fallback_first".to_string(),
                    support: None,
                }
            }
        }
    }

    fn try_resolve(&self, conflict: &Conflict) -> Option<Resolution> {
        if conflict.candidates.is_empty() {
            return None;
        }
        match self {
            Self::WeightedAverage => weighted_average(conflict),
            Self::MostConfident => most_confident(&conflict.candidates),
            Self::MostRecent => Some(most_recent(&conflict.candidates, "most_recent")),
            Self::Consensus => consensus(&conflict.candidates),
        }
    }
}

impl FromStr for ResolutionStrategy {
    type Err = MosaicError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "weighted_average" => Ok(Self::WeightedAverage),
            "most_confident" => Ok(Self::MostConfident),
            "most_recent" => Ok(Self::MostRecent),
            "consensus" => Ok(Self::Consensus),
            _ => Err(MosaicError::UnknownResolutionStrategy {
                name: name.to_string(),
            }),
        }
    }
}

fn weighted_average(conflict: &Conflict) -> Option<Resolution> {
    let numeric: Vec<(f64, f64)> = conflict
        .candidates
        .iter()
        .filter_map(|c| c.value.as_f64().map(|v| (v, c.confidence)))
        .collect();

    if numeric.is_empty() {
        // no numeric candidates: fall back to recency
        return Some(most_recent(&conflict.candidates, "most_recent_fallback"));
    }

    let total: f64 = numeric.iter().map(|(_, c)| c).sum();
    if total <= 0.0 {
        return None;
    }
    let average = numeric.iter().map(|(v, c)| v * c).sum::<f64>() / total;

    Some(Resolution {
        value: serde_json::Number::from_f64(average).map(Value::Number)?,
        strategy_used: "weighted_average".to_string(),
        support: None,
    })
}

fn most_confident(candidates: &[Candidate]) -> Option<Resolution> {
    let mut best = candidates.first()?;
    for candidate in &candidates[1..] {
        if candidate.confidence > best.confidence
            || (candidate.confidence == best.confidence && candidate.source_id < best.source_id)
        {
            best = candidate;
        }
    }
    Some(Resolution {
        value: best.value.clone(),
        strategy_used: "most_confident".to_string(),
        support: None,
    })
}

fn most_recent(candidates: &[Candidate], strategy_used: &str) -> Resolution {
    // candidates is non-empty by construction
    let mut best = &candidates[0];
    for candidate in &candidates[1..] {
        let newer = candidate.timestamp > best.timestamp;
        let tied = candidate.timestamp == best.timestamp;
        if newer || (tied && candidate.source_id < best.source_id) {
            best = candidate;
        }
    }
    Resolution {
        value: best.value.clone(),
        strategy_used: strategy_used.to_string(),
        support: None,
    }
}

fn consensus(candidates: &[Candidate]) -> Option<Resolution> {
    struct Group<'a> {
        value: &'a Value,
        count: usize,
        confidence_sum: f64,
        min_source_id: &'a str,
    }

    let mut groups: Vec<Group> = Vec::new();
    for candidate in candidates {
        match groups.iter_mut().find(|g| *g.value == candidate.value) {
            Some(group) => {
                group.count += 1;
                group.confidence_sum += candidate.confidence;
                if candidate.source_id.as_str() < group.min_source_id {
                    group.min_source_id = &candidate.source_id;
                }
            }
            None => groups.push(Group {
                value: &candidate.value,
                count: 1,
                confidence_sum: candidate.confidence,
                min_source_id: &candidate.source_id,
            }),
        }
    }

    let best = groups.into_iter().max_by(|a, b| {
        a.count
            .cmp(&b.count)
            .then_with(|| {
                a.confidence_sum
                    .partial_cmp(&b.confidence_sum)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| b.min_source_id.cmp(a.min_source_id))
    })?;

    Some(Resolution {
        value: best.value.clone(),
        strategy_used: "consensus".to_string(),
        support: Some(best.count as f64 / candidates.len() as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictType;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn candidate(id: &str, value: Value, confidence: f64) -> Candidate {
        Candidate {
            source_id: id.to_string(),
            value,
            confidence,
            timestamp: Some(Utc::now()),
        }
    }

    fn conflict(candidates: Vec<Candidate>) -> Conflict {
        Conflict {
            field: "v".to_string(),
            candidates,
            conflict_type: ConflictType::ValueMismatch,
            severity: 0.5,
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "consensus".parse::<ResolutionStrategy>().unwrap(),
            ResolutionStrategy::Consensus
        );
        let err = "vote".parse::<ResolutionStrategy>().unwrap_err();
        assert!(matches!(err, MosaicError::UnknownResolutionStrategy { .. }));
    }

    #[test]
    fn test_weighted_average() {
        let c = conflict(vec![
            candidate("a", json!(10.0), 0.8),
            candidate("b", json!(20.0), 0.2),
        ]);
        let resolution = ResolutionStrategy::WeightedAverage.resolve(&c);
        assert_eq!(resolution.value.as_f64().unwrap(), 12.0);
        assert_eq!(resolution.strategy_used, "weighted_average");
    }

    #[test]
    fn test_weighted_average_non_numeric_falls_back_to_recency() {
        let now = Utc::now();
        let mut older = candidate("a", json!("old"), 0.9);
        older.timestamp = Some(now - Duration::seconds(60));
        let mut newer = candidate("b", json!("new"), 0.1);
        newer.timestamp = Some(now);

        let resolution = ResolutionStrategy::WeightedAverage.resolve(&conflict(vec![older, newer]));
        assert_eq!(resolution.value, json!("new"));
        assert_eq!(resolution.strategy_used, "most_recent_fallback");
    }

    #[test]
    fn test_weighted_average_zero_mass_degrades() {
        let c = conflict(vec![
            candidate("a", json!(10.0), 0.0),
            candidate("b", json!(20.0), 0.0),
        ]);
        let resolution = ResolutionStrategy::WeightedAverage.resolve(&c);
        assert_eq!(resolution.strategy_used, "fallback_first");
        assert_eq!(resolution.value, json!(10.0));
    }

    #[test]
    fn test_most_confident_tie_breaks_by_id() {
        let c = conflict(vec![
            candidate("z", json!("zed"), 0.6),
            candidate("a", json!("ay"), 0.6),
        ]);
        let resolution = ResolutionStrategy::MostConfident.resolve(&c);
        assert_eq!(resolution.value, json!("ay"));
    }

    #[test]
    fn test_most_recent_prefers_latest() {
        let now = Utc::now();
        let mut old = candidate("a", json!(1), 0.9);
        old.timestamp = Some(now - Duration::seconds(30));
        let mut new = candidate("b", json!(2), 0.1);
        new.timestamp = Some(now);

        let resolution = ResolutionStrategy::MostRecent.resolve(&conflict(vec![old, new]));
        assert_eq!(resolution.value, json!(2));
    }

    #[test]
    fn test_consensus_majority_with_support() {
        let c = conflict(vec![
            candidate("a", json!("x"), 0.5),
            candidate("b", json!("x"), 0.5),
            candidate("c", json!("y"), 0.9),
        ]);
        let resolution = ResolutionStrategy::Consensus.resolve(&c);
        assert_eq!(resolution.value, json!("x"));
        assert!((resolution.support.unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_consensus_count_tie_breaks_by_confidence() {
        let c = conflict(vec![
            candidate("a", json!("low"), 0.2),
            candidate("b", json!("high"), 0.9),
        ]);
        let resolution = ResolutionStrategy::Consensus.resolve(&c);
        assert_eq!(resolution.value, json!("high"));
        assert_eq!(resolution.support, Some(0.5));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let build = || {
            conflict(vec![
                candidate("b", json!("x"), 0.4),
                candidate("a", json!("y"), 0.4),
                candidate("c", json!("x"), 0.4),
            ])
        };
        let first = ResolutionStrategy::Consensus.resolve(&build());
        for _ in 0..10 {
            let again = ResolutionStrategy::Consensus.resolve(&build());
            assert_eq!(first.value, again.value);
            assert_eq!(first.support, again.support);
        }
    }
}
