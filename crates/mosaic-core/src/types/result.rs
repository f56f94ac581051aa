//! Fusion outputs: per-source results, the fused result, and the structured
//! failure value returned when every source fails.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw payload returned by the fetch capability for one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResult {
    /// Id of the source that produced this result.
    pub source_id: String,
    /// Payload data.
    pub data: serde_json::Value,
    /// Free-form metadata from the adapter.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// When the underlying data was produced. Missing timestamps are treated
    /// as fresh (age zero) by temporal weighting.
    pub timestamp: Option<DateTime<Utc>>,
    /// Wall time the fetch took, in milliseconds.
    #[serde(default)]
    pub fetch_time_ms: u64,
    /// Number of records in the payload, if the adapter counts them.
    #[serde(default)]
    pub record_count: u64,
}

impl SourceResult {
    /// Create a result with the current time as its data timestamp.
    pub fn new(source_id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            source_id: source_id.into(),
            data,
            metadata: HashMap::new(),
            timestamp: Some(Utc::now()),
            fetch_time_ms: 0,
            record_count: 0,
        }
    }

    /// Override the data timestamp.
    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// One source's contribution to a fused result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContribution {
    pub source_id: String,
    /// Computed confidence for this source, [0, 1].
    pub confidence: f64,
    /// Temporal weight applied to this source's result, [0, 1].
    pub temporal_weight: f64,
    /// Wall time the fetch took, in milliseconds.
    pub fetch_time_ms: u64,
}

/// Metadata describing how a fused result was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionMetadata {
    /// Sources that contributed data, with per-source confidence.
    pub sources: Vec<SourceContribution>,
    /// Conflict-resolution strategy that was applied.
    pub resolution_strategy: String,
    /// Synthesis strategy that was applied.
    pub synthesis_strategy: String,
    /// Number of field-level conflicts detected.
    pub conflicts_detected: usize,
    /// Number of conflicts collapsed by the resolver.
    pub conflicts_resolved: usize,
    /// End-to-end processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Whether this result was served from the cache.
    pub from_cache: bool,
    /// When the fusion completed.
    pub timestamp: DateTime<Utc>,
}

/// Quality summary of a fused result. Every field lies in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Fraction of synthesized fields retained after threshold filtering.
    pub completeness: f64,
    /// 1 minus the conflicted-field ratio.
    pub consistency: f64,
    /// Overall confidence of the retained output.
    pub accuracy: f64,
    /// Mean temporal weight of the contributing results.
    pub timeliness: f64,
    /// Mean reliability of the contributing sources.
    pub reliability: f64,
}

impl QualityMetrics {
    /// Clamp every component into [0, 1].
    pub fn clamped(self) -> Self {
        Self {
            completeness: self.completeness.clamp(0.0, 1.0),
            consistency: self.consistency.clamp(0.0, 1.0),
            accuracy: self.accuracy.clamp(0.0, 1.0),
            timeliness: self.timeliness.clamp(0.0, 1.0),
            reliability: self.reliability.clamp(0.0, 1.0),
        }
    }
}

/// A successful fusion output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionResult {
    /// Unique id for this fusion call.
    pub fusion_id: String,
    /// Conflict-resolved, threshold-filtered payload.
    pub data: serde_json::Value,
    /// Overall confidence of the payload, [0, 1].
    pub confidence: f64,
    /// Per-field confidence keyed by field path.
    pub field_confidence: BTreeMap<String, f64>,
    /// Provenance and strategy metadata.
    pub metadata: FusionMetadata,
    /// Quality summary.
    pub quality: QualityMetrics,
}

/// Structured failure returned when zero sources succeed.
///
/// Distinct from [`MosaicError`](crate::error::MosaicError): running out of
/// data is an expected outcome, not a caller mistake, so it is reported as a
/// value rather than an `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionFailure {
    /// Unique id for this fusion call.
    pub fusion_id: String,
    /// Description of the failure.
    pub error: String,
    /// Per-source errors encountered during the fan-out.
    pub source_errors: BTreeMap<String, String>,
    /// End-to-end processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Outcome of a `fuse_data` call that did not hit a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FusionOutcome {
    Success(Box<FusionResult>),
    Failure(FusionFailure),
}

impl FusionOutcome {
    /// Whether the fusion produced data.
    pub fn is_success(&self) -> bool {
        matches!(self, FusionOutcome::Success(_))
    }

    /// Borrow the fused result, if any.
    pub fn success(&self) -> Option<&FusionResult> {
        match self {
            FusionOutcome::Success(result) => Some(result),
            FusionOutcome::Failure(_) => None,
        }
    }

    /// Borrow the failure value, if any.
    pub fn failure(&self) -> Option<&FusionFailure> {
        match self {
            FusionOutcome::Success(_) => None,
            FusionOutcome::Failure(failure) => Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quality_clamped() {
        let quality = QualityMetrics {
            completeness: 1.3,
            consistency: -0.2,
            accuracy: 0.5,
            timeliness: 0.9,
            reliability: 2.0,
        }
        .clamped();
        assert_eq!(quality.completeness, 1.0);
        assert_eq!(quality.consistency, 0.0);
        assert_eq!(quality.reliability, 1.0);
        assert_eq!(quality.accuracy, 0.5);
    }

    #[test]
    fn test_source_result_defaults() {
        let result = SourceResult::new("s1", json!({"a": 1}));
        assert!(result.timestamp.is_some());
        assert_eq!(result.fetch_time_ms, 0);
    }

    #[test]
    fn test_outcome_accessors() {
        let failure = FusionOutcome::Failure(FusionFailure {
            fusion_id: "f1".to_string(),
            error: "all sources failed".to_string(),
            source_errors: BTreeMap::new(),
            processing_time_ms: 12,
        });
        assert!(!failure.is_success());
        assert!(failure.success().is_none());
        assert_eq!(failure.failure().unwrap().fusion_id, "f1");
    }
}
