//! Fusion request and temporal configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Temporal decay settings for one fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Exponential decay rate applied to normalized age.
    pub decay_rate: f64,
    /// Reference "now" for age computation. Defaults to the wall clock at
    /// fusion time when unset.
    pub reference_time: Option<DateTime<Utc>>,
    /// Age at which a result reaches full decay, in seconds.
    pub max_age_secs: f64,
    /// Lifetime of a cached fusion result, in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.1,
            reference_time: None,
            max_age_secs: 3600.0,
            cache_ttl_secs: 300,
        }
    }
}

/// One request to fuse data from registered sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionRequest {
    /// Query passed through to the fetch capability.
    pub query: String,
    /// Candidate source ids. Empty means "all enabled sources".
    pub sources: Vec<String>,
    /// Requested data types; biases selection toward matching sources.
    pub data_types: Vec<String>,
    /// Named conflict-resolution strategy.
    pub conflict_resolution: String,
    /// Named synthesis strategy.
    pub synthesis_strategy: String,
    /// Temporal decay settings.
    pub temporal: TemporalConfig,
    /// Minimum per-field confidence retained in the output, [0, 1].
    pub confidence_threshold: f64,
    /// Per-source fetch timeout in milliseconds. Falls back to the engine
    /// default when unset.
    pub timeout_ms: Option<u64>,
    /// Cache key for the complete fusion output. No caching when unset.
    pub cache_key: Option<String>,
}

impl Default for FusionRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            sources: Vec::new(),
            data_types: Vec::new(),
            conflict_resolution: "weighted_average".to_string(),
            synthesis_strategy: "intelligent_merge".to_string(),
            temporal: TemporalConfig::default(),
            confidence_threshold: 0.0,
            timeout_ms: None,
            cache_key: None,
        }
    }
}

impl FusionRequest {
    /// Create a request for the given query with default settings.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Restrict candidates to the given source ids.
    pub fn with_sources<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Request specific data types.
    pub fn with_data_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Select the conflict-resolution strategy by name.
    pub fn with_resolution(mut self, name: impl Into<String>) -> Self {
        self.conflict_resolution = name.into();
        self
    }

    /// Select the synthesis strategy by name.
    pub fn with_synthesis(mut self, name: impl Into<String>) -> Self {
        self.synthesis_strategy = name.into();
        self
    }

    /// Override temporal settings.
    pub fn with_temporal(mut self, temporal: TemporalConfig) -> Self {
        self.temporal = temporal;
        self
    }

    /// Set the minimum retained per-field confidence (clamped to [0, 1]).
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the per-source fetch timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Cache the output under the given key.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = FusionRequest::new("metrics");
        assert_eq!(req.conflict_resolution, "weighted_average");
        assert_eq!(req.synthesis_strategy, "intelligent_merge");
        assert!(req.sources.is_empty());
        assert_eq!(req.temporal.cache_ttl_secs, 300);
    }

    #[test]
    fn test_threshold_clamped() {
        let req = FusionRequest::new("q").with_confidence_threshold(1.5);
        assert_eq!(req.confidence_threshold, 1.0);
    }
}
