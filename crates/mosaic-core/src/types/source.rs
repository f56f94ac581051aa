//! Source descriptors and running statistics.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of backend a source is served from.
///
/// The engine never talks to these backends directly; the injected
/// [`SourceFetch`](crate::fetch::SourceFetch) capability dispatches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Api,
    Database,
    File,
    Stream,
}

impl SourceType {
    /// String form matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Api => "api",
            SourceType::Database => "database",
            SourceType::File => "file",
            SourceType::Stream => "stream",
        }
    }
}

/// A registered data source with scoring metadata.
///
/// `reliability` is clamped to [0, 1] on registration and update. The counter
/// fields are bookkeeping owned by the registry; values supplied here at
/// registration time are ignored and reset to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    /// Unique identifier. Generated (UUID v4) when empty at registration.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Backend kind, used for fetch dispatch.
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Historical reliability, 0 (never right) to 1 (always right).
    pub reliability: f64,
    /// Typical fetch latency in milliseconds.
    pub latency_ms: f64,
    /// Relative access cost (arbitrary units, higher = more expensive).
    pub cost: f64,
    /// Data types this source can serve.
    pub data_types: BTreeSet<String>,
    /// Named transformers applied, in order, to fetched payloads.
    pub transformers: Vec<String>,
    /// Named validators applied, in order, after transformation.
    pub validators: Vec<String>,
    /// Disabled sources are skipped by selection.
    pub enabled: bool,
    /// Successful fetches since registration.
    pub access_count: u64,
    /// Failed fetches since registration.
    pub error_count: u64,
    /// Time of the most recent successful fetch.
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            source_type: SourceType::Api,
            reliability: 0.5,
            latency_ms: 1000.0,
            cost: 1.0,
            data_types: BTreeSet::new(),
            transformers: Vec::new(),
            validators: Vec::new(),
            enabled: true,
            access_count: 0,
            error_count: 0,
            last_accessed: None,
        }
    }
}

impl Source {
    /// Create a source descriptor with the given id and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the backend kind.
    pub fn with_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    /// Set reliability (clamped to [0, 1]).
    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.reliability = reliability.clamp(0.0, 1.0);
        self
    }

    /// Set typical latency in milliseconds.
    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set relative cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Set the served data types.
    pub fn with_data_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the transformer pipeline.
    pub fn with_transformers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transformers = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the validator pipeline.
    pub fn with_validators<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validators = names.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the source.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Fraction of recorded fetches that failed.
    pub fn error_rate(&self) -> f64 {
        self.error_count as f64 / (self.access_count.max(1)) as f64
    }
}

/// Partial update applied to a registered source.
///
/// `None` fields are left untouched. Counters cannot be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub source_type: Option<SourceType>,
    pub reliability: Option<f64>,
    pub latency_ms: Option<f64>,
    pub cost: Option<f64>,
    pub data_types: Option<BTreeSet<String>>,
    pub transformers: Option<Vec<String>>,
    pub validators: Option<Vec<String>>,
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_clamps_reliability() {
        let source = Source::new("s1", "one").with_reliability(1.7);
        assert_eq!(source.reliability, 1.0);
        let source = Source::new("s2", "two").with_reliability(-0.3);
        assert_eq!(source.reliability, 0.0);
    }

    #[test]
    fn test_error_rate_with_no_accesses() {
        let mut source = Source::new("s1", "one");
        source.error_count = 3;
        assert_eq!(source.error_rate(), 3.0);
        source.access_count = 6;
        assert_eq!(source.error_rate(), 0.5);
    }

    #[test]
    fn test_source_type_serde() {
        let json = serde_json::to_string(&SourceType::Database).unwrap();
        assert_eq!(json, "\"database\"");
    }
}
