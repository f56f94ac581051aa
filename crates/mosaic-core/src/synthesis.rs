//! Synthesis strategies: building the final payload and its confidence map
//! from resolved fields, plus the confidence threshold filter.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conflict::mean;
use crate::error::MosaicError;
use crate::types::value::unflatten;

/// A field after conflict resolution, with the sources that supplied it.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub value: Value,
    /// Ids of every source that produced a candidate for this field.
    pub sources: Vec<String>,
}

/// Synthesized payload with per-field confidence.
#[derive(Debug, Clone)]
pub struct Synthesized {
    /// Flattened fields retained by the strategy.
    pub fields: BTreeMap<String, Value>,
    /// Per-field confidence keyed by field path.
    pub field_confidence: BTreeMap<String, f64>,
    /// Mean confidence across retained fields.
    pub overall_confidence: f64,
}

impl Synthesized {
    /// Rebuild the nested payload from the retained fields.
    pub fn data(&self) -> Value {
        unflatten(&self.fields)
    }
}

/// Named synthesis strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStrategy {
    /// Keep every field; confidence is the mean of contributing sources.
    IntelligentMerge,
    /// Like `intelligent_merge` but drops fields below 0.8 confidence.
    HighConfidenceOnly,
    /// Boosts field confidence by up to 20% for temporally fresh sources.
    TemporalPriority,
}

/// Fields below this confidence are dropped by `high_confidence_only`.
const HIGH_CONFIDENCE_CUTOFF: f64 = 0.8;

/// Maximum relative boost applied by `temporal_priority`.
const TEMPORAL_BOOST: f64 = 0.2;

impl SynthesisStrategy {
    /// Strategy name as it appears in requests.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IntelligentMerge => "intelligent_merge",
            Self::HighConfidenceOnly => "high_confidence_only",
            Self::TemporalPriority => "temporal_priority",
        }
    }

    /// Produce the synthesized field set and confidence map.
    ///
    /// `source_confidence` and `temporal_weights` are keyed by source id and
    /// cover every source that contributed a resolved field.
    pub fn synthesize(
        &self,
        fields: &BTreeMap<String, ResolvedField>,
        source_confidence: &HashMap<String, f64>,
        temporal_weights: &HashMap<String, f64>,
    ) -> Synthesized {
        let mut retained = BTreeMap::new();
        let mut field_confidence = BTreeMap::new();

        for (path, field) in fields {
            let contributions: Vec<f64> = field
                .sources
                .iter()
                .filter_map(|id| source_confidence.get(id).copied())
                .collect();
            let base = mean(&contributions);

            let confidence = match self {
                Self::IntelligentMerge | Self::HighConfidenceOnly => base,
                Self::TemporalPriority => {
                    let max_weight = field
                        .sources
                        .iter()
                        .filter_map(|id| temporal_weights.get(id).copied())
                        .fold(0.0f64, f64::max);
                    (base * (1.0 + max_weight * TEMPORAL_BOOST)).min(1.0)
                }
            };

            if matches!(self, Self::HighConfidenceOnly) && confidence < HIGH_CONFIDENCE_CUTOFF {
                continue;
            }

            retained.insert(path.clone(), field.value.clone());
            field_confidence.insert(path.clone(), confidence);
        }

        let overall = mean(&field_confidence.values().copied().collect::<Vec<f64>>());
        Synthesized {
            fields: retained,
            field_confidence,
            overall_confidence: overall,
        }
    }
}

impl FromStr for SynthesisStrategy {
    type Err = MosaicError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "intelligent_merge" => Ok(Self::IntelligentMerge),
            "high_confidence_only" => Ok(Self::HighConfidenceOnly),
            "temporal_priority" => Ok(Self::TemporalPriority),
            _ => Err(MosaicError::UnknownSynthesisStrategy {
                name: name.to_string(),
            }),
        }
    }
}

/// Threshold-filtered fusion payload.
#[derive(Debug, Clone)]
pub struct Filtered {
    pub data: Value,
    pub field_confidence: BTreeMap<String, f64>,
    pub confidence: f64,
    /// Fields surviving the filter.
    pub retained: usize,
}

/// Drop fields whose confidence falls below `threshold`.
///
/// Non-object payloads (a lone scalar root) pass through unchanged with the
/// overall confidence.
pub fn filter_by_confidence(synthesized: &Synthesized, threshold: f64) -> Filtered {
    let scalar_root = synthesized.fields.len() == 1 && synthesized.fields.contains_key("");
    if scalar_root || threshold <= 0.0 {
        return Filtered {
            data: synthesized.data(),
            field_confidence: synthesized.field_confidence.clone(),
            confidence: synthesized.overall_confidence,
            retained: synthesized.fields.len(),
        };
    }

    let mut fields = BTreeMap::new();
    let mut field_confidence = BTreeMap::new();
    for (path, value) in &synthesized.fields {
        let confidence = synthesized
            .field_confidence
            .get(path)
            .copied()
            .unwrap_or(0.0);
        if confidence >= threshold {
            fields.insert(path.clone(), value.clone());
            field_confidence.insert(path.clone(), confidence);
        }
    }

    let confidence = mean(&field_confidence.values().copied().collect::<Vec<f64>>());
    Filtered {
        data: unflatten(&fields),
        retained: fields.len(),
        field_confidence,
        confidence,
    }
}
