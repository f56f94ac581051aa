//! Field-level conflict detection across source results.
//!
//! Each successful result is flattened into field paths; paths where two or
//! more sources disagree become [`Conflict`]s, typed by how the candidate
//! values diverge and scored by how uncertain the candidates are.

pub mod resolve;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::value::{flatten, is_meaningful, type_name};
use crate::types::{Source, SourceResult};

pub use resolve::{Resolution, ResolutionStrategy};

/// One source's successful result together with its temporal weight.
#[derive(Debug, Clone)]
pub struct FusionInput {
    /// Snapshot of the source at fetch time.
    pub source: Source,
    /// The fetched result.
    pub result: SourceResult,
    /// Temporal weight of the result, [0, 1].
    pub temporal_weight: f64,
}

/// How the candidate values of a conflict diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Candidates have different runtime types.
    TypeMismatch,
    /// Numeric candidates with variance above 0.1.
    SignificantVariance,
    /// Numeric candidates with variance at or below 0.1.
    MinorVariance,
    /// Non-numeric candidates with unequal values.
    ValueMismatch,
}

/// One source's value for a contested field path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub source_id: String,
    pub value: Value,
    /// Candidate-level confidence, [0, 1].
    pub confidence: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A field path where at least two sources disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    /// Dotted field path.
    pub field: String,
    pub candidates: Vec<Candidate>,
    pub conflict_type: ConflictType,
    /// Severity, [0, 1]: high when candidates are both uncertain and spread.
    pub severity: f64,
}

/// Output of conflict analysis: every field path with its candidates, plus
/// the subset that conflicts.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Candidates grouped by field path, ordered for determinism.
    pub fields: BTreeMap<String, Vec<Candidate>>,
    pub conflicts: Vec<Conflict>,
}

/// Flatten all inputs and detect field-level conflicts.
pub fn analyze(inputs: &[FusionInput]) -> Analysis {
    let mut fields: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();

    for input in inputs {
        for (path, value) in flatten(&input.result.data) {
            let confidence = candidate_confidence(&value, input);
            fields.entry(path).or_default().push(Candidate {
                source_id: input.source.id.clone(),
                value,
                confidence,
                timestamp: input.result.timestamp,
            });
        }
    }

    // stable candidate order regardless of fetch completion order
    for candidates in fields.values_mut() {
        candidates.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    }

    let conflicts = fields
        .iter()
        .filter(|(_, candidates)| is_conflicted(candidates))
        .map(|(path, candidates)| build_conflict(path, candidates))
        .collect();

    Analysis { fields, conflicts }
}

fn is_conflicted(candidates: &[Candidate]) -> bool {
    candidates.len() > 1
        && candidates
            .iter()
            .any(|c| c.value != candidates[0].value)
}

/// Candidate confidence: base 0.5, +0.2 for meaningful content, scaled by
/// the owning source's reliability and temporal weight.
fn candidate_confidence(value: &Value, input: &FusionInput) -> f64 {
    let base = if is_meaningful(value) { 0.7 } else { 0.5 };
    (base * input.source.reliability * input.temporal_weight).clamp(0.0, 1.0)
}

fn build_conflict(path: &str, candidates: &[Candidate]) -> Conflict {
    let conflict_type = classify(candidates);
    let confidences: Vec<f64> = candidates.iter().map(|c| c.confidence).collect();
    let severity =
        (variance(&confidences) + (1.0 - mean(&confidences))).clamp(0.0, 1.0);

    Conflict {
        field: path.to_string(),
        candidates: candidates.to_vec(),
        conflict_type,
        severity,
    }
}

fn classify(candidates: &[Candidate]) -> ConflictType {
    let first_type = type_name(&candidates[0].value);
    if candidates.iter().any(|c| type_name(&c.value) != first_type) {
        return ConflictType::TypeMismatch;
    }

    let numbers: Vec<f64> = candidates
        .iter()
        .filter_map(|c| c.value.as_f64())
        .collect();
    if numbers.len() == candidates.len() {
        if variance(&numbers) > 0.1 {
            ConflictType::SignificantVariance
        } else {
            ConflictType::MinorVariance
        }
    } else {
        ConflictType::ValueMismatch
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}
