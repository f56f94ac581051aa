//! The fusion engine: orchestrates selection, parallel fetch, conflict
//! resolution, confidence scoring, synthesis, caching, and metrics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::ResultCache;
use crate::confidence::source_confidence;
use crate::config::EngineConfig;
use crate::conflict::{self, Conflict, FusionInput, ResolutionStrategy};
use crate::error::{MosaicError, MosaicResult};
use crate::fetch::{fetch_one, PipelineRegistry, SourceFetch, Transform, Validate};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::registry::SourceRegistry;
use crate::select::select_sources;
use crate::synthesis::{filter_by_confidence, ResolvedField, SynthesisStrategy};
use crate::temporal::temporal_weight;
use crate::types::{
    FusionFailure, FusionMetadata, FusionOutcome, FusionRequest, FusionResult, QualityMetrics,
    Source, SourceContribution, SourceResult, SourceUpdate,
};

/// Operational snapshot returned by [`FusionEngine::status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Number of registered sources.
    pub sources: usize,
    /// Number of cached fusion results.
    pub cache_entries: usize,
    /// Running fusion metrics.
    pub metrics: MetricsSnapshot,
}

/// Multi-source fusion engine.
///
/// Owns the source registry, pipeline registry, result cache, and metrics;
/// source access goes through the injected [`SourceFetch`] capability.
/// Safe to share across tasks: every method takes `&self`.
pub struct FusionEngine {
    config: EngineConfig,
    registry: SourceRegistry,
    pipelines: PipelineRegistry,
    cache: ResultCache,
    metrics: MetricsCollector,
    fetcher: Arc<dyn SourceFetch>,
}

impl FusionEngine {
    /// Create an engine with the given configuration and fetch capability.
    pub fn new(config: EngineConfig, fetcher: Arc<dyn SourceFetch>) -> Self {
        let cache = ResultCache::new(config.cache_size);
        Self {
            config,
            registry: SourceRegistry::new(),
            pipelines: PipelineRegistry::new(),
            cache,
            metrics: MetricsCollector::new(),
            fetcher,
        }
    }

    /// Register a named transformer available to source pipelines.
    pub fn with_transformer(
        mut self,
        name: impl Into<String>,
        transform: Arc<dyn Transform>,
    ) -> Self {
        self.pipelines.register_transformer(name, transform);
        self
    }

    /// Register a named validator available to source pipelines.
    pub fn with_validator(mut self, name: impl Into<String>, validate: Arc<dyn Validate>) -> Self {
        self.pipelines.register_validator(name, validate);
        self
    }

    // --- administrative surface -------------------------------------------

    /// Register a source, returning its id.
    pub fn register_source(&self, source: Source) -> String {
        self.registry.register(source)
    }

    /// Remove a source. Returns whether it existed.
    pub fn unregister_source(&self, id: &str) -> bool {
        self.registry.unregister(id)
    }

    /// Apply a partial update to a source.
    pub fn update_source(&self, id: &str, patch: SourceUpdate) -> MosaicResult<Source> {
        self.registry.update(id, patch)
    }

    /// Get a source snapshot by id.
    pub fn get_source(&self, id: &str) -> Option<Source> {
        self.registry.get(id)
    }

    /// List all sources, ordered by id.
    pub fn list_sources(&self) -> Vec<Source> {
        self.registry.list()
    }

    // --- operational surface ----------------------------------------------

    /// Snapshot engine state and metrics.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            sources: self.registry.len(),
            cache_entries: self.cache.len(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Drop every cached fusion result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // --- data plane -------------------------------------------------------

    /// Fuse data from the best available sources for a request.
    ///
    /// Configuration problems (unknown strategy names, an empty selection)
    /// return `Err`. Running out of data is not a caller mistake: when every
    /// selected source fails, the call returns `Ok` with a structured
    /// [`FusionOutcome::Failure`].
    pub async fn fuse_data(&self, request: FusionRequest) -> MosaicResult<FusionOutcome> {
        let started = Instant::now();
        let fusion_id = Uuid::new_v4().to_string();

        // strategy names are validated up front: a misconfigured request
        // must fail even when a cached result could have served it
        let resolution: ResolutionStrategy = request.conflict_resolution.parse()?;
        let synthesis: SynthesisStrategy = request.synthesis_strategy.parse()?;

        if let Some(key) = &request.cache_key {
            if let Some(mut hit) = self.cache.get(key) {
                self.metrics.record_cache_hit();
                hit.metadata.from_cache = true;
                tracing::debug!(fusion_id = %hit.fusion_id, cache_key = %key, "served from cache");
                return Ok(FusionOutcome::Success(Box::new(hit)));
            }
        }

        self.metrics.record_attempt();
        tracing::debug!(%fusion_id, query = %request.query, "fusion started");

        let candidates: Vec<Source> = if request.sources.is_empty() {
            self.registry.list()
        } else {
            request
                .sources
                .iter()
                .filter_map(|id| self.registry.get(id))
                .collect()
        };
        let selected = select_sources(&candidates, &request.data_types, self.config.max_sources)?;

        let timeout = Duration::from_millis(
            request.timeout_ms.unwrap_or(self.config.default_timeout_ms),
        );

        // fan out and wait for every fetch to settle
        let settled = join_all(
            selected
                .iter()
                .map(|id| self.fetch_source(id, &request.query, timeout)),
        )
        .await;

        let mut successes: Vec<(Source, SourceResult)> = Vec::new();
        let mut source_errors: BTreeMap<String, String> = BTreeMap::new();
        for (id, outcome) in settled {
            match outcome {
                Ok(pair) => successes.push(pair),
                Err(err) => {
                    source_errors.insert(id, err.to_string());
                }
            }
        }

        if successes.is_empty() {
            let processing_time_ms = started.elapsed().as_millis() as u64;
            self.metrics.record_error("all_sources_failed");
            tracing::warn!(%fusion_id, "all sources failed");
            return Ok(FusionOutcome::Failure(FusionFailure {
                fusion_id,
                error: "all sources failed".to_string(),
                source_errors,
                processing_time_ms,
            }));
        }

        let reference = request.temporal.reference_time.unwrap_or_else(Utc::now);
        let inputs: Vec<FusionInput> = successes
            .into_iter()
            .map(|(source, result)| FusionInput {
                temporal_weight: temporal_weight(result.timestamp, reference, &request.temporal),
                source,
                result,
            })
            .collect();

        let confidences: HashMap<String, f64> = inputs
            .iter()
            .map(|input| (input.source.id.clone(), source_confidence(input)))
            .collect();
        let weights: HashMap<String, f64> = inputs
            .iter()
            .map(|input| (input.source.id.clone(), input.temporal_weight))
            .collect();

        let analysis = conflict::analyze(&inputs);
        let conflicts_detected = analysis.conflicts.len();
        let conflicted: HashMap<&str, &Conflict> = analysis
            .conflicts
            .iter()
            .map(|c| (c.field.as_str(), c))
            .collect();

        let mut conflicts_resolved = 0usize;
        let mut resolved: BTreeMap<String, ResolvedField> = BTreeMap::new();
        for (path, candidates) in &analysis.fields {
            let sources: Vec<String> = candidates.iter().map(|c| c.source_id.clone()).collect();
            let value = match conflicted.get(path.as_str()) {
                Some(conflict) => {
                    conflicts_resolved += 1;
                    resolution.resolve(conflict).value
                }
                // single candidate, or multiple agreeing candidates
                None => candidates[0].value.clone(),
            };
            resolved.insert(path.clone(), ResolvedField { value, sources });
        }

        let synthesized = synthesis.synthesize(&resolved, &confidences, &weights);
        let synthesized_fields = synthesized.fields.len();
        let filtered = filter_by_confidence(&synthesized, request.confidence_threshold);

        let weight_values: Vec<f64> = inputs.iter().map(|i| i.temporal_weight).collect();
        let reliabilities: Vec<f64> = inputs.iter().map(|i| i.source.reliability).collect();
        let quality = QualityMetrics {
            completeness: if synthesized_fields == 0 {
                0.0
            } else {
                filtered.retained as f64 / synthesized_fields as f64
            },
            consistency: if analysis.fields.is_empty() {
                1.0
            } else {
                1.0 - conflicts_detected as f64 / analysis.fields.len() as f64
            },
            accuracy: filtered.confidence,
            timeliness: conflict::mean(&weight_values),
            reliability: conflict::mean(&reliabilities),
        }
        .clamped();

        let processing_time_ms = started.elapsed().as_millis() as u64;
        let sources: Vec<SourceContribution> = inputs
            .iter()
            .map(|input| SourceContribution {
                source_id: input.source.id.clone(),
                confidence: confidences.get(&input.source.id).copied().unwrap_or(0.0),
                temporal_weight: input.temporal_weight,
                fetch_time_ms: input.result.fetch_time_ms,
            })
            .collect();

        let result = FusionResult {
            fusion_id: fusion_id.clone(),
            data: filtered.data,
            confidence: filtered.confidence,
            field_confidence: filtered.field_confidence,
            metadata: FusionMetadata {
                sources,
                resolution_strategy: resolution.name().to_string(),
                synthesis_strategy: synthesis.name().to_string(),
                conflicts_detected,
                conflicts_resolved,
                processing_time_ms,
                from_cache: false,
                timestamp: Utc::now(),
            },
            quality,
        };

        if let Some(key) = &request.cache_key {
            self.cache.insert(
                key.clone(),
                result.clone(),
                Duration::from_secs(request.temporal.cache_ttl_secs),
            );
        }
        self.metrics.record_success(
            result.confidence,
            processing_time_ms,
            conflicts_detected,
            conflicts_resolved,
        );
        tracing::debug!(
            %fusion_id,
            confidence = result.confidence,
            conflicts = conflicts_detected,
            "fusion completed"
        );
        Ok(FusionOutcome::Success(Box::new(result)))
    }

    /// Fetch one selected source, recording stats and metrics either way.
    async fn fetch_source(
        &self,
        id: &str,
        query: &str,
        timeout: Duration,
    ) -> (String, MosaicResult<(Source, SourceResult)>) {
        let entry = match self.registry.entry(id) {
            Some(entry) => entry,
            None => return (id.to_string(), Err(MosaicError::source_not_found(id))),
        };
        let source = entry.snapshot();

        match fetch_one(&self.fetcher, &source, &self.pipelines, query, timeout).await {
            Ok(result) => {
                entry.stats.record_success();
                self.metrics.record_source_use(id);
                (id.to_string(), Ok((source, result)))
            }
            Err(err) => {
                entry.stats.record_error();
                self.metrics.record_error(err.kind());
                tracing::warn!(source_id = %id, error = %err, "source fetch failed");
                (id.to_string(), Err(err))
            }
        }
    }
}
