//! Source registry: concurrency-safe store of source descriptors and their
//! running fetch statistics.
//!
//! Descriptors are mutated only through register/update/unregister; fetch
//! bookkeeping (access and error counts, last-accessed time) lives in atomics
//! so concurrent fusions never lose increments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{MosaicError, MosaicResult};
use crate::types::{Source, SourceUpdate};

/// Running fetch statistics for one source.
#[derive(Debug, Default)]
pub(crate) struct SourceStats {
    access_count: AtomicU64,
    error_count: AtomicU64,
    last_accessed: RwLock<Option<DateTime<Utc>>>,
}

impl SourceStats {
    pub(crate) fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    pub(crate) fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub(crate) fn record_success(&self) {
        self.access_count.fetch_add(1, Ordering::Relaxed);
        *self.last_accessed.write().unwrap() = Some(Utc::now());
    }

    pub(crate) fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// A registered source: immutable-by-fetch descriptor plus atomic stats.
#[derive(Debug)]
pub(crate) struct SourceEntry {
    descriptor: RwLock<Source>,
    pub(crate) stats: SourceStats,
}

impl SourceEntry {
    /// Snapshot the descriptor with current statistics merged in.
    pub(crate) fn snapshot(&self) -> Source {
        let mut source = self.descriptor.read().unwrap().clone();
        source.access_count = self.stats.access_count();
        source.error_count = self.stats.error_count();
        source.last_accessed = *self.stats.last_accessed.read().unwrap();
        source
    }
}

/// CRUD store of source descriptors, safe for concurrent fusions.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    entries: RwLock<HashMap<String, Arc<SourceEntry>>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, generating an id if the descriptor carries none.
    ///
    /// Counters are reset to zero regardless of the values supplied.
    /// Registering an existing id replaces the descriptor and its stats.
    pub fn register(&self, mut source: Source) -> String {
        if source.id.is_empty() {
            source.id = Uuid::new_v4().to_string();
        }
        source.reliability = source.reliability.clamp(0.0, 1.0);
        source.access_count = 0;
        source.error_count = 0;
        source.last_accessed = None;

        let id = source.id.clone();
        let entry = Arc::new(SourceEntry {
            descriptor: RwLock::new(source),
            stats: SourceStats::default(),
        });
        self.entries.write().unwrap().insert(id.clone(), entry);
        tracing::debug!(source_id = %id, "source registered");
        id
    }

    /// Remove a source. Returns whether it existed.
    pub fn unregister(&self, id: &str) -> bool {
        self.entries.write().unwrap().remove(id).is_some()
    }

    /// Apply a partial update, returning the updated snapshot.
    pub fn update(&self, id: &str, patch: SourceUpdate) -> MosaicResult<Source> {
        let entry = self
            .entry(id)
            .ok_or_else(|| MosaicError::source_not_found(id))?;

        {
            let mut descriptor = entry.descriptor.write().unwrap();
            if let Some(name) = patch.name {
                descriptor.name = name;
            }
            if let Some(source_type) = patch.source_type {
                descriptor.source_type = source_type;
            }
            if let Some(reliability) = patch.reliability {
                descriptor.reliability = reliability.clamp(0.0, 1.0);
            }
            if let Some(latency_ms) = patch.latency_ms {
                descriptor.latency_ms = latency_ms;
            }
            if let Some(cost) = patch.cost {
                descriptor.cost = cost;
            }
            if let Some(data_types) = patch.data_types {
                descriptor.data_types = data_types;
            }
            if let Some(transformers) = patch.transformers {
                descriptor.transformers = transformers;
            }
            if let Some(validators) = patch.validators {
                descriptor.validators = validators;
            }
            if let Some(enabled) = patch.enabled {
                descriptor.enabled = enabled;
            }
        }
        Ok(entry.snapshot())
    }

    /// Get a source snapshot by id.
    pub fn get(&self, id: &str) -> Option<Source> {
        self.entry(id).map(|entry| entry.snapshot())
    }

    /// List all sources, ordered by id.
    pub fn list(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self
            .entries
            .read()
            .unwrap()
            .values()
            .map(|entry| entry.snapshot())
            .collect();
        sources.sort_by(|a, b| a.id.cmp(&b.id));
        sources
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    pub(crate) fn entry(&self, id: &str) -> Option<Arc<SourceEntry>> {
        self.entries.read().unwrap().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceType;

    #[test]
    fn test_register_generates_id() {
        let registry = SourceRegistry::new();
        let id = registry.register(Source::new("", "anonymous"));
        assert!(!id.is_empty());
        assert_eq!(registry.get(&id).unwrap().name, "anonymous");
    }

    #[test]
    fn test_register_resets_counters() {
        let registry = SourceRegistry::new();
        let mut source = Source::new("s1", "one");
        source.access_count = 99;
        source.error_count = 7;
        registry.register(source);
        let snapshot = registry.get("s1").unwrap();
        assert_eq!(snapshot.access_count, 0);
        assert_eq!(snapshot.error_count, 0);
        assert!(snapshot.last_accessed.is_none());
    }

    #[test]
    fn test_update_patches_fields() {
        let registry = SourceRegistry::new();
        registry.register(Source::new("s1", "one").with_reliability(0.5));

        let updated = registry
            .update(
                "s1",
                SourceUpdate {
                    reliability: Some(1.4),
                    source_type: Some(SourceType::Stream),
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.reliability, 1.0);
        assert_eq!(updated.source_type, SourceType::Stream);
        assert!(!updated.enabled);
        // untouched field survives
        assert_eq!(updated.name, "one");
    }

    #[test]
    fn test_update_missing_source_fails() {
        let registry = SourceRegistry::new();
        let err = registry.update("nope", SourceUpdate::default()).unwrap_err();
        assert!(matches!(err, MosaicError::SourceNotFound { .. }));
    }

    #[test]
    fn test_unregister() {
        let registry = SourceRegistry::new();
        registry.register(Source::new("s1", "one"));
        assert!(registry.unregister("s1"));
        assert!(!registry.unregister("s1"));
        assert!(registry.get("s1").is_none());
    }

    #[test]
    fn test_list_ordered_by_id() {
        let registry = SourceRegistry::new();
        registry.register(Source::new("b", "two"));
        registry.register(Source::new("a", "one"));
        let ids: Vec<String> = registry.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_stats_visible_in_snapshot() {
        let registry = SourceRegistry::new();
        registry.register(Source::new("s1", "one"));
        let entry = registry.entry("s1").unwrap();
        entry.stats.record_success();
        entry.stats.record_error();
        let snapshot = registry.get("s1").unwrap();
        assert_eq!(snapshot.access_count, 1);
        assert_eq!(snapshot.error_count, 1);
        assert!(snapshot.last_accessed.is_some());
    }

    #[test]
    fn test_concurrent_counter_increments() {
        let registry = Arc::new(SourceRegistry::new());
        registry.register(Source::new("s1", "one"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let entry = registry.entry("s1").unwrap();
                    for _ in 0..100 {
                        entry.stats.record_success();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.get("s1").unwrap().access_count, 800);
    }
}
