//! TTL cache of complete fusion outputs with capacity eviction.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::types::FusionResult;

struct CacheEntry {
    result: FusionResult,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Keyed cache of fusion results, safe for concurrent fusions.
///
/// Entries expire after their per-entry TTL. When the entry count exceeds
/// capacity, the oldest 20% by insertion time are evicted.
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    capacity: usize,
}

impl ResultCache {
    /// Create a cache holding up to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Look up a non-expired entry. Expired entries are purged on sight.
    pub fn get(&self, key: &str) -> Option<FusionResult> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                Some(entry) if !entry.expired(now) => return Some(entry.result.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.entries.write().unwrap().remove(key);
        None
    }

    /// Insert a result under `key` with the given TTL.
    pub fn insert(&self, key: impl Into<String>, result: FusionResult, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap();
        entries.retain(|_, entry| !entry.expired(now));

        if entries.len() >= self.capacity {
            let evict_count = (self.capacity / 5).max(1);
            let mut by_age: Vec<(String, Instant)> = entries
                .iter()
                .map(|(k, entry)| (k.clone(), entry.inserted_at))
                .collect();
            by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
            for (key, _) in by_age.into_iter().take(evict_count) {
                entries.remove(&key);
            }
            tracing::debug!(evicted = evict_count, "cache capacity eviction");
        }

        entries.insert(
            key.into(),
            CacheEntry {
                result,
                inserted_at: now,
                ttl,
            },
        );
    }

    /// Number of entries currently held (including not-yet-purged expired).
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FusionMetadata, QualityMetrics};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn result(id: &str) -> FusionResult {
        FusionResult {
            fusion_id: id.to_string(),
            data: serde_json::json!({"a": 1}),
            confidence: 0.9,
            field_confidence: BTreeMap::new(),
            metadata: FusionMetadata {
                sources: Vec::new(),
                resolution_strategy: "weighted_average".to_string(),
                synthesis_strategy: "intelligent_merge".to_string(),
                conflicts_detected: 0,
                conflicts_resolved: 0,
                processing_time_ms: 1,
                from_cache: false,
                timestamp: Utc::now(),
            },
            quality: QualityMetrics {
                completeness: 1.0,
                consistency: 1.0,
                accuracy: 0.9,
                timeliness: 1.0,
                reliability: 0.9,
            },
        }
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResultCache::new(10);
        cache.insert("k", result("f1"), Duration::from_secs(60));
        assert_eq!(cache.get("k").unwrap().fusion_id, "f1");
    }

    #[test]
    fn test_expired_entry_purged() {
        let cache = ResultCache::new(10);
        cache.insert("k", result("f1"), Duration::from_millis(0));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest_fifth() {
        let cache = ResultCache::new(10);
        for i in 0..10 {
            cache.insert(format!("k{}", i), result("f"), Duration::from_secs(60));
            // insertion-time ordering must be strict for deterministic eviction
            std::thread::sleep(Duration::from_millis(2));
        }
        cache.insert("k10", result("f"), Duration::from_secs(60));

        // 2 oldest evicted (20% of 10), newest retained
        assert_eq!(cache.len(), 9);
        assert!(cache.get("k0").is_none());
        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k10").is_some());
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::new(10);
        cache.insert("k", result("f1"), Duration::from_secs(60));
        cache.clear();
        assert!(cache.is_empty());
    }
}
