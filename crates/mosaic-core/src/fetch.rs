//! Source access capability and the transform/validate pipeline.
//!
//! The engine never implements API/database/file/stream access itself; it is
//! handed an implementation of [`SourceFetch`] and dispatches every fetch
//! through it. Payloads then flow through the source's named transformer and
//! validator pipelines before entering fusion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{MosaicError, MosaicResult};
use crate::types::{Source, SourceResult};

/// Injected capability abstracting over source access.
///
/// Implementations dispatch on `source.source_type` and may return
/// [`MosaicError::UnsupportedSourceType`] for kinds they do not handle.
/// Retry policy, if any, belongs to the implementation; the engine records a
/// failure and moves on.
#[async_trait]
pub trait SourceFetch: Send + Sync {
    /// Fetch data for a query from one source. `timeout` is advisory; the
    /// engine enforces its own deadline around the call.
    async fn fetch(
        &self,
        source: &Source,
        query: &str,
        timeout: Duration,
    ) -> MosaicResult<SourceResult>;
}

/// A named payload transformer. Errors are strings; the pipeline scopes them
/// to the owning source.
pub trait Transform: Send + Sync {
    fn apply(&self, value: Value) -> Result<Value, String>;
}

/// A named payload validator.
pub trait Validate: Send + Sync {
    fn validate(&self, value: &Value) -> Result<(), String>;
}

/// Registry of named transformers and validators referenced by source
/// descriptors. Populated at engine construction time.
#[derive(Default)]
pub struct PipelineRegistry {
    transformers: HashMap<String, Arc<dyn Transform>>,
    validators: HashMap<String, Arc<dyn Validate>>,
}

impl PipelineRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transformer under a name.
    pub fn register_transformer(&mut self, name: impl Into<String>, transform: Arc<dyn Transform>) {
        self.transformers.insert(name.into(), transform);
    }

    /// Register a validator under a name.
    pub fn register_validator(&mut self, name: impl Into<String>, validate: Arc<dyn Validate>) {
        self.validators.insert(name.into(), validate);
    }

    fn transformer(&self, name: &str) -> Option<&Arc<dyn Transform>> {
        self.transformers.get(name)
    }

    fn validator(&self, name: &str) -> Option<&Arc<dyn Validate>> {
        self.validators.get(name)
    }
}

/// Fetch one source with a deadline and run its pipelines.
///
/// Failures here are source-scoped: the caller records them and excludes the
/// source from the fusion without failing the overall call.
pub(crate) async fn fetch_one(
    fetcher: &Arc<dyn SourceFetch>,
    source: &Source,
    pipelines: &PipelineRegistry,
    query: &str,
    timeout: Duration,
) -> MosaicResult<SourceResult> {
    let started = Instant::now();

    let fetched = tokio::time::timeout(timeout, fetcher.fetch(source, query, timeout)).await;
    let mut result = match fetched {
        Ok(inner) => inner?,
        Err(_) => {
            return Err(MosaicError::Timeout {
                source_id: source.id.clone(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    };

    for name in &source.transformers {
        let transform = pipelines.transformer(name).ok_or_else(|| {
            MosaicError::validation(&source.id, format!("unknown transformer '{}'", name))
        })?;
        result.data = transform
            .apply(result.data)
            .map_err(|message| MosaicError::validation(&source.id, message))?;
    }

    for name in &source.validators {
        let validate = pipelines.validator(name).ok_or_else(|| {
            MosaicError::validation(&source.id, format!("unknown validator '{}'", name))
        })?;
        validate
            .validate(&result.data)
            .map_err(|message| MosaicError::validation(&source.id, message))?;
    }

    result.source_id = source.id.clone();
    result.fetch_time_ms = started.elapsed().as_millis() as u64;
    Ok(result)
}
