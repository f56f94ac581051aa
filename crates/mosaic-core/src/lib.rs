//! mosaic-core - Multi-source data fusion engine.
//!
//! Combines data retrieved from multiple, independently unreliable sources
//! into one conflict-resolved, confidence-scored result. Source access is an
//! injected capability ([`SourceFetch`]); the engine owns source selection,
//! parallel fetch with partial-failure tolerance, field-level conflict
//! detection and resolution, temporal decay weighting, confidence scoring,
//! synthesis, and a TTL-cached output.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mosaic_core::{EngineConfig, FusionEngine, FusionRequest, Source};
//!
//! let engine = FusionEngine::new(EngineConfig::default(), Arc::new(my_fetcher));
//! engine.register_source(Source::new("weather-api", "Weather API").with_reliability(0.9));
//!
//! let outcome = engine
//!     .fuse_data(FusionRequest::new("current conditions").with_resolution("consensus"))
//!     .await?;
//! if let Some(result) = outcome.success() {
//!     println!("fused with confidence {}", result.confidence);
//! }
//! ```

pub mod cache;
pub mod confidence;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod registry;
pub mod select;
pub mod synthesis;
pub mod temporal;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use conflict::{Candidate, Conflict, ConflictType, Resolution, ResolutionStrategy};
pub use engine::{EngineStatus, FusionEngine};
pub use error::{MosaicError, MosaicResult};
pub use fetch::{PipelineRegistry, SourceFetch, Transform, Validate};
pub use metrics::MetricsSnapshot;
pub use registry::SourceRegistry;
pub use synthesis::SynthesisStrategy;
pub use types::{
    FusionFailure, FusionMetadata, FusionOutcome, FusionRequest, FusionResult, QualityMetrics,
    Source, SourceContribution, SourceResult, SourceType, SourceUpdate, TemporalConfig,
};
