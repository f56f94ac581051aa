//! Core types for mosaic.

pub mod request;
pub mod result;
pub mod source;
pub mod value;

pub use request::{FusionRequest, TemporalConfig};
pub use result::{
    FusionFailure, FusionMetadata, FusionOutcome, FusionResult, QualityMetrics,
    SourceContribution, SourceResult,
};
pub use source::{Source, SourceType, SourceUpdate};
