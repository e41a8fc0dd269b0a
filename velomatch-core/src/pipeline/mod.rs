//! Wiring of the matching, snapping and aggregation stages
//!
//! [`Pipeline`] validates its [`PipelineConfig`] up front, runs the enabled
//! matching stages, fans the per-edge work out over `rayon` and always
//! returns a [`CompletenessReport`] next to the results.

pub mod cache;
pub mod config;
pub mod policy;
pub mod report;
pub mod runner;

pub use cache::{
    CacheKey, EdgeCache, EdgeResult, Fingerprint, MemoryCache, edge_fingerprint, sources_fingerprint,
};
pub use config::{
    AttributeSchema, CoverageConfig, LayeringConfig, OnewayPolicyKind, OrthogonalConfig,
    PipelineConfig, SnappingConfig, StageSelection,
};
pub use policy::{DualCarriagewayAsBidirectional, OnewayPolicy, StrictOneway, policy_for};
pub use report::{CompletenessReport, RejectedInput};
pub use runner::{Pipeline, PipelineOutput, run_pipeline};
