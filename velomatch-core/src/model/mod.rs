//! Data model of the matching pipeline
//!
//! Inputs (source ways, target edges) are read-only; candidates, segments
//! and aggregated edges are produced by the pipeline stages.

pub mod aggregated;
pub mod attributes;
pub mod candidate;
pub mod feature;
pub mod segment;

pub use aggregated::{AggregatedEdge, DirectionalEdge, EdgeSummary, Layer};
pub use attributes::{AttrValue, Attributes, text_of};
pub use candidate::{Candidate, CandidateOrigin, CandidateStatus, MatchScore, RejectReason};
pub use feature::{DirectionCode, LinearFeature, Oneway, SourceKind, SourceWay, TargetEdge};
pub use segment::{Provenance, Segment};
