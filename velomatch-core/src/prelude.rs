pub use crate::Error;

// Input and output records
pub use crate::model::{
    AggregatedEdge, AttrValue, Attributes, Candidate, CandidateStatus, DirectionCode,
    DirectionalEdge, EdgeSummary, Layer, LinearFeature, RejectReason, Segment, SourceKind,
    SourceWay, TargetEdge,
};

// Running the pipeline
pub use crate::matching::ManualOverrides;
pub use crate::pipeline::{
    AttributeSchema, CompletenessReport, EdgeCache, MemoryCache, Pipeline, PipelineConfig,
    PipelineOutput, run_pipeline,
};

// Extension points
pub use crate::pipeline::OnewayPolicy;
pub use crate::translate::{AttributeTranslator, PassthroughTranslator, RvnTranslator};
