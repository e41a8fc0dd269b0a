//! Merging snapped segments into aggregated edges, direction layers and
//! per-edge summaries

pub mod layers;
pub mod runs;
pub mod summary;

pub use layers::{DirectionLayers, split_layers};
pub use runs::{MergePolicy, aggregate_edge, apply_length_policy, find_runs};
pub use summary::{Hierarchy, SummaryRules, summarize};
