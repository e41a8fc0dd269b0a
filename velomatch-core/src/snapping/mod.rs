//! Segmenting target edges and transferring source attributes onto them

pub mod segmenter;
pub mod snapper;

pub use segmenter::segment_edge;
pub use snapper::{SnapCandidate, SourcePool};
