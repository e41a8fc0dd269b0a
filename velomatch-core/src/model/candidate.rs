//! Proposed correspondences between source ways and target edges

use std::fmt;

use serde::Serialize;

/// Similarity of a source way to a target edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchScore {
    Geometric {
        /// Mean distance from way samples to the edge
        mean_distance: f64,
        /// Undirected angle between way and edge, degrees in `[0, 90]`
        angle_diff: f64,
    },
    /// Sentinel for candidates injected by a manual include
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    Geometric,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Too little of the way lies inside the target buffer
    Coverage,
    /// Short way crossing the target direction
    Orthogonal,
    ManualExclude,
    /// Covered by a higher priority dataset
    Superseded,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RejectReason::Coverage => "coverage",
            RejectReason::Orthogonal => "orthogonal",
            RejectReason::ManualExclude => "manual_exclude",
            RejectReason::Superseded => "superseded",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum CandidateStatus {
    Accepted,
    Rejected(RejectReason),
}

/// Correspondence between one source way and one target edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Index into the source way list
    pub way: usize,
    pub way_id: String,
    /// Index into the target edge list, `None` for synthetic manual candidates
    pub edge: Option<usize>,
    pub edge_id: Option<String>,
    pub score: MatchScore,
    pub origin: CandidateOrigin,
    pub status: CandidateStatus,
}

impl Candidate {
    pub fn is_accepted(&self) -> bool {
        self.status == CandidateStatus::Accepted
    }

    pub fn reject(&mut self, reason: RejectReason) {
        self.status = CandidateStatus::Rejected(reason);
    }
}
