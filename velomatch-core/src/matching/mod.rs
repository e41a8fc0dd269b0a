//! Decides which source ways correspond to which target edges.
//!
//! Stages run in order: candidate selection (with coverage check),
//! orthogonality filter, manual overrides, source layering.

pub mod candidates;
pub mod layering;
pub mod orthogonal;
pub mod overrides;

use std::collections::BTreeSet;

pub use candidates::{features_in_buffer, select_candidates};
pub use layering::supersede_lower_priority;
pub use orthogonal::{filter_orthogonal, is_orthogonal};
pub use overrides::{ManualOverrides, OverrideOutcome, apply_overrides};

use crate::model::Candidate;

/// Indices of source ways with at least one accepted candidate
pub fn accepted_ways(candidates: &[Candidate]) -> BTreeSet<usize> {
    candidates
        .iter()
        .filter(|c| c.is_accepted())
        .map(|c| c.way)
        .collect()
}
