//! Completeness report returned with every pipeline run

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::matching::OverrideOutcome;
use crate::model::{Candidate, CandidateStatus, Segment, TargetEdge};

/// Input feature dropped before processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedInput {
    pub id: String,
    /// `source:<kind>` or `target`
    pub dataset: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletenessReport {
    pub edges: usize,
    /// Edges whose result came from the cache
    pub cached_edges: usize,
    pub segments: usize,
    pub attributed_segments: usize,
    pub unattributed_segments: usize,
    pub attributed_length: f64,
    pub unattributed_length: f64,
    pub aggregated_edges: usize,
    /// Edges without a single attributed segment
    pub unmatched_edges: Vec<String>,
    pub rejected_inputs: Vec<RejectedInput>,
    /// Candidate count per status, `accepted` or the reject reason
    pub candidate_status: BTreeMap<String, usize>,
    pub ambiguous_overrides: Vec<String>,
    pub unknown_overrides: Vec<String>,
}

impl CompletenessReport {
    pub(crate) fn build(
        edges: &[TargetEdge],
        segments: &[Segment],
        aggregated_edges: usize,
        candidates: &[Candidate],
        overrides: &OverrideOutcome,
        rejected_inputs: Vec<RejectedInput>,
    ) -> Self {
        let mut report = CompletenessReport {
            edges: edges.len(),
            segments: segments.len(),
            aggregated_edges,
            rejected_inputs,
            ambiguous_overrides: overrides.ambiguous.clone(),
            unknown_overrides: overrides.unknown.clone(),
            ..Self::default()
        };

        let mut matched: BTreeSet<usize> = BTreeSet::new();
        for segment in segments {
            if segment.is_attributed() {
                report.attributed_segments += 1;
                report.attributed_length += segment.length;
                matched.insert(segment.edge);
            } else {
                report.unattributed_segments += 1;
                report.unattributed_length += segment.length;
            }
        }
        report.unmatched_edges = edges
            .iter()
            .enumerate()
            .filter(|(idx, _)| !matched.contains(idx))
            .map(|(_, edge)| edge.id.clone())
            .collect();

        for candidate in candidates {
            let status = match candidate.status {
                CandidateStatus::Accepted => "accepted".to_string(),
                CandidateStatus::Rejected(reason) => reason.to_string(),
            };
            *report.candidate_status.entry(status).or_insert(0) += 1;
        }
        report
    }

    /// Share of the segmented length that received attributes
    pub fn attributed_fraction(&self) -> f64 {
        let total = self.attributed_length + self.unattributed_length;
        if total > 0.0 {
            self.attributed_length / total
        } else {
            0.0
        }
    }
}
