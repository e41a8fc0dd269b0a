use std::collections::BTreeSet;
use std::ops::Range;

use itertools::Itertools;

use crate::geometry::polyline;
use crate::model::{AggregatedEdge, Segment, TargetEdge};

/// Length limits applied when merging segment runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergePolicy {
    /// Chunks shorter than this join a same-attribute neighbour
    pub min_merge_length: f64,
    /// Runs longer than this are split
    pub max_merge_length: Option<f64>,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            min_merge_length: 50.0,
            max_merge_length: None,
        }
    }
}

/// Maximal runs of consecutive segments with identical attribute sets.
///
/// Unattributed segments form runs of their own and never merge with
/// attributed ones.
pub fn find_runs(segments: &[Segment]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for (_, run) in &segments.iter().chunk_by(|segment| segment.attributes.as_ref()) {
        let end = start + run.count();
        runs.push(start..end);
        start = end;
    }
    runs
}

fn span_length(segments: &[Segment], range: &Range<usize>) -> f64 {
    segments[range.clone()].iter().map(|s| s.length).sum()
}

/// Splits runs at `max_merge_length` and folds short pieces back together.
///
/// A run is only ever divided, never joined with another run, so differing
/// attribute sets cannot end up in one range. Within a run, a piece shorter
/// than `min_merge_length` joins its predecessor, or its successor when it
/// is the first piece. A run shorter than the minimum with no same-attribute
/// neighbour stays as it is.
pub fn apply_length_policy(
    segments: &[Segment],
    runs: &[Range<usize>],
    policy: &MergePolicy,
) -> Vec<Range<usize>> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        let mut pieces = split_run(segments, run, policy.max_merge_length);

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(pieces.len());
        for piece in pieces.drain(..) {
            match merged.last_mut() {
                Some(prev) if span_length(segments, &piece) < policy.min_merge_length => {
                    prev.end = piece.end;
                }
                _ => merged.push(piece),
            }
        }
        if merged.len() > 1 && span_length(segments, &merged[0]) < policy.min_merge_length {
            let first = merged.remove(0);
            merged[0].start = first.start;
        }
        out.extend(merged);
    }
    out
}

fn split_run(segments: &[Segment], run: &Range<usize>, max: Option<f64>) -> Vec<Range<usize>> {
    let Some(max) = max else {
        return vec![run.clone()];
    };
    let mut pieces = Vec::new();
    let mut start = run.start;
    let mut acc = 0.0;
    for idx in run.clone() {
        let len = segments[idx].length;
        if idx > start && acc + len > max + 1e-9 * max.max(1.0) {
            pieces.push(start..idx);
            start = idx;
            acc = 0.0;
        }
        acc += len;
    }
    pieces.push(start..run.end);
    pieces
}

/// Merges the ordered segments of one edge into aggregated edges.
///
/// Element numbers are `"{edge_id}.{k:02}"` with `k` counting runs from 1.
/// The first run starts at the edge's from-node and the last ends at its
/// to-node; internal split point `k` is marked `"{edge_id}#{k}"`.
pub fn aggregate_edge(
    edge_idx: usize,
    edge: &TargetEdge,
    segments: &[Segment],
    policy: &MergePolicy,
) -> Vec<AggregatedEdge> {
    let runs = find_runs(segments);
    let ranges = apply_length_policy(segments, &runs, policy);
    let count = ranges.len();

    ranges
        .into_iter()
        .enumerate()
        .map(|(i, range)| {
            let run = i + 1;
            let parts = &segments[range];
            let sources: BTreeSet<&str> = parts
                .iter()
                .filter_map(|s| s.provenance.as_ref().map(|p| p.way_id.as_str()))
                .collect();

            AggregatedEdge {
                element_nr: format!("{}.{run:02}", edge.id),
                edge: edge_idx,
                edge_id: edge.id.clone(),
                run,
                begin_node: if i == 0 {
                    edge.from_node.clone()
                } else {
                    split_marker(&edge.id, i)
                },
                end_node: if run == count {
                    edge.to_node.clone()
                } else {
                    split_marker(&edge.id, run)
                },
                district: edge.district.clone(),
                street_name: edge.street_name.clone(),
                direction: edge.direction,
                length: parts.iter().map(|s| s.length).sum(),
                geometry: polyline::concat(parts.iter().map(|s| &s.geometry)),
                attributes: parts.first().and_then(|s| s.attributes.clone()),
                first_segment: parts.first().map_or(0, |s| s.ordinal),
                last_segment: parts.last().map_or(0, |s| s.ordinal),
                sources: sources.into_iter().map(str::to_string).collect(),
            }
        })
        .collect()
}

fn split_marker(edge_id: &str, k: usize) -> String {
    format!("{edge_id}#{k}")
}
