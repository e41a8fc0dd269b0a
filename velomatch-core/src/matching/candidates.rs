use geo::LineString;
use log::{debug, info};
use rayon::prelude::*;

use crate::geometry::{Buffer, LineIndex, polyline, vector};
use crate::model::{
    Candidate, CandidateOrigin, CandidateStatus, MatchScore, RejectReason, SourceWay, TargetEdge,
};
use crate::pipeline::PipelineConfig;

/// Number of samples along a way for the mean distance of a candidate
const SCORE_SAMPLES: usize = 5;

/// Indexed features whose geometry intersects `query` buffered by `distance`.
///
/// Pure query: the result is sorted by feature index and empty when nothing
/// is in reach. `distance` must be positive.
pub fn features_in_buffer<'a, F>(
    query: &LineString<f64>,
    distance: f64,
    index: &LineIndex,
    lookup: F,
) -> Vec<usize>
where
    F: Fn(usize) -> &'a LineString<f64>,
{
    index.intersecting(&Buffer::new(query, distance), lookup)
}

/// Creates one candidate per (way, edge) pair within the buffer distance.
///
/// Ways that lie mostly outside the buffered target network get all their
/// candidates rejected with [`RejectReason::Coverage`] when the coverage
/// filter is enabled.
pub fn select_candidates(
    ways: &[SourceWay],
    edges: &[TargetEdge],
    config: &PipelineConfig,
) -> Vec<Candidate> {
    let index = LineIndex::new(edges.iter().map(TargetEdge::geometry));

    let per_way: Vec<Vec<Candidate>> = ways
        .par_iter()
        .enumerate()
        .map(|(way_idx, way)| candidates_for_way(way_idx, way, edges, &index, config))
        .collect();

    let candidates: Vec<Candidate> = per_way.into_iter().flatten().collect();
    let rejected = candidates.iter().filter(|c| !c.is_accepted()).count();
    info!(
        "Selected {} candidates for {} source ways ({rejected} below coverage)",
        candidates.len(),
        ways.len()
    );
    candidates
}

fn candidates_for_way(
    way_idx: usize,
    way: &SourceWay,
    edges: &[TargetEdge],
    index: &LineIndex,
    config: &PipelineConfig,
) -> Vec<Candidate> {
    let distance = config.buffer_for(way.kind);
    let hits = features_in_buffer(way.geometry(), distance, index, |e| edges[e].geometry());
    if hits.is_empty() {
        return Vec::new();
    }

    let status = if config.stages.coverage_filter {
        let fraction = polyline::length_fraction(way.geometry(), config.coverage.sample_step, |c| {
            hits.iter()
                .any(|&e| polyline::point_polyline_distance(c, edges[e].geometry()) <= distance)
        });
        if fraction < config.coverage.min_fraction {
            debug!(
                "Way {} only {:.0}% inside the target buffer",
                way.id,
                fraction * 100.0
            );
            CandidateStatus::Rejected(RejectReason::Coverage)
        } else {
            CandidateStatus::Accepted
        }
    } else {
        CandidateStatus::Accepted
    };

    hits.into_iter()
        .map(|edge_idx| {
            let edge = &edges[edge_idx];
            Candidate {
                way: way_idx,
                way_id: way.id.clone(),
                edge: Some(edge_idx),
                edge_id: Some(edge.id.clone()),
                score: geometric_score(way.geometry(), edge.geometry()),
                origin: CandidateOrigin::Geometric,
                status,
            }
        })
        .collect()
}

/// Mean distance from the way to the edge and their undirected angle.
///
/// The angle is taken against the edge piece nearest to the way midpoint;
/// degenerate directions count as perpendicular.
pub fn geometric_score(way: &LineString<f64>, edge: &LineString<f64>) -> MatchScore {
    let mean_distance = polyline::mean_sample_distance(way, edge, SCORE_SAMPLES);
    let angle_diff = polyline::overall_direction(way)
        .zip(
            polyline::nearest_line(edge, polyline::midpoint(way))
                .and_then(|line| vector::line_direction(&line)),
        )
        .map_or(90.0, |(a, b)| vector::undirected_angle(a, b));
    MatchScore::Geometric {
        mean_distance,
        angle_diff,
    }
}
