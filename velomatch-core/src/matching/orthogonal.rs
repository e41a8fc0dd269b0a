use std::collections::BTreeMap;

use geo::{Coord, Line, LineString};
use hashbrown::HashSet;
use log::{debug, info};
use rayon::prelude::*;

use crate::geometry::{polyline, vector};
use crate::model::{Candidate, CandidateOrigin, RejectReason, SourceWay, TargetEdge};
use crate::pipeline::{OrthogonalConfig, PipelineConfig};

/// Decides whether a short way crosses the nearby target geometry.
///
/// `nearby` holds the target polylines the way matched. They are cut into
/// pieces of `config.piece_length`; pieces within `distance` of the way form a
/// length-weighted mean axis. The way is orthogonal when its start-to-end
/// direction differs from that axis by `angle_threshold` degrees or more.
/// Degenerate directions count as orthogonal.
///
/// At junctions, where the nearby pieces spread wider than
/// `complex_spread_threshold`, a way running parallel to any single piece
/// is kept.
pub fn is_orthogonal(
    way: &LineString<f64>,
    nearby: &[&LineString<f64>],
    distance: f64,
    angle_threshold: f64,
    config: &OrthogonalConfig,
) -> bool {
    let Some(way_dir) = polyline::overall_direction(way) else {
        return true;
    };

    let pieces: Vec<(Coord<f64>, f64)> = nearby
        .iter()
        .flat_map(|ls| polyline::pieces(ls, config.piece_length))
        .filter(|piece| line_to_polyline_distance(piece, way) <= distance)
        .filter_map(|piece| {
            vector::line_direction(&piece).map(|dir| (dir, polyline::line_length(&piece)))
        })
        .collect();

    let Some(axis) = vector::axial_mean(pieces.iter().copied()) else {
        return true;
    };

    let diff = vector::undirected_angle(way_dir, axis);
    if diff + vector::ANGLE_EPSILON < angle_threshold {
        return false;
    }

    !is_parallel_at_junction(way_dir, &pieces, config)
}

fn line_to_polyline_distance(line: &Line<f64>, ls: &LineString<f64>) -> f64 {
    ls.lines()
        .map(|other| polyline::segment_distance(line, &other))
        .fold(f64::INFINITY, f64::min)
}

fn is_parallel_at_junction(
    way_dir: Coord<f64>,
    pieces: &[(Coord<f64>, f64)],
    config: &OrthogonalConfig,
) -> bool {
    let parallel = pieces.iter().any(|(dir, _)| {
        vector::undirected_angle(way_dir, *dir) <= config.complex_parallel_threshold
    });
    if !parallel {
        return false;
    }
    let spread = pieces
        .iter()
        .enumerate()
        .flat_map(|(i, (a, _))| {
            pieces[i + 1..]
                .iter()
                .map(move |(b, _)| vector::undirected_angle(*a, *b))
        })
        .fold(0.0, f64::max);
    spread > config.complex_spread_threshold
}

/// Rejects the candidates of short ways that cross their target edges.
///
/// Only geometric candidates of ways shorter than `short_way_threshold` are
/// considered; long ways bypass the filter. The decision is taken per way
/// and applied to all of its accepted candidates. Returns the number of
/// rejected ways.
pub fn filter_orthogonal(
    ways: &[SourceWay],
    edges: &[TargetEdge],
    candidates: &mut [Candidate],
    config: &PipelineConfig,
) -> usize {
    let mut nearby: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for candidate in candidates.iter() {
        if !candidate.is_accepted() || candidate.origin != CandidateOrigin::Geometric {
            continue;
        }
        if let Some(edge) = candidate.edge {
            nearby.entry(candidate.way).or_default().push(edge);
        }
    }

    let checked: Vec<(usize, Vec<usize>)> = nearby
        .into_iter()
        .filter(|(way_idx, _)| {
            let way = &ways[*way_idx];
            !config.orthogonal.skip_kinds.contains(&way.kind)
                && way.feature.length() < config.short_way_threshold
        })
        .collect();

    let rejected: Vec<usize> = checked
        .par_iter()
        .filter(|(way_idx, edge_ids)| {
            let way = &ways[*way_idx];
            let geoms: Vec<&LineString<f64>> =
                edge_ids.iter().map(|&e| edges[e].geometry()).collect();
            is_orthogonal(
                way.geometry(),
                &geoms,
                config.buffer_for(way.kind),
                config.angle_diff_threshold,
                &config.orthogonal,
            )
        })
        .map(|(way_idx, _)| *way_idx)
        .collect();
    let rejected: HashSet<usize> = rejected.into_iter().collect();

    for candidate in candidates.iter_mut() {
        if candidate.is_accepted()
            && candidate.origin == CandidateOrigin::Geometric
            && rejected.contains(&candidate.way)
        {
            debug!(
                "Rejecting {} -> {:?} as orthogonal",
                candidate.way_id, candidate.edge_id
            );
            candidate.reject(RejectReason::Orthogonal);
        }
    }

    info!(
        "Orthogonal filter checked {} short ways, rejected {}",
        checked.len(),
        rejected.len()
    );
    rejected.len()
}
