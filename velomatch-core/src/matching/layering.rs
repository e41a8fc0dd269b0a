use std::collections::{BTreeMap, BTreeSet};

use geo::LineString;
use log::{debug, info};
use rayon::prelude::*;

use crate::geometry::{Buffer, LineIndex, polyline};
use crate::model::{Candidate, CandidateOrigin, RejectReason, SourceKind, SourceWay};
use crate::pipeline::PipelineConfig;

/// Drops lower priority ways that duplicate higher priority ones.
///
/// Datasets are processed in priority order (bikelanes, streets, paths). A
/// street or path with at least `max_overlap_fraction` of its length within
/// `layering.buffer_distance` of accepted higher priority ways loses its
/// accepted candidates. Manually included ways are never superseded.
/// Returns the number of superseded ways.
pub fn supersede_lower_priority(
    ways: &[SourceWay],
    candidates: &mut [Candidate],
    config: &PipelineConfig,
) -> usize {
    let layering = &config.layering;
    let mut superseded = 0;

    for kind in [SourceKind::Street, SourceKind::Path] {
        if kind == SourceKind::Street && layering.keep_all_streets {
            debug!("Keeping all streets, skipping street layering");
            continue;
        }

        let accepted = accepted_ways(ways, candidates);
        let references: Vec<&LineString<f64>> = accepted
            .iter()
            .filter(|(k, _, _)| *k < kind)
            .map(|(_, way_idx, _)| ways[*way_idx].geometry())
            .collect();
        if references.is_empty() {
            continue;
        }
        let index = LineIndex::new(references.iter().copied());

        let contenders: Vec<usize> = accepted
            .iter()
            .filter(|(k, _, manual)| *k == kind && !manual)
            .map(|(_, way_idx, _)| *way_idx)
            .collect();

        let dropped: BTreeSet<usize> = contenders
            .par_iter()
            .filter(|&&way_idx| {
                let geometry = ways[way_idx].geometry();
                let near = index.intersecting(
                    &Buffer::new(geometry, layering.buffer_distance),
                    |r| references[r],
                );
                if near.is_empty() {
                    return false;
                }
                let overlap = polyline::length_fraction(geometry, config.coverage.sample_step, |c| {
                    near.iter().any(|&r| {
                        polyline::point_polyline_distance(c, references[r])
                            <= layering.buffer_distance
                    })
                });
                overlap >= layering.max_overlap_fraction
            })
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        for candidate in candidates.iter_mut() {
            if candidate.is_accepted() && dropped.contains(&candidate.way) {
                candidate.reject(RejectReason::Superseded);
            }
        }
        info!(
            "Layering: {} of {} accepted {kind} ways covered by higher priority data",
            dropped.len(),
            contenders.len()
        );
        superseded += dropped.len();
    }

    superseded
}

/// Accepted ways as `(kind, way index, manually included)`, one entry per way
fn accepted_ways(ways: &[SourceWay], candidates: &[Candidate]) -> Vec<(SourceKind, usize, bool)> {
    let mut accepted: BTreeMap<usize, bool> = BTreeMap::new();
    for candidate in candidates.iter().filter(|c| c.is_accepted()) {
        let manual = candidate.origin == CandidateOrigin::Manual;
        *accepted.entry(candidate.way).or_insert(false) |= manual;
    }
    accepted
        .into_iter()
        .map(|(way, manual)| (ways[way].kind, way, manual))
        .collect()
}
