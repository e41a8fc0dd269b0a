use geo::Coord;

use crate::geometry::polyline;
use crate::model::{Segment, TargetEdge};

/// Splits an edge into consecutive segments of `length`.
///
/// Cut points lie at multiples of `length` from the edge start; the last
/// segment takes the remainder, so `0 < remainder <= length`. An edge no
/// longer than `length` yields a single segment covering it. Neighbouring
/// segments share their boundary coordinate and keep every interior vertex,
/// so concatenating them reproduces the edge geometry. `length` must be
/// positive.
pub fn segment_edge(edge_idx: usize, edge: &TargetEdge, length: f64) -> Vec<Segment> {
    let geometry = edge.geometry();
    let cumulative = polyline::cumulative_lengths(geometry);
    let total = cumulative.last().copied().unwrap_or(0.0);

    // a remainder within rounding noise of zero belongs to the previous segment
    let tolerance = 1e-9 * total.max(1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = ((total - tolerance) / length).ceil().max(1.0) as usize;

    let boundaries: Vec<(f64, Coord<f64>)> = (0..=count)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let offset = if k == count { total } else { k as f64 * length };
            (offset, polyline::interpolate_with(geometry, &cumulative, offset))
        })
        .collect();

    boundaries
        .windows(2)
        .enumerate()
        .map(|(ordinal, pair)| {
            let (start, end) = (pair[0], pair[1]);
            Segment {
                edge: edge_idx,
                edge_id: edge.id.clone(),
                ordinal,
                start_offset: start.0,
                length: end.0 - start.0,
                geometry: polyline::substring_between(geometry, &cumulative, start, end),
                attributes: None,
                provenance: None,
            }
        })
        .collect()
}
