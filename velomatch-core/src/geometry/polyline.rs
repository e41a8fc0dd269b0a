//! Measurements and linear referencing on polylines

use geo::{
    Centroid, Closest, ClosestPoint, Coord, Distance, Euclidean, Length, Line,
    LineInterpolatePoint, LineString, Point, coord,
};

use super::vector;

pub fn line_length(line: &Line<f64>) -> f64 {
    Euclidean.length(line)
}

/// Planar length of a polyline
pub fn length(ls: &LineString<f64>) -> f64 {
    Euclidean.length(ls)
}

/// Distance along the polyline at every vertex, starting with `0.0`
pub fn cumulative_lengths(ls: &LineString<f64>) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(ls.0.len());
    let mut total = 0.0;
    offsets.push(total);
    for line in ls.lines() {
        total += line_length(&line);
        offsets.push(total);
    }
    offsets
}

/// Point at `offset` along the polyline, using precomputed cumulative lengths.
///
/// Offsets outside the polyline clamp to its endpoints. An offset that equals
/// a vertex offset returns that vertex exactly.
pub fn interpolate_with(ls: &LineString<f64>, cumulative: &[f64], offset: f64) -> Coord<f64> {
    let coords = &ls.0;
    let Some(&last) = coords.last() else {
        return coord! { x: f64::NAN, y: f64::NAN };
    };
    if offset <= 0.0 {
        return coords[0];
    }
    // first vertex whose offset is >= the requested one
    let idx = cumulative.partition_point(|&c| c < offset);
    if idx >= coords.len() {
        return last;
    }
    if idx == 0 || cumulative[idx] == offset {
        return coords[idx];
    }
    let (start, end) = (coords[idx - 1], coords[idx]);
    let span = cumulative[idx] - cumulative[idx - 1];
    if span <= 0.0 {
        return end;
    }
    let t = (offset - cumulative[idx - 1]) / span;
    Line::new(start, end)
        .line_interpolate_point(t)
        .map_or(end, |point| point.0)
}

pub fn interpolate(ls: &LineString<f64>, offset: f64) -> Coord<f64> {
    interpolate_with(ls, &cumulative_lengths(ls), offset)
}

/// Point at `fraction` of the polyline length
pub fn interpolate_fraction(ls: &LineString<f64>, fraction: f64) -> Coord<f64> {
    match ls.line_interpolate_point(fraction.clamp(0.0, 1.0)) {
        Some(point) => point.0,
        None => ls
            .0
            .first()
            .copied()
            .unwrap_or(coord! { x: f64::NAN, y: f64::NAN }),
    }
}

pub fn midpoint(ls: &LineString<f64>) -> Coord<f64> {
    interpolate_fraction(ls, 0.5)
}

/// Sub-polyline between two offsets with known boundary coordinates.
///
/// Keeps every vertex strictly between the offsets. Callers that cut one
/// polyline into consecutive pieces pass the same boundary coordinate to both
/// neighbours, so the pieces join without gaps.
pub fn substring_between(
    ls: &LineString<f64>,
    cumulative: &[f64],
    (start_offset, start): (f64, Coord<f64>),
    (end_offset, end): (f64, Coord<f64>),
) -> LineString<f64> {
    let mut coords = vec![start];
    for (coord, &offset) in ls.0.iter().zip(cumulative) {
        if offset > start_offset && offset < end_offset && *coord != start && *coord != end {
            coords.push(*coord);
        }
    }
    coords.push(end);
    LineString::new(coords)
}

/// Sub-polyline between two offsets
pub fn substring(ls: &LineString<f64>, start_offset: f64, end_offset: f64) -> LineString<f64> {
    let cumulative = cumulative_lengths(ls);
    let start = interpolate_with(ls, &cumulative, start_offset);
    let end = interpolate_with(ls, &cumulative, end_offset);
    substring_between(ls, &cumulative, (start_offset, start), (end_offset, end))
}

/// Joins consecutive polylines, dropping the shared coordinate at each seam
pub fn concat<'a, I>(parts: I) -> LineString<f64>
where
    I: IntoIterator<Item = &'a LineString<f64>>,
{
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for part in parts {
        let skip = usize::from(coords.last().is_some_and(|last| part.0.first() == Some(last)));
        coords.extend(part.0.iter().skip(skip));
    }
    LineString::new(coords)
}

pub fn reversed(ls: &LineString<f64>) -> LineString<f64> {
    LineString::new(ls.0.iter().rev().copied().collect())
}

/// Unit vector from the first to the last coordinate
pub fn overall_direction(ls: &LineString<f64>) -> Option<Coord<f64>> {
    vector::direction(*ls.0.first()?, *ls.0.last()?)
}

/// Length-weighted centroid, falling back to the midpoint for degenerate input
pub fn centroid(ls: &LineString<f64>) -> Coord<f64> {
    ls.centroid().map_or_else(|| midpoint(ls), |point| point.0)
}

pub fn point_segment_distance(point: Coord<f64>, line: &Line<f64>) -> f64 {
    Euclidean.distance(&Point::from(point), line)
}

pub fn point_polyline_distance(point: Coord<f64>, ls: &LineString<f64>) -> f64 {
    match ls.0.as_slice() {
        [] => f64::INFINITY,
        [only] => Euclidean.distance(Point::from(point), Point::from(*only)),
        _ => Euclidean.distance(&Point::from(point), ls),
    }
}

pub fn segment_distance(a: &Line<f64>, b: &Line<f64>) -> f64 {
    Euclidean.distance(a, b)
}

/// Minimum distance between two polylines, zero when they cross
pub fn polyline_distance(a: &LineString<f64>, b: &LineString<f64>) -> f64 {
    if a.0.is_empty() || b.0.is_empty() {
        return f64::INFINITY;
    }
    Euclidean.distance(a, b)
}

/// Line piece of `ls` closest to `point`
pub fn nearest_line(ls: &LineString<f64>, point: Coord<f64>) -> Option<Line<f64>> {
    let target = Point::from(point);
    ls.lines()
        .filter(|line| line_length(line) > 0.0)
        .filter_map(|line| match line.closest_point(&target) {
            Closest::Intersection(p) | Closest::SinglePoint(p) => {
                Some((Euclidean.distance(p, target), line))
            }
            Closest::Indeterminate => None,
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, line)| line)
}

/// Splits the polyline into consecutive pieces no longer than `step`
pub fn pieces(ls: &LineString<f64>, step: f64) -> Vec<Line<f64>> {
    let mut out = Vec::new();
    for line in ls.lines() {
        let len = line_length(&line);
        if len <= 0.0 {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = (len / step).ceil().max(1.0) as usize;
        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        let mut prev = line.start;
        for i in 1..=count {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / n;
            let next = if i == count {
                line.end
            } else {
                line.line_interpolate_point(t).map_or(line.end, |p| p.0)
            };
            out.push(Line::new(prev, next));
            prev = next;
        }
    }
    out
}

/// Fraction of the polyline length whose pieces satisfy `inside`.
///
/// The polyline is cut into pieces of at most `step` and each piece is
/// tested at its midpoint.
pub fn length_fraction<F>(ls: &LineString<f64>, step: f64, inside: F) -> f64
where
    F: Fn(Coord<f64>) -> bool,
{
    let mut total = 0.0;
    let mut covered = 0.0;
    for piece in pieces(ls, step) {
        let len = line_length(&piece);
        total += len;
        if inside(piece.centroid().0) {
            covered += len;
        }
    }
    if total > 0.0 { covered / total } else { 0.0 }
}

/// Mean distance from evenly spaced samples of `from` to `to`.
///
/// `samples` points are taken including both endpoints.
pub fn mean_sample_distance(from: &LineString<f64>, to: &LineString<f64>, samples: usize) -> f64 {
    let samples = samples.max(2);
    let cumulative = cumulative_lengths(from);
    let total = cumulative.last().copied().unwrap_or(0.0);
    #[allow(clippy::cast_precision_loss)]
    let denom = (samples - 1) as f64;
    let sum: f64 = (0..samples)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let offset = total * (i as f64 / denom);
            point_polyline_distance(interpolate_with(from, &cumulative, offset), to)
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let n = samples as f64;
    sum / n
}
