//! Direction vectors and angles

use geo::{Coord, Line, coord};

/// Vectors shorter than this have no usable direction
pub const DEGENERATE_NORM: f64 = 1e-9;

/// Tolerance for angle threshold comparisons, degrees
pub const ANGLE_EPSILON: f64 = 1e-9;

pub fn norm(v: Coord<f64>) -> f64 {
    v.x.hypot(v.y)
}

pub fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

pub fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Unit vector of `v`, or `None` when `v` is degenerate
pub fn unit(v: Coord<f64>) -> Option<Coord<f64>> {
    let n = norm(v);
    if n < DEGENERATE_NORM || !n.is_finite() {
        return None;
    }
    Some(coord! { x: v.x / n, y: v.y / n })
}

/// Unit vector pointing from `from` to `to`
pub fn direction(from: Coord<f64>, to: Coord<f64>) -> Option<Coord<f64>> {
    unit(to - from)
}

pub fn line_direction(line: &Line<f64>) -> Option<Coord<f64>> {
    unit(coord! { x: line.dx(), y: line.dy() })
}

/// Directed angle between two vectors in degrees, `[0, 180]`
pub fn angle_between(a: Coord<f64>, b: Coord<f64>) -> f64 {
    cross(a, b).atan2(dot(a, b)).abs().to_degrees()
}

/// Orientation-agnostic angle between two vectors in degrees, `[0, 90]`
pub fn undirected_angle(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let angle = angle_between(a, b);
    if angle > 90.0 { 180.0 - angle } else { angle }
}

/// Cosine similarity of two vectors, `None` if either is degenerate
pub fn cosine(a: Coord<f64>, b: Coord<f64>) -> Option<f64> {
    let (a, b) = (unit(a)?, unit(b)?);
    Some(dot(a, b).clamp(-1.0, 1.0))
}

/// Length-weighted mean axis of undirected directions.
///
/// Each direction is doubled in angle before summing, so opposite vectors
/// reinforce instead of cancelling. Returns a unit vector, or `None` when
/// the directions cancel out (e.g. two perpendicular axes of equal weight).
pub fn axial_mean<I>(directions: I) -> Option<Coord<f64>>
where
    I: IntoIterator<Item = (Coord<f64>, f64)>,
{
    let (mut sx, mut sy) = (0.0, 0.0);
    let mut total = 0.0;
    for (dir, weight) in directions {
        let Some(dir) = unit(dir) else { continue };
        let theta = dir.y.atan2(dir.x) * 2.0;
        sx += weight * theta.cos();
        sy += weight * theta.sin();
        total += weight;
    }
    if total <= 0.0 || sx.hypot(sy) < DEGENERATE_NORM * total.max(1.0) {
        return None;
    }
    let half = sy.atan2(sx) / 2.0;
    Some(coord! { x: half.cos(), y: half.sin() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn angles() {
        let east = coord! { x: 1.0, y: 0.0 };
        let north = coord! { x: 0.0, y: 2.0 };
        let west = coord! { x: -3.0, y: 0.0 };
        let north_east = coord! { x: 1.0, y: 1.0 };

        assert_close(angle_between(east, north), 90.0);
        assert_close(angle_between(east, west), 180.0);
        assert_close(undirected_angle(east, west), 0.0);
        assert_close(undirected_angle(west, north_east), 45.0);
    }

    #[test]
    fn degenerate_vectors_have_no_direction() {
        assert!(unit(coord! { x: 0.0, y: 1e-12 }).is_none());
        assert!(cosine(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 0.0 }).is_none());
    }

    #[test]
    fn axial_mean_treats_opposite_directions_as_same_axis() {
        let mean = axial_mean([
            (coord! { x: 1.0, y: 0.0 }, 10.0),
            (coord! { x: -1.0, y: 0.0 }, 10.0),
        ])
        .expect("axis");
        assert_close(undirected_angle(mean, coord! { x: 1.0, y: 0.0 }), 0.0);
    }

    #[test]
    fn axial_mean_of_perpendicular_axes_is_degenerate() {
        let mean = axial_mean([
            (coord! { x: 1.0, y: 0.0 }, 5.0),
            (coord! { x: 0.0, y: 1.0 }, 5.0),
        ]);
        assert!(mean.is_none());
    }
}
