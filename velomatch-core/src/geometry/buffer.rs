//! Round-capped buffers around polylines

use geo::{BoundingRect, Coord, LineString};
use rstar::AABB;

use super::polyline;

/// Region within `radius` of an axis polyline.
///
/// Intersection tests are exact distance comparisons against the axis, which
/// is equivalent to intersecting the buffered polygon with round caps and
/// joins.
#[derive(Debug, Clone, Copy)]
pub struct Buffer<'a> {
    pub axis: &'a LineString<f64>,
    pub radius: f64,
}

impl<'a> Buffer<'a> {
    pub fn new(axis: &'a LineString<f64>, radius: f64) -> Self {
        Self { axis, radius }
    }

    /// Axis-aligned envelope of the buffered region
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        match self.axis.bounding_rect() {
            Some(rect) => AABB::from_corners(
                [rect.min().x - self.radius, rect.min().y - self.radius],
                [rect.max().x + self.radius, rect.max().y + self.radius],
            ),
            None => AABB::from_point([f64::NAN, f64::NAN]),
        }
    }

    pub fn contains(&self, point: Coord<f64>) -> bool {
        polyline::point_polyline_distance(point, self.axis) <= self.radius
    }

    pub fn intersects(&self, other: &LineString<f64>) -> bool {
        polyline::polyline_distance(self.axis, other) <= self.radius
    }

    /// Fraction of `other`'s length lying inside this buffer
    pub fn coverage_of(&self, other: &LineString<f64>, step: f64) -> f64 {
        polyline::length_fraction(other, step, |c| self.contains(c))
    }
}

#[cfg(test)]
mod tests {
    use geo::line_string;

    use super::*;

    #[test]
    fn intersects_within_radius_only() {
        let axis = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let buffer = Buffer::new(&axis, 2.0);

        assert!(buffer.intersects(&line_string![(x: 12.0, y: 0.0), (x: 20.0, y: 0.0)]));
        assert!(!buffer.intersects(&line_string![(x: 12.1, y: 0.0), (x: 20.0, y: 0.0)]));
        assert!(buffer.intersects(&line_string![(x: 5.0, y: 1.5), (x: 5.0, y: 9.0)]));
    }

    #[test]
    fn envelope_is_padded_by_radius() {
        let axis = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 5.0)];
        let env = Buffer::new(&axis, 1.0).envelope();
        assert_eq!(env.lower(), [-1.0, -1.0]);
        assert_eq!(env.upper(), [11.0, 6.0]);
    }
}
