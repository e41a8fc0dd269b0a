//! Fixed-length slices of target edges

use geo::LineString;
use serde::Serialize;

use super::attributes::Attributes;

/// Source way that supplied a segment's attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub way_id: String,
    pub score: f64,
}

/// Contiguous piece of a target edge
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Index of the parent edge in the target edge list
    pub edge: usize,
    pub edge_id: String,
    /// Position along the parent edge, starting at 0
    pub ordinal: usize,
    /// Distance from the edge start to the segment start
    pub start_offset: f64,
    pub length: f64,
    pub geometry: LineString<f64>,
    /// `None` while unattributed
    pub attributes: Option<Attributes>,
    pub provenance: Option<Provenance>,
}

impl Segment {
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.length
    }

    pub fn is_attributed(&self) -> bool {
        self.attributes.is_some()
    }
}
