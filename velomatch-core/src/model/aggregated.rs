//! Output units of the aggregation stage

use std::fmt;

use geo::LineString;
use serde::{Deserialize, Serialize};

use super::attributes::Attributes;
use super::feature::DirectionCode;

/// Maximal run of same-attribute segments of one target edge
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedEdge {
    /// Stable identifier `"{edge_id}.{run:02}"`
    pub element_nr: String,
    pub edge: usize,
    pub edge_id: String,
    /// 1-based position of the run along the parent edge
    pub run: usize,
    pub begin_node: String,
    pub end_node: String,
    pub district: Option<String>,
    pub street_name: Option<String>,
    pub direction: DirectionCode,
    /// Sum of the lengths of the merged segments
    pub length: f64,
    pub geometry: LineString<f64>,
    pub attributes: Option<Attributes>,
    /// First and last segment ordinal, inclusive
    pub first_segment: usize,
    pub last_segment: usize,
    /// Sorted, deduplicated ids of contributing source ways
    pub sources: Vec<String>,
}

impl AggregatedEdge {
    pub fn segment_count(&self) -> usize {
        self.last_segment - self.first_segment + 1
    }
}

/// Direction-specific output partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Travel along the edge geometry (Hinrichtung)
    Forward,
    /// Travel against the edge geometry (Gegenrichtung)
    Backward,
}

impl Layer {
    /// Direction flag `ri` used by the target schema
    pub fn ri(self) -> u8 {
        match self {
            Layer::Forward => 0,
            Layer::Backward => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Forward => "forward",
            Layer::Backward => "backward",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated edge placed into one direction layer
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalEdge {
    /// Sequential id within the layer, starting at 1
    pub afid: usize,
    pub layer: Layer,
    /// Geometry and nodes oriented in travel direction of the layer
    pub edge: AggregatedEdge,
}

/// All runs of one target edge collapsed into a single record per layer
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSummary {
    pub edge_id: String,
    pub layer: Layer,
    pub begin_node: String,
    pub end_node: String,
    pub length: f64,
    pub geometry: LineString<f64>,
    pub attributes: Attributes,
    pub runs: usize,
    pub significant_changes: Vec<String>,
}
