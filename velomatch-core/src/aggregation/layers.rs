//! Direction layers: forward and backward views of the aggregated network

use crate::geometry::polyline;
use crate::model::{AggregatedEdge, DirectionCode, DirectionalEdge, Layer};

/// Aggregated edges split by travel direction.
#[derive(Debug, Clone, Default)]
pub struct DirectionLayers {
    pub forward: Vec<DirectionalEdge>,
    pub backward: Vec<DirectionalEdge>,
}

impl DirectionLayers {
    pub fn len(&self) -> usize {
        self.forward.len() + self.backward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.backward.is_empty()
    }

    pub fn layer(&self, layer: Layer) -> &[DirectionalEdge] {
        match layer {
            Layer::Forward => &self.forward,
            Layer::Backward => &self.backward,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectionalEdge> {
        self.forward.iter().chain(self.backward.iter())
    }
}

/// Assigns aggregated edges to the forward and backward layers.
///
/// `R` edges go to the forward layer, `G` edges to the backward layer and
/// `B` edges to both. Backward entries are reversed: geometry runs against
/// digitisation, begin and end nodes are swapped and the runs of one edge
/// appear in travel order. Input must be grouped by edge with runs in
/// ascending order, as produced by aggregation. Identifiers (`afid`) count
/// from 1 within each layer, following edge input order and then travel
/// order, so the backward layer numbers the runs of an edge last to first.
pub fn split_layers(aggregated: &[AggregatedEdge]) -> DirectionLayers {
    let mut layers = DirectionLayers::default();

    for runs in aggregated.chunk_by(|a, b| a.edge == b.edge) {
        let direction = runs[0].direction;
        if matches!(direction, DirectionCode::Forward | DirectionCode::Both) {
            for run in runs {
                let afid = layers.forward.len() + 1;
                layers.forward.push(DirectionalEdge {
                    afid,
                    layer: Layer::Forward,
                    edge: run.clone(),
                });
            }
        }
        if matches!(direction, DirectionCode::Backward | DirectionCode::Both) {
            for run in runs.iter().rev() {
                let afid = layers.backward.len() + 1;
                layers.backward.push(DirectionalEdge {
                    afid,
                    layer: Layer::Backward,
                    edge: reversed(run),
                });
            }
        }
    }

    log::info!(
        "Direction layers: {} forward, {} backward",
        layers.forward.len(),
        layers.backward.len()
    );
    layers
}

fn reversed(run: &AggregatedEdge) -> AggregatedEdge {
    AggregatedEdge {
        begin_node: run.end_node.clone(),
        end_node: run.begin_node.clone(),
        geometry: polyline::reversed(&run.geometry),
        ..run.clone()
    }
}
