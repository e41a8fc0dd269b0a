//! R-tree over polyline envelopes

use geo::{BoundingRect, LineString};
use rstar::{
    AABB, RTree,
    primitives::{GeomWithData, Rectangle},
};

use super::buffer::Buffer;

/// Spatial index of polylines, addressed by their position in the input slice.
///
/// Built once and only read afterwards, so it can be shared between worker
/// threads.
#[derive(Debug, Clone)]
pub struct LineIndex {
    tree: RTree<GeomWithData<Rectangle<[f64; 2]>, usize>>,
}

impl LineIndex {
    pub fn new<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a LineString<f64>>,
    {
        let items = lines
            .into_iter()
            .enumerate()
            .filter_map(|(idx, ls)| {
                let rect = ls.bounding_rect()?;
                let envelope =
                    Rectangle::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
                Some(GeomWithData::new(envelope, idx))
            })
            .collect();

        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices whose envelope intersects `envelope`, sorted ascending
    pub fn in_envelope(&self, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(envelope)
            .map(|item| item.data)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Indices of indexed polylines intersecting `buffer`, sorted ascending.
    ///
    /// `lookup` resolves an index back to its polyline.
    pub fn intersecting<'a, F>(&self, buffer: &Buffer<'_>, lookup: F) -> Vec<usize>
    where
        F: Fn(usize) -> &'a LineString<f64>,
    {
        self.in_envelope(&buffer.envelope())
            .into_iter()
            .filter(|&idx| buffer.intersects(lookup(idx)))
            .collect()
    }
}
