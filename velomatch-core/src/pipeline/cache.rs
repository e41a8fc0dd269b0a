//! Reuse of per-edge results across runs

use std::sync::{Arc, RwLock};

use geo::LineString;
use hashbrown::HashMap;
use sha2::{Digest, Sha256};

use crate::model::{AggregatedEdge, AttrValue, Attributes, Segment, TargetEdge};

/// Identifies the result of one edge under one configuration and one set of
/// source ways in reach.
///
/// Both fingerprints cover content, not just identifiers: an edge or way
/// that keeps its id but changes geometry, direction or tags yields a new
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub edge_id: String,
    pub config_fingerprint: String,
    pub edge_fingerprint: String,
    pub sources_fingerprint: String,
}

impl CacheKey {
    /// `source_digests` are the [`Fingerprint`]s of the prepared ways in
    /// reach of the edge, ordered by way id.
    pub fn new<'a, I>(edge: &TargetEdge, config_fingerprint: &str, source_digests: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            edge_id: edge.id.clone(),
            config_fingerprint: config_fingerprint.to_string(),
            edge_fingerprint: edge_fingerprint(edge),
            sources_fingerprint: sources_fingerprint(source_digests),
        }
    }
}

/// Hex SHA-256 over everything of the edge that reaches the output
pub fn edge_fingerprint(edge: &TargetEdge) -> String {
    Fingerprint::new()
        .text(&edge.id)
        .text(&edge.from_node)
        .text(&edge.to_node)
        .text(edge.direction.code())
        .optional(edge.district.as_deref())
        .optional(edge.street_name.as_deref())
        .geometry(edge.geometry())
        .attributes(&edge.feature.attributes)
        .finish()
}

/// Hex SHA-256 over per-way digests, in the order given
pub fn sources_fingerprint<'a, I>(digests: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut fingerprint = Fingerprint::new();
    for digest in digests {
        fingerprint.text(digest);
    }
    fingerprint.finish()
}

/// Incremental SHA-256 over typed fields.
///
/// Every field is length- or tag-prefixed, so adjacent fields never run into
/// each other.
#[derive(Clone, Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, text: &str) -> &mut Self {
        self.hasher.update(text.len().to_le_bytes());
        self.hasher.update(text.as_bytes());
        self
    }

    pub fn optional(&mut self, text: Option<&str>) -> &mut Self {
        match text {
            Some(text) => {
                self.hasher.update([1]);
                self.text(text)
            }
            None => {
                self.hasher.update([0]);
                self
            }
        }
    }

    pub fn number(&mut self, value: f64) -> &mut Self {
        self.hasher.update(value.to_bits().to_le_bytes());
        self
    }

    pub fn geometry(&mut self, ls: &LineString<f64>) -> &mut Self {
        self.hasher.update(ls.0.len().to_le_bytes());
        for c in &ls.0 {
            self.number(c.x).number(c.y);
        }
        self
    }

    pub fn attributes(&mut self, attributes: &Attributes) -> &mut Self {
        self.hasher.update(attributes.len().to_le_bytes());
        for (key, value) in attributes {
            self.text(key);
            match value {
                AttrValue::Null => self.hasher.update([0]),
                AttrValue::Bool(value) => self.hasher.update([1, u8::from(*value)]),
                AttrValue::Integer(value) => {
                    self.hasher.update([2]);
                    self.hasher.update(value.to_le_bytes());
                }
                AttrValue::Float(value) => {
                    self.hasher.update([3]);
                    self.number(*value);
                }
                AttrValue::Text(value) => {
                    self.hasher.update([4]);
                    self.text(value);
                }
            }
        }
        self
    }

    pub fn finish(&self) -> String {
        self.hasher
            .clone()
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

/// Segmentation and aggregation result of a single target edge
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeResult {
    pub segments: Vec<Segment>,
    pub aggregated: Vec<AggregatedEdge>,
}

/// Storage for per-edge results, shared by the worker threads.
pub trait EdgeCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Arc<EdgeResult>>;
    fn put(&self, key: CacheKey, result: Arc<EdgeResult>);
}

/// In-process cache backed by a hash map
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, Arc<EdgeResult>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl EdgeCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<EdgeResult>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn put(&self, key: CacheKey, result: Arc<EdgeResult>) {
        // a poisoned lock only costs the cache entry
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, result);
        }
    }
}
