//! Maps source tag vocabularies onto the target schema

pub mod rvn;
pub mod signs;
pub mod width;

pub use rvn::RvnTranslator;
pub use signs::has_traffic_sign;
pub use width::parse_width;

use crate::model::{Attributes, SourceWay};
use crate::pipeline::AttributeSchema;

/// Produces the attribute set a source way contributes to target segments.
///
/// Implementations must be deterministic; the snapper translates every
/// matched way once and copies the result onto the segments it wins.
pub trait AttributeTranslator: Send + Sync {
    fn translate(&self, way: &SourceWay) -> Attributes;
}

/// Copies a fixed list of raw keys
#[derive(Debug, Clone, Default)]
pub struct PassthroughTranslator {
    pub keys: Vec<String>,
}

impl PassthroughTranslator {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl AttributeTranslator for PassthroughTranslator {
    fn translate(&self, way: &SourceWay) -> Attributes {
        self.keys
            .iter()
            .filter_map(|key| {
                way.attributes()
                    .get(key)
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }
}

pub fn translator_for(schema: &AttributeSchema) -> Box<dyn AttributeTranslator> {
    match schema {
        AttributeSchema::Rvn { carry } => Box::new(RvnTranslator::new(carry.clone())),
        AttributeSchema::Passthrough { keys } => {
            Box::new(PassthroughTranslator::new(keys.iter().cloned()))
        }
    }
}
