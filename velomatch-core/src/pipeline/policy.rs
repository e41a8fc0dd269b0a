//! Interpretation of one-way tags on source ways

use super::config::OnewayPolicyKind;
use crate::model::{Oneway, SourceWay, text_of};

/// Resolves the travel direction of a source way from its tags.
pub trait OnewayPolicy: Send + Sync {
    fn resolve(&self, way: &SourceWay) -> Oneway;
}

/// Tag interpretation shared by all policies; `dual` decides
/// `oneway=yes_dual_carriageway`.
fn resolve_with(way: &SourceWay, dual: Oneway) -> Oneway {
    let tags = way.attributes();
    if text_of(tags, "oneway_bicycle").as_deref() == Some("no") {
        return Oneway::Both;
    }
    match text_of(tags, "oneway").as_deref() {
        Some("yes" | "true" | "1" | "implicit_yes") => Oneway::Forward,
        Some("-1" | "reverse") => Oneway::Backward,
        Some("yes_dual_carriageway") => dual,
        _ => Oneway::Both,
    }
}

/// Treats dual carriageways like any other one-way road
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictOneway;

impl OnewayPolicy for StrictOneway {
    fn resolve(&self, way: &SourceWay) -> Oneway {
        resolve_with(way, Oneway::Forward)
    }
}

/// Treats each carriageway of a dual carriageway as usable in both directions
#[derive(Debug, Clone, Copy, Default)]
pub struct DualCarriagewayAsBidirectional;

impl OnewayPolicy for DualCarriagewayAsBidirectional {
    fn resolve(&self, way: &SourceWay) -> Oneway {
        resolve_with(way, Oneway::Both)
    }
}

pub fn policy_for(kind: OnewayPolicyKind) -> Box<dyn OnewayPolicy> {
    match kind {
        OnewayPolicyKind::Strict => Box::new(StrictOneway),
        OnewayPolicyKind::DualCarriagewayBidirectional => Box::new(DualCarriagewayAsBidirectional),
    }
}
