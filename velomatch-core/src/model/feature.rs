//! Source ways and target edges

use std::fmt;
use std::str::FromStr;

use geo::LineString;
use serde::{Deserialize, Serialize};

use super::attributes::Attributes;
use crate::Error;
use crate::geometry::polyline;

/// Polyline with a flat attribute table
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFeature {
    pub geometry: LineString<f64>,
    pub attributes: Attributes,
}

impl LinearFeature {
    pub fn new(geometry: LineString<f64>, attributes: Attributes) -> Self {
        Self {
            geometry,
            attributes,
        }
    }

    /// Planar length of the geometry
    pub fn length(&self) -> f64 {
        polyline::length(&self.geometry)
    }

    /// Checks that the geometry has at least two distinct, finite coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] describing the first violation.
    pub fn validate(&self) -> Result<(), Error> {
        let coords = &self.geometry.0;
        if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(Error::InvalidGeometry("non-finite coordinates".to_string()));
        }
        let Some(first) = coords.first() else {
            return Err(Error::InvalidGeometry("no coordinates".to_string()));
        };
        if !coords.iter().any(|c| c != first) {
            return Err(Error::InvalidGeometry(format!(
                "needs at least two distinct coordinates, got {}",
                coords.len()
            )));
        }
        Ok(())
    }
}

/// Dataset a source way was imported from.
///
/// The declaration order is the layering priority, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Bikelane,
    Street,
    Path,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Bikelane, SourceKind::Street, SourceKind::Path];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Bikelane => "bikelane",
            SourceKind::Street => "street",
            SourceKind::Path => "path",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bikelane" | "bikelanes" => Ok(SourceKind::Bikelane),
            "street" | "streets" => Ok(SourceKind::Street),
            "path" | "paths" => Ok(SourceKind::Path),
            other => Err(Error::InvalidData(format!("Unknown source kind: {other}"))),
        }
    }
}

/// One imported community-mapped feature
#[derive(Debug, Clone, PartialEq)]
pub struct SourceWay {
    pub id: String,
    pub kind: SourceKind,
    pub feature: LinearFeature,
}

impl SourceWay {
    pub fn new(id: impl Into<String>, kind: SourceKind, feature: LinearFeature) -> Self {
        Self {
            id: id.into(),
            kind,
            feature,
        }
    }

    pub fn geometry(&self) -> &LineString<f64> {
        &self.feature.geometry
    }

    pub fn attributes(&self) -> &Attributes {
        &self.feature.attributes
    }
}

/// Permitted direction of travel on a target edge, relative to its geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectionCode {
    /// One-way along the geometry
    #[serde(rename = "R")]
    Forward,
    /// One-way against the geometry
    #[serde(rename = "G")]
    Backward,
    #[serde(rename = "B")]
    Both,
}

impl DirectionCode {
    pub fn code(self) -> &'static str {
        match self {
            DirectionCode::Forward => "R",
            DirectionCode::Backward => "G",
            DirectionCode::Both => "B",
        }
    }
}

impl FromStr for DirectionCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R" => Ok(DirectionCode::Forward),
            "G" => Ok(DirectionCode::Backward),
            "B" => Ok(DirectionCode::Both),
            other => Err(Error::InvalidData(format!(
                "Unknown direction code '{other}', expected R, G or B"
            ))),
        }
    }
}

impl fmt::Display for DirectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Edge of the authoritative target network
#[derive(Debug, Clone, PartialEq)]
pub struct TargetEdge {
    pub id: String,
    pub district: Option<String>,
    pub from_node: String,
    pub to_node: String,
    pub direction: DirectionCode,
    pub street_name: Option<String>,
    pub feature: LinearFeature,
}

impl TargetEdge {
    pub fn geometry(&self) -> &LineString<f64> {
        &self.feature.geometry
    }

    pub fn length(&self) -> f64 {
        self.feature.length()
    }
}

/// Travel direction of a source way after applying a [`OnewayPolicy`](crate::pipeline::OnewayPolicy)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Oneway {
    Forward,
    Backward,
    Both,
}

#[cfg(test)]
mod tests {
    use geo::line_string;

    use super::*;

    #[test]
    fn rejects_single_repeated_coordinate() {
        let feature = LinearFeature::new(
            line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0)],
            Attributes::new(),
        );
        assert!(matches!(feature.validate(), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let feature = LinearFeature::new(
            line_string![(x: 0.0, y: 0.0), (x: f64::NAN, y: 1.0)],
            Attributes::new(),
        );
        assert!(matches!(feature.validate(), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn accepts_regular_polyline() {
        let feature = LinearFeature::new(
            line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0)],
            Attributes::new(),
        );
        assert!(feature.validate().is_ok());
        assert!((feature.length() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn parses_direction_codes() {
        assert_eq!("r".parse::<DirectionCode>().ok(), Some(DirectionCode::Forward));
        assert_eq!(" G ".parse::<DirectionCode>().ok(), Some(DirectionCode::Backward));
        assert_eq!("B".parse::<DirectionCode>().ok(), Some(DirectionCode::Both));
        assert!("X".parse::<DirectionCode>().is_err());
    }
}
