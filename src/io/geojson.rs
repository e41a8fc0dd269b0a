//! GeoJSON input and output.
//!
//! Inputs are `FeatureCollection`s of `LineString` or contiguous
//! `MultiLineString` features in a planar CRS. Property names for the target
//! network are configurable; every property also lands in the feature's
//! attribute table.

use std::fs;
use std::path::Path;

use geo::LineString;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value as GeoJsonValue};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use velomatch_core::geometry::polyline;
use velomatch_core::model::{
    AggregatedEdge, AttrValue, Attributes, DirectionCode, DirectionalEdge, EdgeSummary,
    LinearFeature, Segment, SourceKind, SourceWay, TargetEdge,
};

use crate::Error;

/// Property names read from source way features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFields {
    /// Identifier property; the feature `id` member is used when absent
    pub id: String,
}

impl Default for SourceFields {
    fn default() -> Self {
        Self {
            id: "osm_id".to_string(),
        }
    }
}

/// Property names read from target edge features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetFields {
    pub id: String,
    pub from_node: String,
    pub to_node: String,
    /// Direction code `R`, `G` or `B`
    pub direction: String,
    pub district: String,
    pub street_name: String,
}

impl Default for TargetFields {
    fn default() -> Self {
        Self {
            id: "element_nr".to_string(),
            from_node: "beginnt_bei_vp".to_string(),
            to_node: "endet_bei_vp".to_string(),
            direction: "verkehrsrichtung".to_string(),
            district: "bezirk".to_string(),
            street_name: "strassenname".to_string(),
        }
    }
}

fn parse_collection(text: &str) -> Result<FeatureCollection, Error> {
    let geojson: GeoJson = text.parse()?;
    Ok(FeatureCollection::try_from(geojson)?)
}

/// Reads source ways of one dataset from a GeoJSON file.
///
/// Features without identifier or with unusable geometry are skipped with a
/// warning.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a GeoJSON
/// `FeatureCollection`.
pub fn read_source_ways(
    path: &Path,
    kind: SourceKind,
    fields: &SourceFields,
) -> Result<Vec<SourceWay>, Error> {
    let text = fs::read_to_string(path)?;
    let ways = parse_source_ways(&text, kind, fields)?;
    info!("Read {} {kind} ways from {}", ways.len(), path.display());
    Ok(ways)
}

/// Parses source ways from GeoJSON text, see [`read_source_ways`].
///
/// # Errors
///
/// Returns an error if the text is not a GeoJSON `FeatureCollection`.
pub fn parse_source_ways(
    text: &str,
    kind: SourceKind,
    fields: &SourceFields,
) -> Result<Vec<SourceWay>, Error> {
    let collection = parse_collection(text)?;
    let ways = collection
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(idx, feature)| match source_way(&feature, kind, fields) {
            Ok(way) => Some(way),
            Err(reason) => {
                warn!("Skipping {kind} feature #{idx}: {reason}");
                None
            }
        })
        .collect();
    Ok(ways)
}

fn source_way(feature: &Feature, kind: SourceKind, fields: &SourceFields) -> Result<SourceWay, String> {
    let attributes = attributes_of(feature);
    let id = text_property(&attributes, &fields.id)
        .or_else(|| feature_id(feature))
        .ok_or_else(|| format!("missing identifier property '{}'", fields.id))?;
    let geometry = line_geometry(feature).map_err(|reason| format!("{id}: {reason}"))?;
    Ok(SourceWay::new(id, kind, LinearFeature::new(geometry, attributes)))
}

/// Reads the target network from a GeoJSON file.
///
/// A missing direction property is read as `B`; an unknown code skips the
/// feature.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a GeoJSON
/// `FeatureCollection`.
pub fn read_target_edges(path: &Path, fields: &TargetFields) -> Result<Vec<TargetEdge>, Error> {
    let text = fs::read_to_string(path)?;
    let edges = parse_target_edges(&text, fields)?;
    info!("Read {} target edges from {}", edges.len(), path.display());
    Ok(edges)
}

/// Parses target edges from GeoJSON text, see [`read_target_edges`].
///
/// # Errors
///
/// Returns an error if the text is not a GeoJSON `FeatureCollection`.
pub fn parse_target_edges(text: &str, fields: &TargetFields) -> Result<Vec<TargetEdge>, Error> {
    let collection = parse_collection(text)?;
    let edges = collection
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(idx, feature)| match target_edge(&feature, fields) {
            Ok(edge) => Some(edge),
            Err(reason) => {
                warn!("Skipping target feature #{idx}: {reason}");
                None
            }
        })
        .collect();
    Ok(edges)
}

fn target_edge(feature: &Feature, fields: &TargetFields) -> Result<TargetEdge, String> {
    let attributes = attributes_of(feature);
    let id = text_property(&attributes, &fields.id)
        .or_else(|| feature_id(feature))
        .ok_or_else(|| format!("missing identifier property '{}'", fields.id))?;

    let direction = match text_property(&attributes, &fields.direction) {
        Some(code) => code
            .parse::<DirectionCode>()
            .map_err(|e| format!("{id}: {e}"))?,
        None => DirectionCode::Both,
    };
    let from_node = text_property(&attributes, &fields.from_node)
        .ok_or_else(|| format!("{id}: missing from-node property '{}'", fields.from_node))?;
    let to_node = text_property(&attributes, &fields.to_node)
        .ok_or_else(|| format!("{id}: missing to-node property '{}'", fields.to_node))?;
    let geometry = line_geometry(feature).map_err(|reason| format!("{id}: {reason}"))?;

    Ok(TargetEdge {
        district: text_property(&attributes, &fields.district),
        street_name: text_property(&attributes, &fields.street_name),
        id,
        from_node,
        to_node,
        direction,
        feature: LinearFeature::new(geometry, attributes),
    })
}

fn line_geometry(feature: &Feature) -> Result<LineString<f64>, String> {
    let geometry = feature.geometry.clone().ok_or("feature has no geometry")?;
    let geometry = geo::Geometry::<f64>::try_from(geometry).map_err(|e| e.to_string())?;
    match geometry {
        geo::Geometry::LineString(ls) => Ok(ls),
        geo::Geometry::MultiLineString(mls) => {
            let parts = mls.0;
            let contiguous = parts
                .windows(2)
                .all(|pair| pair[0].0.last().is_some() && pair[0].0.last() == pair[1].0.first());
            if contiguous {
                Ok(polyline::concat(parts.iter()))
            } else {
                Err("MultiLineString parts are not contiguous".to_string())
            }
        }
        _ => Err("geometry is not a LineString or MultiLineString".to_string()),
    }
}

fn attributes_of(feature: &Feature) -> Attributes {
    feature
        .properties
        .iter()
        .flatten()
        .map(|(key, value)| (key.clone(), attr_value(value)))
        .collect()
}

fn attr_value(value: &Value) -> AttrValue {
    match value {
        Value::Null => AttrValue::Null,
        Value::Bool(b) => AttrValue::Bool(*b),
        Value::Number(n) => n
            .as_i64()
            .map(AttrValue::Integer)
            .or_else(|| n.as_f64().map(AttrValue::Float))
            .unwrap_or(AttrValue::Null),
        Value::String(s) => AttrValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => AttrValue::Text(value.to_string()),
    }
}

fn text_property(attributes: &Attributes, key: &str) -> Option<String> {
    match attributes.get(key)? {
        AttrValue::Null => None,
        AttrValue::Text(s) if s.trim().is_empty() => None,
        AttrValue::Text(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn feature_id(feature: &Feature) -> Option<String> {
    match feature.id.as_ref()? {
        geojson::feature::Id::String(s) => Some(s.clone()),
        geojson::feature::Id::Number(n) => Some(n.to_string()),
    }
}

fn feature(geometry: &LineString<f64>, properties: JsonObject) -> Result<Feature, Error> {
    let geometry = Geometry::new(GeoJsonValue::from(geometry));
    let value = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": properties,
    });
    Ok(serde_json::from_value::<Feature>(value)?)
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    }
}

/// Attribute table first, fixed fields on top so they cannot be shadowed
fn properties(attributes: Option<&Attributes>, fixed: Value) -> Result<JsonObject, Error> {
    let mut properties = match attributes {
        Some(attributes) => match serde_json::to_value(attributes)? {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        },
        None => JsonObject::new(),
    };
    if let Value::Object(fixed) = fixed {
        properties.extend(fixed);
    }
    Ok(properties)
}

fn aggregated_properties(edge: &AggregatedEdge) -> Value {
    json!({
        "element_nr": edge.element_nr,
        "edge_id": edge.edge_id,
        "run": edge.run,
        "beginnt_bei_vp": edge.begin_node,
        "endet_bei_vp": edge.end_node,
        "bezirk": edge.district,
        "strassenname": edge.street_name,
        "verkehrsrichtung": edge.direction.code(),
        "length": edge.length,
        "first_segment": edge.first_segment,
        "last_segment": edge.last_segment,
        "sources": edge.sources.join(";"),
        "attributed": edge.attributes.is_some(),
    })
}

/// Aggregated edges as a `FeatureCollection`
///
/// # Errors
///
/// Returns an error if a feature cannot be built.
pub fn aggregated_to_geojson(edges: &[AggregatedEdge]) -> Result<FeatureCollection, Error> {
    let features = edges
        .iter()
        .map(|edge| {
            let props = properties(edge.attributes.as_ref(), aggregated_properties(edge))?;
            feature(&edge.geometry, props)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(collection(features))
}

/// One direction layer as a `FeatureCollection`, with `afid` and `ri`
///
/// # Errors
///
/// Returns an error if a feature cannot be built.
pub fn layer_to_geojson(entries: &[DirectionalEdge]) -> Result<FeatureCollection, Error> {
    let features = entries
        .iter()
        .map(|entry| {
            let mut fixed = aggregated_properties(&entry.edge);
            if let Value::Object(map) = &mut fixed {
                map.insert("afid".to_string(), json!(entry.afid));
                map.insert("ri".to_string(), json!(entry.layer.ri()));
            }
            let props = properties(entry.edge.attributes.as_ref(), fixed)?;
            feature(&entry.edge.geometry, props)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(collection(features))
}

/// Edge summaries as a `FeatureCollection`
///
/// # Errors
///
/// Returns an error if a feature cannot be built.
pub fn summaries_to_geojson(summaries: &[EdgeSummary]) -> Result<FeatureCollection, Error> {
    let features = summaries
        .iter()
        .map(|summary| {
            let fixed = json!({
                "element_nr": summary.edge_id,
                "ri": summary.layer.ri(),
                "beginnt_bei_vp": summary.begin_node,
                "endet_bei_vp": summary.end_node,
                "length": summary.length,
                "runs": summary.runs,
                "significant_changes": summary.significant_changes.join(";"),
            });
            let props = properties(Some(&summary.attributes), fixed)?;
            feature(&summary.geometry, props)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(collection(features))
}

/// Snapped segments as a `FeatureCollection`, for inspection
///
/// # Errors
///
/// Returns an error if a feature cannot be built.
pub fn segments_to_geojson(segments: &[Segment]) -> Result<FeatureCollection, Error> {
    let features = segments
        .iter()
        .map(|segment| {
            let provenance = segment.provenance.as_ref();
            let fixed = json!({
                "edge_id": segment.edge_id,
                "ordinal": segment.ordinal,
                "start_offset": segment.start_offset,
                "length": segment.length,
                "source_id": provenance.map(|p| p.way_id.as_str()),
                "score": provenance.map(|p| p.score),
            });
            let props = properties(segment.attributes.as_ref(), fixed)?;
            feature(&segment.geometry, props)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(collection(features))
}

/// Serializes a `FeatureCollection` to `path`.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_feature_collection(path: &Path, collection: &FeatureCollection) -> Result<(), Error> {
    let text = serde_json::to_string(collection)?;
    fs::write(path, text)?;
    info!(
        "Wrote {} features to {}",
        collection.features.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo::line_string;

    use super::*;

    const TARGETS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[0, 0], [100, 0]]},
                "properties": {
                    "element_nr": "E1",
                    "beginnt_bei_vp": 10,
                    "endet_bei_vp": 11,
                    "verkehrsrichtung": "g",
                    "bezirk": "Mitte",
                    "strassenname": "Invalidenstraße"
                }
            },
            {
                "type": "Feature",
                "geometry": {"type": "MultiLineString", "coordinates": [[[0, 0], [0, 50]], [[0, 50], [0, 90]]]},
                "properties": {"element_nr": "E2", "beginnt_bei_vp": "a", "endet_bei_vp": "b"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "MultiLineString", "coordinates": [[[0, 0], [0, 50]], [[5, 50], [5, 90]]]},
                "properties": {"element_nr": "E3", "beginnt_bei_vp": "a", "endet_bei_vp": "b"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 0]]},
                "properties": {"element_nr": "E4", "beginnt_bei_vp": "a", "endet_bei_vp": "b", "verkehrsrichtung": "X"}
            }
        ]
    }"#;

    #[test]
    fn reads_target_edges() {
        let edges = parse_target_edges(TARGETS, &TargetFields::default()).unwrap();
        assert_eq!(edges.len(), 2);

        let first = &edges[0];
        assert_eq!(first.id, "E1");
        assert_eq!(first.from_node, "10");
        assert_eq!(first.direction, DirectionCode::Backward);
        assert_eq!(first.district.as_deref(), Some("Mitte"));
        assert_eq!(first.street_name.as_deref(), Some("Invalidenstraße"));

        let second = &edges[1];
        assert_eq!(second.direction, DirectionCode::Both);
        assert_eq!(second.geometry().0.len(), 3);
        assert!((second.length() - 90.0).abs() < 1e-12);
    }

    #[test]
    fn reads_source_ways_with_fallback_id() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "LineString", "coordinates": [[0, 1], [50, 1]]},
                    "properties": {"osm_id": 42, "highway": "cycleway", "width": 2.5, "lit": true, "note": null}
                },
                {
                    "type": "Feature",
                    "id": "way/7",
                    "geometry": {"type": "LineString", "coordinates": [[0, 2], [50, 2]]},
                    "properties": {"surface": "asphalt"}
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [0, 0]},
                    "properties": {"osm_id": 1}
                }
            ]
        }"#;
        let ways = parse_source_ways(text, SourceKind::Bikelane, &SourceFields::default()).unwrap();
        assert_eq!(ways.len(), 2);
        assert_eq!(ways[0].id, "42");
        assert_eq!(ways[0].attributes()["highway"], AttrValue::from("cycleway"));
        assert_eq!(ways[0].attributes()["width"], AttrValue::Float(2.5));
        assert_eq!(ways[0].attributes()["lit"], AttrValue::Bool(true));
        assert!(ways[0].attributes()["note"].is_null());
        assert_eq!(ways[1].id, "way/7");
    }

    #[test]
    fn rejects_non_collections() {
        let point = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(parse_source_ways(point, SourceKind::Path, &SourceFields::default()).is_err());
    }

    #[test]
    fn writes_aggregated_edges() {
        let mut attributes = Attributes::new();
        attributes.insert("ofm".to_string(), AttrValue::from("Asphalt"));
        attributes.insert("run".to_string(), AttrValue::from("shadowed"));
        let edge = AggregatedEdge {
            element_nr: "E1.01".to_string(),
            edge: 0,
            edge_id: "E1".to_string(),
            run: 1,
            begin_node: "10".to_string(),
            end_node: "E1#1".to_string(),
            district: None,
            street_name: None,
            direction: DirectionCode::Forward,
            length: 40.0,
            geometry: line_string![(x: 0.0, y: 0.0), (x: 40.0, y: 0.0)],
            attributes: Some(attributes),
            first_segment: 0,
            last_segment: 7,
            sources: vec!["1".to_string(), "2".to_string()],
        };

        let collection = aggregated_to_geojson(&[edge]).unwrap();
        assert_eq!(collection.features.len(), 1);
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["element_nr"], json!("E1.01"));
        assert_eq!(props["ofm"], json!("Asphalt"));
        assert_eq!(props["run"], json!(1));
        assert_eq!(props["sources"], json!("1;2"));
        assert_eq!(props["verkehrsrichtung"], json!("R"));
        assert!(collection.features[0].geometry.is_some());
    }
}
