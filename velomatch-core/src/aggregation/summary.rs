//! Collapsing all runs of a target edge into one record per layer

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::geometry::polyline;
use crate::model::{AttrValue, Attributes, DirectionalEdge, EdgeSummary};
use crate::translate::rvn::{
    DAMAGE_SIGN, KEY_COLOUR, KEY_GUIDANCE, KEY_MANDATORY, KEY_PROTECTION, KEY_RESTRICTION,
    KEY_SAFETY_STRIP, KEY_SURFACE, KEY_WIDTH, NO_RESTRICTION,
};

/// Ranked values of a worst-case attribute; earlier entries win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub order: Vec<String>,
    /// Used when none of the runs carries a ranked value
    pub default: String,
}

impl Hierarchy {
    pub fn new<I, S>(order: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
            default: default.into(),
        }
    }

    fn rank(&self, value: &str) -> Option<usize> {
        self.order.iter().position(|v| v == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryRules {
    /// Key under which the edge district takes part in the summary
    pub district_key: Option<String>,
    /// Keys taking the value with the greatest summed run length
    pub longest_section: Vec<String>,
    /// Keys taking the smallest numeric value
    pub minimum: Vec<String>,
    pub hierarchies: BTreeMap<String, Hierarchy>,
    /// Keys for which any change between runs is significant
    pub always_significant: Vec<String>,
    /// Keys for which a change among long runs is significant
    pub significant_when_long: Vec<String>,
    pub min_significant_length: f64,
    /// Spread of `minimum` keys among long runs that counts as significant
    pub min_significant_width_change: f64,
}

impl Default for SummaryRules {
    fn default() -> Self {
        let strings = |keys: &[&str]| keys.iter().map(|k| (*k).to_string()).collect::<Vec<_>>();
        let district = "bezirk";

        let mut hierarchies = BTreeMap::new();
        hierarchies.insert(
            KEY_SAFETY_STRIP.to_string(),
            Hierarchy::new(["nein", "ja", "entfällt"], "entfällt"),
        );
        hierarchies.insert(
            KEY_RESTRICTION.to_string(),
            Hierarchy::new(["Physische Sperre", DAMAGE_SIGN, NO_RESTRICTION], NO_RESTRICTION),
        );

        Self {
            district_key: Some(district.to_string()),
            longest_section: strings(&[
                district,
                KEY_GUIDANCE,
                KEY_MANDATORY,
                KEY_SURFACE,
                KEY_COLOUR,
                KEY_PROTECTION,
            ]),
            minimum: strings(&[KEY_WIDTH]),
            hierarchies,
            always_significant: strings(&[KEY_MANDATORY, KEY_RESTRICTION]),
            significant_when_long: strings(&[
                KEY_GUIDANCE,
                KEY_SURFACE,
                KEY_PROTECTION,
                KEY_SAFETY_STRIP,
            ]),
            min_significant_length: 50.0,
            min_significant_width_change: 0.3,
        }
    }
}

/// One value of a key on one run, weighted by run length
struct Sample<'a> {
    value: &'a AttrValue,
    length: f64,
}

/// Summarizes every edge of one layer.
///
/// Entries of the same edge must be adjacent, as produced by layer splitting.
pub fn summarize(entries: &[DirectionalEdge], rules: &SummaryRules) -> Vec<EdgeSummary> {
    let summaries: Vec<EdgeSummary> = entries
        .chunk_by(|a, b| a.edge.edge == b.edge.edge && a.layer == b.layer)
        .map(|runs| summarize_edge(runs, rules))
        .collect();

    let flagged = summaries
        .iter()
        .filter(|s| !s.significant_changes.is_empty())
        .count();
    log::info!(
        "Summarized {} edge records, {} with significant attribute changes",
        summaries.len(),
        flagged
    );
    summaries
}

fn summarize_edge(runs: &[DirectionalEdge], rules: &SummaryRules) -> EdgeSummary {
    let first = &runs[0];
    let last = &runs[runs.len() - 1];

    let district = first.edge.district.as_ref().map(|d| AttrValue::Text(d.clone()));
    let effective: Vec<(Attributes, f64)> = runs
        .iter()
        .filter_map(|run| {
            let mut attrs = run.edge.attributes.clone()?;
            if let (Some(key), Some(district)) = (&rules.district_key, &district) {
                attrs.entry(key.clone()).or_insert_with(|| district.clone());
            }
            Some((attrs, run.edge.length))
        })
        .collect();

    let keys: BTreeSet<&String> = effective.iter().flat_map(|(a, _)| a.keys()).collect();

    let mut attributes = Attributes::new();
    let mut significant_changes = Vec::new();
    for key in keys {
        let samples: Vec<Sample<'_>> = effective
            .iter()
            .filter_map(|(attrs, length)| {
                attrs
                    .get(key)
                    .filter(|v| !v.is_null())
                    .map(|value| Sample { value, length: *length })
            })
            .collect();

        if let Some(value) = combine(key, &samples, rules) {
            attributes.insert(key.clone(), value);
        }
        if is_significant(key, &samples, rules) {
            significant_changes.push(key.clone());
        }
    }

    if !significant_changes.is_empty() {
        log::info!(
            "Edge {} ({}): significant changes in {}",
            first.edge.edge_id,
            first.layer,
            significant_changes.join(", ")
        );
    }

    EdgeSummary {
        edge_id: first.edge.edge_id.clone(),
        layer: first.layer,
        begin_node: first.edge.begin_node.clone(),
        end_node: last.edge.end_node.clone(),
        length: runs.iter().map(|r| r.edge.length).sum(),
        geometry: polyline::concat(runs.iter().map(|r| &r.edge.geometry)),
        attributes,
        runs: runs.len(),
        significant_changes,
    }
}

fn combine(key: &str, samples: &[Sample<'_>], rules: &SummaryRules) -> Option<AttrValue> {
    if let Some(hierarchy) = rules.hierarchies.get(key) {
        let best = samples
            .iter()
            .filter_map(|s| s.value.as_str().and_then(|v| hierarchy.rank(v)))
            .min();
        return Some(AttrValue::from(
            best.map_or(hierarchy.default.as_str(), |rank| hierarchy.order[rank].as_str()),
        ));
    }
    if samples.is_empty() {
        return None;
    }
    if rules.longest_section.iter().any(|k| k == key) {
        return longest_section(samples);
    }
    if rules.minimum.iter().any(|k| k == key) {
        let min = samples
            .iter()
            .filter_map(|s| s.value.as_f64())
            .min_by(f64::total_cmp);
        if let Some(min) = min {
            return Some(AttrValue::Float(min));
        }
    }
    Some(joined(samples))
}

/// Value with the greatest summed length; ties go to the smaller value
fn longest_section(samples: &[Sample<'_>]) -> Option<AttrValue> {
    let mut totals: BTreeMap<&AttrValue, f64> = BTreeMap::new();
    for sample in samples {
        *totals.entry(sample.value).or_insert(0.0) += sample.length;
    }
    // BTreeMap iterates ascending, so keeping the first maximum favours the smaller value
    let mut best: Option<(&AttrValue, f64)> = None;
    for (value, total) in totals {
        if best.is_none_or(|(_, b)| total > b) {
            best = Some((value, total));
        }
    }
    best.map(|(value, _)| value.clone())
}

fn joined(samples: &[Sample<'_>]) -> AttrValue {
    let unique: BTreeSet<&AttrValue> = samples.iter().map(|s| s.value).collect();
    if unique.len() == 1 {
        if let Some(value) = unique.first() {
            return (*value).clone();
        }
    }
    let parts: BTreeSet<String> = unique.iter().map(ToString::to_string).collect();
    AttrValue::Text(parts.into_iter().collect::<Vec<_>>().join(";"))
}

fn distinct<'a, I>(values: I) -> usize
where
    I: Iterator<Item = &'a AttrValue>,
{
    values.collect::<BTreeSet<_>>().len()
}

fn is_significant(key: &str, samples: &[Sample<'_>], rules: &SummaryRules) -> bool {
    if rules.always_significant.iter().any(|k| k == key) {
        return distinct(samples.iter().map(|s| s.value)) > 1;
    }

    let long: Vec<&Sample<'_>> = samples
        .iter()
        .filter(|s| s.length >= rules.min_significant_length)
        .collect();
    if rules.significant_when_long.iter().any(|k| k == key) {
        return distinct(long.iter().map(|s| s.value)) > 1;
    }
    if rules.minimum.iter().any(|k| k == key) {
        let widths: Vec<f64> = long.iter().filter_map(|s| s.value.as_f64()).collect();
        let min = widths.iter().copied().min_by(f64::total_cmp);
        let max = widths.iter().copied().max_by(f64::total_cmp);
        if let (Some(min), Some(max)) = (min, max) {
            return max - min > rules.min_significant_width_change;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use geo::line_string;

    use super::*;
    use crate::model::{AggregatedEdge, DirectionCode, Layer};

    fn entry(run: usize, length: f64, attrs: &[(&str, AttrValue)]) -> DirectionalEdge {
        let x0 = 100.0 * run as f64;
        DirectionalEdge {
            afid: run,
            layer: Layer::Forward,
            edge: AggregatedEdge {
                element_nr: format!("e.{run:02}"),
                edge: 0,
                edge_id: "e".to_string(),
                run,
                begin_node: format!("n{run}"),
                end_node: format!("n{}", run + 1),
                district: Some("Mitte".to_string()),
                street_name: None,
                direction: DirectionCode::Forward,
                length,
                geometry: line_string![(x: x0, y: 0.0), (x: x0 + 100.0, y: 0.0)],
                attributes: Some(
                    attrs
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), v.clone()))
                        .collect(),
                ),
                first_segment: 0,
                last_segment: 0,
                sources: Vec::new(),
            },
        }
    }

    #[test]
    fn longest_section_wins() {
        let entries = vec![
            entry(1, 30.0, &[("ofm", "Asphalt".into())]),
            entry(2, 60.0, &[("ofm", "Pflaster".into())]),
            entry(3, 40.0, &[("ofm", "Asphalt".into())]),
        ];
        let summary = &summarize(&entries, &SummaryRules::default())[0];
        assert_eq!(summary.attributes["ofm"], AttrValue::from("Asphalt"));
        assert_eq!(summary.attributes["bezirk"], AttrValue::from("Mitte"));
        assert_eq!(summary.runs, 3);
        assert_eq!(summary.begin_node, "n1");
        assert_eq!(summary.end_node, "n4");
        assert!((summary.length - 130.0).abs() < 1e-12);
    }

    #[test]
    fn longest_section_tie_takes_smaller_value() {
        let entries = vec![
            entry(1, 50.0, &[("fuehr", "Radweg".into())]),
            entry(2, 50.0, &[("fuehr", "Gehweg".into())]),
        ];
        let summary = &summarize(&entries, &SummaryRules::default())[0];
        assert_eq!(summary.attributes["fuehr"], AttrValue::from("Gehweg"));
    }

    #[test]
    fn worst_case_rules() {
        let entries = vec![
            entry(
                1,
                80.0,
                &[
                    ("breite", 2.0.into()),
                    ("trennstreifen", "ja".into()),
                    ("nutz_beschr", "keine".into()),
                ],
            ),
            entry(
                2,
                10.0,
                &[
                    ("breite", 1.2.into()),
                    ("trennstreifen", "nein".into()),
                    ("nutz_beschr", "Physische Sperre".into()),
                ],
            ),
        ];
        let summary = &summarize(&entries, &SummaryRules::default())[0];
        assert_eq!(summary.attributes["breite"], AttrValue::Float(1.2));
        assert_eq!(summary.attributes["trennstreifen"], AttrValue::from("nein"));
        assert_eq!(summary.attributes["nutz_beschr"], AttrValue::from("Physische Sperre"));
    }

    #[test]
    fn other_keys_are_joined() {
        let entries = vec![
            entry(1, 10.0, &[("tilda_name", "B".into())]),
            entry(2, 10.0, &[("tilda_name", "A".into())]),
            entry(3, 10.0, &[("tilda_name", "B".into())]),
        ];
        let summary = &summarize(&entries, &SummaryRules::default())[0];
        assert_eq!(summary.attributes["tilda_name"], AttrValue::from("A;B"));
    }

    #[test]
    fn significant_changes() {
        let entries = vec![
            entry(
                1,
                60.0,
                &[("pflicht", true.into()), ("ofm", "Asphalt".into()), ("breite", 2.0.into())],
            ),
            entry(
                2,
                10.0,
                &[("pflicht", false.into()), ("ofm", "Pflaster".into()), ("breite", 1.0.into())],
            ),
            entry(
                3,
                60.0,
                &[("pflicht", true.into()), ("ofm", "Asphalt".into()), ("breite", 2.5.into())],
            ),
        ];
        let summary = &summarize(&entries, &SummaryRules::default())[0];
        // the short paved run does not count, the width spread of long runs does
        assert_eq!(summary.significant_changes, vec!["breite", "pflicht"]);
    }

    #[test]
    fn unattributed_runs_are_ignored() {
        let mut bare = entry(2, 40.0, &[]);
        bare.edge.attributes = None;
        let entries = vec![entry(1, 40.0, &[("ofm", "Asphalt".into())]), bare];
        let summary = &summarize(&entries, &SummaryRules::default())[0];
        assert_eq!(summary.attributes["ofm"], AttrValue::from("Asphalt"));
        assert!(!summary.attributes.contains_key("trennstreifen"));
        assert_eq!(summary.runs, 2);
    }
}
