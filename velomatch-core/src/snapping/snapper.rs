use std::cmp::Ordering;
use std::collections::BTreeSet;

use geo::{Coord, LineString};
use log::trace;

use crate::geometry::{Buffer, LineIndex, polyline, vector};
use crate::model::{Attributes, DirectionCode, Oneway, Provenance, Segment, SourceWay, TargetEdge};
use crate::pipeline::{Fingerprint, OnewayPolicy, PipelineConfig};
use crate::translate::AttributeTranslator;

/// Relative tolerance under which two scores count as tied
pub const SCORE_EPSILON: f64 = 1e-9;

/// Absolute tolerance for comparing centroid distances
const DISTANCE_EPSILON: f64 = 1e-9;

/// Matched source way, prepared once for snapping
#[derive(Debug, Clone)]
struct PooledWay {
    id: String,
    geometry: LineString<f64>,
    oneway: Oneway,
    centroid: Coord<f64>,
    attributes: Attributes,
    /// Fingerprint of everything snapping reads from this way
    digest: String,
}

/// Read-only pool of accepted source ways with a spatial index.
///
/// Built once before the per-edge fan-out. Ways are translated and their
/// one-way tags resolved up front, so snapping itself only reads.
#[derive(Debug, Clone)]
pub struct SourcePool {
    ways: Vec<PooledWay>,
    index: LineIndex,
}

/// Scored way in reach of a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapCandidate {
    pub pool_idx: usize,
    pub score: f64,
    pub centroid_distance: f64,
    pub aligned: bool,
}

impl SourcePool {
    /// Prepares the ways whose indices are in `accepted`
    pub fn new(
        ways: &[SourceWay],
        accepted: &BTreeSet<usize>,
        translator: &dyn AttributeTranslator,
        policy: &dyn OnewayPolicy,
    ) -> Self {
        let ways: Vec<PooledWay> = accepted
            .iter()
            .map(|&idx| &ways[idx])
            .map(|way| {
                let oneway = policy.resolve(way);
                let attributes = translator.translate(way);
                let digest = Fingerprint::new()
                    .text(&way.id)
                    .text(&format!("{oneway:?}"))
                    .geometry(way.geometry())
                    .attributes(&attributes)
                    .finish();
                PooledWay {
                    id: way.id.clone(),
                    geometry: way.geometry().clone(),
                    oneway,
                    centroid: polyline::centroid(way.geometry()),
                    attributes,
                    digest,
                }
            })
            .collect();
        let index = LineIndex::new(ways.iter().map(|w| &w.geometry));
        Self { ways, index }
    }

    pub fn len(&self) -> usize {
        self.ways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ways.is_empty()
    }

    /// Scores every pooled way within `snap_radius` of the segment.
    ///
    /// The result is ordered by way identifier.
    pub fn candidates(
        &self,
        segment: &LineString<f64>,
        direction: DirectionCode,
        config: &PipelineConfig,
    ) -> Vec<SnapCandidate> {
        let buffer = Buffer::new(segment, config.snap_radius);
        let hits = self
            .index
            .intersecting(&buffer, |idx| &self.ways[idx].geometry);
        if hits.is_empty() {
            return Vec::new();
        }

        let travel = polyline::overall_direction(segment).map(|dir| match direction {
            DirectionCode::Backward => -dir,
            DirectionCode::Forward | DirectionCode::Both => dir,
        });
        let midpoint = polyline::midpoint(segment);

        let mut scored: Vec<SnapCandidate> = hits
            .into_iter()
            .map(|pool_idx| {
                let way = &self.ways[pool_idx];
                let mean_distance = polyline::mean_sample_distance(
                    segment,
                    &way.geometry,
                    config.snapping.proximity_samples,
                );
                let proximity = 1.0 / (1.0 + mean_distance);

                let local = polyline::nearest_line(&way.geometry, midpoint)
                    .and_then(|line| vector::line_direction(&line))
                    .map(|dir| match way.oneway {
                        Oneway::Backward => -dir,
                        Oneway::Forward | Oneway::Both => dir,
                    });

                let (alignment, aligned) = match (travel, local) {
                    (Some(travel), Some(local)) => {
                        let cos = vector::dot(travel, local).clamp(-1.0, 1.0);
                        let agnostic =
                            direction == DirectionCode::Both || way.oneway == Oneway::Both;
                        let alignment = if agnostic { cos.abs() } else { cos };
                        let within = vector::undirected_angle(travel, local)
                            <= config.angle_diff_threshold + vector::ANGLE_EPSILON;
                        (alignment, within)
                    }
                    _ => (0.0, false),
                };

                SnapCandidate {
                    pool_idx,
                    score: proximity * (1.0 + alignment),
                    centroid_distance: vector::norm(way.centroid - midpoint),
                    aligned,
                }
            })
            .collect();
        scored.sort_by(|a, b| self.ways[a.pool_idx].id.cmp(&self.ways[b.pool_idx].id));
        scored
    }

    /// Picks the attribute source for one segment.
    ///
    /// Misaligned ways only compete when no aligned way is in reach and
    /// `fallback_to_misaligned` is set. Highest score wins; near-equal scores
    /// fall back to the smaller centroid distance to the segment midpoint and
    /// then to the smaller way identifier.
    pub fn best(&self, candidates: &[SnapCandidate], config: &PipelineConfig) -> Option<SnapCandidate> {
        let aligned: Vec<SnapCandidate> = candidates.iter().filter(|c| c.aligned).copied().collect();
        let competing: &[SnapCandidate] = if !aligned.is_empty() {
            &aligned
        } else if config.snapping.fallback_to_misaligned {
            candidates
        } else {
            &[]
        };

        competing.iter().copied().reduce(|best, next| {
            if self.compare(&next, &best) == Ordering::Greater {
                next
            } else {
                best
            }
        })
    }

    /// Preference order of two candidates, `Greater` meaning `a` wins
    fn compare(&self, a: &SnapCandidate, b: &SnapCandidate) -> Ordering {
        let tolerance = SCORE_EPSILON * a.score.abs().max(b.score.abs()).max(1.0);
        if (a.score - b.score).abs() > tolerance {
            return a.score.total_cmp(&b.score);
        }
        if (a.centroid_distance - b.centroid_distance).abs() > DISTANCE_EPSILON {
            return b.centroid_distance.total_cmp(&a.centroid_distance);
        }
        self.ways[b.pool_idx].id.cmp(&self.ways[a.pool_idx].id)
    }

    /// Copies the winning way's attributes onto the segment.
    ///
    /// Leaves the segment unattributed when no way is in reach.
    pub fn snap_segment(&self, segment: &mut Segment, edge: &TargetEdge, config: &PipelineConfig) {
        let candidates = self.candidates(&segment.geometry, edge.direction, config);
        match self.best(&candidates, config) {
            Some(winner) => {
                let way = &self.ways[winner.pool_idx];
                segment.attributes = Some(way.attributes.clone());
                segment.provenance = Some(Provenance {
                    way_id: way.id.clone(),
                    score: winner.score,
                });
            }
            None => {
                trace!(
                    "Segment {} of edge {} has no source in reach ({} candidates)",
                    segment.ordinal,
                    edge.id,
                    candidates.len()
                );
                segment.attributes = None;
                segment.provenance = None;
            }
        }
    }

    pub fn way_id(&self, pool_idx: usize) -> &str {
        &self.ways[pool_idx].id
    }

    /// Content digests of the pooled ways within `radius` of `geometry`,
    /// ordered by way id.
    ///
    /// A digest covers the way id, geometry, resolved one-way value and
    /// translated attributes.
    pub fn digests_in_reach(&self, geometry: &LineString<f64>, radius: f64) -> Vec<&str> {
        let buffer = Buffer::new(geometry, radius);
        let mut ways: Vec<&PooledWay> = self
            .index
            .intersecting(&buffer, |idx| &self.ways[idx].geometry)
            .into_iter()
            .map(|idx| &self.ways[idx])
            .collect();
        ways.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        ways.into_iter().map(|way| way.digest.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use geo::line_string;

    use super::*;
    use crate::model::{AttrValue, LinearFeature, SourceKind};
    use crate::pipeline::StrictOneway;
    use crate::snapping::segment_edge;
    use crate::translate::PassthroughTranslator;

    fn way(id: &str, ls: LineString<f64>, tags: &[(&str, &str)]) -> SourceWay {
        let attributes = tags
            .iter()
            .map(|(k, v)| ((*k).to_string(), AttrValue::from(*v)))
            .collect();
        SourceWay::new(id, SourceKind::Bikelane, LinearFeature::new(ls, attributes))
    }

    fn edge(direction: DirectionCode) -> TargetEdge {
        TargetEdge {
            id: "e".to_string(),
            district: None,
            from_node: "a".to_string(),
            to_node: "b".to_string(),
            direction,
            street_name: None,
            feature: LinearFeature::new(
                line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
                Attributes::new(),
            ),
        }
    }

    fn pool(ways: &[SourceWay]) -> SourcePool {
        let accepted = (0..ways.len()).collect();
        SourcePool::new(
            ways,
            &accepted,
            &PassthroughTranslator::new(["surface", "oneway"]),
            &StrictOneway,
        )
    }

    fn snap(ways: &[SourceWay], direction: DirectionCode) -> Segment {
        let edge = edge(direction);
        let mut segment = segment_edge(0, &edge, 100.0).remove(0);
        pool(ways).snap_segment(&mut segment, &edge, &PipelineConfig::default());
        segment
    }

    fn winner(segment: &Segment) -> Option<&str> {
        segment.provenance.as_ref().map(|p| p.way_id.as_str())
    }

    #[test]
    fn closer_way_wins() {
        let ways = [
            way("far", line_string![(x: 0.0, y: 6.0), (x: 10.0, y: 6.0)], &[("surface", "gravel")]),
            way("near", line_string![(x: 0.0, y: 2.0), (x: 10.0, y: 2.0)], &[("surface", "asphalt")]),
        ];
        let segment = snap(&ways, DirectionCode::Both);
        assert_eq!(winner(&segment), Some("near"));
        assert_eq!(
            segment.attributes.as_ref().and_then(|a| a.get("surface")),
            Some(&AttrValue::from("asphalt"))
        );
    }

    #[test]
    fn equal_score_prefers_smaller_centroid_distance() {
        // same offset, so same proximity and alignment; "z" is centred on the
        // segment and wins despite the larger id
        let ways = [
            way("z", line_string![(x: -5.0, y: 3.0), (x: 15.0, y: 3.0)], &[]),
            way("a", line_string![(x: -10.0, y: -3.0), (x: 30.0, y: -3.0)], &[]),
        ];
        let segment = snap(&ways, DirectionCode::Both);
        assert_eq!(winner(&segment), Some("z"));
    }

    #[test]
    fn equal_score_and_distance_prefers_smaller_id() {
        let ways = [
            way("w2", line_string![(x: 0.0, y: 3.0), (x: 10.0, y: 3.0)], &[]),
            way("w1", line_string![(x: 0.0, y: -3.0), (x: 10.0, y: -3.0)], &[]),
        ];
        let segment = snap(&ways, DirectionCode::Both);
        assert_eq!(winner(&segment), Some("w1"));
    }

    #[test]
    fn one_way_against_travel_direction_loses() {
        // both ways are one-way; only "with" runs in the edge's travel direction
        let ways = [
            way(
                "against",
                line_string![(x: 10.0, y: 2.0), (x: 0.0, y: 2.0)],
                &[("oneway", "yes")],
            ),
            way(
                "with",
                line_string![(x: 0.0, y: 2.5), (x: 10.0, y: 2.5)],
                &[("oneway", "yes")],
            ),
        ];
        assert_eq!(winner(&snap(&ways, DirectionCode::Forward)), Some("with"));
        assert_eq!(winner(&snap(&ways, DirectionCode::Backward)), Some("against"));
    }

    #[test]
    fn bidirectional_edge_ignores_orientation() {
        let ways = [
            way(
                "against",
                line_string![(x: 10.0, y: 2.0), (x: 0.0, y: 2.0)],
                &[("oneway", "yes")],
            ),
            way(
                "with",
                line_string![(x: 0.0, y: 2.5), (x: 10.0, y: 2.5)],
                &[("oneway", "yes")],
            ),
        ];
        assert_eq!(winner(&snap(&ways, DirectionCode::Both)), Some("against"));
    }

    #[test]
    fn misaligned_way_only_used_as_fallback() {
        let crossing = way("cross", line_string![(x: 5.0, y: -10.0), (x: 5.0, y: 10.0)], &[]);
        let parallel = way("par", line_string![(x: 0.0, y: 8.0), (x: 10.0, y: 8.0)], &[]);

        assert_eq!(winner(&snap(&[crossing.clone(), parallel], DirectionCode::Both)), Some("par"));
        assert_eq!(winner(&snap(&[crossing.clone()], DirectionCode::Both)), Some("cross"));

        let edge = edge(DirectionCode::Both);
        let mut segment = segment_edge(0, &edge, 100.0).remove(0);
        let mut config = PipelineConfig::default();
        config.snapping.fallback_to_misaligned = false;
        pool(&[crossing]).snap_segment(&mut segment, &edge, &config);
        assert!(segment.attributes.is_none());
    }

    #[test]
    fn no_way_in_reach_leaves_segment_unattributed() {
        let ways = [way("far", line_string![(x: 0.0, y: 50.0), (x: 10.0, y: 50.0)], &[])];
        let segment = snap(&ways, DirectionCode::Both);
        assert!(segment.attributes.is_none());
        assert!(segment.provenance.is_none());
    }
}
