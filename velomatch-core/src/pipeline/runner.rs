use std::sync::Arc;
use std::time::Instant;

use hashbrown::HashSet;
use log::{debug, info, warn};
use rayon::prelude::*;

use super::cache::{CacheKey, EdgeCache, EdgeResult};
use super::config::PipelineConfig;
use super::policy::policy_for;
use super::report::{CompletenessReport, RejectedInput};
use crate::Error;
use crate::aggregation::{self, DirectionLayers};
use crate::matching::{self, ManualOverrides, OverrideOutcome};
use crate::model::{AggregatedEdge, Candidate, EdgeSummary, Segment, SourceWay, TargetEdge};
use crate::snapping::{SourcePool, segment_edge};
use crate::translate::translator_for;

/// Everything one pipeline run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Source ways that passed validation; candidate `way` indices point here
    pub ways: Vec<SourceWay>,
    /// Target edges that passed validation; `edge` indices point here
    pub edges: Vec<TargetEdge>,
    pub candidates: Vec<Candidate>,
    pub overrides: OverrideOutcome,
    pub segments: Vec<Segment>,
    pub aggregated: Vec<AggregatedEdge>,
    /// Empty when direction layers are disabled
    pub layers: DirectionLayers,
    pub summaries: Vec<EdgeSummary>,
    pub report: CompletenessReport,
}

/// Configured matching pipeline.
///
/// The configuration is validated once on construction; a pipeline can run
/// any number of inputs. An optional [`EdgeCache`] lets unchanged edges skip
/// segmentation and snapping.
pub struct Pipeline<'c> {
    config: PipelineConfig,
    cache: Option<&'c dyn EdgeCache>,
}

impl<'c> Pipeline<'c> {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is unusable.
    pub fn new(config: PipelineConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            cache: None,
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: &'c dyn EdgeCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Matches `ways` onto `edges` and aggregates the transferred attributes.
    ///
    /// Invalid or duplicate features are dropped with a warning and listed in
    /// the report; they never abort the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be built or the
    /// configuration cannot be fingerprinted for the cache.
    pub fn run(
        &self,
        ways: Vec<SourceWay>,
        edges: Vec<TargetEdge>,
        overrides: &ManualOverrides,
    ) -> Result<PipelineOutput, Error> {
        match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                pool.install(|| self.run_inner(ways, edges, overrides))
            }
            None => self.run_inner(ways, edges, overrides),
        }
    }

    fn run_inner(
        &self,
        ways: Vec<SourceWay>,
        edges: Vec<TargetEdge>,
        overrides: &ManualOverrides,
    ) -> Result<PipelineOutput, Error> {
        let config = &self.config;
        let started = Instant::now();

        let mut rejected_inputs = Vec::new();
        let ways = validate_ways(ways, &mut rejected_inputs);
        let edges = validate_edges(edges, &mut rejected_inputs);
        info!(
            "Matching {} source ways onto {} target edges",
            ways.len(),
            edges.len()
        );

        let (candidates, outcome) = self.match_ways(&ways, &edges, overrides);

        let accepted = matching::accepted_ways(&candidates);
        let translator = translator_for(&config.attributes);
        let policy = policy_for(config.oneway_policy);
        let pool = SourcePool::new(&ways, &accepted, translator.as_ref(), policy.as_ref());
        info!("Snapping with {} accepted source ways", pool.len());

        let fingerprint = match self.cache {
            Some(_) => Some(config.fingerprint()?),
            None => None,
        };

        let results: Vec<(EdgeResult, bool)> = edges
            .par_iter()
            .enumerate()
            .map(|(idx, edge)| self.process_edge(idx, edge, &pool, fingerprint.as_deref()))
            .collect();

        let cached_edges = results.iter().filter(|(_, hit)| *hit).count();
        let mut segments = Vec::new();
        let mut aggregated = Vec::new();
        for (result, _) in results {
            segments.extend(result.segments);
            aggregated.extend(result.aggregated);
        }
        info!(
            "Aggregated {} segments into {} edges ({cached_edges} edges from cache)",
            segments.len(),
            aggregated.len()
        );

        let stages = &config.stages;
        let layers = if stages.direction_layers || stages.edge_summaries {
            aggregation::split_layers(&aggregated)
        } else {
            DirectionLayers::default()
        };
        let summaries = if stages.edge_summaries {
            let mut summaries = aggregation::summarize(&layers.forward, &config.summary);
            summaries.extend(aggregation::summarize(&layers.backward, &config.summary));
            summaries
        } else {
            Vec::new()
        };
        let layers = if stages.direction_layers {
            layers
        } else {
            DirectionLayers::default()
        };

        let mut report = CompletenessReport::build(
            &edges,
            &segments,
            aggregated.len(),
            &candidates,
            &outcome,
            rejected_inputs,
        );
        report.cached_edges = cached_edges;
        info!(
            "Pipeline finished in {:.2?}: {:.1}% of {:.0} length units attributed, {} edges unmatched",
            started.elapsed(),
            report.attributed_fraction() * 100.0,
            report.attributed_length + report.unattributed_length,
            report.unmatched_edges.len()
        );

        Ok(PipelineOutput {
            ways,
            edges,
            candidates,
            overrides: outcome,
            segments,
            aggregated,
            layers,
            summaries,
            report,
        })
    }

    /// Candidate selection followed by the enabled filter stages
    fn match_ways(
        &self,
        ways: &[SourceWay],
        edges: &[TargetEdge],
        overrides: &ManualOverrides,
    ) -> (Vec<Candidate>, OverrideOutcome) {
        let config = &self.config;
        let stages = &config.stages;

        let mut candidates = matching::select_candidates(ways, edges, config);
        if stages.orthogonal_filter {
            matching::filter_orthogonal(ways, edges, &mut candidates, config);
        } else {
            debug!("Orthogonality filter disabled");
        }
        let outcome = if stages.manual_overrides {
            matching::apply_overrides(ways, &mut candidates, overrides)
        } else {
            if !overrides.is_empty() {
                warn!("Manual overrides given but the override stage is disabled");
            }
            OverrideOutcome::default()
        };
        if stages.layering {
            matching::supersede_lower_priority(ways, &mut candidates, config);
        } else {
            debug!("Source layering disabled");
        }
        (candidates, outcome)
    }

    /// Segments, snaps and aggregates one edge, consulting the cache first
    fn process_edge(
        &self,
        idx: usize,
        edge: &TargetEdge,
        pool: &SourcePool,
        fingerprint: Option<&str>,
    ) -> (EdgeResult, bool) {
        let key = match (self.cache, fingerprint) {
            (Some(_), Some(fingerprint)) => Some(CacheKey::new(
                edge,
                fingerprint,
                pool.digests_in_reach(edge.geometry(), self.config.snap_radius),
            )),
            _ => None,
        };

        if let (Some(cache), Some(key)) = (self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                return (reindexed(&hit, idx), true);
            }
        }

        let mut segments = segment_edge(idx, edge, self.config.segment_length);
        for segment in &mut segments {
            pool.snap_segment(segment, edge, &self.config);
        }
        let aggregated =
            aggregation::aggregate_edge(idx, edge, &segments, &self.config.merge_policy());
        let result = EdgeResult {
            segments,
            aggregated,
        };

        if let (Some(cache), Some(key)) = (self.cache, key) {
            cache.put(key, Arc::new(result.clone()));
        }
        (result, false)
    }
}

/// Runs the pipeline once without a cache.
///
/// # Errors
///
/// See [`Pipeline::new`] and [`Pipeline::run`].
pub fn run_pipeline(
    ways: Vec<SourceWay>,
    edges: Vec<TargetEdge>,
    overrides: &ManualOverrides,
    config: &PipelineConfig,
) -> Result<PipelineOutput, Error> {
    Pipeline::new(config.clone())?.run(ways, edges, overrides)
}

/// Cached results keep the edge index of the run that stored them
fn reindexed(hit: &EdgeResult, idx: usize) -> EdgeResult {
    let mut result = hit.clone();
    for segment in &mut result.segments {
        segment.edge = idx;
    }
    for aggregated in &mut result.aggregated {
        aggregated.edge = idx;
    }
    result
}

fn validate_ways(ways: Vec<SourceWay>, rejected: &mut Vec<RejectedInput>) -> Vec<SourceWay> {
    let mut seen = HashSet::new();
    ways.into_iter()
        .filter(|way| {
            let reason = match way.feature.validate() {
                Err(err) => err.to_string(),
                Ok(()) if !seen.insert(way.id.clone()) => "duplicate identifier".to_string(),
                Ok(()) => return true,
            };
            let dataset = format!("source:{}", way.kind);
            warn!("Dropping {dataset} way {}: {reason}", way.id);
            rejected.push(RejectedInput {
                id: way.id.clone(),
                dataset,
                reason,
            });
            false
        })
        .collect()
}

fn validate_edges(edges: Vec<TargetEdge>, rejected: &mut Vec<RejectedInput>) -> Vec<TargetEdge> {
    let mut seen = HashSet::new();
    edges
        .into_iter()
        .filter(|edge| {
            let reason = match edge.feature.validate() {
                Err(err) => err.to_string(),
                Ok(()) if !seen.insert(edge.id.clone()) => "duplicate identifier".to_string(),
                Ok(()) => return true,
            };
            warn!("Dropping target edge {}: {reason}", edge.id);
            rejected.push(RejectedInput {
                id: edge.id.clone(),
                dataset: "target".to_string(),
                reason,
            });
            false
        })
        .collect()
}
