use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::aggregation::{MergePolicy, SummaryRules};
use crate::model::SourceKind;
use crate::Error;

/// Configuration of the whole matching pipeline.
///
/// Every section has defaults, so a partial configuration file only needs
/// to name the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Buffer distance for candidate selection
    pub buffer_distance: f64,
    /// Per-dataset buffer distances replacing `buffer_distance`
    pub buffer_overrides: BTreeMap<SourceKind, f64>,
    /// Maximum angular difference, degrees, for the orthogonality filter and
    /// directional alignment
    pub angle_diff_threshold: f64,
    /// Ways shorter than this go through the orthogonality filter
    pub short_way_threshold: f64,
    /// Target length of edge segments
    pub segment_length: f64,
    pub min_merge_length: f64,
    pub max_merge_length: Option<f64>,
    /// Radius of the per-segment search buffer
    pub snap_radius: f64,
    pub coverage: CoverageConfig,
    pub orthogonal: OrthogonalConfig,
    pub layering: LayeringConfig,
    pub snapping: SnappingConfig,
    pub summary: SummaryRules,
    pub stages: StageSelection,
    pub attributes: AttributeSchema,
    pub oneway_policy: OnewayPolicyKind,
    /// Worker threads, all available cores when unset
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_distance: 20.0,
            buffer_overrides: BTreeMap::new(),
            angle_diff_threshold: 35.0,
            short_way_threshold: 50.0,
            segment_length: 5.0,
            min_merge_length: 50.0,
            max_merge_length: None,
            snap_radius: 20.0,
            coverage: CoverageConfig::default(),
            orthogonal: OrthogonalConfig::default(),
            layering: LayeringConfig::default(),
            snapping: SnappingConfig::default(),
            summary: SummaryRules::default(),
            stages: StageSelection::default(),
            attributes: AttributeSchema::default(),
            oneway_policy: OnewayPolicyKind::default(),
            threads: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Minimum share of a way's length inside the target buffer
    pub min_fraction: f64,
    /// Sampling step along the way
    pub sample_step: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            min_fraction: 0.7,
            sample_step: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrthogonalConfig {
    /// Nearby target pieces spreading wider than this mark a junction
    pub complex_spread_threshold: f64,
    /// At a junction, a piece this close in angle keeps the way
    pub complex_parallel_threshold: f64,
    /// Length of the target pieces the mean direction is computed from
    pub piece_length: f64,
    /// Datasets exempt from the filter
    pub skip_kinds: Vec<SourceKind>,
}

impl Default for OrthogonalConfig {
    fn default() -> Self {
        Self {
            complex_spread_threshold: 60.0,
            complex_parallel_threshold: 20.0,
            piece_length: 5.0,
            skip_kinds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayeringConfig {
    pub buffer_distance: f64,
    /// Share of a way within reach of higher priority ways at which it is dropped
    pub max_overlap_fraction: f64,
    /// Keep streets even where bikelanes cover them
    pub keep_all_streets: bool,
}

impl Default for LayeringConfig {
    fn default() -> Self {
        Self {
            buffer_distance: 10.0,
            max_overlap_fraction: 0.8,
            keep_all_streets: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnappingConfig {
    /// Use misaligned ways when no aligned way is in reach
    pub fallback_to_misaligned: bool,
    /// Samples along a segment for the proximity term
    pub proximity_samples: usize,
}

impl Default for SnappingConfig {
    fn default() -> Self {
        Self {
            fallback_to_misaligned: true,
            proximity_samples: 5,
        }
    }
}

/// Stages to run. Disabled stages pass their input through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSelection {
    pub coverage_filter: bool,
    pub orthogonal_filter: bool,
    pub manual_overrides: bool,
    pub layering: bool,
    pub direction_layers: bool,
    pub edge_summaries: bool,
}

impl Default for StageSelection {
    fn default() -> Self {
        Self {
            coverage_filter: true,
            orthogonal_filter: true,
            manual_overrides: true,
            layering: true,
            direction_layers: true,
            edge_summaries: true,
        }
    }
}

/// Target vocabulary the snapped attributes are translated into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum AttributeSchema {
    /// Radvorrangsnetz attribute set, plus raw keys in `carry` copied with a
    /// `tilda_` prefix
    Rvn {
        #[serde(default)]
        carry: Vec<String>,
    },
    /// Raw source attributes, restricted to `keys`
    Passthrough { keys: Vec<String> },
}

impl Default for AttributeSchema {
    fn default() -> Self {
        AttributeSchema::Rvn { carry: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnewayPolicyKind {
    #[default]
    Strict,
    DualCarriagewayBidirectional,
}

impl PipelineConfig {
    /// Candidate buffer distance for ways of `kind`
    pub fn buffer_for(&self, kind: SourceKind) -> f64 {
        self.buffer_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.buffer_distance)
    }

    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy {
            min_merge_length: self.min_merge_length,
            max_merge_length: self.max_merge_length,
        }
    }

    /// Rejects configurations the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending value.
    pub fn validate(&self) -> Result<(), Error> {
        positive("buffer_distance", self.buffer_distance)?;
        for (kind, distance) in &self.buffer_overrides {
            positive(&format!("buffer_overrides.{kind}"), *distance)?;
        }
        angle("angle_diff_threshold", self.angle_diff_threshold)?;
        non_negative("short_way_threshold", self.short_way_threshold)?;
        positive("segment_length", self.segment_length)?;
        non_negative("min_merge_length", self.min_merge_length)?;
        if let Some(max) = self.max_merge_length {
            positive("max_merge_length", max)?;
        }
        positive("snap_radius", self.snap_radius)?;

        fraction("coverage.min_fraction", self.coverage.min_fraction)?;
        positive("coverage.sample_step", self.coverage.sample_step)?;

        angle(
            "orthogonal.complex_spread_threshold",
            self.orthogonal.complex_spread_threshold,
        )?;
        angle(
            "orthogonal.complex_parallel_threshold",
            self.orthogonal.complex_parallel_threshold,
        )?;
        positive("orthogonal.piece_length", self.orthogonal.piece_length)?;

        positive("layering.buffer_distance", self.layering.buffer_distance)?;
        fraction(
            "layering.max_overlap_fraction",
            self.layering.max_overlap_fraction,
        )?;

        if self.snapping.proximity_samples < 2 {
            return Err(Error::InvalidConfig(format!(
                "snapping.proximity_samples must be at least 2, got {}",
                self.snapping.proximity_samples
            )));
        }
        non_negative(
            "summary.min_significant_length",
            self.summary.min_significant_length,
        )?;
        if self.threads == Some(0) {
            return Err(Error::InvalidConfig(
                "threads must be at least 1 when set".to_string(),
            ));
        }
        if let AttributeSchema::Passthrough { keys } = &self.attributes {
            if keys.is_empty() {
                return Err(Error::InvalidConfig(
                    "passthrough attribute schema needs at least one key".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Hex SHA-256 of the canonical JSON form of this configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn fingerprint(&self) -> Result<String, Error> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex_digest(&canonical))
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn positive(name: &str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}

fn angle(name: &str, value: f64) -> Result<(), Error> {
    if (0.0..=180.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must be within [0, 180] degrees, got {value}"
        )))
    }
}

fn fraction(name: &str, value: f64) -> Result<(), Error> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}
