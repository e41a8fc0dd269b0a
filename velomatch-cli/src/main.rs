//! Command line front end: reads GeoJSON sources and targets, runs the
//! matching pipeline and writes the results into an output directory.

mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use velomatch::io::{self, SourceFields};
use velomatch_core::model::{SourceKind, SourceWay};
use velomatch_core::pipeline::{MemoryCache, Pipeline, PipelineOutput};

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target network edges (GeoJSON LineStrings)
    #[arg(long)]
    targets: PathBuf,

    /// Dedicated cycling infrastructure
    #[arg(long)]
    bikelanes: Option<PathBuf>,

    /// Streets with roadside cycling attributes
    #[arg(long)]
    streets: Option<PathBuf>,

    /// Shared and unpaved paths
    #[arg(long)]
    paths: Option<PathBuf>,

    /// Way ids to force-include, one per line
    #[arg(long)]
    include: Option<PathBuf>,

    /// Way ids to force-exclude, one per line
    #[arg(long)]
    exclude: Option<PathBuf>,

    /// Directory receiving all outputs
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    segment_length: Option<f64>,

    #[arg(long)]
    buffer: Option<f64>,

    #[arg(long)]
    min_merge_length: Option<f64>,

    #[arg(long)]
    max_merge_length: Option<f64>,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    skip_coverage: bool,

    #[arg(long)]
    skip_orthogonal: bool,

    #[arg(long)]
    skip_overrides: bool,

    #[arg(long)]
    skip_layering: bool,

    #[arg(long)]
    skip_layers: bool,

    #[arg(long)]
    skip_summaries: bool,

    /// Also write the per-segment snapping result
    #[arg(long)]
    write_segments: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// More output per occurrence (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn config(&self) -> Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => CliConfig::load(path)?,
            None => CliConfig::default(),
        };
        let pipeline = &mut config.pipeline;
        if let Some(length) = self.segment_length {
            pipeline.segment_length = length;
        }
        if let Some(buffer) = self.buffer {
            pipeline.buffer_distance = buffer;
        }
        if let Some(length) = self.min_merge_length {
            pipeline.min_merge_length = length;
        }
        if self.max_merge_length.is_some() {
            pipeline.max_merge_length = self.max_merge_length;
        }
        if self.threads.is_some() {
            pipeline.threads = self.threads;
        }
        let stages = &mut pipeline.stages;
        stages.coverage_filter &= !self.skip_coverage;
        stages.orthogonal_filter &= !self.skip_orthogonal;
        stages.manual_overrides &= !self.skip_overrides;
        stages.layering &= !self.skip_layering;
        stages.direction_layers &= !self.skip_layers;
        stages.edge_summaries &= !self.skip_summaries;
        Ok(config)
    }

    fn sources(&self) -> impl Iterator<Item = (SourceKind, &Path)> {
        [
            (SourceKind::Bikelane, self.bikelanes.as_deref()),
            (SourceKind::Street, self.streets.as_deref()),
            (SourceKind::Path, self.paths.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, path)| path.map(|path| (kind, path)))
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn read_sources(args: &Args, fields: &SourceFields) -> Result<Vec<SourceWay>> {
    let mut ways = Vec::new();
    for (kind, path) in args.sources() {
        let mut batch = io::read_source_ways(path, kind, fields)
            .with_context(|| format!("reading {kind} ways from {}", path.display()))?;
        info!("{} {kind} ways from {}", batch.len(), path.display());
        ways.append(&mut batch);
    }
    Ok(ways)
}

fn write_outputs(dir: &Path, output: &PipelineOutput, write_segments: bool) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    io::write_feature_collection(
        &dir.join("aggregated.geojson"),
        &io::aggregated_to_geojson(&output.aggregated)?,
    )?;
    if !output.layers.is_empty() {
        io::write_feature_collection(
            &dir.join("hinrichtung.geojson"),
            &io::layer_to_geojson(&output.layers.forward)?,
        )?;
        io::write_feature_collection(
            &dir.join("gegenrichtung.geojson"),
            &io::layer_to_geojson(&output.layers.backward)?,
        )?;
    }
    if !output.summaries.is_empty() {
        io::write_feature_collection(
            &dir.join("summaries.geojson"),
            &io::summaries_to_geojson(&output.summaries)?,
        )?;
    }
    if write_segments {
        io::write_feature_collection(
            &dir.join("segments.geojson"),
            &io::segments_to_geojson(&output.segments)?,
        )?;
    }
    io::write_candidates_file(&dir.join("candidates.csv"), &output.candidates, &output.ways)?;
    io::write_report(&dir.join("report.json"), &output.report)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.config()?;
    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }
    if args.sources().next().is_none() {
        bail!("no source data given, pass at least one of --bikelanes, --streets or --paths");
    }

    let edges = io::read_target_edges(&args.targets, &config.target_fields)
        .with_context(|| format!("reading targets from {}", args.targets.display()))?;
    let ways = read_sources(&args, &config.source_fields)?;
    let overrides = io::read_overrides(args.include.as_deref(), args.exclude.as_deref())
        .context("reading manual overrides")?;

    let cache = MemoryCache::new();
    let pipeline = Pipeline::new(config.pipeline)
        .context("invalid pipeline configuration")?
        .with_cache(&cache);
    let output = pipeline.run(ways, edges, &overrides)?;

    let report = &output.report;
    if !report.unknown_overrides.is_empty() {
        warn!(
            "{} override ids matched no source way",
            report.unknown_overrides.len()
        );
    }
    info!(
        "{} of {} edges attributed, {:.1}% of the segmented length",
        report.edges - report.unmatched_edges.len(),
        report.edges,
        report.attributed_fraction() * 100.0
    );

    write_outputs(&args.output, &output, args.write_segments)?;
    info!("Results written to {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_config() {
        let args = Args::parse_from([
            "velomatch",
            "--targets",
            "t.geojson",
            "--bikelanes",
            "b.geojson",
            "--segment-length",
            "2.5",
            "--max-merge-length",
            "400",
            "--skip-orthogonal",
            "--skip-summaries",
            "-vv",
        ]);
        let config = args.config().unwrap();

        assert!((config.pipeline.segment_length - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.max_merge_length, Some(400.0));
        assert!(!config.pipeline.stages.orthogonal_filter);
        assert!(!config.pipeline.stages.edge_summaries);
        assert!(config.pipeline.stages.coverage_filter);
        assert_eq!(args.verbose, 2);

        let sources: Vec<_> = args.sources().map(|(kind, _)| kind).collect();
        assert_eq!(sources, vec![SourceKind::Bikelane]);
    }

    #[test]
    fn sources_keep_dataset_order() {
        let args = Args::parse_from([
            "velomatch",
            "--targets",
            "t.geojson",
            "--paths",
            "p.geojson",
            "--bikelanes",
            "b.geojson",
        ]);
        let sources: Vec<_> = args.sources().map(|(kind, _)| kind).collect();
        assert_eq!(sources, vec![SourceKind::Bikelane, SourceKind::Path]);
    }
}
