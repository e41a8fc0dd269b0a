//! Audit outputs: the candidate table and the completeness report

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use log::info;
use serde::Serialize;
use velomatch_core::model::{Candidate, CandidateOrigin, CandidateStatus, MatchScore, SourceWay};
use velomatch_core::pipeline::CompletenessReport;
use wkt::ToWkt;

use crate::Error;

#[derive(Debug, Serialize)]
struct CandidateRow<'a> {
    way_id: &'a str,
    dataset: &'a str,
    edge_id: Option<&'a str>,
    status: &'static str,
    reason: Option<String>,
    origin: &'static str,
    mean_distance: Option<f64>,
    angle_diff: Option<f64>,
    wkt: String,
}

/// Writes one CSV row per candidate, with the source way geometry as WKT.
///
/// `ways` is the list the candidate indices refer to.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_candidates_csv<W: Write>(
    writer: W,
    candidates: &[Candidate],
    ways: &[SourceWay],
) -> Result<(), Error> {
    let mut csv = csv::Writer::from_writer(writer);
    for candidate in candidates {
        let way = ways.get(candidate.way).ok_or_else(|| {
            Error::InvalidInput(format!(
                "candidate {} refers to way index {} of {}",
                candidate.way_id,
                candidate.way,
                ways.len()
            ))
        })?;
        let (mean_distance, angle_diff) = match candidate.score {
            MatchScore::Geometric {
                mean_distance,
                angle_diff,
            } => (Some(mean_distance), Some(angle_diff)),
            MatchScore::Manual => (None, None),
        };
        let (status, reason) = match candidate.status {
            CandidateStatus::Accepted => ("accepted", None),
            CandidateStatus::Rejected(reason) => ("rejected", Some(reason.to_string())),
        };
        csv.serialize(CandidateRow {
            way_id: &candidate.way_id,
            dataset: way.kind.as_str(),
            edge_id: candidate.edge_id.as_deref(),
            status,
            reason,
            origin: match candidate.origin {
                CandidateOrigin::Geometric => "geometric",
                CandidateOrigin::Manual => "manual",
            },
            mean_distance,
            angle_diff,
            wkt: way.geometry().to_wkt().to_string(),
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_candidates_file(
    path: &Path,
    candidates: &[Candidate],
    ways: &[SourceWay],
) -> Result<(), Error> {
    write_candidates_csv(File::create(path)?, candidates, ways)?;
    info!("Wrote {} candidates to {}", candidates.len(), path.display());
    Ok(())
}

/// Writes the completeness report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_report(path: &Path, report: &CompletenessReport) -> Result<(), Error> {
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    info!("Wrote completeness report to {}", path.display());
    Ok(())
}

/// Reads a report written by [`write_report`] as untyped JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_report(path: &Path) -> Result<serde_json::Value, Error> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}
