//! Manual include and exclude lists.
//!
//! One way id per line. Everything after `#` is a comment, blank lines are
//! ignored, and a line holding more than one token is skipped with a warning.

use std::fs;
use std::path::Path;

use log::{info, warn};
use velomatch_core::matching::ManualOverrides;

use crate::Error;

pub fn parse_id_list(text: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        if content.split_whitespace().count() > 1 || content.contains([',', ';']) {
            warn!("Ignoring malformed id on line {}: '{content}'", line_no + 1);
            continue;
        }
        ids.push(content.to_string());
    }
    ids
}

/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_id_list(path: &Path) -> Result<Vec<String>, Error> {
    let ids = parse_id_list(&fs::read_to_string(path)?);
    info!("Read {} ids from {}", ids.len(), path.display());
    Ok(ids)
}

/// Builds the overrides from optional include and exclude files.
///
/// # Errors
///
/// Returns an error if a given file cannot be read.
pub fn read_overrides(
    include: Option<&Path>,
    exclude: Option<&Path>,
) -> Result<ManualOverrides, Error> {
    let include = include.map(read_id_list).transpose()?.unwrap_or_default();
    let exclude = exclude.map(read_id_list).transpose()?.unwrap_or_default();
    Ok(ManualOverrides::new(include, exclude))
}
