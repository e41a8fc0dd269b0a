use std::collections::BTreeSet;

use hashbrown::HashMap;
use log::{info, warn};
use serde::Serialize;

use crate::model::{
    Candidate, CandidateOrigin, CandidateStatus, MatchScore, RejectReason, SourceWay,
};

/// Identifier lists that force source ways in or out of the match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualOverrides {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl ManualOverrides {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Ids listed for both inclusion and exclusion
    pub fn ambiguous(&self) -> Vec<String> {
        self.include.intersection(&self.exclude).cloned().collect()
    }
}

/// What applying the overrides changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverrideOutcome {
    /// Ways re-accepted or injected by an include
    pub included: Vec<String>,
    /// Ways whose candidates were rejected by an exclude
    pub excluded: Vec<String>,
    /// Ids in both lists; exclusion won
    pub ambiguous: Vec<String>,
    /// Listed ids that match no loaded way
    pub unknown: Vec<String>,
}

/// Applies forced includes and excludes on top of the automatic candidates.
///
/// Excluded ways lose all accepted candidates. An included way without an
/// accepted candidate gets its geometric candidates re-accepted; if it has
/// none, a synthetic candidate with [`MatchScore::Manual`] is added. An id in
/// both lists is treated as excluded and reported as ambiguous.
pub fn apply_overrides(
    ways: &[SourceWay],
    candidates: &mut Vec<Candidate>,
    overrides: &ManualOverrides,
) -> OverrideOutcome {
    let mut outcome = OverrideOutcome {
        ambiguous: overrides.ambiguous(),
        ..OverrideOutcome::default()
    };
    for id in &outcome.ambiguous {
        warn!("Way {id} is listed for both inclusion and exclusion, excluding it");
    }

    let by_id: HashMap<&str, usize> = ways
        .iter()
        .enumerate()
        .map(|(idx, way)| (way.id.as_str(), idx))
        .collect();

    for id in overrides.include.union(&overrides.exclude) {
        if !by_id.contains_key(id.as_str()) {
            warn!("Manual override references unknown way {id}");
            outcome.unknown.push(id.clone());
        }
    }

    for id in overrides.include.difference(&overrides.exclude) {
        let Some(&way_idx) = by_id.get(id.as_str()) else {
            continue;
        };
        if candidates
            .iter()
            .any(|c| c.way == way_idx && c.is_accepted())
        {
            continue;
        }

        let mut reaccepted = false;
        for candidate in candidates.iter_mut().filter(|c| c.way == way_idx) {
            candidate.status = CandidateStatus::Accepted;
            candidate.origin = CandidateOrigin::Manual;
            reaccepted = true;
        }
        if !reaccepted {
            candidates.push(Candidate {
                way: way_idx,
                way_id: id.clone(),
                edge: None,
                edge_id: None,
                score: MatchScore::Manual,
                origin: CandidateOrigin::Manual,
                status: CandidateStatus::Accepted,
            });
        }
        outcome.included.push(id.clone());
    }

    for id in &overrides.exclude {
        let Some(&way_idx) = by_id.get(id.as_str()) else {
            continue;
        };
        let mut touched = false;
        for candidate in candidates
            .iter_mut()
            .filter(|c| c.way == way_idx && c.is_accepted())
        {
            candidate.reject(RejectReason::ManualExclude);
            touched = true;
        }
        if touched {
            outcome.excluded.push(id.clone());
        }
    }

    candidates.sort_by(|a, b| a.way.cmp(&b.way).then_with(|| a.edge.cmp(&b.edge)));

    info!(
        "Manual overrides: {} included, {} excluded, {} ambiguous, {} unknown",
        outcome.included.len(),
        outcome.excluded.len(),
        outcome.ambiguous.len(),
        outcome.unknown.len()
    );
    outcome
}
