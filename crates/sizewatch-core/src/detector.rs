//! Regression detection between two artifact sets.

use std::collections::HashMap;

use crate::artifact::{Artifact, BuildArtifactDiff};

/// Find the candidate artifact with the largest size increase over `baseline`.
///
/// Artifacts are matched by `full_path`, using the first baseline entry when a
/// path repeats. A candidate with no baseline counterpart counts its full size
/// as the increase. Ties keep the earliest candidate. Returns `None` when
/// `candidate` is empty.
pub fn find_largest_increase(
    baseline: &[Artifact],
    candidate: &[Artifact],
) -> Option<BuildArtifactDiff> {
    let mut index: HashMap<&str, u64> = HashMap::with_capacity(baseline.len());
    for artifact in baseline {
        index
            .entry(artifact.full_path.as_str())
            .or_insert(artifact.size_bytes);
    }

    let mut largest: Option<(&Artifact, i64)> = None;
    for artifact in candidate {
        let new_size = to_signed(artifact.size_bytes);
        let increase = match index.get(artifact.full_path.as_str()) {
            Some(&old_size) => new_size.saturating_sub(to_signed(old_size)),
            None => new_size,
        };
        let is_larger = match largest {
            Some((_, best)) => increase > best,
            None => true,
        };
        if is_larger {
            largest = Some((artifact, increase));
        }
    }

    largest.map(|(artifact, increase)| BuildArtifactDiff {
        artifact: artifact.clone(),
        increase,
    })
}

fn to_signed(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}
