//! Reconciliation of two annotation sets for the same image.
//!
//! Pure batch computation: boxes are paired greedily by ascending
//! centroid distance, candidate pairs are accepted or rejected on
//! intersection-over-union, and every discrepancy is classified as a wrong
//! label ("error"), a missing box ("miss") or a superfluous one
//! ("redundant"). Mislabels are expected to sit spatially close to their
//! correct counterpart, so the approximate (not globally optimal) bipartite
//! matching is good enough.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PREFILTER_RATIO;
use crate::model::CharacterAnnotation;

/// Overlap thresholds for accepting a near-pair as a true correspondence.
///
/// Historical call sites applied these inconsistently: one pre-filtered at
/// a fixed 0.20 before the caller's threshold, another applied the caller's
/// threshold directly. Both stay configurable rather than guessing the
/// intent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// A true correspondence must exceed this intersection-over-union.
    pub accept_ratio: f64,
    /// Optional hard floor applied before `accept_ratio`.
    pub prefilter_ratio: Option<f64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            accept_ratio: 0.5,
            prefilter_ratio: Some(DEFAULT_PREFILTER_RATIO),
        }
    }
}

impl MatchConfig {
    /// The configuration used by the cross-validation CLI: caller-supplied
    /// accept ratio over the fixed historical pre-filter.
    pub fn with_accept_ratio(accept_ratio: f64) -> Self {
        Self {
            accept_ratio,
            ..Self::default()
        }
    }
}

/// Discrepancies seen from one side of the comparison.
///
/// `error` and `miss` carry the *other* side's annotations (the value this
/// side should have produced); `redundant` carries this side's own.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SideReport {
    pub error: Vec<CharacterAnnotation>,
    pub miss: Vec<CharacterAnnotation>,
    pub redundant: Vec<CharacterAnnotation>,
}

impl SideReport {
    pub fn is_clean(&self) -> bool {
        self.error.is_empty() && self.miss.is_empty() && self.redundant.is_empty()
    }
}

/// The classified diff of two annotation sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchReport {
    pub left: SideReport,
    pub right: SideReport,
}

/// A candidate correspondence ordered by centroid distance. Ties break on
/// the indices to keep the queue order deterministic; the tie order carries
/// no meaning.
struct DistPair {
    distance: f64,
    i: usize,
    j: usize,
}

impl PartialEq for DistPair {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DistPair {}

impl PartialOrd for DistPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.i.cmp(&other.i))
            .then_with(|| self.j.cmp(&other.j))
    }
}

/// Compare two annotation sets for the same image.
pub fn match_annotations(
    left: &[CharacterAnnotation],
    right: &[CharacterAnnotation],
    config: &MatchConfig,
) -> MatchReport {
    let left_centers: Vec<_> = left.iter().map(|c| c.polygon.center()).collect();
    let right_centers: Vec<_> = right.iter().map(|c| c.polygon.center()).collect();

    let mut queue = BinaryHeap::with_capacity(left.len() * right.len());
    for (i, lc) in left_centers.iter().enumerate() {
        for (j, rc) in right_centers.iter().enumerate() {
            queue.push(Reverse(DistPair {
                distance: lc.manhattan_distance_to(rc),
                i,
                j,
            }));
        }
    }

    // First pass: greedy nearest-centroid claiming, then the IoU gate.
    let mut near_left = vec![false; left.len()];
    let mut near_right = vec![false; right.len()];
    let mut matched_left = vec![false; left.len()];
    let mut matched_right = vec![false; right.len()];
    let mut report = MatchReport::default();

    while let Some(Reverse(pair)) = queue.pop() {
        if near_left[pair.i] || near_right[pair.j] {
            continue;
        }
        near_left[pair.i] = true;
        near_right[pair.j] = true;

        let a = &left[pair.i];
        let b = &right[pair.j];
        let iou = a.polygon.iou(&b.polygon);
        if let Some(prefilter) = config.prefilter_ratio {
            if iou < prefilter {
                continue;
            }
        }
        if iou <= config.accept_ratio {
            continue;
        }
        matched_left[pair.i] = true;
        matched_right[pair.j] = true;
        if a.text != b.text {
            // Each side's error entry carries the other side's value.
            report.left.error.push(b.clone());
            report.right.error.push(a.clone());
        }
    }

    for (i, matched) in matched_left.iter().enumerate() {
        if !matched {
            report.left.redundant.push(left[i].clone());
            report.right.miss.push(left[i].clone());
        }
    }
    for (j, matched) in matched_right.iter().enumerate() {
        if !matched {
            report.right.redundant.push(right[j].clone());
            report.left.miss.push(right[j].clone());
        }
    }

    log::debug!(
        "matched {}/{} left, {}/{} right; {} label errors",
        matched_left.iter().filter(|m| **m).count(),
        left.len(),
        matched_right.iter().filter(|m| **m).count(),
        right.len(),
        report.left.error.len()
    );
    report
}
