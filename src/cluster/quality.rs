//! Internal clustering quality metrics.

use super::distance::DistanceMatrix;
use super::Labels;
use crate::config::QualityMetric;

/// Score an assignment with the given metric. Higher is better.
///
/// Returns `None` when the metric is undefined for this assignment.
pub fn score(metric: QualityMetric, distances: &DistanceMatrix, labels: &Labels) -> Option<f64> {
    match metric {
        QualityMetric::Silhouette => silhouette(distances, labels),
    }
}

/// Mean silhouette coefficient over non-noise points.
///
/// For point `i` in cluster `C`, `a(i)` is the mean distance to the other
/// members of `C` and `b(i)` the smallest mean distance to any other cluster;
/// `s(i) = (b − a) / max(a, b)`, and 0 for a point alone in its cluster.
///
/// Noise points are excluded from both the average and the per-point means.
/// `None` when fewer than two clusters exist.
pub fn silhouette(distances: &DistanceMatrix, labels: &Labels) -> Option<f64> {
    let k = labels.cluster_count();
    if k < 2 {
        return None;
    }
    let assignments = labels.assignments();

    let mut sizes = vec![0usize; k];
    for c in assignments.iter().filter_map(|a| a.cluster()) {
        sizes[c] += 1;
    }

    let mut total = 0.0f64;
    let mut count = 0usize;
    let mut sums = vec![0.0f64; k];

    for (i, a) in assignments.iter().enumerate() {
        let Some(own) = a.cluster() else { continue };
        count += 1;
        if sizes[own] < 2 {
            continue;
        }

        sums.iter_mut().for_each(|s| *s = 0.0);
        for (j, d) in distances.row(i).iter().enumerate() {
            if let Some(c) = assignments[j].cluster() {
                sums[c] += f64::from(*d);
            }
        }

        let a_i = sums[own] / (sizes[own] - 1) as f64;
        let b_i = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a_i.max(b_i);
        if denom > 0.0 && denom.is_finite() {
            total += (b_i - a_i) / denom;
        }
    }

    (count > 0).then(|| total / count as f64)
}
