//! Density-based clustering over the fused feature space.
//!
//! - [`distance`]: pairwise distance matrix shared by every candidate
//! - [`dbscan`]: the [`ClusterEngine`](dbscan::ClusterEngine), one DBSCAN pass
//! - [`quality`]: internal quality metrics (silhouette)
//! - [`search`]: grid search over DBSCAN parameters

pub mod dbscan;
pub mod distance;
pub mod quality;
pub mod search;

use serde::{Deserialize, Serialize};

/// Label given to one entity by a clustering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assignment {
    /// Member of the cluster with this id.
    Cluster(usize),
    /// Not dense enough to belong to any cluster.
    Noise,
}

impl Assignment {
    /// The cluster id, or `None` for noise.
    pub fn cluster(self) -> Option<usize> {
        match self {
            Assignment::Cluster(id) => Some(id),
            Assignment::Noise => None,
        }
    }

    /// Whether this is the noise label.
    pub fn is_noise(self) -> bool {
        matches!(self, Assignment::Noise)
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assignment::Cluster(id) => write!(f, "cluster {id}"),
            Assignment::Noise => write!(f, "noise"),
        }
    }
}

/// One assignment per matrix row, with cluster ids dense in `0..cluster_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    assignments: Vec<Assignment>,
    cluster_count: usize,
}

impl Labels {
    /// Wrap assignments whose cluster ids are already dense.
    pub fn new(assignments: Vec<Assignment>) -> Self {
        let cluster_count = assignments
            .iter()
            .filter_map(|a| a.cluster())
            .max()
            .map_or(0, |m| m + 1);
        Self {
            assignments,
            cluster_count,
        }
    }

    /// Assignments in row order.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Number of clusters.
    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Number of noise rows.
    pub fn noise_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_noise()).count()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Row indices of each cluster, indexed by cluster id.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.cluster_count];
        for (row, a) in self.assignments.iter().enumerate() {
            if let Some(c) = a.cluster() {
                members[c].push(row);
            }
        }
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_count_clusters_and_noise() {
        let labels = Labels::new(vec![
            Assignment::Cluster(0),
            Assignment::Noise,
            Assignment::Cluster(1),
            Assignment::Cluster(0),
        ]);
        assert_eq!(labels.cluster_count(), 2);
        assert_eq!(labels.noise_count(), 1);
        assert_eq!(labels.members(), vec![vec![0, 3], vec![2]]);
    }

    #[test]
    fn all_noise_has_no_clusters() {
        let labels = Labels::new(vec![Assignment::Noise; 3]);
        assert_eq!(labels.cluster_count(), 0);
        assert!(labels.members().is_empty());
    }

    #[test]
    fn assignment_serializes_readably() {
        assert_eq!(
            serde_json::to_string(&Assignment::Cluster(2)).unwrap(),
            r#"{"cluster":2}"#
        );
        assert_eq!(serde_json::to_string(&Assignment::Noise).unwrap(), r#""noise""#);
    }
}
