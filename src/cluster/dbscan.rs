//! DBSCAN over a precomputed distance matrix.
//!
//! Points are visited in row order and cluster ids are assigned in discovery
//! order, so the same matrix and parameters always give the same labels.
//! A point's neighborhood includes the point itself: with `min_neighbors = 3`
//! a point is core when it has at least two other points within `radius`.
//!
//! Border points reachable from several clusters keep the first cluster that
//! reached them. Clusters that end up with fewer than `min_neighbors` members
//! are relabelled as noise and the remaining ids are compacted.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::distance::DistanceMatrix;
use super::{Assignment, Labels};
use crate::error::ClusteringError;
use crate::fusion::FeatureMatrix;
use crate::simd::DistanceKernel;

/// The two DBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DbscanParams {
    /// Neighborhood radius (Euclidean, inclusive).
    pub radius: f64,
    /// Minimum neighborhood size for a core point, the point itself included.
    pub min_neighbors: usize,
}

impl DbscanParams {
    pub fn new(radius: f64, min_neighbors: usize) -> Self {
        Self {
            radius,
            min_neighbors,
        }
    }
}

impl std::fmt::Display for DbscanParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "radius={} min={}", self.radius, self.min_neighbors)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Unvisited,
    Noise,
    Cluster(usize),
}

/// Runs one DBSCAN pass with fixed parameters.
#[derive(Debug, Clone, Copy)]
pub struct ClusterEngine {
    params: DbscanParams,
}

impl ClusterEngine {
    /// Create an engine. Fails on a non-positive or non-finite radius.
    pub fn new(params: DbscanParams) -> Result<Self, ClusteringError> {
        if !params.radius.is_finite() || params.radius <= 0.0 {
            return Err(ClusteringError::InvalidRadius {
                radius: params.radius,
            });
        }
        Ok(Self { params })
    }

    /// The parameters of this engine.
    pub fn params(&self) -> DbscanParams {
        self.params
    }

    /// Cluster the rows of a feature matrix.
    pub fn fit(
        &self,
        matrix: &FeatureMatrix,
        kernel: &dyn DistanceKernel,
    ) -> Result<Labels, ClusteringError> {
        self.check_rows(matrix.rows())?;
        let distances = DistanceMatrix::compute(matrix, kernel)?;
        self.fit_precomputed(&distances)
    }

    /// Cluster points given their pairwise distances.
    pub fn fit_precomputed(&self, distances: &DistanceMatrix) -> Result<Labels, ClusteringError> {
        let n = distances.len();
        self.check_rows(n)?;

        let radius = self.params.radius as f32;
        let min = self.params.min_neighbors;
        let neighbors = |i: usize| -> Vec<usize> {
            distances
                .row(i)
                .iter()
                .enumerate()
                .filter(|&(_, &d)| d <= radius)
                .map(|(j, _)| j)
                .collect()
        };

        let mut state = vec![State::Unvisited; n];
        let mut next_cluster = 0usize;

        for i in 0..n {
            if state[i] != State::Unvisited {
                continue;
            }
            let seeds = neighbors(i);
            if seeds.len() < min {
                state[i] = State::Noise;
                continue;
            }

            let cluster = next_cluster;
            next_cluster += 1;
            state[i] = State::Cluster(cluster);

            let mut queue: VecDeque<usize> = seeds.into();
            while let Some(j) = queue.pop_front() {
                match state[j] {
                    State::Cluster(_) => {}
                    State::Noise => state[j] = State::Cluster(cluster),
                    State::Unvisited => {
                        state[j] = State::Cluster(cluster);
                        let reach = neighbors(j);
                        if reach.len() >= min {
                            queue.extend(reach);
                        }
                    }
                }
            }
        }

        Ok(compact(&state, next_cluster, min))
    }

    fn check_rows(&self, rows: usize) -> Result<(), ClusteringError> {
        if rows < self.params.min_neighbors {
            return Err(ClusteringError::TooFewPoints {
                rows,
                min_neighbors: self.params.min_neighbors,
            });
        }
        Ok(())
    }
}

/// Drop clusters below `min` members to noise and renumber the rest densely.
fn compact(state: &[State], clusters: usize, min: usize) -> Labels {
    let mut sizes = vec![0usize; clusters];
    for s in state {
        if let State::Cluster(c) = s {
            sizes[*c] += 1;
        }
    }

    let mut remap = vec![None; clusters];
    let mut next = 0;
    for (c, &size) in sizes.iter().enumerate() {
        if size >= min {
            remap[c] = Some(next);
            next += 1;
        }
    }

    let assignments = state
        .iter()
        .map(|s| match s {
            State::Cluster(c) => remap[*c].map_or(Assignment::Noise, Assignment::Cluster),
            _ => Assignment::Noise,
        })
        .collect();
    Labels::new(assignments)
}
