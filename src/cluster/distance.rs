//! Pairwise Euclidean distances over a feature matrix.
//!
//! The full `n × n` matrix is computed once per run (rows in parallel) and
//! shared read-only by every parameter candidate and the quality metric.

use rayon::prelude::*;

use crate::error::ClusteringError;
use crate::fusion::FeatureMatrix;
use crate::simd::DistanceKernel;

/// Dense symmetric distance matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f32>,
}

impl DistanceMatrix {
    /// Compute all pairwise distances. Fails on non-finite input.
    pub fn compute(
        matrix: &FeatureMatrix,
        kernel: &dyn DistanceKernel,
    ) -> Result<Self, ClusteringError> {
        matrix.ensure_finite()?;
        let n = matrix.rows();
        let mut data = vec![0.0f32; n * n];
        if n > 0 {
            data.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
                let a = matrix.row(i);
                for (j, d) in row.iter_mut().enumerate() {
                    if i != j {
                        *d = kernel.euclidean(a, matrix.row(j));
                    }
                }
            });
        }
        Ok(Self { n, data })
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the matrix is empty.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Distance between points `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.n + j]
    }

    /// Distances from point `i` to every point.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.n..(i + 1) * self.n]
    }
}
