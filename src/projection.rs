//! Two-dimensional projection of the fused matrix for visualization.
//!
//! The first two principal components are found by power iteration on the
//! implicit covariance `XᵀX` of the centered matrix, the second orthogonalized
//! against the first. The start vector is drawn from the run seed and the
//! sign of each component is fixed, so projections are reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cluster::{Assignment, Labels};
use crate::fusion::FeatureMatrix;

const MAX_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1e-9;

/// One entity placed in the plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub entity_id: String,
    pub x: f32,
    pub y: f32,
    pub assignment: Assignment,
}

/// Seeded principal-component projection.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    seed: u64,
}

impl Projection {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Project every row to its first two principal coordinates.
    ///
    /// Fewer than two rows, or no variance, places every point at the origin.
    pub fn project(&self, matrix: &FeatureMatrix, labels: &Labels) -> Vec<ProjectedPoint> {
        let n = matrix.rows();
        let dim = matrix.dim();

        let (xs, ys) = if n < 2 || dim == 0 {
            (vec![0.0; n], vec![0.0; n])
        } else {
            let centered = center(matrix);
            let mut rng = StdRng::seed_from_u64(self.seed);
            let first = principal_component(&centered, dim, &[], &mut rng);
            let found: Vec<Vec<f64>> = first.iter().cloned().collect();
            let second = principal_component(&centered, dim, &found, &mut rng);
            (coordinates(&centered, first.as_deref()), coordinates(&centered, second.as_deref()))
        };

        matrix
            .ids()
            .iter()
            .zip(labels.assignments())
            .enumerate()
            .map(|(i, (id, &assignment))| ProjectedPoint {
                entity_id: id.clone(),
                x: xs[i] as f32,
                y: ys[i] as f32,
                assignment,
            })
            .collect()
    }
}

fn center(matrix: &FeatureMatrix) -> Vec<Vec<f64>> {
    let n = matrix.rows() as f64;
    let mut mean = vec![0.0f64; matrix.dim()];
    for i in 0..matrix.rows() {
        for (m, &x) in mean.iter_mut().zip(matrix.row(i)) {
            *m += f64::from(x);
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    (0..matrix.rows())
        .map(|i| {
            matrix
                .row(i)
                .iter()
                .zip(&mean)
                .map(|(&x, m)| f64::from(x) - m)
                .collect()
        })
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    norm
}

fn orthogonalize(v: &mut [f64], against: &[Vec<f64>]) {
    for u in against {
        let p = dot(v, u);
        v.iter_mut().zip(u).for_each(|(x, y)| *x -= p * y);
    }
}

/// `XᵀX v` without forming the covariance matrix.
fn covariance_apply(rows: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; v.len()];
    for row in rows {
        let s = dot(row, v);
        out.iter_mut().zip(row).for_each(|(o, x)| *o += x * s);
    }
    out
}

/// Leading eigenvector orthogonal to `found`, or `None` when no variance remains.
fn principal_component(
    rows: &[Vec<f64>],
    dim: usize,
    found: &[Vec<f64>],
    rng: &mut StdRng,
) -> Option<Vec<f64>> {
    let mut v: Vec<f64> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    orthogonalize(&mut v, found);
    if normalize(&mut v) == 0.0 {
        return None;
    }

    for _ in 0..MAX_ITERATIONS {
        let mut next = covariance_apply(rows, &v);
        orthogonalize(&mut next, found);
        if normalize(&mut next) <= TOLERANCE {
            return None;
        }
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if delta < TOLERANCE {
            break;
        }
    }

    // Largest-magnitude component positive.
    let pivot = v
        .iter()
        .copied()
        .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
    Some(v)
}

fn coordinates(rows: &[Vec<f64>], component: Option<&[f64]>) -> Vec<f64> {
    match component {
        Some(c) => rows.iter().map(|r| dot(r, c)).collect(),
        None => vec![0.0; rows.len()],
    }
}
