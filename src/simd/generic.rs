//! Pure-Rust scalar fallback for the dense vector kernels.
//!
//! Works on all platforms and serves as the reference implementation for
//! correctness testing.

use super::{DistanceKernel, IsaLevel};

/// Pure-Rust scalar kernel, no SIMD intrinsics.
#[derive(Debug, Clone, Copy)]
pub struct GenericKernel;

impl DistanceKernel for GenericKernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Generic
    }

    fn squared_euclidean(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b.iter())
            .map(|(&av, &bv)| {
                let d = av - bv;
                d * d
            })
            .sum()
    }

    fn dot(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        a.iter().zip(b.iter()).map(|(&av, &bv)| av * bv).sum()
    }

    fn axpy(&self, alpha: f32, x: &[f32], y: &mut [f32]) {
        debug_assert_eq!(x.len(), y.len());
        for (yv, &xv) in y.iter_mut().zip(x.iter()) {
            *yv += alpha * xv;
        }
    }
}
