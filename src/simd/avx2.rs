//! AVX2 (256-bit) SIMD kernel for x86_64 dense vector operations.
//!
//! Falls through to scalar code for tail elements that don't fill
//! a full 256-bit (8 × f32) register.

use super::{DistanceKernel, IsaLevel};

/// AVX2-accelerated kernel.
#[derive(Debug, Clone, Copy)]
pub struct Avx2Kernel;

#[cfg(target_arch = "x86_64")]
impl DistanceKernel for Avx2Kernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Avx2
    }

    fn squared_euclidean(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());

        if is_x86_feature_detected!("avx2") {
            // Safety: we've confirmed AVX2 support at runtime.
            unsafe { self.squared_euclidean_avx2(a, b) }
        } else {
            super::generic::GenericKernel.squared_euclidean(a, b)
        }
    }

    fn dot(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());

        if is_x86_feature_detected!("avx2") {
            unsafe { self.dot_avx2(a, b) }
        } else {
            super::generic::GenericKernel.dot(a, b)
        }
    }

    fn axpy(&self, alpha: f32, x: &[f32], y: &mut [f32]) {
        debug_assert_eq!(x.len(), y.len());

        if is_x86_feature_detected!("avx2") {
            unsafe { self.axpy_avx2(alpha, x, y) }
        } else {
            super::generic::GenericKernel.axpy(alpha, x, y);
        }
    }
}

#[cfg(target_arch = "x86_64")]
impl Avx2Kernel {
    #[target_feature(enable = "avx2")]
    unsafe fn squared_euclidean_avx2(&self, a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let len = a.len();
        let chunks = len / 8;
        let mut lanes = [0f32; 8];

        unsafe {
            let mut acc = _mm256_setzero_ps();
            for i in 0..chunks {
                let offset = i * 8;
                let va = _mm256_loadu_ps(a.as_ptr().add(offset));
                let vb = _mm256_loadu_ps(b.as_ptr().add(offset));
                let diff = _mm256_sub_ps(va, vb);
                acc = _mm256_add_ps(acc, _mm256_mul_ps(diff, diff));
            }
            _mm256_storeu_ps(lanes.as_mut_ptr(), acc);
        }

        // Scalar tail
        let mut sum: f32 = lanes.iter().sum();
        for i in chunks * 8..len {
            let d = a[i] - b[i];
            sum += d * d;
        }
        sum
    }

    #[target_feature(enable = "avx2")]
    unsafe fn dot_avx2(&self, a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let len = a.len();
        let chunks = len / 8;
        let mut lanes = [0f32; 8];

        unsafe {
            let mut acc = _mm256_setzero_ps();
            for i in 0..chunks {
                let offset = i * 8;
                let va = _mm256_loadu_ps(a.as_ptr().add(offset));
                let vb = _mm256_loadu_ps(b.as_ptr().add(offset));
                acc = _mm256_add_ps(acc, _mm256_mul_ps(va, vb));
            }
            _mm256_storeu_ps(lanes.as_mut_ptr(), acc);
        }

        let mut sum: f32 = lanes.iter().sum();
        for i in chunks * 8..len {
            sum += a[i] * b[i];
        }
        sum
    }

    #[target_feature(enable = "avx2")]
    unsafe fn axpy_avx2(&self, alpha: f32, x: &[f32], y: &mut [f32]) {
        use std::arch::x86_64::*;

        let len = x.len();
        let chunks = len / 8;

        unsafe {
            let va = _mm256_set1_ps(alpha);
            for i in 0..chunks {
                let offset = i * 8;
                let vx = _mm256_loadu_ps(x.as_ptr().add(offset));
                let vy = _mm256_loadu_ps(y.as_ptr().add(offset));
                let result = _mm256_add_ps(vy, _mm256_mul_ps(va, vx));
                _mm256_storeu_ps(y.as_mut_ptr().add(offset), result);
            }
        }

        for i in chunks * 8..len {
            y[i] += alpha * x[i];
        }
    }
}
