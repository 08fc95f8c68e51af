//! SIMD-accelerated kernels for dense feature vectors.
//!
//! This module provides a `DistanceKernel` trait with CPU-specific implementations.
//! At runtime, [`detect_isa`] determines the best available instruction set and
//! [`best_kernel`] returns the fastest implementation for the current CPU.
//!
//! # Supported ISA levels
//!
//! - **Generic**: Pure-Rust scalar fallback, works everywhere
//! - **AVX2**: 256-bit SIMD for x86_64 systems with AVX2 support

pub mod avx2;
pub mod generic;

/// Instruction set architecture level detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IsaLevel {
    /// Pure-Rust scalar operations, no SIMD.
    Generic,
    /// x86_64 AVX2 (256-bit vectors).
    Avx2,
}

impl std::fmt::Display for IsaLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsaLevel::Generic => write!(f, "Generic (scalar)"),
            IsaLevel::Avx2 => write!(f, "AVX2 (256-bit)"),
        }
    }
}

/// Detect the best ISA level available on the current CPU.
pub fn detect_isa() -> IsaLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return IsaLevel::Avx2;
        }
    }
    IsaLevel::Generic
}

/// Trait for SIMD-accelerated dense vector kernels.
///
/// Slices passed to one call must have equal length.
pub trait DistanceKernel: Send + Sync {
    /// The ISA level this kernel targets.
    fn isa_level(&self) -> IsaLevel;

    /// Squared Euclidean distance `Σ (a_i - b_i)²`.
    fn squared_euclidean(&self, a: &[f32], b: &[f32]) -> f32;

    /// Dot product `Σ a_i · b_i`.
    fn dot(&self, a: &[f32], b: &[f32]) -> f32;

    /// In-place `y += alpha · x`.
    fn axpy(&self, alpha: f32, x: &[f32], y: &mut [f32]);

    /// Euclidean distance.
    fn euclidean(&self, a: &[f32], b: &[f32]) -> f32 {
        self.squared_euclidean(a, b).sqrt()
    }

    /// L2 norm.
    fn norm(&self, a: &[f32]) -> f32 {
        self.dot(a, a).sqrt()
    }
}

/// Return the best available kernel for the current CPU.
pub fn best_kernel() -> Box<dyn DistanceKernel> {
    match detect_isa() {
        #[cfg(target_arch = "x86_64")]
        IsaLevel::Avx2 => Box::new(avx2::Avx2Kernel),
        _ => Box::new(generic::GenericKernel),
    }
}
