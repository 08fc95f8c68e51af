//! Per-entity feature builders.
//!
//! Three independent sources feed the fused feature space:
//!
//! - [`text`]: semantic embedding of title, description and topics
//! - [`engagement`]: log-compressed, batch-normalized channel statistics
//! - [`graph`]: relational position in the subscription graph
//!
//! Every builder emits fixed-dimension vectors for a run; [`FeatureDims`]
//! records the declared sizes that fusion validates against.

pub mod engagement;
pub mod graph;
pub mod text;

/// Declared sub-vector dimensions for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDims {
    /// Semantic embedding dimension.
    pub text: usize,
    /// Engagement vector dimension.
    pub engagement: usize,
    /// Relational vector dimension.
    pub relational: usize,
}

impl FeatureDims {
    /// Dimension of the fused (concatenated) vector.
    pub fn fused(&self) -> usize {
        self.text + self.engagement + self.relational
    }
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left unchanged.
pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
