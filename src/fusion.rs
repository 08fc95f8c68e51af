//! Feature fusion: weighted concatenation of the three sub-vectors.
//!
//! Each sub-vector is scaled by the square root of its weight before
//! concatenation, so squared Euclidean distance in the fused space equals the
//! weighted sum of squared sub-space distances:
//!
//! ```text
//! ‖f(x) − f(y)‖² = w_t‖s_x − s_y‖² + w_e‖e_x − e_y‖² + w_s‖r_x − r_y‖²
//! ```
//!
//! Any distance-based algorithm downstream sees the weighting without having
//! to know about it.

use crate::config::FeatureWeights;
use crate::error::{ClusteringError, ConfigError, FeatureDimensionError, YtcResult};
use crate::features::FeatureDims;

/// All features of one entity for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    /// The entity these features describe.
    pub entity_id: String,
    /// Semantic embedding.
    pub semantic: Vec<f32>,
    /// Normalized engagement statistics.
    pub engagement: Vec<f32>,
    /// Relational (subscription graph) features.
    pub relational: Vec<f32>,
    /// Weighted concatenation of the three.
    pub fused: Vec<f32>,
}

/// Combines sub-vectors under a validated weight triple.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFusion {
    weights: FeatureWeights,
    dims: FeatureDims,
}

impl FeatureFusion {
    /// Create a fusion stage. Fails if the weights are invalid.
    pub fn new(weights: FeatureWeights, dims: FeatureDims) -> Result<Self, ConfigError> {
        weights.validate()?;
        Ok(Self { weights, dims })
    }

    /// Declared sub-vector dimensions.
    pub fn dims(&self) -> FeatureDims {
        self.dims
    }

    /// Fuse per-entity sub-vectors. All four inputs are aligned by index.
    ///
    /// Counts and dimensions are validated for every entity before any fused
    /// vector is produced.
    pub fn fuse(
        &self,
        entity_ids: &[String],
        semantic: Vec<Vec<f32>>,
        engagement: Vec<Vec<f32>>,
        relational: Vec<Vec<f32>>,
    ) -> YtcResult<Vec<FeatureVector>> {
        let n = entity_ids.len();
        for (feature, actual) in [
            ("semantic", semantic.len()),
            ("engagement", engagement.len()),
            ("relational", relational.len()),
        ] {
            if actual != n {
                return Err(FeatureDimensionError::CountMismatch {
                    feature,
                    expected: n,
                    actual,
                }
                .into());
            }
        }

        for (i, id) in entity_ids.iter().enumerate() {
            check_dim("semantic", id, self.dims.text, semantic[i].len())?;
            check_dim("engagement", id, self.dims.engagement, engagement[i].len())?;
            check_dim("relational", id, self.dims.relational, relational[i].len())?;
        }

        let scale_t = self.weights.text.sqrt() as f32;
        let scale_e = self.weights.engagement.sqrt() as f32;
        let scale_s = self.weights.subscription.sqrt() as f32;

        Ok(entity_ids
            .iter()
            .zip(semantic)
            .zip(engagement)
            .zip(relational)
            .map(|(((id, semantic), engagement), relational)| {
                let mut fused = Vec::with_capacity(self.dims.fused());
                fused.extend(semantic.iter().map(|x| x * scale_t));
                fused.extend(engagement.iter().map(|x| x * scale_e));
                fused.extend(relational.iter().map(|x| x * scale_s));
                FeatureVector {
                    entity_id: id.clone(),
                    semantic,
                    engagement,
                    relational,
                    fused,
                }
            })
            .collect())
    }
}

fn check_dim(
    feature: &'static str,
    entity_id: &str,
    expected: usize,
    actual: usize,
) -> Result<(), FeatureDimensionError> {
    if expected != actual {
        return Err(FeatureDimensionError::Mismatch {
            feature,
            entity_id: entity_id.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Row-major matrix of fused vectors, one row per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    ids: Vec<String>,
    data: Vec<f32>,
    dim: usize,
}

impl FeatureMatrix {
    /// Build from explicit rows. Every row must have length `dim`.
    pub fn from_rows(
        ids: Vec<String>,
        rows: &[Vec<f32>],
        dim: usize,
    ) -> Result<Self, FeatureDimensionError> {
        if ids.len() != rows.len() {
            return Err(FeatureDimensionError::CountMismatch {
                feature: "fused",
                expected: ids.len(),
                actual: rows.len(),
            });
        }
        let mut data = Vec::with_capacity(rows.len() * dim);
        for (id, row) in ids.iter().zip(rows) {
            check_dim("fused", id, dim, row.len())?;
            data.extend_from_slice(row);
        }
        Ok(Self { ids, data, dim })
    }

    /// Collect the fused vectors of a run.
    pub fn from_features(vectors: &[FeatureVector], dim: usize) -> Result<Self, FeatureDimensionError> {
        let ids = vectors.iter().map(|v| v.entity_id.clone()).collect();
        let rows: Vec<Vec<f32>> = vectors.iter().map(|v| v.fused.clone()).collect();
        Self::from_rows(ids, &rows, dim)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.ids.len()
    }

    /// Row dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Entity ids, one per row.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// One row.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Fail on the first row holding NaN or infinity.
    pub fn ensure_finite(&self) -> Result<(), ClusteringError> {
        if self.dim == 0 {
            return Ok(());
        }
        match self
            .data
            .chunks(self.dim)
            .position(|row| row.iter().any(|x| !x.is_finite()))
        {
            Some(row) => Err(ClusteringError::NonFinite { row }),
            None => Ok(()),
        }
    }
}
