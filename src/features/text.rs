//! Semantic text features.
//!
//! The embedding model sits behind the [`TextEmbedder`] trait and is shared
//! read-only across worker threads. The built-in [`HashingEmbedder`] maps
//! text into a fixed-size space using deterministic seeded random token
//! vectors: each token gets a bipolar (±1) vector derived from its hash, and
//! a text is the term-frequency weighted superposition of its tokens. Texts
//! sharing vocabulary land close together; the same text always maps to the
//! same vector for a given seed.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::entity::EntityRecord;
use crate::error::{EmbeddingError, FeatureDimensionError, YtcResult};
use crate::simd::{self, DistanceKernel};

use super::l2_normalize;

/// Weight of an adjacent-word bigram relative to a single word.
const BIGRAM_WEIGHT: f32 = 0.5;

static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
    "it", "its", "of", "on", "or", "our", "that", "the", "this", "to", "was", "we", "were",
    "will", "with", "you", "your", "my", "me", "i",
];

/// A text embedding model.
///
/// Implementations must be deterministic: the same text yields the same
/// vector for the lifetime of the model.
pub trait TextEmbedder: Send + Sync {
    /// Output dimension.
    fn dimension(&self) -> usize;

    /// Embed one text. Empty text must map to the zero vector; non-empty text
    /// the model cannot process is an error.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Feature-hashing embedder built from seeded bipolar token vectors.
pub struct HashingEmbedder {
    dim: usize,
    seed: u64,
    kernel: Box<dyn DistanceKernel>,
}

impl HashingEmbedder {
    /// Create an embedder producing `dim`-dimensional vectors.
    pub fn new(dim: usize, seed: u64) -> Self {
        Self {
            dim,
            seed,
            kernel: simd::best_kernel(),
        }
    }

    /// Deterministic bipolar vector for a token, scaled to unit norm.
    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let mut rng = rand::rngs::StdRng::seed_from_u64(hasher.finish() ^ self.seed);

        let mut bits = vec![0u8; self.dim.div_ceil(8)];
        rng.fill_bytes(&mut bits);

        let scale = 1.0 / (self.dim as f32).sqrt();
        (0..self.dim)
            .map(|i| {
                if (bits[i / 8] >> (i % 8)) & 1 == 1 {
                    scale
                } else {
                    -scale
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for HashingEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingEmbedder")
            .field("dim", &self.dim)
            .field("seed", &self.seed)
            .field("isa", &self.kernel.isa_level())
            .finish()
    }
}

impl TextEmbedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(vec![0.0; self.dim]);
        }

        let normalized: String = trimmed.nfkc().flat_map(char::to_lowercase).collect();
        let terms = weighted_terms(&normalized);
        if terms.is_empty() {
            return Err(EmbeddingError::NoEncodableContent {
                preview: preview(trimmed),
            });
        }

        let mut acc = vec![0.0f32; self.dim];
        for (term, weight) in &terms {
            self.kernel.axpy(*weight, &self.token_vector(term), &mut acc);
        }

        let norm = self.kernel.norm(&acc);
        if !norm.is_finite() {
            return Err(EmbeddingError::NonFinite {
                preview: preview(trimmed),
            });
        }
        if norm == 0.0 {
            return Err(EmbeddingError::Model {
                message: format!("token vectors cancelled out for {:?}", preview(trimmed)),
            });
        }
        l2_normalize(&mut acc);
        Ok(acc)
    }
}

/// Split normalized text into terms with sublinear term-frequency weights.
///
/// Words (minus stop-words) and adjacent-word bigrams are used; text without
/// any word falls back to character trigrams. A `BTreeMap` keeps the
/// accumulation order fixed.
fn weighted_terms(normalized: &str) -> BTreeMap<String, f32> {
    let words: Vec<&str> = RE_WORD
        .find_iter(normalized)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();

    let mut counts: BTreeMap<String, (u32, f32)> = BTreeMap::new();
    if words.is_empty() {
        let chars: Vec<char> = normalized
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .collect();
        if chars.len() < 3 {
            if !chars.is_empty() {
                counts.insert(chars.iter().collect(), (1, 1.0));
            }
        } else {
            for gram in chars.windows(3) {
                counts.entry(gram.iter().collect()).or_insert((0, 1.0)).0 += 1;
            }
        }
    } else {
        for w in &words {
            counts.entry((*w).to_string()).or_insert((0, 1.0)).0 += 1;
        }
        for pair in words.windows(2) {
            counts
                .entry(format!("{} {}", pair[0], pair[1]))
                .or_insert((0, BIGRAM_WEIGHT))
                .0 += 1;
        }
    }

    counts
        .into_iter()
        .map(|(term, (tf, base))| (term, base * (1.0 + (tf as f32).ln())))
        .collect()
}

fn preview(text: &str) -> String {
    text.chars().take(40).collect()
}

/// Builds the semantic sub-vector for every entity of a batch.
#[derive(Clone)]
pub struct TextFeatureBuilder {
    embedder: Arc<dyn TextEmbedder>,
}

impl TextFeatureBuilder {
    /// Wrap a shared embedding model.
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { embedder }
    }

    /// Builder backed by a [`HashingEmbedder`].
    pub fn hashing(dim: usize, seed: u64) -> Self {
        Self::new(Arc::new(HashingEmbedder::new(dim, seed)))
    }

    /// Output dimension of the underlying model.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Embed one text and check the output dimension.
    pub fn embed(&self, entity_id: &str, text: &str) -> YtcResult<Vec<f32>> {
        let vector = self.embedder.embed(text)?;
        if vector.len() != self.dimension() {
            return Err(FeatureDimensionError::Mismatch {
                feature: "semantic",
                entity_id: entity_id.to_string(),
                expected: self.dimension(),
                actual: vector.len(),
            }
            .into());
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(EmbeddingError::NonFinite {
                preview: preview(text),
            }
            .into());
        }
        Ok(vector)
    }

    /// Embed every entity's prepared text in parallel, preserving order.
    ///
    /// Any single failure aborts the whole batch.
    pub fn build(&self, entities: &[EntityRecord]) -> YtcResult<Vec<Vec<f32>>> {
        entities
            .par_iter()
            .map(|e| self.embed(&e.id, &e.prepared_text()))
            .collect()
    }
}

impl std::fmt::Debug for TextFeatureBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextFeatureBuilder")
            .field("dim", &self.dimension())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::YtcError;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn deterministic_embedding() {
        let e = HashingEmbedder::new(128, 42);
        let v1 = e.embed("Minecraft speedruns and gaming news").unwrap();
        let v2 = e.embed("Minecraft speedruns and gaming news").unwrap();
        assert_eq!(v1, v2);
        assert_eq!(v1.len(), 128);
    }

    #[test]
    fn output_has_unit_norm() {
        let e = HashingEmbedder::new(256, 1);
        let v = e.embed("Jazz piano lessons").unwrap();
        let norm = cosine(&v, &v).sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm={norm}");
    }

    #[test]
    fn empty_text_maps_to_zero_vector() {
        let e = HashingEmbedder::new(64, 0);
        assert!(e.embed("").unwrap().iter().all(|&x| x == 0.0));
        assert!(e.embed("   \n").unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn control_only_text_is_an_error() {
        let e = HashingEmbedder::new(64, 0);
        let err = e.embed("\u{7}\u{1b}").unwrap_err();
        assert!(matches!(err, EmbeddingError::NoEncodableContent { .. }));
    }

    #[test]
    fn punctuation_only_text_still_embeds() {
        let e = HashingEmbedder::new(64, 0);
        let v = e.embed("!!! ???").unwrap();
        assert!(v.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn shared_vocabulary_is_closer() {
        let e = HashingEmbedder::new(384, 42);
        let cooking_a = e.embed("easy cooking recipes baking bread").unwrap();
        let cooking_b = e.embed("cooking recipes for baking cakes").unwrap();
        let gaming = e.embed("minecraft survival gameplay walkthrough").unwrap();
        assert!(cosine(&cooking_a, &cooking_b) > cosine(&cooking_a, &gaming));
    }

    #[test]
    fn case_and_width_normalized() {
        let e = HashingEmbedder::new(64, 3);
        let a = e.embed("ＧＡＭＩＮＧ News").unwrap();
        let b = e.embed("gaming news").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seed_changes_embedding() {
        let a = HashingEmbedder::new(64, 1).embed("science").unwrap();
        let b = HashingEmbedder::new(64, 2).embed("science").unwrap();
        assert_ne!(a, b);
    }

    struct ShortModel;

    impl TextEmbedder for ShortModel {
        fn dimension(&self) -> usize {
            8
        }
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![0.0; 4])
        }
    }

    #[test]
    fn wrong_model_dimension_is_a_dimension_error() {
        let builder = TextFeatureBuilder::new(Arc::new(ShortModel));
        let err = builder.embed("UC1", "hello").unwrap_err();
        assert!(matches!(
            err,
            YtcError::FeatureDimension(FeatureDimensionError::Mismatch {
                expected: 8,
                actual: 4,
                ..
            })
        ));
    }
}
