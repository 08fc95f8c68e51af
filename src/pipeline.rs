//! End-to-end clustering run.
//!
//! A run has two phases. Phase 1 builds the three feature sources
//! concurrently and fuses them. Phase 2 searches DBSCAN parameters over one
//! shared distance matrix, clusters with the winner, then summarizes and
//! projects the result into an immutable [`ClusteringRun`].
//!
//! Entities are processed in id order, so the result does not depend on the
//! order records arrive in.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::cluster::dbscan::{ClusterEngine, DbscanParams};
use crate::cluster::distance::DistanceMatrix;
use crate::cluster::search::{CandidateReport, ParameterSearch};
use crate::cluster::Assignment;
use crate::config::ClusteringConfig;
use crate::entity::{ensure_unique_ids, Edge, EntityRecord};
use crate::error::{ConfigError, FeatureDimensionError, InsufficientDataError, YtcResult};
use crate::export::{ClusterRecord, RunRecord};
use crate::features::engagement::{EngagementFeatureBuilder, ENGAGEMENT_DIM};
use crate::features::graph::GraphFeatureBuilder;
use crate::features::text::{TextEmbedder, TextFeatureBuilder};
use crate::features::FeatureDims;
use crate::fusion::{FeatureFusion, FeatureMatrix, FeatureVector};
use crate::projection::{ProjectedPoint, Projection};
use crate::simd::{self, DistanceKernel};
use crate::summarize::{Cluster, ClusterSummarizer};

/// Result of a completed run. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct ClusteringRun {
    pub config: ClusteringConfig,
    pub dims: FeatureDims,
    /// Entity ids in processing (sorted) order.
    pub entity_ids: Vec<String>,
    /// One assignment per entity, aligned with `entity_ids`.
    pub assignments: Vec<Assignment>,
    pub clusters: Vec<Cluster>,
    /// Noise entity ids, sorted.
    pub noise: Vec<String>,
    pub params: DbscanParams,
    pub quality_score: Option<f64>,
    pub low_confidence: bool,
    pub candidates: Vec<CandidateReport>,
    pub projection: Vec<ProjectedPoint>,
    pub created_at: DateTime<Utc>,
}

impl ClusteringRun {
    /// The assignment of one entity.
    pub fn assignment(&self, entity_id: &str) -> Option<Assignment> {
        self.entity_ids
            .binary_search_by(|id| id.as_str().cmp(entity_id))
            .ok()
            .map(|i| self.assignments[i])
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Export form of this run.
    pub fn to_record(&self) -> RunRecord {
        RunRecord {
            created_at: self.created_at,
            config: self.config.clone(),
            selected_radius: self.params.radius,
            selected_min_neighbors: self.params.min_neighbors,
            quality_score: self.quality_score,
            low_confidence: self.low_confidence,
            target_cluster_count: self.config.target_cluster_count,
            clusters: self.clusters.iter().map(ClusterRecord::from).collect(),
            noise: self.noise.clone(),
            candidates: self.candidates.clone(),
            projection: self.projection.clone(),
        }
    }
}

/// A configured clustering pipeline.
pub struct Pipeline {
    config: ClusteringConfig,
    text: TextFeatureBuilder,
    kernel: Box<dyn DistanceKernel>,
}

impl Pipeline {
    /// Validate the config and set up the default hashing text embedder.
    pub fn new(config: ClusteringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let text = TextFeatureBuilder::hashing(config.text_dimension, config.random_seed);
        Ok(Self {
            config,
            text,
            kernel: simd::best_kernel(),
        })
    }

    /// Use another embedding model. Its dimension must equal `text_dimension`;
    /// a mismatch fails the run before any text is embedded.
    pub fn with_embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.text = TextFeatureBuilder::new(embedder);
        self
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Declared sub-vector dimensions for runs of this pipeline.
    pub fn dims(&self) -> FeatureDims {
        FeatureDims {
            text: self.config.text_dimension,
            engagement: ENGAGEMENT_DIM,
            relational: self.graph_builder().dimension(),
        }
    }

    fn graph_builder(&self) -> GraphFeatureBuilder {
        GraphFeatureBuilder::new(self.config.graph_buckets, self.config.random_seed)
    }

    /// Phase 1: build and fuse features for `entities`, in the order given.
    pub fn build_features(
        &self,
        entities: &[EntityRecord],
        edges: &[Edge],
    ) -> YtcResult<Vec<FeatureVector>> {
        let model_dim = self.text.dimension();
        if model_dim != self.config.text_dimension {
            return Err(FeatureDimensionError::ModelDimension {
                expected: self.config.text_dimension,
                actual: model_dim,
            }
            .into());
        }

        let ids: Vec<String> = entities.iter().map(|e| e.id.clone()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let graph = self.graph_builder();

        let (semantic, (engagement, relational)) = rayon::join(
            || self.text.build(entities),
            || {
                rayon::join(
                    || EngagementFeatureBuilder.build(entities),
                    || graph.build(&id_refs, edges),
                )
            },
        );
        let semantic = semantic?;
        let relational = relational?;

        let fusion = FeatureFusion::new(self.config.weights, self.dims())?;
        fusion.fuse(&ids, semantic, engagement, relational)
    }

    /// Run both phases.
    pub fn run(&self, mut entities: Vec<EntityRecord>, edges: &[Edge]) -> YtcResult<ClusteringRun> {
        let started = Instant::now();
        ensure_unique_ids(&entities)?;
        let required = self.config.smallest_min_neighborhood().unwrap_or(1);
        if entities.len() < required {
            return Err(InsufficientDataError {
                entities: entities.len(),
                required,
            }
            .into());
        }
        entities.sort_by(|a, b| a.id.cmp(&b.id));

        tracing::info!(
            entities = entities.len(),
            edges = edges.len(),
            seed = self.config.random_seed,
            isa = %self.kernel.isa_level(),
            "clustering run started"
        );

        let dims = self.dims();
        let features = self.build_features(&entities, edges)?;
        let matrix = FeatureMatrix::from_features(&features, dims.fused())?;
        drop(features);
        tracing::debug!(rows = matrix.rows(), dim = matrix.dim(), "features fused");

        let distances = DistanceMatrix::compute(&matrix, self.kernel.as_ref())?;
        let search = ParameterSearch::from_config(&self.config).run_precomputed(&distances)?;
        let params = search.best.params;
        let labels = ClusterEngine::new(params)?.fit_precomputed(&distances)?;

        let summary = ClusterSummarizer::new(self.config.topic_count).summarize(&entities, &matrix, &labels)?;
        let projection = Projection::new(self.config.random_seed).project(&matrix, &labels);

        if let Some(target) = self.config.target_cluster_count {
            if target != summary.clusters.len() {
                tracing::warn!(
                    target,
                    found = summary.clusters.len(),
                    "cluster count differs from the advisory target"
                );
            }
        }

        tracing::info!(
            clusters = summary.clusters.len(),
            noise = summary.noise.len(),
            radius = params.radius,
            min_neighbors = params.min_neighbors,
            score = ?search.best.score,
            low_confidence = search.low_confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "clustering run finished"
        );

        Ok(ClusteringRun {
            config: self.config.clone(),
            dims,
            entity_ids: matrix.ids().to_vec(),
            assignments: labels.assignments().to_vec(),
            clusters: summary.clusters,
            noise: summary.noise,
            params,
            quality_score: search.best.score,
            low_confidence: search.low_confidence,
            candidates: search.reports(),
            projection,
            created_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("text", &self.text)
            .field("isa", &self.kernel.isa_level())
            .finish()
    }
}

/// Validate `config` and run it over `entities` and `edges`.
pub fn run(config: &ClusteringConfig, entities: Vec<EntityRecord>, edges: &[Edge]) -> YtcResult<ClusteringRun> {
    Pipeline::new(config.clone())?.run(entities, edges)
}
