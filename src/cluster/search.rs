//! Automatic selection of DBSCAN parameters.
//!
//! Every `(radius, min_neighbors)` pair of the grid is evaluated against one
//! shared [`DistanceMatrix`]. Each evaluation yields a typed
//! [`CandidateOutcome`]; evaluations are reduced with [`compare`], a total
//! order that does not depend on grid order or thread scheduling.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::dbscan::{ClusterEngine, DbscanParams};
use super::distance::DistanceMatrix;
use super::{quality, Labels};
use crate::config::{ClusteringConfig, QualityMetric};
use crate::error::ClusteringError;
use crate::fusion::FeatureMatrix;
use crate::simd::DistanceKernel;

/// Why a candidate produced no assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// The matrix has fewer rows than the candidate's minimum neighborhood.
    TooFewPoints { rows: usize, min_neighbors: usize },
    /// The time budget ran out before the candidate started.
    TimedOut,
    /// The clustering engine rejected the candidate.
    Failed { message: String },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::TooFewPoints { rows, min_neighbors } => {
                write!(f, "too few points ({rows} < {min_neighbors})")
            }
            Rejection::TimedOut => write!(f, "timed out"),
            Rejection::Failed { message } => write!(f, "failed: {message}"),
        }
    }
}

/// A finished candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub params: DbscanParams,
    pub labels: Labels,
    /// Quality score; `None` when the metric is undefined (fewer than two clusters).
    pub score: Option<f64>,
}

impl Evaluation {
    pub fn clusters(&self) -> usize {
        self.labels.cluster_count()
    }

    pub fn noise(&self) -> usize {
        self.labels.noise_count()
    }
}

/// Result of evaluating one grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateOutcome {
    pub params: DbscanParams,
    pub result: Result<Evaluation, Rejection>,
}

/// Serializable summary of one candidate, kept in the run record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub radius: f64,
    pub min_neighbors: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clusters: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl From<&CandidateOutcome> for CandidateReport {
    fn from(outcome: &CandidateOutcome) -> Self {
        let (clusters, noise, score, rejection) = match &outcome.result {
            Ok(e) => (Some(e.clusters()), Some(e.noise()), e.score, None),
            Err(r) => (None, None, None, Some(r.clone())),
        };
        Self {
            radius: outcome.params.radius,
            min_neighbors: outcome.params.min_neighbors,
            clusters,
            noise,
            score,
            rejection,
        }
    }
}

/// Outcome of a full search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The selected candidate.
    pub best: Evaluation,
    /// Set when the best candidate is unscored or the budget cut the search short.
    pub low_confidence: bool,
    /// Set when at least one candidate was skipped for lack of time.
    pub timed_out: bool,
    /// Every candidate in grid order.
    pub candidates: Vec<CandidateOutcome>,
}

impl SearchOutcome {
    pub fn reports(&self) -> Vec<CandidateReport> {
        self.candidates.iter().map(CandidateReport::from).collect()
    }
}

/// Order two evaluations, better first.
///
/// Scored beats unscored; then higher score; among unscored, more clusters;
/// then fewer noise points; then smaller radius; then smaller minimum
/// neighborhood. Distinct grid points never compare equal.
pub fn compare(a: &Evaluation, b: &Evaluation) -> Ordering {
    let primary = match (a.score, b.score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.clusters().cmp(&a.clusters()),
    };
    primary
        .then_with(|| a.noise().cmp(&b.noise()))
        .then_with(|| a.params.radius.total_cmp(&b.params.radius))
        .then_with(|| a.params.min_neighbors.cmp(&b.params.min_neighbors))
}

/// Grid search over DBSCAN parameters.
#[derive(Debug, Clone)]
pub struct ParameterSearch {
    radii: Vec<f64>,
    min_neighbors: Vec<usize>,
    metric: QualityMetric,
    budget: Option<Duration>,
}

impl ParameterSearch {
    /// Create a search over the given grids. Duplicate grid values are merged.
    pub fn new(radii: &[f64], min_neighbors: &[usize], metric: QualityMetric) -> Self {
        let mut radii = radii.to_vec();
        radii.sort_by(f64::total_cmp);
        radii.dedup();
        let mut min_neighbors = min_neighbors.to_vec();
        min_neighbors.sort_unstable();
        min_neighbors.dedup();
        Self {
            radii,
            min_neighbors,
            metric,
            budget: None,
        }
    }

    /// Search configured by a run config.
    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self::new(
            &config.density_radius_grid,
            &config.min_neighborhood_grid,
            config.quality_metric,
        )
        .with_time_budget(config.time_budget())
    }

    /// Limit the wall-clock time spent starting candidates.
    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }

    /// Grid points in evaluation order: radius-major, both ascending.
    pub fn candidates(&self) -> Vec<DbscanParams> {
        self.radii
            .iter()
            .flat_map(|&r| {
                self.min_neighbors
                    .iter()
                    .map(move |&m| DbscanParams::new(r, m))
            })
            .collect()
    }

    /// Compute the distance matrix and search.
    pub fn run(
        &self,
        matrix: &FeatureMatrix,
        kernel: &dyn DistanceKernel,
    ) -> Result<SearchOutcome, ClusteringError> {
        let distances = DistanceMatrix::compute(matrix, kernel)?;
        self.run_precomputed(&distances)
    }

    /// Evaluate every candidate against shared distances and select the best.
    pub fn run_precomputed(
        &self,
        distances: &DistanceMatrix,
    ) -> Result<SearchOutcome, ClusteringError> {
        let deadline = self.budget.and_then(|b| Instant::now().checked_add(b));
        self.run_until(distances, deadline)
    }

    /// Evaluate the grid, skipping candidates that start after `deadline`.
    fn run_until(
        &self,
        distances: &DistanceMatrix,
        deadline: Option<Instant>,
    ) -> Result<SearchOutcome, ClusteringError> {
        let candidates: Vec<CandidateOutcome> = self
            .candidates()
            .par_iter()
            .map(|&params| self.evaluate(params, distances, deadline))
            .collect();
        select(candidates)
    }

    fn evaluate(
        &self,
        params: DbscanParams,
        distances: &DistanceMatrix,
        deadline: Option<Instant>,
    ) -> CandidateOutcome {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::debug!(%params, "candidate skipped, time budget reached");
            return CandidateOutcome {
                params,
                result: Err(Rejection::TimedOut),
            };
        }

        let labels = ClusterEngine::new(params).and_then(|e| e.fit_precomputed(distances));
        let result = match labels {
            Ok(labels) => {
                let score = quality::score(self.metric, distances, &labels);
                tracing::debug!(
                    %params,
                    clusters = labels.cluster_count(),
                    noise = labels.noise_count(),
                    score = ?score,
                    "candidate evaluated"
                );
                Ok(Evaluation {
                    params,
                    labels,
                    score,
                })
            }
            Err(ClusteringError::TooFewPoints {
                rows,
                min_neighbors,
            }) => Err(Rejection::TooFewPoints {
                rows,
                min_neighbors,
            }),
            Err(e) => Err(Rejection::Failed {
                message: e.to_string(),
            }),
        };
        if let Err(ref rejection) = result {
            tracing::debug!(%params, %rejection, "candidate rejected");
        }
        CandidateOutcome { params, result }
    }
}

/// Reduce evaluated candidates to the best finished one.
fn select(candidates: Vec<CandidateOutcome>) -> Result<SearchOutcome, ClusteringError> {
    let timed_out = candidates
        .iter()
        .any(|c| matches!(c.result, Err(Rejection::TimedOut)));

    let best = candidates
        .iter()
        .filter_map(|c| c.result.as_ref().ok())
        .min_by(|a, b| compare(a, b))
        .cloned();

    let Some(best) = best else {
        if timed_out {
            tracing::warn!(candidates = candidates.len(), "time budget exhausted before any candidate finished");
            return Err(ClusteringError::BudgetExhausted);
        }
        return Err(ClusteringError::NoViableCandidate {
            candidates: candidates.len(),
        });
    };

    let low_confidence = best.score.is_none() || timed_out;
    if timed_out {
        tracing::warn!("time budget reached, returning best finished candidate");
    }
    if best.score.is_none() {
        tracing::warn!(
            radius = best.params.radius,
            min_neighbors = best.params.min_neighbors,
            clusters = best.clusters(),
            "no candidate produced a scorable assignment"
        );
    }

    Ok(SearchOutcome {
        best,
        low_confidence,
        timed_out,
        candidates,
    })
}
