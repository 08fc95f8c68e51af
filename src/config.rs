//! Clustering run configuration.
//!
//! A [`ClusteringConfig`] is an explicit value passed into every run; there are
//! no process-wide defaults. Configuration can be loaded from TOML and must be
//! validated with [`ClusteringConfig::validate`] before any feature building.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tolerance for the weight-sum check.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Relative weights of the three feature sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    /// Weight of the semantic (title/description/topics) embedding.
    pub text: f64,
    /// Weight of the engagement statistics.
    pub engagement: f64,
    /// Weight of the subscription-graph features.
    pub subscription: f64,
}

impl FeatureWeights {
    /// Create a weight triple. Call [`validate`](Self::validate) before use.
    pub fn new(text: f64, engagement: f64, subscription: f64) -> Self {
        Self {
            text,
            engagement,
            subscription,
        }
    }

    /// Check that every weight is finite and non-negative and that they sum
    /// to 1.0 within [`WEIGHT_SUM_TOLERANCE`].
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, value) in [
            ("text", self.text),
            ("engagement", self.engagement),
            ("subscription", self.subscription),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        let sum = self.text + self.engagement + self.subscription;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }
        Ok(())
    }
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            text: 0.6,
            engagement: 0.1,
            subscription: 0.3,
        }
    }
}

/// Internal quality metric used to rank parameter candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMetric {
    /// Mean silhouette coefficient over non-noise entities.
    #[default]
    Silhouette,
}

impl std::fmt::Display for QualityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityMetric::Silhouette => write!(f, "silhouette"),
        }
    }
}

/// Configuration for one clustering run, persisted as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Feature source weights.
    #[serde(default)]
    pub weights: FeatureWeights,
    /// Candidate DBSCAN radii.
    #[serde(default = "default_radius_grid")]
    pub density_radius_grid: Vec<f64>,
    /// Candidate minimum neighborhood sizes (the point itself included).
    #[serde(default = "default_min_neighborhood_grid")]
    pub min_neighborhood_grid: Vec<usize>,
    /// Metric used to rank candidates.
    #[serde(default)]
    pub quality_metric: QualityMetric,
    /// Seed for every pseudo-random step of the run.
    #[serde(default = "default_seed")]
    pub random_seed: u64,
    /// Wall-clock budget for the parameter search, in seconds.
    #[serde(default)]
    pub time_budget_secs: Option<f64>,
    /// Dimension of the semantic embedding.
    #[serde(default = "default_text_dimension")]
    pub text_dimension: usize,
    /// Number of hash buckets in the graph neighborhood signature.
    #[serde(default = "default_graph_buckets")]
    pub graph_buckets: usize,
    /// Number of dominant topics reported per cluster.
    #[serde(default = "default_topic_count")]
    pub topic_count: usize,
    /// Advisory only: density clustering never forces this count.
    #[serde(default)]
    pub target_cluster_count: Option<usize>,
}

fn default_radius_grid() -> Vec<f64> {
    vec![0.2, 0.3, 0.4, 0.5, 0.6, 0.8]
}
fn default_min_neighborhood_grid() -> Vec<usize> {
    vec![3, 5, 8]
}
fn default_seed() -> u64 {
    42
}
fn default_text_dimension() -> usize {
    384
}
fn default_graph_buckets() -> usize {
    16
}
fn default_topic_count() -> usize {
    3
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            weights: FeatureWeights::default(),
            density_radius_grid: default_radius_grid(),
            min_neighborhood_grid: default_min_neighborhood_grid(),
            quality_metric: QualityMetric::default(),
            random_seed: default_seed(),
            time_budget_secs: None,
            text_dimension: default_text_dimension(),
            graph_buckets: default_graph_buckets(),
            topic_count: default_topic_count(),
            target_cluster_count: None,
        }
    }
}

impl ClusteringConfig {
    /// Reject invalid combinations before any feature building starts.
    pub fn validate(&self) -> ConfigResult<()> {
        self.weights.validate()?;

        if self.density_radius_grid.is_empty() {
            return Err(ConfigError::EmptyGrid {
                grid: "density_radius_grid",
            });
        }
        if let Some(&value) = self
            .density_radius_grid
            .iter()
            .find(|r| !r.is_finite() || **r <= 0.0)
        {
            return Err(ConfigError::InvalidRadius { value });
        }

        if self.min_neighborhood_grid.is_empty() {
            return Err(ConfigError::EmptyGrid {
                grid: "min_neighborhood_grid",
            });
        }
        if self.min_neighborhood_grid.contains(&0) {
            return Err(ConfigError::ZeroMinNeighborhood);
        }

        if self.text_dimension == 0 {
            return Err(ConfigError::ZeroField {
                field: "text_dimension",
            });
        }
        if self.graph_buckets == 0 {
            return Err(ConfigError::ZeroField {
                field: "graph_buckets",
            });
        }
        if self.target_cluster_count == Some(0) {
            return Err(ConfigError::ZeroField {
                field: "target_cluster_count",
            });
        }
        if let Some(secs) = self.time_budget_secs {
            if !secs.is_finite() || secs <= 0.0 || Duration::try_from_secs_f64(secs).is_err() {
                return Err(ConfigError::InvalidTimeBudget { secs });
            }
        }
        Ok(())
    }

    /// Smallest candidate minimum neighborhood size, if the grid is non-empty.
    pub fn smallest_min_neighborhood(&self) -> Option<usize> {
        self.min_neighborhood_grid.iter().copied().min()
    }

    /// The wall-clock budget as a [`Duration`]. Values a `Duration` cannot
    /// hold read as no budget; `validate` rejects them up front.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Parse a config from TOML text. The result is not yet validated.
    pub fn from_toml_str(text: &str, origin: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text, &path.display().to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Render the config as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "<memory>".into(),
            message: e.to_string(),
        })
    }
}
