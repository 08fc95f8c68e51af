//! Export types for clustering results.
//!
//! These are the records handed to the persistence and visualization layers.
//! They serialize to JSON and parse back without loss of membership or
//! centroids.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster::search::CandidateReport;
use crate::config::ClusteringConfig;
use crate::error::ExportError;
use crate::projection::ProjectedPoint;
use crate::summarize::Cluster;

/// Exported cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Cluster id, dense from 0 within a run.
    pub cluster_id: usize,
    /// Derived display name.
    pub name: String,
    /// Number of members.
    pub size: usize,
    /// Mean fused vector of the members.
    pub centroid: Vec<f32>,
    /// Member entity ids, sorted.
    pub members: Vec<String>,
    /// Most frequent topic names.
    pub dominant_topics: Vec<String>,
    /// Mean raw subscriber count.
    pub avg_subscriber_count: f64,
    /// Mean raw view count.
    pub avg_view_count: f64,
    /// Mean raw video count.
    #[serde(default)]
    pub avg_video_count: f64,
}

impl From<&Cluster> for ClusterRecord {
    fn from(c: &Cluster) -> Self {
        Self {
            cluster_id: c.id,
            name: c.name.clone(),
            size: c.size,
            centroid: c.centroid.clone(),
            members: c.members.clone(),
            dominant_topics: c.dominant_topics.clone(),
            avg_subscriber_count: c.avg_subscriber_count,
            avg_view_count: c.avg_view_count,
            avg_video_count: c.avg_video_count,
        }
    }
}

/// Exported clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// When the run completed.
    pub created_at: DateTime<Utc>,
    /// Configuration the run used.
    pub config: ClusteringConfig,
    /// Selected DBSCAN radius.
    pub selected_radius: f64,
    /// Selected minimum neighborhood size.
    pub selected_min_neighbors: usize,
    /// Quality score of the selected candidate, if defined.
    pub quality_score: Option<f64>,
    /// Set when the score is undefined or the time budget cut the search short.
    pub low_confidence: bool,
    /// Advisory cluster count from the config, echoed for reference.
    #[serde(default)]
    pub target_cluster_count: Option<usize>,
    pub clusters: Vec<ClusterRecord>,
    /// Entity ids labelled noise, sorted.
    pub noise: Vec<String>,
    /// Every parameter candidate and how it fared.
    #[serde(default)]
    pub candidates: Vec<CandidateReport>,
    /// 2-D coordinates for the visualization layer.
    #[serde(default)]
    pub projection: Vec<ProjectedPoint>,
}

impl RunRecord {
    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a record produced by [`to_json_pretty`](Self::to_json_pretty).
    pub fn from_json(text: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Write the record as JSON to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|source| ExportError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Read a record from a JSON file.
    pub fn read_from(path: &Path) -> Result<Self, ExportError> {
        let text = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Total number of entities covered by the record.
    pub fn entity_count(&self) -> usize {
        self.clusters.iter().map(|c| c.size).sum::<usize>() + self.noise.len()
    }
}

/// Compact display of a count: `1.2M`, `3.4K`, `999`.
pub fn format_count(count: f64) -> String {
    if count >= 1_000_000.0 {
        format!("{:.1}M", count / 1_000_000.0)
    } else if count >= 1_000.0 {
        format!("{:.1}K", count / 1_000.0)
    } else {
        format!("{}", count.round().max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RunRecord {
        RunRecord {
            created_at: "2024-05-01T12:00:00Z".parse().unwrap(),
            config: ClusteringConfig::default(),
            selected_radius: 0.4,
            selected_min_neighbors: 3,
            quality_score: Some(0.71),
            low_confidence: false,
            target_cluster_count: Some(2),
            clusters: vec![ClusterRecord {
                cluster_id: 0,
                name: "Music & Jazz".into(),
                size: 3,
                centroid: vec![0.25, -0.5, 0.125],
                members: vec!["a".into(), "b".into(), "c".into()],
                dominant_topics: vec!["Music".into(), "Jazz".into()],
                avg_subscriber_count: 1500.0,
                avg_view_count: 2.5e6,
                avg_video_count: 12.0,
            }],
            noise: vec!["d".into()],
            candidates: vec![],
            projection: vec![],
        }
    }

    #[test]
    fn json_preserves_membership_and_centroids() {
        let r = record();
        let back = RunRecord::from_json(&r.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back, r);
        assert_eq!(back.entity_count(), 4);
    }

    #[test]
    fn cluster_record_uses_documented_field_names() {
        let json = serde_json::to_value(&record().clusters[0]).unwrap();
        for field in [
            "cluster_id",
            "name",
            "size",
            "centroid",
            "members",
            "dominant_topics",
            "avg_subscriber_count",
            "avg_view_count",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn malformed_json_is_export_error() {
        assert!(matches!(
            RunRecord::from_json("{\"clusters\": 3}"),
            Err(ExportError::Json { .. })
        ));
    }

    #[test]
    fn counts_formatted_by_magnitude() {
        assert_eq!(format_count(1_234_567.0), "1.2M");
        assert_eq!(format_count(3_400.0), "3.4K");
        assert_eq!(format_count(999.4), "999");
        assert_eq!(format_count(0.0), "0");
    }
}
