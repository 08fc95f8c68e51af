//! Input data model: channel records and subscription edges.
//!
//! Records are produced by the external collection layer and are immutable
//! once they reach the engine. They are passed by value into a run.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// One channel as fetched by the collection layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Stable channel identifier.
    pub id: String,
    /// Channel title.
    #[serde(default)]
    pub title: String,
    /// Free-text channel description.
    #[serde(default)]
    pub description: String,
    /// Channel creation time.
    pub published_at: DateTime<Utc>,
    /// Topic tags: plain names or topic URLs such as
    /// `https://en.wikipedia.org/wiki/Video_game_culture`.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Subscriber count.
    #[serde(default)]
    pub subscriber_count: u64,
    /// Number of uploaded videos.
    #[serde(default)]
    pub video_count: u64,
    /// Total view count.
    #[serde(default)]
    pub view_count: u64,
}

impl EntityRecord {
    /// Readable topic names, deduplicated, in the order first seen.
    pub fn topic_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.topics
            .iter()
            .map(|t| topic_name(t))
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect()
    }

    /// Text fed to the semantic embedding: `title - description - Topics: a, b`.
    ///
    /// Empty parts are skipped, so a record with no text yields an empty string.
    pub fn prepared_text(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(3);
        let title = self.title.trim();
        if !title.is_empty() {
            parts.push(title.to_string());
        }
        let description = self.description.trim();
        if !description.is_empty() {
            parts.push(description.to_string());
        }
        let topics = self.topic_names();
        if !topics.is_empty() {
            parts.push(format!("Topics: {}", topics.join(", ")));
        }
        parts.join(" - ")
    }

    /// Raw engagement statistics of this record.
    pub fn stats(&self) -> EngagementStats {
        EngagementStats {
            subscriber_count: self.subscriber_count,
            video_count: self.video_count,
            view_count: self.view_count,
            published_at: self.published_at,
        }
    }
}

/// Raw numeric statistics consumed by the engagement feature builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementStats {
    pub subscriber_count: u64,
    pub video_count: u64,
    pub view_count: u64,
    pub published_at: DateTime<Utc>,
}

/// A directed subscription relationship: `source` subscribes to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Subscribing channel.
    pub source: String,
    /// Channel subscribed to.
    pub target: String,
    /// Relationship strength in `(0, 1]`.
    #[serde(default = "default_edge_weight")]
    pub weight: f64,
}

fn default_edge_weight() -> f64 {
    1.0
}

impl Edge {
    /// Create an edge with full weight.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: 1.0,
        }
    }

    /// Set the weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Reject weights outside `(0, 1]`.
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.weight.is_finite() || self.weight <= 0.0 || self.weight > 1.0 {
            return Err(InputError::InvalidEdgeWeight {
                source_id: self.source.clone(),
                target_id: self.target.clone(),
                weight: self.weight,
            });
        }
        Ok(())
    }
}

/// Reduce a topic tag to a readable name.
///
/// Topic URLs keep only their last path segment; underscores become spaces.
pub fn topic_name(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    last.replace('_', " ").trim().to_string()
}

/// Read a JSON array of entity records.
pub fn load_entities(path: &Path) -> Result<Vec<EntityRecord>, InputError> {
    load_json_array(path)
}

/// Read a JSON array of edges.
pub fn load_edges(path: &Path) -> Result<Vec<Edge>, InputError> {
    load_json_array(path)
}

fn load_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, InputError> {
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| InputError::Malformed {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Fail if two records share an id.
pub fn ensure_unique_ids(entities: &[EntityRecord]) -> Result<(), InputError> {
    let mut seen = BTreeSet::new();
    for entity in entities {
        if !seen.insert(entity.id.as_str()) {
            return Err(InputError::DuplicateEntity {
                id: entity.id.clone(),
            });
        }
    }
    Ok(())
}
