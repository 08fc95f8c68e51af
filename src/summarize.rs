//! Cluster summaries: centroid, statistics, dominant topics and a name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cluster::{Assignment, Labels};
use crate::entity::EntityRecord;
use crate::error::{FeatureDimensionError, YtcResult};
use crate::fusion::FeatureMatrix;

/// Keyword lists used to name clusters whose members carry no topic tags.
/// Order matters: equal scores resolve to the earlier category.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Music", &["music", "band", "song", "singer", "rapper", "artist", "piano", "guitar", "drum"]),
    (
        "Gaming",
        &["game", "gaming", "playthrough", "minecraft", "fortnite", "gamer", "xbox", "playstation", "nintendo"],
    ),
    (
        "Technology",
        &["tech", "technology", "programming", "code", "developer", "computer", "software", "hardware"],
    ),
    ("Science", &["science", "physics", "chemistry", "biology", "astronomy", "space", "experiment"]),
    (
        "Education",
        &["education", "learn", "school", "university", "college", "academic", "lecture", "course"],
    ),
    ("Entertainment", &["entertainment", "funny", "comedy", "prank", "skit", "humor"]),
    ("News", &["news", "politics", "current events", "journalist", "report"]),
    ("Sports", &["sports", "football", "basketball", "soccer", "baseball", "nfl", "nba", "fitness"]),
    ("Art", &["art", "drawing", "painting", "animation", "design", "creative"]),
    ("Food", &["food", "cooking", "recipe", "chef", "baking", "cuisine", "restaurant"]),
    ("Fashion", &["fashion", "clothing", "style", "beauty", "makeup", "model"]),
    ("Travel", &["travel", "vlog", "adventure", "tourism", "explore", "destination"]),
    ("Automotive", &["car", "auto", "vehicle", "motorcycle", "racing", "engine"]),
    ("Finance", &["finance", "money", "investing", "stock", "crypto", "bitcoin", "business"]),
    ("DIY", &["diy", "craft", "how to", "tutorial", "woodworking", "maker", "build"]),
    ("Lifestyle", &["lifestyle", "minimalism", "productivity", "self-improvement", "motivation"]),
    ("History", &["history", "historical", "ancient", "medieval", "civilization", "war"]),
];

/// A secondary category is named when it scores above this share of the primary.
const SECONDARY_CATEGORY_RATIO: f64 = 0.7;

/// Delimiter between the terms of a cluster name.
pub const NAME_DELIMITER: &str = " & ";

/// One cluster of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: usize,
    pub name: String,
    /// Member entity ids, sorted.
    pub members: Vec<String>,
    /// Mean fused vector of the members.
    pub centroid: Vec<f32>,
    pub size: usize,
    pub avg_subscriber_count: f64,
    pub avg_view_count: f64,
    pub avg_video_count: f64,
    /// Most frequent topic names among members, ties in lexical order.
    pub dominant_topics: Vec<String>,
}

/// Clusters plus the entities left as noise.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub clusters: Vec<Cluster>,
    /// Noise entity ids, sorted.
    pub noise: Vec<String>,
}

/// Aggregates the members of each cluster into a [`Cluster`].
#[derive(Debug, Clone, Copy)]
pub struct ClusterSummarizer {
    topic_count: usize,
}

impl ClusterSummarizer {
    /// Report up to `topic_count` dominant topics per cluster.
    pub fn new(topic_count: usize) -> Self {
        Self { topic_count }
    }

    /// Summarize a labelled run. `entities`, matrix rows and labels are aligned by index.
    pub fn summarize(
        &self,
        entities: &[EntityRecord],
        matrix: &FeatureMatrix,
        labels: &Labels,
    ) -> YtcResult<Summary> {
        for (feature, actual) in [("fused", matrix.rows()), ("assignment", labels.len())] {
            if actual != entities.len() {
                return Err(FeatureDimensionError::CountMismatch {
                    feature,
                    expected: entities.len(),
                    actual,
                }
                .into());
            }
        }

        let clusters = labels
            .members()
            .into_iter()
            .enumerate()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(id, rows)| self.summarize_one(id, &rows, entities, matrix))
            .collect();

        let mut noise: Vec<String> = labels
            .assignments()
            .iter()
            .zip(entities)
            .filter(|(a, _)| matches!(a, Assignment::Noise))
            .map(|(_, e)| e.id.clone())
            .collect();
        noise.sort();

        Ok(Summary { clusters, noise })
    }

    fn summarize_one(
        &self,
        id: usize,
        rows: &[usize],
        entities: &[EntityRecord],
        matrix: &FeatureMatrix,
    ) -> Cluster {
        let size = rows.len();
        let n = size as f64;

        let mut sum = vec![0.0f64; matrix.dim()];
        for &r in rows {
            for (s, &x) in sum.iter_mut().zip(matrix.row(r)) {
                *s += f64::from(x);
            }
        }
        let centroid = sum.into_iter().map(|s| (s / n) as f32).collect();

        let members_iter = || rows.iter().map(|&r| &entities[r]);
        let mean = |f: fn(&EntityRecord) -> u64| members_iter().map(|e| f(e) as f64).sum::<f64>() / n;

        let mut members: Vec<String> = members_iter().map(|e| e.id.clone()).collect();
        members.sort();

        let dominant_topics = dominant_topics(members_iter(), self.topic_count);
        let name = cluster_name(id, &dominant_topics, members_iter());

        Cluster {
            id,
            name,
            members,
            centroid,
            size,
            avg_subscriber_count: mean(|e| e.subscriber_count),
            avg_view_count: mean(|e| e.view_count),
            avg_video_count: mean(|e| e.video_count),
            dominant_topics,
        }
    }
}

/// The `limit` topics carried by the most members, ties in lexical order.
fn dominant_topics<'a>(members: impl Iterator<Item = &'a EntityRecord>, limit: usize) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for entity in members {
        for topic in entity.topic_names() {
            *counts.entry(topic).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    // BTreeMap order is lexical; a stable sort keeps it within equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(limit).map(|(t, _)| t).collect()
}

fn cluster_name<'a>(
    id: usize,
    dominant_topics: &[String],
    members: impl Iterator<Item = &'a EntityRecord>,
) -> String {
    if !dominant_topics.is_empty() {
        return dominant_topics
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(NAME_DELIMITER);
    }
    category_name(members).unwrap_or_else(|| format!("Cluster {id}"))
}

/// Name from keyword occurrences in member titles and descriptions.
fn category_name<'a>(members: impl Iterator<Item = &'a EntityRecord>) -> Option<String> {
    let text = members
        .map(|e| format!("{} {}", e.title, e.description))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut scores: Vec<(&str, usize)> = CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| {
            let score = keywords.iter().map(|k| text.matches(k).count()).sum();
            (*category, score)
        })
        .collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    let (primary, top) = scores[0];
    if top == 0 {
        return None;
    }
    let (secondary, next) = scores[1];
    if next as f64 > top as f64 * SECONDARY_CATEGORY_RATIO {
        Some(format!("{primary}{NAME_DELIMITER}{secondary}"))
    } else {
        Some(primary.to_string())
    }
}
