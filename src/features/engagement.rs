//! Engagement features from raw channel statistics.
//!
//! Building is a two-step operation with a barrier in between: an
//! [`EngagementScaler`] is fit once over the full batch, then every entity is
//! transformed with those same parameters. A scaler belongs to exactly one run.

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::entity::{EngagementStats, EntityRecord};

/// Number of engagement features.
pub const ENGAGEMENT_DIM: usize = 5;

/// Log-compressed features before normalization:
/// subscribers, videos, views, views per video, channel age in days
/// relative to the newest channel in the batch.
fn raw_features(stats: &EngagementStats, reference: DateTime<Utc>) -> [f64; ENGAGEMENT_DIM] {
    let subs = stats.subscriber_count as f64;
    let videos = stats.video_count as f64;
    let views = stats.view_count as f64;
    let per_video = views / videos.max(1.0);
    let age_days = (reference - stats.published_at).num_seconds().max(0) as f64 / 86_400.0;
    [
        subs.ln_1p(),
        videos.ln_1p(),
        views.ln_1p(),
        per_video.ln_1p(),
        age_days.ln_1p(),
    ]
}

/// Min/max normalization parameters fit over one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementScaler {
    reference: DateTime<Utc>,
    min: [f64; ENGAGEMENT_DIM],
    max: [f64; ENGAGEMENT_DIM],
}

impl EngagementScaler {
    /// Fit the scaler over every entity of the batch.
    ///
    /// An empty batch yields a scaler that maps everything to zero.
    pub fn fit(batch: &[EngagementStats]) -> Self {
        let reference = batch
            .iter()
            .map(|s| s.published_at)
            .max()
            .unwrap_or(DateTime::UNIX_EPOCH);

        let mut min = [f64::INFINITY; ENGAGEMENT_DIM];
        let mut max = [f64::NEG_INFINITY; ENGAGEMENT_DIM];
        for stats in batch {
            let f = raw_features(stats, reference);
            for i in 0..ENGAGEMENT_DIM {
                min[i] = min[i].min(f[i]);
                max[i] = max[i].max(f[i]);
            }
        }
        if batch.is_empty() {
            min = [0.0; ENGAGEMENT_DIM];
            max = [0.0; ENGAGEMENT_DIM];
        }

        Self {
            reference,
            min,
            max,
        }
    }

    /// Map raw statistics into `[0, 1]` per feature, scaled so the vector
    /// norm is at most 1. Features constant across the batch map to 0.
    pub fn transform(&self, stats: &EngagementStats) -> Vec<f32> {
        let scale = 1.0 / (ENGAGEMENT_DIM as f64).sqrt();
        let f = raw_features(stats, self.reference);
        (0..ENGAGEMENT_DIM)
            .map(|i| {
                let span = self.max[i] - self.min[i];
                let unit = if span > 0.0 {
                    ((f[i] - self.min[i]) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (unit * scale) as f32
            })
            .collect()
    }

    /// Newest creation time in the fitted batch.
    pub fn reference(&self) -> DateTime<Utc> {
        self.reference
    }
}

/// Builds the engagement sub-vector for every entity of a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementFeatureBuilder;

impl EngagementFeatureBuilder {
    /// Output dimension.
    pub fn dimension(&self) -> usize {
        ENGAGEMENT_DIM
    }

    /// Fit over the whole batch, then transform each entity in parallel.
    pub fn build(&self, entities: &[EntityRecord]) -> Vec<Vec<f32>> {
        let batch: Vec<EngagementStats> = entities.iter().map(EntityRecord::stats).collect();
        let scaler = EngagementScaler::fit(&batch);
        batch.par_iter().map(|s| scaler.transform(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(subs: u64, videos: u64, views: u64, published: &str) -> EngagementStats {
        EngagementStats {
            subscriber_count: subs,
            video_count: videos,
            view_count: views,
            published_at: published.parse().unwrap(),
        }
    }

    #[test]
    fn min_and_max_map_to_bounds() {
        let batch = vec![
            stats(0, 0, 0, "2020-01-01T00:00:00Z"),
            stats(1_000_000, 500, 90_000_000, "2010-01-01T00:00:00Z"),
        ];
        let scaler = EngagementScaler::fit(&batch);
        let lo = scaler.transform(&batch[0]);
        let hi = scaler.transform(&batch[1]);
        let top = 1.0 / (ENGAGEMENT_DIM as f32).sqrt();
        assert!(lo.iter().all(|&x| x.abs() < 1e-6));
        assert!(hi.iter().all(|&x| (x - top).abs() < 1e-6), "{hi:?}");
    }

    #[test]
    fn norm_bounded_by_one() {
        let batch = vec![
            stats(10, 1, 100, "2019-01-01T00:00:00Z"),
            stats(5_000, 30, 800_000, "2015-01-01T00:00:00Z"),
            stats(2, 200, 900, "2021-06-01T00:00:00Z"),
        ];
        let scaler = EngagementScaler::fit(&batch);
        for s in &batch {
            let v = scaler.transform(s);
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!(norm <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn constant_feature_maps_to_zero() {
        let batch = vec![
            stats(100, 10, 1_000, "2019-01-01T00:00:00Z"),
            stats(100, 10, 1_000, "2019-01-01T00:00:00Z"),
        ];
        let scaler = EngagementScaler::fit(&batch);
        assert!(scaler.transform(&batch[0]).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn fit_is_order_independent() {
        let a = stats(10, 1, 100, "2019-01-01T00:00:00Z");
        let b = stats(5_000, 30, 800_000, "2015-01-01T00:00:00Z");
        let c = stats(2, 200, 900, "2021-06-01T00:00:00Z");
        let s1 = EngagementScaler::fit(&[a, b, c]);
        let s2 = EngagementScaler::fit(&[c, a, b]);
        assert_eq!(s1, s2);
        assert_eq!(s1.reference(), c.published_at);
    }

    #[test]
    fn empty_batch_is_neutral() {
        let scaler = EngagementScaler::fit(&[]);
        let v = scaler.transform(&stats(10, 1, 1, "2019-01-01T00:00:00Z"));
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn age_is_measured_from_the_newest_channel() {
        let entity = |id: &str, published: &str| EntityRecord {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            published_at: published.parse().unwrap(),
            topics: vec![],
            subscriber_count: 100,
            video_count: 10,
            view_count: 1_000,
        };
        let vectors = EngagementFeatureBuilder.build(&[
            entity("old", "2010-01-01T00:00:00Z"),
            entity("mid", "2018-01-01T00:00:00Z"),
            entity("new", "2020-01-01T00:00:00Z"),
        ]);
        let top = 1.0 / (ENGAGEMENT_DIM as f32).sqrt();
        assert!(vectors.iter().all(|v| v.len() == ENGAGEMENT_DIM));
        // Counts are identical, so only the age slot varies.
        assert!(vectors.iter().all(|v| v[..4].iter().all(|&x| x == 0.0)));
        assert!((vectors[0][4] - top).abs() < 1e-6);
        assert!(vectors[1][4] > 0.0 && vectors[1][4] < top);
        assert_eq!(vectors[2][4], 0.0);
    }
}
