//! End-to-end integration tests for the ytcluster engine.
//!
//! These tests exercise the full run from raw channel records through feature
//! building, parameter search, clustering and summarization, validating that
//! the stages agree on ids, dimensions and labels.

use std::collections::BTreeSet;

use ytcluster::cluster::Assignment;
use ytcluster::config::{ClusteringConfig, FeatureWeights};
use ytcluster::entity::{Edge, EntityRecord};
use ytcluster::error::{ConfigError, InsufficientDataError, YtcError};
use ytcluster::pipeline::{self, Pipeline};

fn channel(id: &str, title: &str, description: &str, topics: &[&str], subs: u64) -> EntityRecord {
    EntityRecord {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        published_at: "2014-09-01T00:00:00Z".parse().unwrap(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        subscriber_count: subs,
        video_count: 120,
        view_count: subs * 150,
    }
}

/// Ten cooking channels and ten gaming channels.
fn two_groups() -> Vec<EntityRecord> {
    let mut entities = Vec::new();
    for i in 0..10 {
        entities.push(channel(
            &format!("UCfood{i:02}"),
            "Kitchen Stories",
            "Weekly recipes, baking and home cooking",
            &["https://en.wikipedia.org/wiki/Food", "Cooking"],
            50_000 + i * 100,
        ));
        entities.push(channel(
            &format!("UCgame{i:02}"),
            "Pixel Plays",
            "Minecraft survival, speedruns and retro consoles",
            &["https://en.wikipedia.org/wiki/Video_game_culture"],
            2_000_000 + i * 1_000,
        ));
    }
    entities
}

fn ids(entities: &[EntityRecord]) -> BTreeSet<String> {
    entities.iter().map(|e| e.id.clone()).collect()
}

#[test]
fn two_separated_groups_form_two_clusters() {
    let entities = two_groups();
    let run = pipeline::run(&ClusteringConfig::default(), entities, &[]).unwrap();

    assert_eq!(run.cluster_count(), 2);
    assert!(run.noise.is_empty());
    assert!(run.quality_score.unwrap() > 0.5);
    assert!(!run.low_confidence);

    let food = run.assignment("UCfood00").unwrap();
    let game = run.assignment("UCgame00").unwrap();
    assert_ne!(food, game);
    for i in 0..10 {
        assert_eq!(run.assignment(&format!("UCfood{i:02}")), Some(food));
        assert_eq!(run.assignment(&format!("UCgame{i:02}")), Some(game));
    }

    let names: BTreeSet<&str> = run.clusters.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains("Cooking & Food"), "{names:?}");
    assert!(names.contains("Video game culture"), "{names:?}");
}

#[test]
fn members_and_noise_partition_the_input() {
    let mut entities = two_groups();
    entities.push(channel(
        "UCodd",
        "Lighthouse keeping",
        "Maritime history of the northern coast",
        &["History"],
        700,
    ));
    let expected = ids(&entities);

    let run = pipeline::run(&ClusteringConfig::default(), entities, &[]).unwrap();

    let mut seen = BTreeSet::new();
    let mut total = 0;
    for cluster in &run.clusters {
        assert!(!cluster.members.is_empty());
        assert_eq!(cluster.size, cluster.members.len());
        for m in &cluster.members {
            seen.insert(m.clone());
            total += 1;
        }
    }
    for n in &run.noise {
        seen.insert(n.clone());
        total += 1;
    }
    assert_eq!(seen, expected);
    assert_eq!(total, expected.len());
    assert_eq!(run.noise, vec!["UCodd".to_string()]);
    assert_eq!(run.assignment("UCodd"), Some(Assignment::Noise));
}

#[test]
fn centroids_have_fused_dimension() {
    let run = pipeline::run(&ClusteringConfig::default(), two_groups(), &[]).unwrap();
    let fused = run.dims.fused();
    assert_eq!(fused, 384 + 5 + 4 + 16);
    for cluster in &run.clusters {
        assert_eq!(cluster.centroid.len(), fused);
        assert!(cluster.size >= run.params.min_neighbors);
    }
}

#[test]
fn identical_input_and_seed_give_identical_assignments() {
    let config = ClusteringConfig {
        random_seed: 7,
        ..Default::default()
    };
    let a = pipeline::run(&config, two_groups(), &[]).unwrap();
    let b = pipeline::run(&config, two_groups(), &[]).unwrap();
    assert_eq!(a.entity_ids, b.entity_ids);
    assert_eq!(a.assignments, b.assignments);
    assert_eq!(a.clusters, b.clusters);
    assert_eq!(a.projection, b.projection);
    assert_eq!(a.quality_score, b.quality_score);
}

#[test]
fn input_order_does_not_matter() {
    let forward = two_groups();
    let mut reversed = two_groups();
    reversed.reverse();
    let edges = vec![
        Edge::new("UCfood00", "UCfood01"),
        Edge::new("UCgame03", "UCgame04").with_weight(0.5),
        Edge::new("UCgame04", "UCexternal"),
    ];
    let mut shuffled_edges = edges.clone();
    shuffled_edges.rotate_left(1);

    let config = ClusteringConfig::default();
    let a = pipeline::run(&config, forward, &edges).unwrap();
    let b = pipeline::run(&config, reversed, &shuffled_edges).unwrap();
    assert_eq!(a.assignments, b.assignments);
    assert_eq!(a.clusters, b.clusters);
}

#[test]
fn three_identical_isolated_entities_form_one_cluster() {
    let config = ClusteringConfig {
        density_radius_grid: vec![1.0],
        min_neighborhood_grid: vec![3],
        ..Default::default()
    };
    let entities = (0..3)
        .map(|i| channel(&format!("UC{i}"), "Same", "Same text", &["Music"], 1_000))
        .collect();
    let run = pipeline::run(&config, entities, &[]).unwrap();

    assert_eq!(run.cluster_count(), 1);
    assert_eq!(run.clusters[0].size, 3);
    assert!(run.noise.is_empty());
    // A single cluster has no silhouette.
    assert!(run.quality_score.is_none());
    assert!(run.low_confidence);
}

#[test]
fn single_entity_is_insufficient_data() {
    let config = ClusteringConfig {
        min_neighborhood_grid: vec![5],
        ..Default::default()
    };
    let err = pipeline::run(&config, vec![channel("UC1", "Solo", "", &[], 10)], &[]).unwrap_err();
    assert!(matches!(
        err,
        YtcError::InsufficientData(InsufficientDataError {
            entities: 1,
            required: 5
        })
    ));
}

#[test]
fn bad_weights_rejected_before_feature_building() {
    let config = ClusteringConfig {
        weights: FeatureWeights::new(0.5, 0.5, 0.5),
        ..Default::default()
    };
    // The edge weight is invalid too, but configuration is checked first.
    let edges = [Edge::new("a", "b").with_weight(7.0)];
    let err = pipeline::run(&config, two_groups(), &edges).unwrap_err();
    assert!(matches!(err, YtcError::Config(ConfigError::WeightSum { .. })));
}

#[test]
fn subscriptions_separate_otherwise_identical_channels() {
    let config = ClusteringConfig {
        weights: FeatureWeights::new(0.2, 0.1, 0.7),
        density_radius_grid: vec![0.2, 0.3, 0.4],
        min_neighborhood_grid: vec![3],
        graph_buckets: 64,
        ..Default::default()
    };
    let mut entities = Vec::new();
    let mut edges = Vec::new();
    for i in 0..6 {
        let a = format!("UCa{i}");
        let b = format!("UCb{i}");
        entities.push(channel(&a, "Daily vlog", "Life updates", &[], 10_000));
        entities.push(channel(&b, "Daily vlog", "Life updates", &[], 10_000));
        for target in ["UCnews1", "UCnews2", "UCnews3"] {
            edges.push(Edge::new(a.clone(), target));
        }
        for target in ["UCcraft1", "UCcraft2", "UCcraft3"] {
            edges.push(Edge::new(b.clone(), target));
        }
    }

    let run = Pipeline::new(config).unwrap().run(entities, &edges).unwrap();
    assert_eq!(run.cluster_count(), 2);
    assert_ne!(run.assignment("UCa0"), run.assignment("UCb0"));
    assert_eq!(run.assignment("UCa0"), run.assignment("UCa5"));
    assert_eq!(run.assignment("UCb0"), run.assignment("UCb5"));
}

#[test]
fn candidate_reports_cover_the_grid() {
    let config = ClusteringConfig {
        density_radius_grid: vec![0.3, 0.6],
        min_neighborhood_grid: vec![3, 50],
        ..Default::default()
    };
    let run = pipeline::run(&config, two_groups(), &[]).unwrap();
    assert_eq!(run.candidates.len(), 4);
    let rejected = run.candidates.iter().filter(|c| c.rejection.is_some()).count();
    assert_eq!(rejected, 2);
    assert_eq!(run.params.min_neighbors, 3);
}
