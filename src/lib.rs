// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ytcluster
//!
//! Feature-fusion clustering of media channels. Each channel is described by
//! three feature sources, fused under configurable weights, and grouped by
//! density-based clustering with automatically selected parameters.
//!
//! ## Architecture
//!
//! - **Features** (`features`): semantic text embedding, batch-normalized
//!   engagement statistics, and subscription-graph position
//! - **Fusion** (`fusion`): weighted concatenation into one vector per channel
//! - **Clustering** (`cluster`): DBSCAN with a silhouette-scored parameter search
//! - **Summaries** (`summarize`): centroid, statistics, topics and a name per cluster
//! - **Projection** (`projection`): 2-D principal components for plotting
//! - **SIMD acceleration** (`simd`): Runtime-dispatched AVX2/generic distance kernels
//!
//! ## Library usage
//!
//! ```no_run
//! use ytcluster::config::ClusteringConfig;
//! use ytcluster::entity::{load_edges, load_entities};
//! use ytcluster::pipeline::Pipeline;
//! use std::path::Path;
//!
//! let entities = load_entities(Path::new("channels.json")).unwrap();
//! let edges = load_edges(Path::new("subscriptions.json")).unwrap();
//! let pipeline = Pipeline::new(ClusteringConfig::default()).unwrap();
//! let run = pipeline.run(entities, &edges).unwrap();
//! for cluster in &run.clusters {
//!     println!("{}: {} channels", cluster.name, cluster.size);
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod entity;
pub mod error;
pub mod export;
pub mod features;
pub mod fusion;
pub mod pipeline;
pub mod projection;
pub mod simd;
pub mod summarize;
