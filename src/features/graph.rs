//! Relational features from the subscription graph.
//!
//! The edge list is treated as a set: edges are canonicalized (self-loops
//! dropped, duplicate pairs collapsed to their maximum weight) and inserted
//! into a petgraph `DiGraph` in sorted order, with nodes inserted in sorted id
//! order. Every later reduction walks that canonical structure, so the output
//! does not depend on the order of the input list.
//!
//! Per entity the vector holds four scalar features (weighted in-degree,
//! weighted out-degree, PageRank, weak component size) followed by a hashed
//! neighborhood signature.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use rayon::prelude::*;

use crate::entity::Edge;
use crate::error::InputError;

use super::l2_normalize;

/// Number of scalar features ahead of the signature block.
pub const GRAPH_SCALAR_FEATURES: usize = 4;

/// PageRank damping factor.
const DAMPING: f64 = 0.85;

/// PageRank power iterations.
const PAGERANK_ITERATIONS: usize = 50;

/// Canonical, order-independent view of the subscription graph.
pub struct SubscriptionGraph {
    graph: DiGraph<String, f64>,
    index: HashMap<String, NodeIndex>,
}

impl SubscriptionGraph {
    /// Build the graph from entity ids and an edge list.
    ///
    /// Edge endpoints outside the entity set become nodes too; they shape the
    /// features of the entities connected to them.
    pub fn build<'a>(
        entity_ids: impl IntoIterator<Item = &'a str>,
        edges: &[Edge],
    ) -> Result<Self, InputError> {
        let mut canonical: BTreeMap<(&str, &str), f64> = BTreeMap::new();
        for edge in edges {
            edge.validate()?;
            if edge.source == edge.target {
                continue;
            }
            let w = canonical
                .entry((edge.source.as_str(), edge.target.as_str()))
                .or_insert(edge.weight);
            *w = w.max(edge.weight);
        }

        let mut ids: BTreeSet<&str> = entity_ids.into_iter().collect();
        for &(source, target) in canonical.keys() {
            ids.insert(source);
            ids.insert(target);
        }

        let mut graph = DiGraph::with_capacity(ids.len(), canonical.len());
        let mut index = HashMap::with_capacity(ids.len());
        for id in ids {
            let idx = graph.add_node(id.to_string());
            index.insert(id.to_string(), idx);
        }
        for ((source, target), weight) in canonical {
            graph.add_edge(index[source], index[target], weight);
        }

        Ok(Self { graph, index })
    }

    /// Number of nodes, including endpoints outside the entity set.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct directed edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn node(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    fn weighted_degree(&self, idx: NodeIndex, dir: Direction) -> f64 {
        self.graph.edges_directed(idx, dir).map(|e| *e.weight()).sum()
    }

    fn is_isolated(&self, idx: NodeIndex) -> bool {
        self.graph.neighbors_undirected(idx).next().is_none()
    }

    /// Weighted PageRank by power iteration. Dangling mass is spread uniformly.
    pub fn pagerank(&self, damping: f64, iterations: usize) -> Vec<f64> {
        let n = self.graph.node_count();
        if n == 0 {
            return vec![];
        }
        let nf = n as f64;
        let out_weight: Vec<f64> = self
            .graph
            .node_indices()
            .map(|idx| self.weighted_degree(idx, Direction::Outgoing))
            .collect();

        let mut rank = vec![1.0 / nf; n];
        for _ in 0..iterations {
            let mut next = vec![(1.0 - damping) / nf; n];
            let mut dangling = 0.0;
            for u in self.graph.node_indices() {
                let r = rank[u.index()];
                if out_weight[u.index()] == 0.0 {
                    dangling += r;
                    continue;
                }
                for e in self.graph.edges(u) {
                    next[e.target().index()] += damping * r * e.weight() / out_weight[u.index()];
                }
            }
            let spread = damping * dangling / nf;
            for v in &mut next {
                *v += spread;
            }
            rank = next;
        }
        rank
    }

    /// Size of the weakly connected component of every node.
    pub fn component_sizes(&self) -> Vec<usize> {
        let n = self.graph.node_count();
        let mut uf = UnionFind::<usize>::new(n);
        for e in self.graph.edge_references() {
            uf.union(e.source().index(), e.target().index());
        }
        let labels = uf.into_labeling();
        let mut sizes: HashMap<usize, usize> = HashMap::new();
        for &l in &labels {
            *sizes.entry(l).or_default() += 1;
        }
        labels.iter().map(|l| sizes[l]).collect()
    }
}

impl std::fmt::Debug for SubscriptionGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGraph")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

/// Builds the relational sub-vector for every entity of a batch.
#[derive(Debug, Clone, Copy)]
pub struct GraphFeatureBuilder {
    buckets: usize,
    seed: u64,
}

impl GraphFeatureBuilder {
    /// Create a builder with `buckets` signature buckets.
    pub fn new(buckets: usize, seed: u64) -> Self {
        Self { buckets, seed }
    }

    /// Output dimension.
    pub fn dimension(&self) -> usize {
        GRAPH_SCALAR_FEATURES + self.buckets
    }

    /// One relational vector per entity id, in the order given.
    ///
    /// Entities without any incident edge receive the zero vector.
    pub fn build(&self, entity_ids: &[&str], edges: &[Edge]) -> Result<Vec<Vec<f32>>, InputError> {
        let graph = SubscriptionGraph::build(entity_ids.iter().copied(), edges)?;
        let ranks = graph.pagerank(DAMPING, PAGERANK_ITERATIONS);
        let components = graph.component_sizes();
        let log_nodes = (graph.node_count() as f64).ln();

        let nodes: Vec<NodeIndex> = entity_ids
            .iter()
            .filter_map(|id| graph.node(id))
            .collect();

        // Batch maxima over the entity set only.
        let mut max_in = 0.0f64;
        let mut max_out = 0.0f64;
        let mut max_rank = 0.0f64;
        for &idx in &nodes {
            if graph.is_isolated(idx) {
                continue;
            }
            max_in = max_in.max(graph.weighted_degree(idx, Direction::Incoming).ln_1p());
            max_out = max_out.max(graph.weighted_degree(idx, Direction::Outgoing).ln_1p());
            max_rank = max_rank.max(ranks[idx.index()]);
        }

        let scalar_scale = 1.0 / ((2 * GRAPH_SCALAR_FEATURES) as f64).sqrt();
        let signature_scale = 1.0 / 2f32.sqrt();
        let dim = self.dimension();

        let vectors = entity_ids
            .par_iter()
            .map(|id| {
                let Some(idx) = graph.node(id) else {
                    return vec![0.0; dim];
                };
                if graph.is_isolated(idx) {
                    return vec![0.0; dim];
                }

                let in_deg = graph.weighted_degree(idx, Direction::Incoming).ln_1p();
                let out_deg = graph.weighted_degree(idx, Direction::Outgoing).ln_1p();
                let component = if log_nodes > 0.0 {
                    (components[idx.index()] as f64).ln() / log_nodes
                } else {
                    0.0
                };
                let scalars = [
                    ratio(in_deg, max_in),
                    ratio(out_deg, max_out),
                    ratio(ranks[idx.index()], max_rank),
                    component,
                ];

                let mut out = Vec::with_capacity(dim);
                out.extend(scalars.iter().map(|s| (s * scalar_scale) as f32));
                let mut signature = self.signature(&graph, idx);
                l2_normalize(&mut signature);
                out.extend(signature.iter().map(|s| s * signature_scale));
                out
            })
            .collect();

        Ok(vectors)
    }

    /// Signed feature-hashed bag of neighbors, separated by edge direction.
    fn signature(&self, graph: &SubscriptionGraph, idx: NodeIndex) -> Vec<f32> {
        let mut sig = vec![0.0f32; self.buckets];
        for (dir, tag) in [(Direction::Outgoing, 0u8), (Direction::Incoming, 1u8)] {
            for e in graph.graph.edges_directed(idx, dir) {
                let neighbor = if dir == Direction::Outgoing {
                    e.target()
                } else {
                    e.source()
                };
                let mut hasher = DefaultHasher::new();
                self.seed.hash(&mut hasher);
                tag.hash(&mut hasher);
                graph.graph[neighbor].hash(&mut hasher);
                let h = hasher.finish();
                let bucket = (h % self.buckets as u64) as usize;
                let sign = if (h >> 63) & 1 == 1 { 1.0 } else { -1.0 };
                sig[bucket] += sign * *e.weight() as f32;
            }
        }
        sig
    }
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 { value / max } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<&'static str> {
        vec!["a", "b", "c", "d", "lonely"]
    }

    fn edges() -> Vec<Edge> {
        vec![
            Edge::new("a", "b"),
            Edge::new("b", "c").with_weight(0.5),
            Edge::new("c", "a"),
            Edge::new("a", "x"),
            Edge::new("d", "x").with_weight(0.7),
            Edge::new("d", "b"),
        ]
    }

    #[test]
    fn output_invariant_under_edge_permutation() {
        let builder = GraphFeatureBuilder::new(16, 42);
        let forward = builder.build(&ids(), &edges()).unwrap();

        let mut reversed = edges();
        reversed.reverse();
        assert_eq!(forward, builder.build(&ids(), &reversed).unwrap());

        let mut rotated = edges();
        rotated.rotate_left(2);
        assert_eq!(forward, builder.build(&ids(), &rotated).unwrap());
    }

    #[test]
    fn output_invariant_under_entity_order() {
        let builder = GraphFeatureBuilder::new(8, 1);
        let a = builder.build(&ids(), &edges()).unwrap();
        let mut shuffled = ids();
        shuffled.reverse();
        let b = builder.build(&shuffled, &edges()).unwrap();
        for (i, id) in ids().iter().enumerate() {
            let j = shuffled.iter().position(|s| s == id).unwrap();
            assert_eq!(a[i], b[j]);
        }
    }

    #[test]
    fn isolated_entity_gets_zero_vector() {
        let builder = GraphFeatureBuilder::new(16, 42);
        let vectors = builder.build(&ids(), &edges()).unwrap();
        assert_eq!(vectors[4].len(), builder.dimension());
        assert!(vectors[4].iter().all(|&x| x == 0.0));
        assert!(vectors[0].iter().any(|&x| x != 0.0));
    }

    #[test]
    fn no_edges_at_all_is_not_an_error() {
        let builder = GraphFeatureBuilder::new(4, 0);
        let vectors = builder.build(&["a", "b"], &[]).unwrap();
        assert!(vectors.iter().flatten().all(|&x| x == 0.0));
    }

    #[test]
    fn duplicate_edges_collapse_to_max_weight() {
        let builder = GraphFeatureBuilder::new(8, 0);
        let single = builder
            .build(&["a", "b"], &[Edge::new("a", "b").with_weight(0.9)])
            .unwrap();
        let duplicated = builder
            .build(
                &["a", "b"],
                &[
                    Edge::new("a", "b").with_weight(0.2),
                    Edge::new("a", "b").with_weight(0.9),
                ],
            )
            .unwrap();
        assert_eq!(single, duplicated);
    }

    #[test]
    fn self_loops_ignored() {
        let builder = GraphFeatureBuilder::new(8, 0);
        let vectors = builder.build(&["a"], &[Edge::new("a", "a")]).unwrap();
        assert!(vectors[0].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn invalid_weight_rejected() {
        let builder = GraphFeatureBuilder::new(8, 0);
        let err = builder
            .build(&["a", "b"], &[Edge::new("a", "b").with_weight(2.0)])
            .unwrap_err();
        assert!(matches!(err, InputError::InvalidEdgeWeight { .. }));
    }

    #[test]
    fn shared_subscriptions_give_similar_signatures() {
        let builder = GraphFeatureBuilder::new(32, 7);
        let ids = ["fan1", "fan2", "other"];
        let edges = vec![
            Edge::new("fan1", "chef"),
            Edge::new("fan1", "baker"),
            Edge::new("fan2", "chef"),
            Edge::new("fan2", "baker"),
            Edge::new("other", "gamer"),
            Edge::new("other", "streamer"),
        ];
        let v = builder.build(&ids, &edges).unwrap();
        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        let start = GRAPH_SCALAR_FEATURES;
        assert!(dot(&v[0][start..], &v[1][start..]) > dot(&v[0][start..], &v[2][start..]));
    }

    #[test]
    fn norm_bounded_by_one() {
        let builder = GraphFeatureBuilder::new(16, 42);
        for v in builder.build(&ids(), &edges()).unwrap() {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!(norm <= 1.0 + 1e-5, "norm={norm}");
        }
    }

    #[test]
    fn pagerank_sums_to_one() {
        let graph = SubscriptionGraph::build(ids(), &edges()).unwrap();
        let ranks = graph.pagerank(DAMPING, PAGERANK_ITERATIONS);
        let total: f64 = ranks.iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "total={total}");
        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.edge_count(), 6);
    }

    #[test]
    fn component_sizes_are_weak() {
        let graph = SubscriptionGraph::build(ids(), &edges()).unwrap();
        let sizes = graph.component_sizes();
        let lonely = graph.node("lonely").unwrap();
        let a = graph.node("a").unwrap();
        assert_eq!(sizes[lonely.index()], 1);
        assert_eq!(sizes[a.index()], 5);
    }
}
