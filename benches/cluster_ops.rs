//! Benchmarks for clustering operations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use ytcluster::cluster::dbscan::{ClusterEngine, DbscanParams};
use ytcluster::cluster::distance::DistanceMatrix;
use ytcluster::cluster::quality;
use ytcluster::config::QualityMetric;
use ytcluster::features::text::{HashingEmbedder, TextEmbedder};
use ytcluster::fusion::FeatureMatrix;
use ytcluster::simd;

/// `n` points in `dim` dimensions around four well-separated centers.
fn blobs(n: usize, dim: usize) -> FeatureMatrix {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let rows: Vec<Vec<f32>> = (0..n)
        .map(|i| {
            let center = (i % 4) as f32 * 3.0;
            (0..dim).map(|_| center + rng.gen_range(-0.1..0.1)).collect()
        })
        .collect();
    let ids = (0..n).map(|i| format!("UC{i:05}")).collect();
    FeatureMatrix::from_rows(ids, &rows, dim).unwrap()
}

fn bench_distance_kernel(c: &mut Criterion) {
    let kernel = simd::best_kernel();
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let a: Vec<f32> = (0..409).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let b: Vec<f32> = (0..409).map(|_| rng.gen_range(-1.0..1.0)).collect();

    c.bench_function("euclidean_409", |bench| {
        bench.iter(|| black_box(kernel.euclidean(&a, &b)))
    });
}

fn bench_distance_matrix(c: &mut Criterion) {
    let kernel = simd::best_kernel();
    let m = blobs(500, 409);

    c.bench_function("distance_matrix_500x409", |bench| {
        bench.iter(|| black_box(DistanceMatrix::compute(&m, kernel.as_ref()).unwrap()))
    });
}

fn bench_dbscan(c: &mut Criterion) {
    let kernel = simd::best_kernel();
    let d = DistanceMatrix::compute(&blobs(500, 409), kernel.as_ref()).unwrap();
    let engine = ClusterEngine::new(DbscanParams::new(2.0, 5)).unwrap();

    c.bench_function("dbscan_500", |bench| {
        bench.iter(|| black_box(engine.fit_precomputed(&d).unwrap()))
    });
}

fn bench_silhouette(c: &mut Criterion) {
    let kernel = simd::best_kernel();
    let d = DistanceMatrix::compute(&blobs(500, 409), kernel.as_ref()).unwrap();
    let labels = ClusterEngine::new(DbscanParams::new(2.0, 5))
        .unwrap()
        .fit_precomputed(&d)
        .unwrap();

    c.bench_function("silhouette_500", |bench| {
        bench.iter(|| black_box(quality::score(QualityMetric::Silhouette, &d, &labels)))
    });
}

fn bench_embed(c: &mut Criterion) {
    let embedder = HashingEmbedder::new(384, 42);
    let text = "Kitchen Stories - Weekly recipes, baking and home cooking - Topics: Food, Cooking";

    c.bench_function("hashing_embed_384", |bench| {
        bench.iter(|| black_box(embedder.embed(text).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_distance_kernel,
    bench_distance_matrix,
    bench_dbscan,
    bench_silhouette,
    bench_embed
);
criterion_main!(benches);
