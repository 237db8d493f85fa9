use criterion::{black_box, criterion_group, criterion_main, Criterion};

use moltox::config::{ConformerConfig, PipelineConfig, ToxicityConfig};
use moltox::render::render_2d;
use moltox::toxicity::{GraphConvModel, ToxicityModel};
use moltox::{build_3d, descriptors, MoleculeGraph};

const ETHANOL: &str = "CCO";
const ASPIRIN: &str = "CC(=O)Oc1ccccc1C(=O)O";
const CAFFEINE: &str = "Cn1cnc2c1c(=O)n(C)c(=O)n2C";

fn bench_sanitize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize");
    group.bench_function("aspirin", |b| {
        b.iter(|| black_box(MoleculeGraph::from_smiles(black_box(ASPIRIN)).unwrap()))
    });
    group.bench_function("caffeine", |b| {
        b.iter(|| black_box(MoleculeGraph::from_smiles(black_box(CAFFEINE)).unwrap()))
    });
    group.finish();
}

fn bench_structure(c: &mut Criterion) {
    let config = ConformerConfig::default();
    let mut group = c.benchmark_group("build_3d");
    group.sample_size(20);
    group.bench_function("ethanol", |b| b.iter(|| black_box(build_3d(black_box(ETHANOL), &config).unwrap())));
    group.bench_function("aspirin", |b| b.iter(|| black_box(build_3d(black_box(ASPIRIN), &config).unwrap())));
    group.finish();
}

fn bench_analyses(c: &mut Criterion) {
    let aspirin = MoleculeGraph::from_smiles(ASPIRIN).unwrap();
    let model = GraphConvModel::from_config(&ToxicityConfig::default()).unwrap();

    c.bench_function("descriptors/aspirin", |b| {
        b.iter(|| black_box(descriptors::compute(black_box(&aspirin)).unwrap()))
    });
    c.bench_function("toxicity/aspirin", |b| b.iter(|| black_box(model.predict(black_box(&aspirin)).unwrap())));
    c.bench_function("render_2d/aspirin", |b| b.iter(|| black_box(render_2d(black_box(&aspirin), 400).unwrap())));
}

fn bench_pipeline(c: &mut Criterion) {
    let mut config = PipelineConfig::default();
    config.explanation.enabled = false;
    let pipeline = moltox::Pipeline::from_config(config).unwrap();
    let mut group = c.benchmark_group("analyze");
    group.sample_size(10);
    group.bench_function("caffeine", |b| b.iter(|| black_box(pipeline.analyze(black_box(CAFFEINE), None).unwrap())));
    group.finish();
}

criterion_group!(benches, bench_sanitize, bench_structure, bench_analyses, bench_pipeline);
criterion_main!(benches);
