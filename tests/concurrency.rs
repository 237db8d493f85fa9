use std::sync::Arc;
use std::thread;

use moltox::config::PipelineConfig;
use moltox::toxicity::{GraphConvModel, ToxicityModel};
use moltox::{MoleculeGraph, Pipeline};

const MOLECULES: [&str; 6] = [
    "CCO",
    "c1ccccc1O",
    "CC(=O)Oc1ccccc1C(=O)O",
    "CN1C=NC2=C1C(=O)N(C(=O)N2C)C",
    "ClC(Cl)(Cl)Cl",
    "C[NH3+]",
];

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.explanation.enabled = false;
    config
}

#[test]
fn shared_classifier_gives_identical_results() {
    let model: Arc<dyn ToxicityModel> = Arc::new(GraphConvModel::from_config(&config().toxicity).unwrap());
    let graphs: Vec<MoleculeGraph> = MOLECULES.iter().map(|s| MoleculeGraph::from_smiles(s).unwrap()).collect();
    let sequential: Vec<_> = graphs.iter().map(|g| model.predict(g).unwrap()).collect();

    let parallel: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = graphs
            .iter()
            .map(|g| {
                let model = Arc::clone(&model);
                scope.spawn(move || model.predict(g).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(parallel, sequential);
}

#[test]
fn concurrent_analyses_match_sequential_ones() {
    let pipeline = Pipeline::from_config(config()).unwrap();
    let sequential: Vec<String> = MOLECULES
        .iter()
        .map(|s| serde_json::to_string(&pipeline.analyze(s, None).unwrap().report()).unwrap())
        .collect();

    let parallel: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = MOLECULES
            .iter()
            .map(|s| {
                let pipeline = &pipeline;
                scope.spawn(move || serde_json::to_string(&pipeline.analyze(s, None).unwrap().report()).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(parallel, sequential);
}
