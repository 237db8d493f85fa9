//! Serialized GraphConv parameters.
//!
//! Matrices are stored row-major as nested arrays, `[input][output]`. A
//! file written by [`GraphConvWeights::save`] loads back with
//! [`GraphConvWeights::load`]; shapes are checked when the model is built.

use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::featurize::{ATOM_FEATURES, MAX_DEGREE};
use super::ENDPOINTS;

pub const CONV_WIDTH: usize = 64;
pub const DENSE_WIDTH: usize = 128;

#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("failed to read weights from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed weights file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("weight shape mismatch: {0}")]
    Shape(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseWeights {
    pub weight: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchNormWeights {
    pub gamma: Vec<f64>,
    pub beta: Vec<f64>,
    pub moving_mean: Vec<f64>,
    pub moving_variance: Vec<f64>,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_epsilon() -> f64 {
    1e-3
}

/// One GraphConv layer: a self and a neighbor transform per atom degree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConvLayerWeights {
    pub self_weights: Vec<Vec<Vec<f64>>>,
    pub neighbor_weights: Vec<Vec<Vec<f64>>>,
    pub bias: Vec<Vec<f64>>,
    pub batch_norm: BatchNormWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConvWeights {
    pub conv: Vec<GraphConvLayerWeights>,
    pub dense: DenseWeights,
    pub dense_batch_norm: BatchNormWeights,
    /// One two-class head per endpoint, in endpoint order.
    pub heads: Vec<DenseWeights>,
}

impl GraphConvWeights {
    pub fn load(path: &Path) -> Result<Self, WeightsError> {
        let text = std::fs::read_to_string(path).map_err(|source| WeightsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), WeightsError> {
        let text = serde_json::to_string(self)?;
        std::fs::write(path, text).map_err(|source| WeightsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Glorot-uniform weights from `seed`. Biases are zero and batch norms
    /// are identities.
    pub fn glorot(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let conv = [ATOM_FEATURES, CONV_WIDTH]
            .into_iter()
            .map(|input| GraphConvLayerWeights {
                self_weights: (0..=MAX_DEGREE)
                    .map(|_| glorot_matrix(&mut rng, input, CONV_WIDTH))
                    .collect(),
                neighbor_weights: (0..=MAX_DEGREE)
                    .map(|_| glorot_matrix(&mut rng, input, CONV_WIDTH))
                    .collect(),
                bias: vec![vec![0.0; CONV_WIDTH]; MAX_DEGREE + 1],
                batch_norm: BatchNormWeights::identity(CONV_WIDTH),
            })
            .collect();
        let dense = DenseWeights {
            weight: glorot_matrix(&mut rng, CONV_WIDTH, DENSE_WIDTH),
            bias: vec![0.0; DENSE_WIDTH],
        };
        let heads = ENDPOINTS
            .iter()
            .map(|_| DenseWeights {
                weight: glorot_matrix(&mut rng, 2 * DENSE_WIDTH, 2),
                bias: vec![0.0; 2],
            })
            .collect();
        Self {
            conv,
            dense,
            dense_batch_norm: BatchNormWeights::identity(DENSE_WIDTH),
            heads,
        }
    }
}

impl BatchNormWeights {
    pub fn identity(width: usize) -> Self {
        Self {
            gamma: vec![1.0; width],
            beta: vec![0.0; width],
            moving_mean: vec![0.0; width],
            moving_variance: vec![1.0; width],
            epsilon: default_epsilon(),
        }
    }
}

fn glorot_matrix(rng: &mut ChaCha8Rng, fan_in: usize, fan_out: usize) -> Vec<Vec<f64>> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    (0..fan_in)
        .map(|_| (0..fan_out).map(|_| rng.gen_range(-limit..limit)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glorot_is_seeded() {
        let a = GraphConvWeights::glorot(7);
        assert_eq!(a, GraphConvWeights::glorot(7));
        assert_ne!(a.dense, GraphConvWeights::glorot(8).dense);
        assert_eq!(a.conv.len(), 2);
        assert_eq!(a.conv[0].self_weights.len(), MAX_DEGREE + 1);
        assert_eq!(a.conv[0].self_weights[0].len(), ATOM_FEATURES);
        assert_eq!(a.heads.len(), 12);
        let limit = (6.0 / (ATOM_FEATURES + CONV_WIDTH) as f64).sqrt();
        assert!(a.conv[0].neighbor_weights[3]
            .iter()
            .flatten()
            .all(|w| w.abs() <= limit));
    }

    #[test]
    fn save_and_load() {
        let path = std::env::temp_dir().join(format!("moltox-weights-{}.json", std::process::id()));
        let weights = GraphConvWeights::glorot(1);
        weights.save(&path).unwrap();
        let loaded = GraphConvWeights::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let flat = |w: &GraphConvWeights| -> Vec<f64> {
            w.heads.iter().flat_map(|h| h.weight.iter().flatten().copied()).collect()
        };
        for (a, b) in flat(&loaded).iter().zip(flat(&weights).iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(loaded.conv.len(), 2);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = GraphConvWeights::load(Path::new("/nonexistent/moltox.json")).unwrap_err();
        assert!(matches!(err, WeightsError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/moltox.json"));
    }

    #[test]
    fn epsilon_defaults() {
        let bn: BatchNormWeights = serde_json::from_str(
            r#"{"gamma":[1],"beta":[0],"moving_mean":[0],"moving_variance":[1]}"#,
        )
        .unwrap();
        assert_eq!(bn.epsilon, 1e-3);
    }
}
