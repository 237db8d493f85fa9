//! GraphConv forward pass.

use std::path::Path;

use ndarray::{Array1, Array2, Axis, Zip};
use tracing::info;

use super::featurize::{ConvMolFeatures, ATOM_FEATURES, MAX_DEGREE};
use super::weights::{
    BatchNormWeights, DenseWeights, GraphConvLayerWeights, GraphConvWeights, WeightsError,
    CONV_WIDTH, DENSE_WIDTH,
};
use super::{ToxicityError, ToxicityModel, ENDPOINTS};
use crate::config::ToxicityConfig;

#[derive(Debug, Clone)]
struct Dense {
    weight: Array2<f64>,
    bias: Array1<f64>,
}

/// Inference-mode batch norm folded into `x * scale + shift`.
#[derive(Debug, Clone)]
struct BatchNorm {
    scale: Array1<f64>,
    shift: Array1<f64>,
}

#[derive(Debug, Clone)]
struct GraphConvLayer {
    self_weights: Vec<Array2<f64>>,
    neighbor_weights: Vec<Array2<f64>>,
    bias: Vec<Array1<f64>>,
    batch_norm: BatchNorm,
}

/// Two GraphConv blocks, a dense layer, graph gather and one softmax head
/// per endpoint. Immutable once built.
#[derive(Debug, Clone)]
pub struct GraphConvModel {
    conv: Vec<GraphConvLayer>,
    dense: Dense,
    dense_batch_norm: BatchNorm,
    heads: Vec<Dense>,
}

impl GraphConvModel {
    pub fn from_weights(weights: &GraphConvWeights) -> Result<Self, WeightsError> {
        if weights.conv.len() != 2 {
            return Err(shape(format!("expected 2 conv layers, found {}", weights.conv.len())));
        }
        let conv = weights
            .conv
            .iter()
            .zip([ATOM_FEATURES, CONV_WIDTH])
            .enumerate()
            .map(|(i, (layer, input))| conv_layer(layer, input, &format!("conv[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        let dense_layer = dense(&weights.dense, CONV_WIDTH, DENSE_WIDTH, "dense")?;
        let dense_batch_norm = batch_norm(&weights.dense_batch_norm, DENSE_WIDTH, "dense_batch_norm")?;
        if weights.heads.len() != ENDPOINTS.len() {
            return Err(shape(format!(
                "expected {} heads, found {}",
                ENDPOINTS.len(),
                weights.heads.len()
            )));
        }
        let heads = weights
            .heads
            .iter()
            .enumerate()
            .map(|(i, h)| dense(h, 2 * DENSE_WIDTH, 2, &format!("heads[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            conv,
            dense: dense_layer,
            dense_batch_norm,
            heads,
        })
    }

    pub fn load(path: &Path) -> Result<Self, WeightsError> {
        Self::from_weights(&GraphConvWeights::load(path)?)
    }

    /// Model from the configured weight file, or seeded Glorot weights
    /// when none is set.
    pub fn from_config(config: &ToxicityConfig) -> Result<Self, WeightsError> {
        match &config.weights_path {
            Some(path) => {
                let model = Self::load(path)?;
                info!(path = %path.display(), "loaded toxicity weights");
                Ok(model)
            }
            None => {
                info!(seed = config.init_seed, "using initialized toxicity weights");
                Self::from_weights(&GraphConvWeights::glorot(config.init_seed))
            }
        }
    }

    fn graph_conv(layer: &GraphConvLayer, x: &Array2<f64>, adjacency: &[Vec<usize>]) -> Array2<f64> {
        let mut out = Array2::zeros((x.nrows(), CONV_WIDTH));
        for (i, neighbors) in adjacency.iter().enumerate() {
            let degree = neighbors.len();
            let mut row = x.row(i).dot(&layer.self_weights[degree]) + &layer.bias[degree];
            if degree > 0 {
                let mut summed = Array1::<f64>::zeros(x.ncols());
                for &j in neighbors {
                    summed += &x.row(j);
                }
                row += &summed.dot(&layer.neighbor_weights[degree]);
            }
            out.row_mut(i).assign(&row);
        }
        out
    }

    fn graph_pool(x: &Array2<f64>, adjacency: &[Vec<usize>]) -> Array2<f64> {
        let mut out = x.clone();
        for (i, neighbors) in adjacency.iter().enumerate() {
            let mut row = out.row_mut(i);
            for &j in neighbors {
                Zip::from(&mut row).and(x.row(j)).for_each(|a, &b| *a = a.max(b));
            }
        }
        out
    }

    fn forward(&self, features: &ConvMolFeatures) -> Vec<f64> {
        let adjacency = &features.adjacency;
        let mut x = features.atom_features.clone();
        for layer in &self.conv {
            x = Self::graph_conv(layer, &x, adjacency);
            x.mapv_inplace(|v| v.max(0.0));
            layer.batch_norm.apply(&mut x);
            x = Self::graph_pool(&x, adjacency);
        }

        let mut atoms = x.dot(&self.dense.weight) + &self.dense.bias;
        atoms.mapv_inplace(f64::tanh);
        self.dense_batch_norm.apply(&mut atoms);

        let summed = atoms.sum_axis(Axis(0));
        let maxed = atoms.fold_axis(Axis(0), f64::NEG_INFINITY, |&m, &v| m.max(v));
        let gathered: Array1<f64> = summed.iter().chain(maxed.iter()).map(|v| v.tanh()).collect();

        self.heads
            .iter()
            .map(|head| {
                let logits = gathered.dot(&head.weight) + &head.bias;
                positive_class_probability(logits[0], logits[1])
            })
            .collect()
    }
}

impl ToxicityModel for GraphConvModel {
    fn probabilities(&self, features: &ConvMolFeatures) -> Result<Vec<f64>, ToxicityError> {
        if features.atom_features.ncols() != ATOM_FEATURES
            || features.atom_features.nrows() != features.atom_count()
        {
            return Err(ToxicityError::InferenceError(format!(
                "feature matrix is {:?}, expected ({}, {ATOM_FEATURES})",
                features.atom_features.dim(),
                features.atom_count()
            )));
        }
        if let Some(bad) = features
            .adjacency
            .iter()
            .flatten()
            .find(|&&j| j >= features.atom_count())
        {
            return Err(ToxicityError::InferenceError(format!(
                "adjacency references atom {bad}"
            )));
        }
        if features.adjacency.iter().any(|n| n.len() > MAX_DEGREE) {
            return Err(ToxicityError::InferenceError(format!(
                "atom degree exceeds {MAX_DEGREE}"
            )));
        }
        Ok(self.forward(features))
    }
}

/// Softmax over two logits, returning the second class.
fn positive_class_probability(negative: f64, positive: f64) -> f64 {
    let m = negative.max(positive);
    let (en, ep) = ((negative - m).exp(), (positive - m).exp());
    ep / (en + ep)
}

impl BatchNorm {
    fn apply(&self, x: &mut Array2<f64>) {
        for mut row in x.rows_mut() {
            Zip::from(&mut row)
                .and(&self.scale)
                .and(&self.shift)
                .for_each(|v, &s, &b| *v = *v * s + b);
        }
    }
}

fn shape(message: String) -> WeightsError {
    WeightsError::Shape(message)
}

fn matrix(rows: &[Vec<f64>], n_in: usize, n_out: usize, name: &str) -> Result<Array2<f64>, WeightsError> {
    if rows.len() != n_in || rows.iter().any(|r| r.len() != n_out) {
        return Err(shape(format!("{name} must be {n_in}x{n_out}")));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((n_in, n_out), flat).map_err(|e| shape(format!("{name}: {e}")))
}

fn vector(values: &[f64], len: usize, name: &str) -> Result<Array1<f64>, WeightsError> {
    if values.len() != len {
        return Err(shape(format!("{name} must have {len} entries, found {}", values.len())));
    }
    Ok(Array1::from(values.to_vec()))
}

fn dense(w: &DenseWeights, n_in: usize, n_out: usize, name: &str) -> Result<Dense, WeightsError> {
    Ok(Dense {
        weight: matrix(&w.weight, n_in, n_out, &format!("{name}.weight"))?,
        bias: vector(&w.bias, n_out, &format!("{name}.bias"))?,
    })
}

fn batch_norm(w: &BatchNormWeights, width: usize, name: &str) -> Result<BatchNorm, WeightsError> {
    let gamma = vector(&w.gamma, width, &format!("{name}.gamma"))?;
    let beta = vector(&w.beta, width, &format!("{name}.beta"))?;
    let mean = vector(&w.moving_mean, width, &format!("{name}.moving_mean"))?;
    let var = vector(&w.moving_variance, width, &format!("{name}.moving_variance"))?;
    if var.iter().any(|&v| v + w.epsilon <= 0.0) {
        return Err(shape(format!("{name}: variance plus epsilon must be positive")));
    }
    let scale = &gamma / &var.mapv(|v| (v + w.epsilon).sqrt());
    let shift = &beta - &(&mean * &scale);
    Ok(BatchNorm { scale, shift })
}

fn conv_layer(w: &GraphConvLayerWeights, n_in: usize, name: &str) -> Result<GraphConvLayer, WeightsError> {
    let per_degree = MAX_DEGREE + 1;
    if w.self_weights.len() != per_degree
        || w.neighbor_weights.len() != per_degree
        || w.bias.len() != per_degree
    {
        return Err(shape(format!("{name} needs {per_degree} weights per degree")));
    }
    let self_weights = w
        .self_weights
        .iter()
        .map(|m| matrix(m, n_in, CONV_WIDTH, &format!("{name}.self_weights")))
        .collect::<Result<Vec<_>, _>>()?;
    let neighbor_weights = w
        .neighbor_weights
        .iter()
        .map(|m| matrix(m, n_in, CONV_WIDTH, &format!("{name}.neighbor_weights")))
        .collect::<Result<Vec<_>, _>>()?;
    let bias = w
        .bias
        .iter()
        .map(|b| vector(b, CONV_WIDTH, &format!("{name}.bias")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(GraphConvLayer {
        self_weights,
        neighbor_weights,
        bias,
        batch_norm: batch_norm(&w.batch_norm, CONV_WIDTH, &format!("{name}.batch_norm"))?,
    })
}
