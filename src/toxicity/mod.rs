//! Multi-task toxicity classification over the Tox21 endpoints.

mod featurize;
mod model;
mod weights;

pub use featurize::{featurize, ConvMolFeatures, ATOM_FEATURES, MAX_DEGREE};
pub use model::GraphConvModel;
pub use weights::{
    BatchNormWeights, DenseWeights, GraphConvLayerWeights, GraphConvWeights, WeightsError,
    CONV_WIDTH, DENSE_WIDTH,
};

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::sanitize::MoleculeGraph;

pub const ENDPOINTS: [&str; 12] = [
    "NR-AR",
    "NR-AR-LBD",
    "NR-AhR",
    "NR-Aromatase",
    "NR-ER",
    "NR-ER-LBD",
    "NR-PPAR-gamma",
    "SR-ARE",
    "SR-ATAD5",
    "SR-HSE",
    "SR-MMP",
    "SR-p53",
];

/// Probabilities strictly above this are labelled toxic.
pub const THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToxicityError {
    #[error("featurization failed: {0}")]
    FeaturizationError(String),
    #[error("inference failed: {0}")]
    InferenceError(String),
}

impl From<WeightsError> for ToxicityError {
    fn from(e: WeightsError) -> Self {
        Self::InferenceError(e.to_string())
    }
}

/// A classifier shared read-only between pipeline runs.
pub trait ToxicityModel: Send + Sync {
    /// Positive-class probability per endpoint, in [`ENDPOINTS`] order.
    fn probabilities(&self, features: &ConvMolFeatures) -> Result<Vec<f64>, ToxicityError>;

    fn predict(&self, graph: &MoleculeGraph) -> Result<ToxicityProfile, ToxicityError> {
        let features = featurize(graph)?;
        let probabilities = self.probabilities(&features)?;
        let profile = ToxicityProfile::from_probabilities(&probabilities)?;
        debug!(toxic = profile.toxic_count(), "toxicity predicted");
        Ok(profile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Prediction {
    Toxic,
    #[serde(rename = "Non-Toxic")]
    NonToxic,
}

impl Prediction {
    pub fn from_probability(p: f64) -> Self {
        if p > THRESHOLD {
            Self::Toxic
        } else {
            Self::NonToxic
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Toxic => "Toxic",
            Self::NonToxic => "Non-Toxic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointPrediction {
    pub endpoint: &'static str,
    pub prediction: Prediction,
    pub probability: f64,
}

impl EndpointPrediction {
    /// Probability with two decimals.
    pub fn confidence(&self) -> String {
        format!("{:.2}", self.probability)
    }
}

impl Serialize for EndpointPrediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("EndpointPrediction", 2)?;
        s.serialize_field("prediction", &self.prediction)?;
        s.serialize_field("confidence", &self.confidence())?;
        s.end()
    }
}

/// Twelve endpoint predictions in fixed order. Serializes as a map from
/// endpoint name to `{prediction, confidence}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToxicityProfile {
    entries: Vec<EndpointPrediction>,
}

impl ToxicityProfile {
    pub fn from_probabilities(probabilities: &[f64]) -> Result<Self, ToxicityError> {
        if probabilities.len() != ENDPOINTS.len() {
            return Err(ToxicityError::InferenceError(format!(
                "model returned {} outputs for {} endpoints",
                probabilities.len(),
                ENDPOINTS.len()
            )));
        }
        let entries = ENDPOINTS
            .iter()
            .zip(probabilities)
            .map(|(&endpoint, &p)| {
                if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                    return Err(ToxicityError::InferenceError(format!(
                        "{endpoint}: probability {p} is not in [0, 1]"
                    )));
                }
                Ok(EndpointPrediction {
                    endpoint,
                    prediction: Prediction::from_probability(p),
                    probability: p,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[EndpointPrediction] {
        &self.entries
    }

    pub fn get(&self, endpoint: &str) -> Option<&EndpointPrediction> {
        self.entries.iter().find(|e| e.endpoint == endpoint)
    }

    pub fn toxic_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.prediction == Prediction::Toxic)
            .count()
    }

    /// `"{endpoint}: {prediction} (confidence: {x.xx})"`, one line each.
    pub fn explanation(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "{}: {} (confidence: {})",
                    e.endpoint,
                    e.prediction.as_str(),
                    e.confidence()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Serialize for ToxicityProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for e in &self.entries {
            map.serialize_entry(e.endpoint, e)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Fixed(Vec<f64>);

    impl ToxicityModel for Fixed {
        fn probabilities(&self, _features: &ConvMolFeatures) -> Result<Vec<f64>, ToxicityError> {
            Ok(self.0.clone())
        }
    }

    fn ethanol() -> MoleculeGraph {
        MoleculeGraph::from_smiles("CCO").unwrap()
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(Prediction::from_probability(0.5), Prediction::NonToxic);
        assert_eq!(Prediction::from_probability(0.5000001), Prediction::Toxic);
        assert_eq!(Prediction::from_probability(0.0), Prediction::NonToxic);
    }

    #[test]
    fn stub_models_drive_the_profile() {
        let mut p = vec![0.1; 12];
        p[0] = 0.5;
        p[11] = 0.93;
        let model: Arc<dyn ToxicityModel> = Arc::new(Fixed(p));
        let profile = model.predict(&ethanol()).unwrap();
        assert_eq!(profile.entries().len(), 12);
        assert_eq!(profile.get("NR-AR").unwrap().prediction, Prediction::NonToxic);
        assert_eq!(profile.get("SR-p53").unwrap().prediction, Prediction::Toxic);
        assert_eq!(profile.toxic_count(), 1);
        assert!(profile
            .explanation()
            .ends_with("SR-p53: Toxic (confidence: 0.93)"));
    }

    #[test]
    fn bad_outputs_are_inference_errors() {
        for p in [vec![0.2; 11], vec![f64::NAN; 12], vec![1.5; 12]] {
            assert!(matches!(
                Fixed(p).predict(&ethanol()),
                Err(ToxicityError::InferenceError(_))
            ));
        }
    }

    #[test]
    fn json_keeps_endpoint_order() {
        let profile = ToxicityProfile::from_probabilities(&[0.25; 12]).unwrap();
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.starts_with(r#"{"NR-AR":{"prediction":"Non-Toxic","confidence":"0.25"},"NR-AR-LBD""#));
        assert!(json.find("SR-MMP").unwrap() < json.find("SR-p53").unwrap());
    }

    #[test]
    fn graph_conv_is_shareable() {
        fn assert_shareable<T: Send + Sync>() {}
        assert_shareable::<GraphConvModel>();
        assert_shareable::<Arc<dyn ToxicityModel>>();
    }

    #[test]
    fn weight_errors_become_inference_errors() {
        let err: ToxicityError = WeightsError::Shape("heads".into()).into();
        assert!(matches!(err, ToxicityError::InferenceError(m) if m.contains("heads")));
    }
}
