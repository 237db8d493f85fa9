//! Request orchestration.
//!
//! A request moves through [`Stage`]s in a fixed order. Only parsing can
//! end it early; every later stage yields a [`StageResult`] and the
//! [`Analysis`] is assembled from whatever succeeded.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::conformer::{self, Conformer3D, StructureError};
use crate::descriptors::{self, DescriptorError, DescriptorSet, DisplayProperties};
use crate::explain::{build_context, service_from_config, ExplanationError, ExplanationService};
use crate::render::{self, RasterImage, RenderError, VectorImage};
use crate::sanitize::{MoleculeGraph, SanitizeError};
use crate::toxicity::{GraphConvModel, ToxicityError, ToxicityModel, ToxicityProfile, WeightsError};

pub const CONVERSION_MESSAGE: &str = "Molecule MOL file created successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Parsing,
    Building3D,
    ComputingDescriptors,
    ClassifyingToxicity,
    Rendering,
    Explaining,
    Assembling,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parsing => "parsing",
            Self::Building3D => "building_3d",
            Self::ComputingDescriptors => "computing_descriptors",
            Self::ClassifyingToxicity => "classifying_toxicity",
            Self::Rendering => "rendering",
            Self::Explaining => "explaining",
            Self::Assembling => "assembling",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Toxicity(#[from] ToxicityError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Explanation(#[from] ExplanationError),
    #[error("cancelled before {0} started")]
    Cancelled(Stage),
    /// An input this stage needs was not produced.
    #[error("skipped: {0}")]
    Skipped(&'static str),
}

pub type StageResult<T> = Result<T, StageError>;

/// Only a parse failure aborts an analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("invalid structure: {0}")]
    InvalidStructure(#[from] SanitizeError),
}

/// Everything one analysis produced, stage by stage.
#[derive(Debug)]
pub struct Analysis {
    pub graph: MoleculeGraph,
    pub structure: StageResult<Conformer3D>,
    pub descriptors: StageResult<DescriptorSet>,
    pub toxicity: StageResult<ToxicityProfile>,
    pub depiction: StageResult<VectorImage>,
    pub depiction_png: StageResult<RasterImage>,
    pub toxicity_chart: StageResult<RasterImage>,
    /// `None` when no question was asked.
    pub explanation: Option<StageResult<String>>,
    /// Context handed to the explanation service, when it was called.
    pub explanation_context: Option<String>,
}

/// `{endpoint: {prediction, confidence}}` or `{"Error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToxicityField {
    Profile(ToxicityProfile),
    Error {
        #[serde(rename = "Error")]
        error: String,
    },
}

/// JSON document returned by `analyze`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub properties: Option<DisplayProperties>,
    pub toxicity: ToxicityField,
    pub molecule_image: Option<String>,
    pub molecule_image_2d: Option<String>,
    pub toxicity_plot: Option<String>,
    pub mol_block: Option<String>,
    pub explanation_response: String,
    pub stage_errors: BTreeMap<String, String>,
}

/// JSON document returned by `convert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub message: String,
    pub mol_block: String,
}

fn record<T>(errors: &mut BTreeMap<String, String>, stage: Stage, result: &StageResult<T>) {
    match result {
        Ok(_) | Err(StageError::Skipped(_)) => {}
        Err(e) => {
            errors
                .entry(stage.as_str().to_owned())
                .and_modify(|m| {
                    m.push_str("; ");
                    m.push_str(&e.to_string());
                })
                .or_insert_with(|| e.to_string());
        }
    }
}

impl Analysis {
    pub fn report(&self) -> AnalysisReport {
        let mut stage_errors = BTreeMap::new();
        record(&mut stage_errors, Stage::Building3D, &self.structure);
        record(&mut stage_errors, Stage::ComputingDescriptors, &self.descriptors);
        record(&mut stage_errors, Stage::ClassifyingToxicity, &self.toxicity);
        record(&mut stage_errors, Stage::Rendering, &self.depiction_png);
        record(&mut stage_errors, Stage::Rendering, &self.depiction);
        record(&mut stage_errors, Stage::Rendering, &self.toxicity_chart);
        if let Some(explanation) = &self.explanation {
            record(&mut stage_errors, Stage::Explaining, explanation);
        }

        let toxicity = match &self.toxicity {
            Ok(profile) => ToxicityField::Profile(profile.clone()),
            Err(e) => ToxicityField::Error {
                error: format!("Prediction error: {e}"),
            },
        };
        let explanation_response = match &self.explanation {
            None => String::new(),
            Some(Ok(text)) => text.clone(),
            Some(Err(e)) => format!("Error: {e}"),
        };

        AnalysisReport {
            properties: self.descriptors.as_ref().ok().map(DescriptorSet::display),
            toxicity,
            molecule_image: self.depiction_png.as_ref().ok().map(RasterImage::to_base64),
            molecule_image_2d: self.depiction.as_ref().ok().map(VectorImage::data_uri),
            toxicity_plot: self.toxicity_chart.as_ref().ok().map(RasterImage::to_base64),
            mol_block: self.structure.as_ref().ok().map(Conformer3D::to_mol_block),
            explanation_response,
            stage_errors,
        }
    }
}

/// Shared, read-only pipeline state. One instance serves any number of
/// concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    model: Arc<dyn ToxicityModel>,
    explainer: Arc<dyn ExplanationService>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        model: Arc<dyn ToxicityModel>,
        explainer: Arc<dyn ExplanationService>,
    ) -> Self {
        Self {
            config,
            model,
            explainer,
        }
    }

    /// Build the GraphConv classifier and explanation backend named by
    /// `config`.
    pub fn from_config(config: PipelineConfig) -> Result<Self, WeightsError> {
        let model = Arc::new(GraphConvModel::from_config(&config.toxicity)?);
        let explainer = service_from_config(&config.explanation);
        Ok(Self::new(config, model, explainer))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn analyze(&self, smiles: &str, question: Option<&str>) -> Result<Analysis, PipelineError> {
        self.analyze_with_cancel(smiles, question, &AtomicBool::new(false))
    }

    /// Like [`Pipeline::analyze`], but once `cancel` is set every stage not
    /// yet started reports [`StageError::Cancelled`].
    #[instrument(skip(self, question, cancel), fields(question = question.is_some()))]
    pub fn analyze_with_cancel(
        &self,
        smiles: &str,
        question: Option<&str>,
        cancel: &AtomicBool,
    ) -> Result<Analysis, PipelineError> {
        let started = Instant::now();
        let graph = MoleculeGraph::from_smiles(smiles).map_err(|e| {
            warn!(error = %e, "rejected input");
            PipelineError::from(e)
        })?;

        let gate = |stage: Stage| -> StageResult<()> {
            if cancel.load(Ordering::Relaxed) {
                debug!(%stage, "cancelled");
                Err(StageError::Cancelled(stage))
            } else {
                Ok(())
            }
        };

        let structure = gate(Stage::Building3D)
            .and_then(|()| Ok(conformer::generate(&graph, &self.config.conformer)?));
        let descriptors =
            gate(Stage::ComputingDescriptors).and_then(|()| Ok(descriptors::compute(&graph)?));
        let toxicity =
            gate(Stage::ClassifyingToxicity).and_then(|()| Ok(self.model.predict(&graph)?));

        let size = self.config.render.depiction_size;
        let (depiction, depiction_png, toxicity_chart) = match gate(Stage::Rendering) {
            Ok(()) => (
                render::render_2d(&graph, size).map_err(StageError::from),
                render::render_2d_png(&graph, size).map_err(StageError::from),
                match &toxicity {
                    Ok(profile) => render::render_confidence_chart(
                        profile,
                        self.config.render.chart_width,
                        self.config.render.chart_height,
                    )
                    .map_err(StageError::from),
                    Err(_) => Err(StageError::Skipped("no toxicity profile")),
                },
            ),
            Err(_) => (
                Err(StageError::Cancelled(Stage::Rendering)),
                Err(StageError::Cancelled(Stage::Rendering)),
                Err(StageError::Cancelled(Stage::Rendering)),
            ),
        };

        let mut explanation_context = None;
        let explanation = question.filter(|q| !q.trim().is_empty()).map(|q| -> StageResult<String> {
            gate(Stage::Explaining)?;
            let properties = match &descriptors {
                Ok(d) => d.explanation(),
                Err(e) => format!("Molecular properties unavailable: {e}"),
            };
            let tox = match &toxicity {
                Ok(p) => p.explanation(),
                Err(e) => format!("Toxicity prediction unavailable: {e}"),
            };
            let context = build_context(graph.smiles(), &properties, &tox);
            let answer = self.explainer.generate(&context, q);
            explanation_context = Some(context);
            Ok(answer?)
        });

        for (stage, failed) in [
            (Stage::Building3D, structure.as_ref().err()),
            (Stage::ComputingDescriptors, descriptors.as_ref().err()),
            (Stage::ClassifyingToxicity, toxicity.as_ref().err()),
        ] {
            if let Some(e) = failed {
                warn!(%stage, error = %e, "stage failed");
            }
        }
        if let Some(Err(e)) = &explanation {
            warn!(stage = %Stage::Explaining, error = %e, "stage failed");
        }

        info!(
            smiles = %graph.smiles(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis assembled"
        );
        Ok(Analysis {
            graph,
            structure,
            descriptors,
            toxicity,
            depiction,
            depiction_png,
            toxicity_chart,
            explanation,
            explanation_context,
        })
    }

    /// 3D structure only, as a MOL block.
    #[instrument(skip(self))]
    pub fn convert(&self, smiles: &str) -> Result<ConversionReport, StructureError> {
        let conformer = conformer::build_3d(smiles, &self.config.conformer)?;
        info!(atoms = conformer.atom_count(), "conversion done");
        Ok(ConversionReport {
            message: CONVERSION_MESSAGE.to_owned(),
            mol_block: conformer.to_mol_block(),
        })
    }
}
