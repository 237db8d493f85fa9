//! Pipeline configuration.
//!
//! Read from a TOML file named by `--config` or the `MOLTOX_CONFIG`
//! environment variable. Every section and key is optional; a missing file
//! path means all defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV: &str = "MOLTOX_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub conformer: ConformerConfig,
    pub toxicity: ToxicityConfig,
    pub render: RenderConfig,
    pub explanation: ExplanationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformerConfig {
    /// Fixed embedding seed. `None` derives one from the molecule.
    pub seed: Option<u64>,
    pub max_embed_attempts: u32,
    pub max_iterations: u32,
    /// RMS gradient (kcal/mol/Å) below which minimization stops.
    pub gradient_tolerance: f64,
    /// Relative energy change below which minimization stops.
    pub energy_tolerance: f64,
}

impl Default for ConformerConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_embed_attempts: 10,
            max_iterations: 500,
            gradient_tolerance: 0.1,
            energy_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToxicityConfig {
    /// JSON weight file. Without one the network is Glorot-initialized.
    pub weights_path: Option<PathBuf>,
    pub init_seed: u64,
}

impl Default for ToxicityConfig {
    fn default() -> Self {
        Self {
            weights_path: None,
            init_seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub depiction_size: u32,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            depiction_size: 400,
            chart_width: 1200,
            chart_height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    pub enabled: bool,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gemini-1.5-flash".to_owned(),
            base_url: "https://generativelanguage.googleapis.com".to_owned(),
            timeout_secs: 30,
            api_key_env: "GENAI_API_KEY".to_owned(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Load from `explicit`, else from `$MOLTOX_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Self::from_file(Path::new(&path)),
                None => Ok(Self::default()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = PipelineConfig::from_toml("").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.conformer.max_iterations, 500);
        assert_eq!(cfg.conformer.max_embed_attempts, 10);
        assert_eq!(cfg.explanation.model, "gemini-1.5-flash");
        assert_eq!(cfg.render.chart_width, 1200);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = PipelineConfig::from_toml(
            r#"
            [conformer]
            seed = 7

            [explanation]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.conformer.seed, Some(7));
        assert_eq!(cfg.conformer.max_iterations, 500);
        assert!(!cfg.explanation.enabled);
        assert_eq!(cfg.explanation.api_key_env, "GENAI_API_KEY");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            PipelineConfig::from_toml("[conformer"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/moltox.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
