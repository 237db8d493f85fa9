use thiserror::Error;

use crate::sanitize::SanitizeError;

/// Ways 3D structure generation can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructureError {
    /// The input is not a chemically valid molecule.
    #[error("invalid structure: {0}")]
    InvalidStructure(#[from] SanitizeError),

    /// No coordinates satisfying the distance bounds were found.
    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    /// Minimization diverged or produced an unacceptable geometry.
    #[error("optimization failed: {0}")]
    OptimizationFailure(String),
}
