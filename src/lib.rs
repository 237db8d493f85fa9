//! SMILES in, chemical analysis out.
//!
//! The chemistry core (SMILES parsing, kekulization, rings, aromaticity,
//! valence, hybridization, hydrogens) feeds four analyses of a
//! [`MoleculeGraph`]: a DREIDING-minimized 3D conformer ([`conformer`]),
//! physicochemical [`descriptors`], a GraphConv [`toxicity`] profile and
//! 2D depictions ([`render`]). [`pipeline::Pipeline`] runs them all for one
//! request and assembles the report.

pub mod aromaticity;
pub mod atom;
pub mod bond;
pub mod config;
pub mod conformer;
pub mod conjugation;
pub mod descriptors;
pub mod element;
pub mod explain;
pub mod formula;
pub mod hybridization;
pub mod hydrogen;
pub mod kekulize;
pub mod mol;
pub mod molfile;
pub mod pipeline;
pub mod render;
pub mod rings;
pub mod sanitize;
pub mod smiles;
pub mod toxicity;
pub mod traits;
pub mod valence;

pub use atom::{Atom, Chirality};
pub use bond::{Bond, BondOrder, BondStereo, SmilesBond, SmilesBondOrder};
pub use config::PipelineConfig;
pub use conformer::{build_3d, Conformer3D, StructureError};
pub use descriptors::DescriptorSet;
pub use element::Element;
pub use hybridization::Hybridization;
pub use kekulize::{kekulize, KekulizeError};
pub use mol::Mol;
pub use pipeline::{Analysis, AnalysisReport, ConversionReport, Pipeline};
pub use sanitize::{MoleculeGraph, SanitizeError};
pub use smiles::{from_smiles, parse_smiles, SmilesError};
pub use toxicity::{ToxicityModel, ToxicityProfile};
pub use traits::{
    HasAromaticity, HasAtomicNum, HasBondOrder, HasBondStereo, HasChirality, HasFormalCharge,
    HasHydrogenCount, HasIsotope,
};
