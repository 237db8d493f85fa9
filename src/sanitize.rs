//! Validated molecules.
//!
//! [`MoleculeGraph`] is the only way the rest of the crate sees a molecule:
//! it is built from SMILES, kekulized, valence-checked, ring-perceived and
//! aromaticity-perceived in one step, and never mutated afterwards.

use petgraph::graph::NodeIndex;
use thiserror::Error;
use tracing::debug;

use crate::aromaticity::perceive_aromaticity;
use crate::atom::Atom;
use crate::bond::Bond;
use crate::hybridization::{assign_hybridization, Hybridization};
use crate::hydrogen::add_hs;
use crate::mol::Mol;
use crate::rings::RingInfo;
use crate::smiles::{from_smiles, SmilesError};
use crate::valence::{check_valence, ValenceError};

/// Why a SMILES string does not describe a usable molecule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("invalid SMILES: {0}")]
    Smiles(#[from] SmilesError),
    #[error("invalid valence: {0}")]
    Valence(#[from] ValenceError),
}

#[derive(Debug, Clone)]
pub struct MoleculeGraph {
    smiles: String,
    mol: Mol<Atom, Bond>,
    rings: RingInfo,
    hybridization: Vec<Hybridization>,
}

impl MoleculeGraph {
    pub fn from_smiles(smiles: &str) -> Result<Self, SanitizeError> {
        let mol = from_smiles(smiles)?;
        check_valence(&mol)?;
        let graph = Self::perceive(smiles.trim().to_owned(), mol);
        debug!(
            smiles = %graph.smiles,
            atoms = graph.mol.atom_count(),
            rings = graph.rings.num_rings(),
            "sanitized molecule"
        );
        Ok(graph)
    }

    fn perceive(smiles: String, mut mol: Mol<Atom, Bond>) -> Self {
        let rings = RingInfo::sssr(&mol);
        perceive_aromaticity(&mut mol, &rings);
        let hybridization = assign_hybridization(&mol);
        Self {
            smiles,
            mol,
            rings,
            hybridization,
        }
    }

    /// A new graph with every implicit hydrogen made explicit. Heavy atoms
    /// keep their indices.
    pub fn with_hydrogens(&self) -> Self {
        Self::perceive(self.smiles.clone(), add_hs(&self.mol))
    }

    pub fn smiles(&self) -> &str {
        &self.smiles
    }

    pub fn mol(&self) -> &Mol<Atom, Bond> {
        &self.mol
    }

    pub fn rings(&self) -> &RingInfo {
        &self.rings
    }

    pub fn hybridization(&self, atom: NodeIndex) -> Hybridization {
        self.hybridization[atom.index()]
    }

    pub fn atom_count(&self) -> usize {
        self.mol.atom_count()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.mol
            .atoms()
            .filter(|&i| self.mol.atom(i).atomic_num > 1)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.mol.is_empty()
    }
}
