//! Physicochemical descriptors.

mod crippen;
mod lipinski;
mod tpsa;

pub use crippen::{crippen_logp, heavy_atom_type, hydrogen_type, CrippenType};
pub use lipinski::{aromatic_rings, h_bond_acceptors, h_bond_donors, rotatable_bonds};
pub use tpsa::tpsa;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::formula::{average_mol_weight, exact_mol_weight, mol_formula};
use crate::sanitize::MoleculeGraph;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("invalid structure: {0}")]
    InvalidStructure(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptorSet {
    /// Average molecular weight, g/mol.
    pub molecular_weight: f64,
    /// Monoisotopic mass, g/mol.
    pub exact_molecular_weight: f64,
    pub logp: f64,
    pub h_bond_donors: u32,
    pub h_bond_acceptors: u32,
    pub rotatable_bonds: u32,
    /// Å².
    pub tpsa: f64,
    pub aromatic_rings: u32,
    pub formula: String,
}

/// Report form of a [`DescriptorSet`]: strings keyed by property name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayProperties {
    #[serde(rename = "Molecular Weight")]
    pub molecular_weight: String,
    #[serde(rename = "Exact Molecular Weight")]
    pub exact_molecular_weight: String,
    #[serde(rename = "LogP")]
    pub logp: String,
    #[serde(rename = "H-Bond Donors")]
    pub h_bond_donors: String,
    #[serde(rename = "H-Bond Acceptors")]
    pub h_bond_acceptors: String,
    #[serde(rename = "Rotatable Bonds")]
    pub rotatable_bonds: String,
    #[serde(rename = "TPSA")]
    pub tpsa: String,
    #[serde(rename = "Aromatic Rings")]
    pub aromatic_rings: String,
    #[serde(rename = "Formula")]
    pub formula: String,
}

pub fn compute(graph: &MoleculeGraph) -> Result<DescriptorSet, DescriptorError> {
    if graph.is_empty() {
        return Err(DescriptorError::InvalidStructure("molecule has no atoms".to_owned()));
    }
    let mol = graph.mol();
    let set = DescriptorSet {
        molecular_weight: average_mol_weight(mol),
        exact_molecular_weight: exact_mol_weight(mol),
        logp: crippen_logp(graph),
        h_bond_donors: h_bond_donors(graph),
        h_bond_acceptors: h_bond_acceptors(graph),
        rotatable_bonds: rotatable_bonds(graph),
        tpsa: tpsa(graph),
        aromatic_rings: aromatic_rings(mol, graph.rings()),
        formula: mol_formula(mol),
    };
    debug!(formula = %set.formula, mw = set.molecular_weight, logp = set.logp, "descriptors computed");
    Ok(set)
}

impl DescriptorSet {
    pub fn display(&self) -> DisplayProperties {
        DisplayProperties {
            molecular_weight: format!("{:.2}", self.molecular_weight),
            exact_molecular_weight: format!("{:.2}", self.exact_molecular_weight),
            logp: format!("{:.2}", self.logp),
            h_bond_donors: self.h_bond_donors.to_string(),
            h_bond_acceptors: self.h_bond_acceptors.to_string(),
            rotatable_bonds: self.rotatable_bonds.to_string(),
            tpsa: format!("{:.2}", self.tpsa),
            aromatic_rings: self.aromatic_rings.to_string(),
            formula: self.formula.clone(),
        }
    }

    /// One property per line, with units, for the explanation context.
    pub fn explanation(&self) -> String {
        let d = self.display();
        format!(
            "Molecular Weight: {} g/mol\n\
             Exact Molecular Weight: {} g/mol\n\
             LogP: {} (lipophilicity)\n\
             H-Bond Donors: {}\n\
             H-Bond Acceptors: {}\n\
             Rotatable Bonds: {}\n\
             TPSA: {} Å²\n\
             Aromatic Rings: {}",
            d.molecular_weight,
            d.exact_molecular_weight,
            d.logp,
            d.h_bond_donors,
            d.h_bond_acceptors,
            d.rotatable_bonds,
            d.tpsa,
            d.aromatic_rings
        )
    }
}
