//! ConvMol atom features.
//!
//! Each atom becomes a 75-wide row:
//!
//! | slice   | feature                                   |
//! |---------|-------------------------------------------|
//! | 0..44   | element one-hot, last slot is `Unknown`   |
//! | 44..55  | degree 0..=10                             |
//! | 55..62  | implicit hydrogens 0..=6                  |
//! | 62      | formal charge                             |
//! | 63      | radical electrons                         |
//! | 64..69  | hybridization SP, SP2, SP3, SP3D, SP3D2   |
//! | 69      | aromatic                                  |
//! | 70..75  | total hydrogens 0..=4 (4 means 4 or more) |

use ndarray::Array2;
use petgraph::graph::NodeIndex;

use super::ToxicityError;
use crate::element::Element;
use crate::hybridization::Hybridization;
use crate::hydrogen::total_hydrogens;
use crate::sanitize::MoleculeGraph;
use crate::valence::radical_electrons;

pub const ATOM_FEATURES: usize = 75;
pub const MAX_DEGREE: usize = 10;
const MAX_IMPLICIT_HYDROGENS: usize = 6;
const MAX_TOTAL_HYDROGENS: usize = 4;

const ELEMENTS: [&str; 44] = [
    "C", "N", "O", "S", "F", "Si", "P", "Cl", "Br", "Mg", "Na", "Ca", "Fe", "As", "Al", "I", "B",
    "V", "K", "Tl", "Yb", "Sb", "Sn", "Ag", "Pd", "Co", "Se", "Ti", "Zn", "H", "Li", "Ge", "Cu",
    "Au", "Ni", "Cd", "In", "Mn", "Zr", "Cr", "Pt", "Hg", "Pb", "Unknown",
];

const DEGREE_OFFSET: usize = 44;
const IMPLICIT_H_OFFSET: usize = DEGREE_OFFSET + MAX_DEGREE + 1;
const CHARGE: usize = IMPLICIT_H_OFFSET + MAX_IMPLICIT_HYDROGENS + 1;
const RADICALS: usize = CHARGE + 1;
const HYBRIDIZATION_OFFSET: usize = RADICALS + 1;
const AROMATIC: usize = HYBRIDIZATION_OFFSET + 5;
const TOTAL_H_OFFSET: usize = AROMATIC + 1;

/// Atom feature matrix plus adjacency lists, one row and list per atom.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvMolFeatures {
    pub atom_features: Array2<f64>,
    pub adjacency: Vec<Vec<usize>>,
}

impl ConvMolFeatures {
    pub fn atom_count(&self) -> usize {
        self.adjacency.len()
    }
}

pub fn featurize(graph: &MoleculeGraph) -> Result<ConvMolFeatures, ToxicityError> {
    let mol = graph.mol();
    if mol.is_empty() {
        return Err(ToxicityError::FeaturizationError("molecule has no atoms".to_owned()));
    }

    let n = mol.atom_count();
    let mut features = Array2::zeros((n, ATOM_FEATURES));
    let mut adjacency = Vec::with_capacity(n);

    for idx in mol.atoms() {
        let i = idx.index();
        let atom = mol.atom(idx);
        let mut row = features.row_mut(i);

        let symbol = Element::from_atomic_num(atom.atomic_num).map_or("?", Element::symbol);
        let slot = ELEMENTS[..ELEMENTS.len() - 1]
            .iter()
            .position(|&s| s == symbol)
            .ok_or_else(|| unsupported(idx, format!("element {symbol} is outside the vocabulary")))?;
        row[slot] = 1.0;

        let neighbors: Vec<usize> = mol.sorted_neighbors(idx).iter().map(|n| n.index()).collect();
        if neighbors.len() > MAX_DEGREE {
            return Err(unsupported(idx, format!("degree {} exceeds {MAX_DEGREE}", neighbors.len())));
        }
        row[DEGREE_OFFSET + neighbors.len()] = 1.0;

        let implicit = usize::from(atom.hydrogen_count);
        if implicit > MAX_IMPLICIT_HYDROGENS {
            return Err(unsupported(
                idx,
                format!("{implicit} implicit hydrogens exceed {MAX_IMPLICIT_HYDROGENS}"),
            ));
        }
        row[IMPLICIT_H_OFFSET + implicit] = 1.0;

        row[CHARGE] = f64::from(atom.formal_charge);
        row[RADICALS] = f64::from(radical_electrons(mol, idx));

        let hybrid_slot = match graph.hybridization(idx) {
            Hybridization::SP => Some(0),
            Hybridization::SP2 => Some(1),
            Hybridization::SP3 => Some(2),
            Hybridization::SP3D => Some(3),
            Hybridization::SP3D2 => Some(4),
            Hybridization::S | Hybridization::Other => None,
        };
        if let Some(s) = hybrid_slot {
            row[HYBRIDIZATION_OFFSET + s] = 1.0;
        }
        if atom.is_aromatic {
            row[AROMATIC] = 1.0;
        }
        let total = usize::from(total_hydrogens(mol, idx)).min(MAX_TOTAL_HYDROGENS);
        row[TOTAL_H_OFFSET + total] = 1.0;

        adjacency.push(neighbors);
    }

    Ok(ConvMolFeatures {
        atom_features: features,
        adjacency,
    })
}

fn unsupported(idx: NodeIndex, message: String) -> ToxicityError {
    ToxicityError::FeaturizationError(format!("atom {}: {message}", idx.index()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(smiles: &str) -> Result<ConvMolFeatures, ToxicityError> {
        featurize(&MoleculeGraph::from_smiles(smiles).unwrap())
    }

    #[test]
    fn layout_constants_add_up() {
        assert_eq!(TOTAL_H_OFFSET + MAX_TOTAL_HYDROGENS + 1, ATOM_FEATURES);
    }

    #[test]
    fn ethanol_rows() {
        let f = features("CCO").unwrap();
        assert_eq!(f.atom_features.dim(), (3, ATOM_FEATURES));
        assert_eq!(f.adjacency, vec![vec![1], vec![0, 2], vec![1]]);

        let oxygen = f.atom_features.row(2);
        assert_eq!(oxygen[2], 1.0);
        assert_eq!(oxygen[DEGREE_OFFSET + 1], 1.0);
        assert_eq!(oxygen[IMPLICIT_H_OFFSET + 1], 1.0);
        assert_eq!(oxygen[HYBRIDIZATION_OFFSET + 2], 1.0);
        assert_eq!(oxygen[TOTAL_H_OFFSET + 1], 1.0);
        assert_eq!(oxygen[AROMATIC], 0.0);
        // element, degree, implicit H, hybridization, total H
        assert_eq!(oxygen.sum(), 5.0);
    }

    #[test]
    fn charges_and_aromaticity() {
        let f = features("c1ccccc1[O-]").unwrap();
        assert_eq!(f.atom_features[[0, AROMATIC]], 1.0);
        assert_eq!(f.atom_features[[6, CHARGE]], -1.0);
    }

    #[test]
    fn unsupported_atoms_fail() {
        assert!(matches!(
            features("[U]"),
            Err(ToxicityError::FeaturizationError(_))
        ));
        assert!(matches!(
            features("[Xe]"),
            Err(ToxicityError::FeaturizationError(_))
        ));
    }

    #[test]
    fn methane_hydrogens_are_capped_in_the_total() {
        let f = features("C").unwrap();
        assert_eq!(f.atom_features[[0, IMPLICIT_H_OFFSET + 4]], 1.0);
        assert_eq!(f.atom_features[[0, TOTAL_H_OFFSET + 4]], 1.0);
    }
}
