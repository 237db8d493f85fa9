//! Bond conjugation.
//!
//! A bond is conjugated when it is aromatic, or when it joins a multiple
//! bond to another pi-capable neighbor through a shared atom (C=C-C=C,
//! C=C-O, O=C-N and so on).

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::bond::BondOrder;
use crate::element::{outer_shell_electrons, Element};
use crate::mol::Mol;
use crate::traits::{HasAromaticity, HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount};
use crate::valence::{radical_electrons, total_valence};

/// Electrons an atom can offer to a pi system: unused valence plus lone
/// pairs, minus radicals. Negative means "not a candidate".
fn available_pi_electrons<A, B>(mol: &Mol<A, B>, idx: NodeIndex) -> i16
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge,
    B: HasBondOrder,
{
    let atom = mol.atom(idx);
    let Some(&default_valence) = Element::from_atomic_num(atom.atomic_num())
        .and_then(|e| e.default_valences().first())
    else {
        return -1;
    };
    if default_valence <= 1 {
        return -1;
    }
    let degree = mol.degree(idx) as i16 + i16::from(atom.hydrogen_count());
    if degree > 3 {
        return -1;
    }
    let outer = i16::from(outer_shell_electrons(atom.atomic_num()));
    let lone_electrons =
        (outer - i16::from(default_valence) - i16::from(atom.formal_charge())).max(0);
    let radicals = i16::from(radical_electrons(mol, idx));
    (i16::from(default_valence) - degree) + lone_electrons - radicals
}

fn is_candidate<A, B>(mol: &Mol<A, B>, idx: NodeIndex) -> bool
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge,
    B: HasBondOrder,
{
    let atom = mol.atom(idx);
    let anum = atom.atomic_num();
    let Some(&default_valence) = Element::from_atomic_num(anum)
        .and_then(|e| e.default_valences().first())
    else {
        return false;
    };
    if atom.formal_charge() == 0 && total_valence(mol, idx) > default_valence {
        return false;
    }
    // Second-row-and-below pnictogens and chalcogens only join as terminal
    // chalcogens.
    let outer = outer_shell_electrons(anum);
    let degree = mol.degree(idx) + atom.hydrogen_count() as usize;
    let row_ok = anum <= 10 || (outer != 5 && outer != 6) || (outer == 6 && degree < 2);
    row_ok && available_pi_electrons(mol, idx) > 0
}

fn other_end<A, B>(mol: &Mol<A, B>, edge: EdgeIndex, from: NodeIndex) -> Option<NodeIndex> {
    let (a, b) = mol.bond_endpoints(edge)?;
    Some(if a == from { b } else { a })
}

/// Per-bond conjugation flags, indexed by edge index.
pub fn assign_conjugation<A, B>(mol: &Mol<A, B>) -> Vec<bool>
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge + HasAromaticity,
    B: HasBondOrder,
{
    let mut conjugated = vec![false; mol.bond_count()];

    for edge in mol.bonds() {
        if let Some((a, b)) = mol.bond_endpoints(edge) {
            if mol.atom(a).is_aromatic() && mol.atom(b).is_aromatic() {
                conjugated[edge.index()] = true;
            }
        }
    }

    for center in mol.atoms() {
        if !is_candidate(mol, center) {
            continue;
        }
        let steric = mol.degree(center) + mol.atom(center).hydrogen_count() as usize;
        if !(2..=3).contains(&steric) {
            continue;
        }
        let bonds: Vec<EdgeIndex> = mol.bonds_of(center).collect();
        for &multiple in &bonds {
            if mol.bond(multiple).bond_order() == BondOrder::Single {
                continue;
            }
            let Some(partner) = other_end(mol, multiple, center) else {
                continue;
            };
            if !is_candidate(mol, partner) {
                continue;
            }
            for &other in bonds.iter().filter(|&&e| e != multiple) {
                let Some(neighbor) = other_end(mol, other, center) else {
                    continue;
                };
                let neighbor_steric =
                    mol.degree(neighbor) + mol.atom(neighbor).hydrogen_count() as usize;
                if neighbor_steric <= 3 && is_candidate(mol, neighbor) {
                    conjugated[multiple.index()] = true;
                    conjugated[other.index()] = true;
                }
            }
        }
    }

    conjugated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::from_smiles;

    fn conj(smiles: &str) -> Vec<bool> {
        let mol = from_smiles(smiles).unwrap();
        assign_conjugation(&mol)
    }

    #[test]
    fn saturated_and_isolated() {
        assert_eq!(conj("CC"), vec![false]);
        assert_eq!(conj("C=C"), vec![false]);
        assert_eq!(conj("CC=C"), vec![false, false]);
        assert!(conj("C1CCCCC1").iter().all(|&c| !c));
    }

    #[test]
    fn dienes_and_enones() {
        assert_eq!(conj("C=CC=C"), vec![true, true, true]);
        assert_eq!(conj("C=CC=O"), vec![true, true, true]);
    }

    #[test]
    fn carboxyl_and_amide() {
        let c = conj("CC(=O)O");
        assert_eq!(c, vec![false, true, true]);
        let c = conj("CC(N)=O");
        assert_eq!(c, vec![false, true, true]);
    }

    #[test]
    fn heteroatom_on_ring() {
        assert!(conj("Nc1ccccc1")[0]);
        assert!(conj("Oc1ccccc1")[0]);
    }
}
