//! Hydrogen-bond counts, rotatable bonds and aromatic rings.

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::hydrogen::total_hydrogens;
use crate::mol::Mol;
use crate::rings::RingInfo;
use crate::sanitize::MoleculeGraph;
use crate::valence::total_valence;

fn heavy_degree(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> usize {
    mol.neighbors(idx).filter(|&n| mol.atom(n).atomic_num > 1).count()
}

/// Lipinski donors: N-H (neutral trivalent or cationic tetravalent),
/// neutral O-H and S-H, and neutral pyrrole-type aromatic N-H.
pub fn h_bond_donors(graph: &MoleculeGraph) -> u32 {
    let mol = graph.mol();
    mol.atoms().filter(|&i| is_donor(mol, i)).count() as u32
}

fn is_donor(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    let atom = mol.atom(idx);
    let h = total_hydrogens(mol, idx);
    let v = total_valence(mol, idx);
    match (atom.atomic_num, atom.is_aromatic) {
        (7, false) => h > 0 && (v == 3 || (atom.formal_charge == 1 && v == 4)),
        (7, true) => h == 1 && atom.formal_charge == 0,
        (8 | 16, false) => h == 1 && atom.formal_charge == 0,
        _ => false,
    }
}

/// Lipinski acceptors: divalent O and S (hydroxyls only when not on an
/// acyl-like atom), anionic O and S, trivalent N except amide-like N on
/// an acyclic C=X, aromatic N without H, aromatic O and S, and fluorine.
pub fn h_bond_acceptors(graph: &MoleculeGraph) -> u32 {
    let mol = graph.mol();
    let rings = graph.rings();
    mol.atoms().filter(|&i| is_acceptor(mol, rings, i)).count() as u32
}

fn is_acceptor(mol: &Mol<Atom, Bond>, rings: &RingInfo, idx: NodeIndex) -> bool {
    let atom = mol.atom(idx);
    let h = total_hydrogens(mol, idx);
    let v = total_valence(mol, idx);
    match (atom.atomic_num, atom.is_aromatic) {
        (9, _) => true,
        (8 | 16, false) => {
            atom.formal_charge < 0
                || (v == 2 && h == 0)
                || (v == 2
                    && h == 1
                    && single_bonded(mol, idx)
                        .filter(|&n| mol.atom(n).atomic_num > 1)
                        .any(|n| !double_bonded_to_heteroatom(mol, rings, n, false)))
        }
        (7, false) => {
            v == 3 && !single_bonded(mol, idx).any(|n| double_bonded_to_heteroatom(mol, rings, n, true))
        }
        (7, true) => h == 0 && atom.formal_charge == 0,
        (8 | 16, true) => atom.formal_charge == 0,
        _ => false,
    }
}

/// Neighbors joined by a non-aromatic single bond.
fn single_bonded<'a>(mol: &'a Mol<Atom, Bond>, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + 'a {
    mol.bonds_of(idx).filter_map(move |e| {
        let bond = mol.bond(e);
        if bond.order != BondOrder::Single || bond.is_aromatic {
            return None;
        }
        let (a, b) = mol.bond_endpoints(e)?;
        Some(if a == idx { b } else { a })
    })
}

/// Whether `idx` carries a non-aromatic double bond to N, O, P or S,
/// optionally only counting bonds outside rings.
fn double_bonded_to_heteroatom(
    mol: &Mol<Atom, Bond>,
    rings: &RingInfo,
    idx: NodeIndex,
    acyclic_only: bool,
) -> bool {
    mol.bonds_of(idx).any(|e| {
        let bond = mol.bond(e);
        let Some((a, b)) = mol.bond_endpoints(e) else {
            return false;
        };
        let other = if a == idx { b } else { a };
        bond.order == BondOrder::Double
            && !bond.is_aromatic
            && matches!(mol.atom(other).atomic_num, 7 | 8 | 15 | 16)
            && !(acyclic_only && rings.is_ring_bond(a, b))
    })
}

/// N single-bonded to a carbonyl carbon.
fn is_amide_nitrogen(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    mol.atom(idx).atomic_num == 7
        && mol.bonds_of(idx).any(|e| {
            let bond = mol.bond(e);
            if bond.order != BondOrder::Single || bond.is_aromatic {
                return false;
            }
            let Some((a, b)) = mol.bond_endpoints(e) else {
                return false;
            };
            let c = if a == idx { b } else { a };
            mol.atom(c).atomic_num == 6 && is_carbonyl_carbon(mol, c)
        })
}

fn is_carbonyl_carbon(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    mol.bonds_of(idx).any(|e| {
        let Some((a, b)) = mol.bond_endpoints(e) else {
            return false;
        };
        let other = if a == idx { b } else { a };
        mol.bond(e).order == BondOrder::Double && mol.atom(other).atomic_num == 8
    })
}

fn in_triple_bond(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    mol.bonds_of(idx)
        .any(|e| mol.bond(e).order == BondOrder::Triple)
}

/// Acyclic single bonds between non-terminal heavy atoms, skipping
/// bonds next to a triple bond and amide C-N bonds.
pub fn rotatable_bonds(graph: &MoleculeGraph) -> u32 {
    let mol = graph.mol();
    let rings = graph.rings();
    mol.bonds()
        .filter(|&e| {
            let bond = mol.bond(e);
            let Some((a, b)) = mol.bond_endpoints(e) else {
                return false;
            };
            if bond.order != BondOrder::Single || bond.is_aromatic || rings.is_ring_bond(a, b) {
                return false;
            }
            if mol.atom(a).atomic_num <= 1 || mol.atom(b).atomic_num <= 1 {
                return false;
            }
            if heavy_degree(mol, a) < 2 || heavy_degree(mol, b) < 2 {
                return false;
            }
            if in_triple_bond(mol, a) || in_triple_bond(mol, b) {
                return false;
            }
            let amide = (is_amide_nitrogen(mol, a) && is_carbonyl_carbon(mol, b))
                || (is_amide_nitrogen(mol, b) && is_carbonyl_carbon(mol, a));
            !amide
        })
        .count() as u32
}

/// SSSR rings whose atoms and bonds are all aromatic.
pub fn aromatic_rings(mol: &Mol<Atom, Bond>, rings: &RingInfo) -> u32 {
    rings
        .rings()
        .iter()
        .filter(|ring| {
            ring.iter().all(|&i| mol.atom(i).is_aromatic)
                && RingInfo::ring_edges(ring).all(|(a, b)| {
                    mol.bond_between(a, b)
                        .is_some_and(|e| mol.bond(e).is_aromatic)
                })
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(smiles: &str) -> MoleculeGraph {
        MoleculeGraph::from_smiles(smiles).unwrap()
    }

    #[test]
    fn donors_and_acceptors() {
        let cases = [
            ("CCO", 1, 1),
            ("CC(=O)O", 1, 1),
            ("CC(=O)Oc1ccccc1C(=O)O", 1, 3),
            ("CC(N)=O", 1, 1),
            ("c1ccncc1", 0, 1),
            ("c1cc[nH]c1", 1, 0),
            ("c1ccoc1", 0, 1),
            ("C[NH3+]", 1, 0),
            ("CN(C)c1ccccc1", 0, 1),
            ("CN(C)C", 0, 1),
            ("Fc1ccccc1", 0, 1),
            ("CCS", 1, 1),
            ("CC(=O)[O-]", 0, 2),
            ("O=C1CCCN1", 1, 1),
            ("C1=NCCN1", 1, 2),
        ];
        for (smiles, hbd, hba) in cases {
            let g = graph(smiles);
            assert_eq!(h_bond_donors(&g), hbd, "{smiles} donors");
            assert_eq!(h_bond_acceptors(&g), hba, "{smiles} acceptors");
        }
    }

    #[test]
    fn explicit_hydrogens_do_not_change_counts() {
        for smiles in ["CC(=O)O", "CCS", "CN(C)c1ccccc1", "C[NH3+]"] {
            let heavy = graph(smiles);
            let full = heavy.with_hydrogens();
            assert_eq!(h_bond_donors(&heavy), h_bond_donors(&full), "{smiles}");
            assert_eq!(h_bond_acceptors(&heavy), h_bond_acceptors(&full), "{smiles}");
        }
    }

    #[test]
    fn rotatable_bond_rules() {
        let cases = [
            ("CCO", 0),
            ("CCCC", 1),
            ("CCCCC", 2),
            ("CC(=O)NC", 0),
            ("CCC#CC", 0),
            ("c1ccccc1-c1ccccc1", 1),
            ("C1CCCCC1", 0),
            ("CCOC(=O)C", 2),
        ];
        for (smiles, expected) in cases {
            assert_eq!(rotatable_bonds(&graph(smiles)), expected, "{smiles}");
        }
    }

    #[test]
    fn hydrogens_do_not_add_rotors() {
        let g = graph("CCCC").with_hydrogens();
        assert_eq!(rotatable_bonds(&g), 1);
    }

    #[test]
    fn aromatic_ring_count() {
        for (smiles, expected) in [
            ("c1ccccc1", 1),
            ("c1ccc2ccccc2c1", 2),
            ("C1CCCCC1", 0),
            ("c1ccccc1C1CC1", 1),
        ] {
            let g = graph(smiles);
            assert_eq!(aromatic_rings(g.mol(), g.rings()), expected, "{smiles}");
        }
    }
}
