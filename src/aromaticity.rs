//! Hückel aromaticity over SSSR rings.
//!
//! Each ring atom contributes 0, 1 or 2 pi electrons (or disqualifies the
//! ring). A ring is aromatic when its total satisfies 4n + 2. Pairs of
//! fused rings that fail individually are retried as a single envelope,
//! which is what makes azulene aromatic.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::rings::RingInfo;
use crate::traits::{HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount};

/// Per-atom aromaticity.
pub fn find_aromatic_atoms<A, B>(mol: &Mol<A, B>, rings: &RingInfo) -> Vec<bool>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let mut aromatic = vec![false; mol.atom_count()];
    for system in aromatic_systems(mol, rings) {
        for ring in system {
            for atom in ring {
                aromatic[atom.index()] = true;
            }
        }
    }
    aromatic
}

/// Set `is_aromatic` on atoms and on the bonds of every aromatic ring.
/// Bond orders keep their Kekulé assignment.
pub fn perceive_aromaticity(mol: &mut Mol<Atom, Bond>, rings: &RingInfo) {
    let systems = aromatic_systems(mol, rings);

    let atoms: Vec<NodeIndex> = mol.atoms().collect();
    for idx in atoms {
        mol.atom_mut(idx).is_aromatic = false;
    }
    let bonds: Vec<_> = mol.bonds().collect();
    for e in bonds {
        mol.bond_mut(e).is_aromatic = false;
    }

    for system in systems {
        for ring in system {
            for (a, b) in RingInfo::ring_edges(ring) {
                mol.atom_mut(a).is_aromatic = true;
                if let Some(e) = mol.bond_between(a, b) {
                    mol.bond_mut(e).is_aromatic = true;
                }
            }
        }
    }
}

fn aromatic_systems<'r, A, B>(mol: &Mol<A, B>, rings: &'r RingInfo) -> Vec<Vec<&'r [NodeIndex]>>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let ring_bond = |a: NodeIndex, b: NodeIndex| rings.is_ring_bond(a, b);

    let mut found: Vec<Vec<&[NodeIndex]>> = Vec::new();
    let mut leftovers: Vec<&[NodeIndex]> = Vec::new();
    for ring in rings.rings() {
        let atoms: HashSet<NodeIndex> = ring.iter().copied().collect();
        match ring_pi_electrons(mol, &atoms, &ring_bond) {
            Some(pi) if is_huckel(pi) => found.push(vec![ring.as_slice()]),
            Some(_) => leftovers.push(ring.as_slice()),
            None => {}
        }
    }

    for (i, a) in leftovers.iter().enumerate() {
        for b in &leftovers[i + 1..] {
            let shared = a.iter().filter(|x| b.contains(x)).count();
            if shared != 2 {
                continue;
            }
            let atoms: HashSet<NodeIndex> = a.iter().chain(b.iter()).copied().collect();
            if ring_pi_electrons(mol, &atoms, &ring_bond).is_some_and(is_huckel) {
                found.push(vec![*a, *b]);
            }
        }
    }
    found
}

fn ring_pi_electrons<A, B>(
    mol: &Mol<A, B>,
    atoms: &HashSet<NodeIndex>,
    ring_bond: &dyn Fn(NodeIndex, NodeIndex) -> bool,
) -> Option<u8>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    if atoms.len() < 3 {
        return None;
    }
    atoms.iter().try_fold(0u8, |acc, &atom| {
        pi_electrons(mol, atom, ring_bond).map(|e| acc.saturating_add(e))
    })
}

/// Pi electrons donated by one ring atom, or `None` if the atom cannot be
/// part of an aromatic ring.
fn pi_electrons<A, B>(
    mol: &Mol<A, B>,
    idx: NodeIndex,
    ring_bond: &dyn Fn(NodeIndex, NodeIndex) -> bool,
) -> Option<u8>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let atom = mol.atom(idx);
    let mut ring_double = false;
    let mut exo_double_to_hetero = false;
    let mut exo_double_other = false;
    for e in mol.bonds_of(idx) {
        match mol.bond(e).bond_order() {
            BondOrder::Triple => return None,
            BondOrder::Double => {
                let Some((a, b)) = mol.bond_endpoints(e) else {
                    continue;
                };
                let other = if a == idx { b } else { a };
                if ring_bond(idx, other) {
                    ring_double = true;
                } else if matches!(mol.atom(other).atomic_num(), 7 | 8 | 16) {
                    exo_double_to_hetero = true;
                } else {
                    exo_double_other = true;
                }
            }
            BondOrder::Single => {}
        }
    }
    if exo_double_other {
        return None;
    }

    let degree = mol.degree(idx) + atom.hydrogen_count() as usize;
    let charge = atom.formal_charge();

    match (atom.atomic_num(), charge) {
        (6, 0) if ring_double => Some(1),
        (6, 0) if exo_double_to_hetero => Some(0),
        (6, -1) if !ring_double => Some(2),
        (6, 1) => Some(if ring_double { 1 } else { 0 }),
        (7 | 15 | 33, 0) if ring_double => Some(1),
        (7 | 15 | 33, 0) if degree == 3 && !exo_double_to_hetero => Some(2),
        (7 | 15 | 33, 1) if ring_double => Some(1),
        (7 | 15 | 33, -1) if degree == 2 => Some(2),
        (8 | 16 | 34 | 52, 0) if degree == 2 && !ring_double => Some(2),
        (8 | 16 | 34 | 52, 1) if ring_double => Some(1),
        (5, 0) => Some(if ring_double { 1 } else { 0 }),
        _ => None,
    }
}

fn is_huckel(pi_electrons: u8) -> bool {
    pi_electrons >= 2 && (pi_electrons - 2) % 4 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::from_smiles;

    fn aromatic(smiles: &str) -> Vec<bool> {
        let mol = from_smiles(smiles).unwrap();
        let rings = RingInfo::sssr(&mol);
        find_aromatic_atoms(&mol, &rings)
    }

    #[test]
    fn benzene_and_heteroaromatics() {
        assert!(aromatic("c1ccccc1").iter().all(|&a| a));
        assert!(aromatic("c1ccncc1").iter().all(|&a| a));
        assert!(aromatic("[nH]1cccc1").iter().all(|&a| a));
        assert!(aromatic("o1cccc1").iter().all(|&a| a));
        assert!(aromatic("s1cccc1").iter().all(|&a| a));
    }

    #[test]
    fn kekule_input_is_perceived() {
        assert!(aromatic("C1=CC=CC=C1").iter().all(|&a| a));
    }

    #[test]
    fn fused_rings() {
        assert!(aromatic("c1ccc2ccccc2c1").iter().all(|&a| a));
        assert!(aromatic("c1ccc2cccc2cc1").iter().all(|&a| a));
    }

    #[test]
    fn substituents_stay_aliphatic() {
        assert_eq!(aromatic("Cc1ccccc1"), vec![false, true, true, true, true, true, true]);
    }

    #[test]
    fn non_aromatic_rings() {
        assert!(aromatic("C1CCCCC1").iter().all(|&a| !a));
        assert!(aromatic("C1=CCC=C1").iter().all(|&a| !a));
        assert!(aromatic("C1=CC=C1").iter().all(|&a| !a));
        assert!(aromatic("O=C1C=CC(=O)C=C1").iter().all(|&a| !a));
    }

    #[test]
    fn pyridone_is_aromatic() {
        let flags = aromatic("O=c1cccc[nH]1");
        assert!(!flags[0]);
        assert!(flags[1..].iter().all(|&a| a));
    }

    #[test]
    fn perception_marks_ring_bonds() {
        let mut mol = from_smiles("c1ccccc1CC").unwrap();
        let rings = RingInfo::sssr(&mol);
        perceive_aromaticity(&mut mol, &rings);
        let aromatic_bonds = mol.bonds().filter(|&e| mol.bond(e).is_aromatic).count();
        assert_eq!(aromatic_bonds, 6);
        assert!(!mol.atom(NodeIndex::new(7)).is_aromatic);
    }
}
