use petgraph::graph::NodeIndex;

use crate::atom::{Atom, Chirality};
use crate::bond::{Bond, BondOrder};
use crate::mol::{permutation_parity, Mol};

/// Make every implicit hydrogen an explicit node.
///
/// Heavy atoms keep their indices; new hydrogens are appended in parent
/// order. A stereocenter whose implicit hydrogen moves from first to last
/// in its reference order gets its tag inverted, so the geometry it
/// describes is unchanged.
pub fn add_hs(mol: &Mol<Atom, Bond>) -> Mol<Atom, Bond> {
    let mut result = mol.map_atoms(|_, atom| Atom {
        hydrogen_count: 0,
        ..atom.clone()
    });

    for parent in mol.atoms() {
        let atom = mol.atom(parent);
        let before = reference_order(mol, parent);

        for _ in 0..atom.hydrogen_count {
            let h = result.add_atom(Atom::hydrogen());
            result.add_bond(parent, h, Bond::with_order(BondOrder::Single));
        }

        if atom.chirality != Chirality::None && atom.hydrogen_count == 1 {
            let mut after: Vec<Option<NodeIndex>> = result
                .sorted_neighbors(parent)
                .into_iter()
                .map(Some)
                .collect();
            // The fresh hydrogen stands in for the implicit one.
            if let Some(last) = after.last_mut() {
                *last = None;
            }
            if !permutation_parity(&before, &after) {
                result.atom_mut(parent).chirality = atom.chirality.inverted();
            }
        }
    }
    result
}

/// Reference neighbor order with `None` for a single implicit hydrogen.
fn reference_order(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> Vec<Option<NodeIndex>> {
    let mut order = Vec::with_capacity(4);
    if mol.atom(idx).hydrogen_count == 1 {
        order.push(None);
    }
    order.extend(mol.sorted_neighbors(idx).into_iter().map(Some));
    order
}

/// Total hydrogens on an atom, implicit plus explicit neighbors.
pub fn total_hydrogens(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> u8 {
    let explicit = mol
        .neighbors(idx)
        .filter(|&n| mol.atom(n).atomic_num == 1)
        .count() as u8;
    mol.atom(idx).hydrogen_count + explicit
}

/// Heavy atoms only, with explicit hydrogens folded back into counts.
/// Isotope-labelled and charged hydrogens stay explicit.
pub fn remove_hs(mol: &Mol<Atom, Bond>) -> Mol<Atom, Bond> {
    let removable = |idx: NodeIndex| {
        let a = mol.atom(idx);
        a.atomic_num == 1 && a.isotope == 0 && a.formal_charge == 0 && mol.degree(idx) == 1
    };

    let mut result = Mol::new();
    let mut index_map: Vec<Option<NodeIndex>> = vec![None; mol.atom_count()];
    for idx in mol.atoms().filter(|&i| !removable(i)) {
        let folded = mol.neighbors(idx).filter(|&n| removable(n)).count() as u8;
        let atom = mol.atom(idx);
        let before = explicit_reference_order(mol, idx);
        let mut new_atom = Atom {
            hydrogen_count: atom.hydrogen_count + folded,
            ..atom.clone()
        };
        if atom.chirality != Chirality::None && new_atom.hydrogen_count == 1 && folded == 1 {
            // Explicit H moves to the front of the reference order.
            let mut after: Vec<Option<NodeIndex>> = vec![None];
            after.extend(
                mol.sorted_neighbors(idx)
                    .into_iter()
                    .filter(|&n| !removable(n))
                    .map(Some),
            );
            if !permutation_parity(&before, &after) {
                new_atom.chirality = atom.chirality.inverted();
            }
        }
        index_map[idx.index()] = Some(result.add_atom(new_atom));
    }

    for edge in mol.bonds() {
        let Some((a, b)) = mol.bond_endpoints(edge) else {
            continue;
        };
        if let (Some(na), Some(nb)) = (index_map[a.index()], index_map[b.index()]) {
            let mut bond = mol.bond(edge).clone();
            bond.stereo = remap_stereo(bond.stereo, &index_map);
            result.add_bond(na, nb, bond);
        }
    }
    result
}

fn explicit_reference_order(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> Vec<Option<NodeIndex>> {
    let mut order = Vec::with_capacity(4);
    if mol.atom(idx).hydrogen_count == 1 {
        order.push(None);
    }
    order.extend(mol.sorted_neighbors(idx).into_iter().map(|n| {
        let a = mol.atom(n);
        let folds = a.atomic_num == 1 && a.isotope == 0 && a.formal_charge == 0 && mol.degree(n) == 1;
        if folds {
            None
        } else {
            Some(n)
        }
    }));
    order
}

fn remap_stereo(
    stereo: crate::bond::BondStereo,
    index_map: &[Option<NodeIndex>],
) -> crate::bond::BondStereo {
    use crate::bond::BondStereo;
    let map = |n: NodeIndex| index_map[n.index()];
    match stereo {
        BondStereo::Cis(l, r) => match (map(l), map(r)) {
            (Some(l), Some(r)) => BondStereo::Cis(l, r),
            _ => BondStereo::None,
        },
        BondStereo::Trans(l, r) => match (map(l), map(r)) {
            (Some(l), Some(r)) => BondStereo::Trans(l, r),
            _ => BondStereo::None,
        },
        BondStereo::None => BondStereo::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::BondStereo;
    use crate::smiles::from_smiles;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    #[test]
    fn methane_and_ethanol() {
        let mol = add_hs(&from_smiles("C").unwrap());
        assert_eq!(mol.atom_count(), 5);
        assert_eq!(mol.bond_count(), 4);
        assert_eq!(mol.atom(n(0)).hydrogen_count, 0);

        let mol = add_hs(&from_smiles("CCO").unwrap());
        assert_eq!(mol.atom_count(), 9);
        assert!(mol.atoms().skip(3).all(|i| mol.atom(i).atomic_num == 1));
    }

    #[test]
    fn heavy_indices_survive() {
        let mol = add_hs(&from_smiles("OC=O").unwrap());
        assert_eq!(mol.atom(n(0)).atomic_num, 8);
        assert_eq!(mol.atom(n(1)).atomic_num, 6);
        assert_eq!(mol.atom(n(2)).atomic_num, 8);
        assert_eq!(total_hydrogens(&mol, n(0)), 1);
        assert_eq!(total_hydrogens(&mol, n(1)), 1);
    }

    #[test]
    fn metals_gain_nothing() {
        let mol = add_hs(&from_smiles("[Fe]").unwrap());
        assert_eq!(mol.atom_count(), 1);
    }

    #[test]
    fn implicit_h_stereocenter_is_inverted() {
        let heavy = from_smiles("N[C@@H](C)C(=O)O").unwrap();
        assert_eq!(heavy.atom(n(1)).chirality, Chirality::Ccw);
        let full = add_hs(&heavy);
        assert_eq!(full.atom(n(1)).chirality, Chirality::Cw);
    }

    #[test]
    fn stereocenter_without_h_unchanged() {
        let heavy = from_smiles("F[C@](Cl)(Br)I").unwrap();
        let tag = heavy.atom(n(1)).chirality;
        assert_eq!(add_hs(&heavy).atom(n(1)).chirality, tag);
    }

    #[test]
    fn remove_hs_round_trips_chirality() {
        let heavy = from_smiles("N[C@@H](C)C(=O)O").unwrap();
        let back = remove_hs(&add_hs(&heavy));
        assert_eq!(back.atom_count(), heavy.atom_count());
        assert_eq!(back.atom(n(1)).chirality, Chirality::Ccw);
        assert_eq!(back.atom(n(1)).hydrogen_count, 1);
    }

    #[test]
    fn ez_stereo_survives_both_directions() {
        let heavy = from_smiles("F/C=C/F").unwrap();
        let full = add_hs(&heavy);
        let e = full.bond_between(n(1), n(2)).unwrap();
        assert_eq!(full.bond(e).stereo, BondStereo::Trans(n(0), n(3)));
        let back = remove_hs(&full);
        let e = back.bond_between(n(1), n(2)).unwrap();
        assert_eq!(back.bond(e).stereo, BondStereo::Trans(n(0), n(3)));
    }

    #[test]
    fn deuterium_stays_explicit() {
        let mol = from_smiles("[2H]C").unwrap();
        let back = remove_hs(&add_hs(&mol));
        assert_eq!(back.atom_count(), 2);
    }
}
