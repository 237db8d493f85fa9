use petgraph::graph::NodeIndex;
use thiserror::Error;

use crate::element::{outer_shell_electrons, Element};
use crate::mol::Mol;
use crate::traits::{HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount};

/// An atom carries more bonds than any of its allowed valence states.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("atom {} ({symbol}): valence {actual} exceeds allowed {allowed:?}", .atom.index())]
pub struct ValenceError {
    pub atom: NodeIndex,
    pub symbol: &'static str,
    pub actual: u8,
    pub allowed: Vec<u8>,
}

/// Sum of bond orders plus implicit hydrogens.
pub fn total_valence<A, B>(mol: &Mol<A, B>, atom: NodeIndex) -> u8
where
    A: HasHydrogenCount,
    B: HasBondOrder,
{
    let bond_sum: u8 = mol
        .bonds_of(atom)
        .map(|e| mol.bond(e).bond_order().valence_contribution())
        .sum();
    bond_sum + mol.atom(atom).hydrogen_count()
}

/// Valence states shifted by formal charge: N+ behaves like carbon, O-
/// like fluorine, B- like carbon, C± like boron.
pub fn allowed_valences(atomic_num: u8, charge: i8) -> Vec<u8> {
    let Some(elem) = Element::from_atomic_num(atomic_num) else {
        return Vec::new();
    };
    let charge = i16::from(charge);
    let outer = outer_shell_electrons(atomic_num);
    elem.default_valences()
        .iter()
        .map(|&v| {
            let v = i16::from(v);
            match outer {
                0..=3 => v - charge,
                4 => v - charge.abs(),
                _ => v + charge,
            }
        })
        .filter_map(|v| u8::try_from(v).ok())
        .collect()
}

/// Unpaired electrons: the gap between the total valence and the nearest
/// allowed state at or above it.
pub fn radical_electrons<A, B>(mol: &Mol<A, B>, atom: NodeIndex) -> u8
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let a = mol.atom(atom);
    let used = total_valence(mol, atom);
    allowed_valences(a.atomic_num(), a.formal_charge())
        .into_iter()
        .find(|&v| v >= used)
        .map_or(0, |v| v - used)
}

/// First atom whose bonds exceed every allowed valence state. Elements
/// without a valence model (metals, noble gases) are not checked.
pub fn check_valence<A, B>(mol: &Mol<A, B>) -> Result<(), ValenceError>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    for idx in mol.atoms() {
        let atom = mol.atom(idx);
        let allowed = allowed_valences(atom.atomic_num(), atom.formal_charge());
        let Some(&max) = allowed.iter().max() else {
            continue;
        };
        let actual = total_valence(mol, idx);
        if actual > max {
            let symbol = Element::from_atomic_num(atom.atomic_num()).map_or("?", Element::symbol);
            return Err(ValenceError {
                atom: idx,
                symbol,
                actual,
                allowed,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bond::Bond;
    use crate::smiles::from_smiles;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    #[test]
    fn common_molecules_pass() {
        for s in ["C", "CCO", "c1ccccc1", "O", "N", "CS(=O)(=O)C", "S(F)(F)(F)(F)(F)F"] {
            assert!(check_valence(&from_smiles(s).unwrap()).is_ok(), "{s}");
        }
    }

    #[test]
    fn charged_atoms_use_shifted_valence() {
        for s in ["[NH4+]", "C[O-]", "[BH4-]", "C[N+](=O)[O-]", "[Cl-]"] {
            assert!(check_valence(&from_smiles(s).unwrap()).is_ok(), "{s}");
        }
        assert_eq!(allowed_valences(7, 1), vec![4, 6]);
        assert_eq!(allowed_valences(8, -1), vec![1]);
        assert_eq!(allowed_valences(6, 1), vec![3]);
    }

    #[test]
    fn pentavalent_carbon_fails() {
        let mut mol = Mol::<Atom, Bond>::new();
        let c = mol.add_atom(Atom {
            atomic_num: 6,
            hydrogen_count: 5,
            ..Atom::default()
        });
        let err = check_valence(&mol).unwrap_err();
        assert_eq!(err.atom, c);
        assert_eq!(err.actual, 5);
        assert_eq!(err.allowed, vec![4]);
        assert_eq!(err.to_string(), "atom 0 (C): valence 5 exceeds allowed [4]");
    }

    #[test]
    fn bracket_overload_fails() {
        assert!(check_valence(&from_smiles("C[CH3](C)C").unwrap()).is_err());
        assert!(check_valence(&from_smiles("[OH3]").unwrap()).is_err());
    }

    #[test]
    fn metals_are_skipped() {
        assert!(check_valence(&from_smiles("[Fe]").unwrap()).is_ok());
    }

    #[test]
    fn radicals() {
        assert_eq!(radical_electrons(&from_smiles("C").unwrap(), n(0)), 0);
        assert_eq!(radical_electrons(&from_smiles("[CH3]").unwrap(), n(0)), 1);
        assert_eq!(radical_electrons(&from_smiles("[CH2]").unwrap(), n(0)), 2);
        assert_eq!(radical_electrons(&from_smiles("[OH]").unwrap(), n(0)), 1);
        assert_eq!(radical_electrons(&from_smiles("[NH4+]").unwrap(), n(0)), 0);
        assert_eq!(radical_electrons(&from_smiles("[Cl-]").unwrap(), n(0)), 0);
        assert_eq!(radical_electrons(&from_smiles("[Fe]").unwrap(), n(0)), 0);
    }

    #[test]
    fn total_valence_counts_hydrogens() {
        let mol = from_smiles("C=C").unwrap();
        assert!(mol.atoms().all(|i| total_valence(&mol, i) == 4));
    }
}
