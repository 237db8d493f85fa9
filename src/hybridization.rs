use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::conjugation::assign_conjugation;
use crate::element::outer_shell_electrons;
use crate::mol::Mol;
use crate::traits::{HasAromaticity, HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount};
use crate::valence::{radical_electrons, total_valence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Hybridization {
    S,
    SP,
    SP2,
    #[default]
    SP3,
    SP3D,
    SP3D2,
    Other,
}

/// Steric number: sigma partners plus lone pairs plus radicals.
fn steric_number<A, B>(mol: &Mol<A, B>, idx: NodeIndex) -> i16
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge,
    B: HasBondOrder,
{
    let atom = mol.atom(idx);
    let degree = mol.degree(idx) as i16 + i16::from(atom.hydrogen_count());
    let anum = atom.atomic_num();
    if anum <= 1 || anum >= 89 {
        return degree;
    }

    let outer = i16::from(outer_shell_electrons(anum));
    let valence = i16::from(total_valence(mol, idx));
    let charge = i16::from(atom.formal_charge());
    let free_electrons = outer - (valence + charge);

    if valence + outer - charge < 8 {
        let radicals = i16::from(radical_electrons(mol, idx));
        degree + (free_electrons - radicals) / 2 + radicals
    } else {
        degree + free_electrons / 2
    }
}

fn classify<A, B>(mol: &Mol<A, B>, idx: NodeIndex, has_conjugated_bond: bool) -> Hybridization
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge,
    B: HasBondOrder,
{
    match steric_number(mol, idx) {
        i16::MIN..=1 => Hybridization::S,
        2 => Hybridization::SP,
        3 => Hybridization::SP2,
        // A lone pair next to a pi system delocalizes (amide N, phenol O).
        4 => {
            let degree = mol.degree(idx) + mol.atom(idx).hydrogen_count() as usize;
            if degree > 3 || !has_conjugated_bond {
                Hybridization::SP3
            } else {
                Hybridization::SP2
            }
        }
        5 => Hybridization::SP3D,
        6 => Hybridization::SP3D2,
        _ => Hybridization::Other,
    }
}

/// Hybridization of every atom, indexed by node index.
pub fn assign_hybridization<A, B>(mol: &Mol<A, B>) -> Vec<Hybridization>
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge + HasAromaticity,
    B: HasBondOrder,
{
    let conjugated = assign_conjugation(mol);
    mol.atoms()
        .map(|idx| {
            let has_conj = mol.bonds_of(idx).any(|e| conjugated[e.index()]);
            classify(mol, idx, has_conj)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::Hybridization::*;
    use super::*;
    use crate::smiles::from_smiles;

    fn hyb(smiles: &str) -> Vec<Hybridization> {
        assign_hybridization(&from_smiles(smiles).unwrap())
    }

    #[test]
    fn carbon_states() {
        assert_eq!(hyb("CC"), vec![SP3, SP3]);
        assert_eq!(hyb("C=C"), vec![SP2, SP2]);
        assert_eq!(hyb("C#C"), vec![SP, SP]);
        assert!(hyb("c1ccccc1").iter().all(|&h| h == SP2));
    }

    #[test]
    fn heteroatoms() {
        assert_eq!(hyb("O"), vec![SP3]);
        assert_eq!(hyb("N"), vec![SP3]);
        assert_eq!(hyb("CCO"), vec![SP3, SP3, SP3]);
        assert_eq!(hyb("CC=O"), vec![SP3, SP2, SP2]);
        assert_eq!(hyb("N#Cc1ccccc1")[..2], [SP, SP]);
    }

    #[test]
    fn delocalized_lone_pairs() {
        assert_eq!(hyb("CC(N)=O"), vec![SP3, SP2, SP2, SP2]);
        assert_eq!(hyb("Nc1ccccc1")[0], SP2);
        assert_eq!(hyb("Oc1ccccc1")[0], SP2);
        assert!(hyb("c1cc[nH]c1").iter().all(|&h| h == SP2));
    }

    #[test]
    fn charged_and_hypervalent() {
        assert_eq!(hyb("[NH4+]"), vec![SP3]);
        assert_eq!(hyb("CS(C)(=O)=O")[1], SP3);
        assert_eq!(hyb("O=P(O)(O)O")[1], SP3);
        let nitro = hyb("O=[N+]([O-])c1ccccc1");
        assert_eq!(nitro[..3], [SP2, SP2, SP2]);
    }

    #[test]
    fn radicals_and_ions() {
        assert_eq!(hyb("[CH3]"), vec![SP3]);
        assert_eq!(hyb("[Cl-].[Na+]"), vec![SP3, S]);
    }
}
