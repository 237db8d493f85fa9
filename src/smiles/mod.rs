//! SMILES reading: tokenizer → parse tree → graph → Kekulé form.

mod builder;
pub mod error;
mod parse_tree;
mod tokenizer;

use crate::atom::Atom;
use crate::bond::{Bond, SmilesBond};
use crate::kekulize;
use crate::mol::Mol;
pub use error::SmilesError;

/// Parse into a graph that still carries SMILES aromatic bond orders.
pub fn parse_smiles(s: &str) -> Result<Mol<Atom, SmilesBond>, SmilesError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tokens = tokenizer::tokenize(trimmed)?;
    if tokens.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tree = parse_tree::build_parse_tree(&tokens)?;
    Ok(builder::build_mol(&tree))
}

/// Parse and kekulize.
pub fn from_smiles(s: &str) -> Result<Mol<Atom, Bond>, SmilesError> {
    let mol = parse_smiles(s)?;
    Ok(kekulize::kekulize(mol)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::{BondOrder, SmilesBondOrder};
    use petgraph::graph::NodeIndex;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    fn h_counts(s: &str) -> Vec<u8> {
        let mol = parse_smiles(s).unwrap();
        mol.atoms().map(|i| mol.atom(i).hydrogen_count).collect()
    }

    #[test]
    fn small_molecules() {
        assert_eq!(h_counts("C"), vec![4]);
        assert_eq!(h_counts("CC"), vec![3, 3]);
        assert_eq!(h_counts("C=C"), vec![2, 2]);
        assert_eq!(h_counts("C#C"), vec![1, 1]);
        assert_eq!(h_counts("O"), vec![2]);
        assert_eq!(h_counts("N"), vec![3]);
        assert_eq!(h_counts("Cl"), vec![1]);
        assert_eq!(h_counts("CCO"), vec![3, 2, 1]);
    }

    #[test]
    fn branches_and_rings() {
        let mol = parse_smiles("CC(C)(C)C").unwrap();
        assert_eq!(mol.atom_count(), 5);
        assert_eq!(mol.atom(n(1)).hydrogen_count, 0);

        let mol = parse_smiles("C1CCCCC1").unwrap();
        assert_eq!(mol.bond_count(), 6);
        assert!(mol.atoms().all(|i| mol.atom(i).hydrogen_count == 2));
    }

    #[test]
    fn charged_bracket_atoms() {
        let mol = parse_smiles("[NH4+]").unwrap();
        assert_eq!(mol.atom(n(0)).formal_charge, 1);
        assert_eq!(mol.atom(n(0)).hydrogen_count, 4);

        let mol = parse_smiles("CC(=O)[O-]").unwrap();
        assert_eq!(mol.atom(n(3)).formal_charge, -1);
        assert_eq!(mol.atom(n(3)).hydrogen_count, 0);
    }

    #[test]
    fn explicit_bond_orders() {
        let mol = parse_smiles("C=C").unwrap();
        let e = mol.bond_between(n(0), n(1)).unwrap();
        assert_eq!(mol.bond(e).order, SmilesBondOrder::Double);
    }

    #[test]
    fn from_smiles_kekulizes() {
        let mol = from_smiles("c1ccccc1O").unwrap();
        let doubles = mol
            .bonds()
            .filter(|&e| mol.bond(e).order == BondOrder::Double)
            .count();
        assert_eq!(doubles, 3);
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert_eq!(parse_smiles(""), Err(SmilesError::EmptyInput));
        assert_eq!(parse_smiles("   "), Err(SmilesError::EmptyInput));
    }

    #[test]
    fn kekulize_failure_surfaces() {
        assert!(matches!(
            from_smiles("c1cccc1"),
            Err(SmilesError::Kekulize(_))
        ));
    }
}
