//! Molecular formula and molecular weight.
//!
//! [`mol_formula`] produces a Hill system string, [`average_mol_weight`]
//! gives the average molecular weight in g/mol, and [`exact_mol_weight`]
//! gives the monoisotopic mass.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::element::{isotope_mass, Element};
use crate::mol::Mol;
use crate::traits::{HasAtomicNum, HasFormalCharge, HasHydrogenCount, HasIsotope};

fn mass_sum<A, B>(mol: &Mol<A, B>, natural: impl Fn(Element) -> f64) -> f64
where
    A: HasAtomicNum + HasHydrogenCount + HasIsotope,
{
    let h = natural(Element::H);
    mol.atoms()
        .map(|idx| {
            let a = mol.atom(idx);
            let heavy = match (a.isotope(), Element::from_atomic_num(a.atomic_num())) {
                (0, Some(elem)) => natural(elem),
                (0, None) => 0.0,
                (mass_number, _) => isotope_mass(a.atomic_num(), mass_number),
            };
            heavy + f64::from(a.hydrogen_count()) * h
        })
        .sum()
}

/// Average molecular weight over natural isotopic abundance. Labelled
/// atoms use their isotope's mass.
pub fn average_mol_weight<A, B>(mol: &Mol<A, B>) -> f64
where
    A: HasAtomicNum + HasHydrogenCount + HasIsotope,
{
    mass_sum(mol, Element::atomic_weight)
}

/// Monoisotopic mass using the most abundant isotope of each element.
pub fn exact_mol_weight<A, B>(mol: &Mol<A, B>) -> f64
where
    A: HasAtomicNum + HasHydrogenCount + HasIsotope,
{
    mass_sum(mol, Element::exact_mass)
}

/// Hill system formula: C, then H, then the rest alphabetically; without
/// carbon everything is alphabetical. Net charge is appended as `+`, `2-`.
pub fn mol_formula<A, B>(mol: &Mol<A, B>) -> String
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge,
{
    let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();
    let mut net_charge: i32 = 0;
    for idx in mol.atoms() {
        let a = mol.atom(idx);
        if let Some(elem) = Element::from_atomic_num(a.atomic_num()) {
            *counts.entry(elem.symbol()).or_default() += 1;
        }
        if a.hydrogen_count() > 0 {
            *counts.entry("H").or_default() += u32::from(a.hydrogen_count());
        }
        net_charge += i32::from(a.formal_charge());
    }

    let mut out = String::new();
    if let Some(c) = counts.remove("C") {
        append_element(&mut out, "C", c);
        if let Some(h) = counts.remove("H") {
            append_element(&mut out, "H", h);
        }
    }
    for (sym, count) in &counts {
        append_element(&mut out, sym, *count);
    }

    match net_charge {
        0 => {}
        1 => out.push('+'),
        -1 => out.push('-'),
        q if q > 0 => {
            let _ = write!(out, "{q}+");
        }
        q => {
            let _ = write!(out, "{}-", q.unsigned_abs());
        }
    }
    out
}

fn append_element(buf: &mut String, symbol: &str, count: u32) {
    buf.push_str(symbol);
    if count > 1 {
        let _ = write!(buf, "{count}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrogen::add_hs;
    use crate::smiles::{from_smiles, parse_smiles};
    use approx::assert_abs_diff_eq;

    #[test]
    fn hill_formulas() {
        let cases = [
            ("C", "CH4"),
            ("c1ccccc1", "C6H6"),
            ("O", "H2O"),
            ("CCO", "C2H6O"),
            ("[Na+].[Cl-]", "ClNa"),
            ("[NH4+]", "H4N+"),
            ("[O-2]", "O2-"),
            ("[HH]", "H2"),
        ];
        for (smiles, expected) in cases {
            assert_eq!(mol_formula(&parse_smiles(smiles).unwrap()), expected, "{smiles}");
        }
    }

    #[test]
    fn average_weights() {
        let mol = parse_smiles("CCO").unwrap();
        assert_abs_diff_eq!(average_mol_weight(&mol), 46.069, epsilon = 1e-3);
        let mol = parse_smiles("c1ccccc1").unwrap();
        assert_abs_diff_eq!(average_mol_weight(&mol), 78.114, epsilon = 1e-2);
    }

    #[test]
    fn exact_weights() {
        let mol = parse_smiles("CCO").unwrap();
        assert_abs_diff_eq!(exact_mol_weight(&mol), 46.041_864_8, epsilon = 1e-5);
        let mol = parse_smiles("[2H]C([2H])([2H])[2H]").unwrap();
        assert_abs_diff_eq!(exact_mol_weight(&mol), 12.0 + 4.0 * 2.014_101_778_12, epsilon = 1e-6);
    }

    #[test]
    fn explicit_hydrogens_weigh_the_same() {
        let heavy = from_smiles("CC(=O)O").unwrap();
        let full = add_hs(&heavy);
        assert_abs_diff_eq!(average_mol_weight(&heavy), average_mol_weight(&full), epsilon = 1e-9);
        assert_eq!(mol_formula(&heavy), mol_formula(&full));
    }

    #[test]
    fn empty_molecule() {
        let mol: Mol<crate::atom::Atom, crate::bond::Bond> = Mol::new();
        assert_eq!(mol_formula(&mol), "");
        assert_eq!(average_mol_weight(&mol), 0.0);
    }
}
