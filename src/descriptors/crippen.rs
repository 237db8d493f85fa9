//! Wildman-Crippen logP (J. Chem. Inf. Comput. Sci. 1999, 39, 868).
//!
//! Every heavy atom is assigned one atom type from its element, aromaticity,
//! charge, hydrogen count and immediate neighborhood. Every hydrogen,
//! implicit or explicit, gets a type from the atom it is attached to. The
//! molecule's logP is the sum of the per-type contributions.

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::hydrogen::total_hydrogens;
use crate::mol::Mol;
use crate::sanitize::MoleculeGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrippenType {
    C1, C2, C3, C4, C5, C6, C7, C8, C9, C10, C11, C12, C13, C14, C15, C16, C17, C18, C19,
    C20, C21, C22, C23, C24, C25, C26, C27,
    H1, H2, H3, H4, HS,
    N1, N2, N3, N4, N5, N6, N7, N8, N9, N10, N11, N12, N13, N14,
    O1, O2, O3, O4, O5, O6, O7, O8, O9, O10, O11, O12,
    F, Cl, Br, I, Hal,
    P, S1, S2, S3,
    Me,
}

impl CrippenType {
    pub fn logp(self) -> f64 {
        use CrippenType::*;
        match self {
            C1 => 0.1441,
            C2 => 0.0,
            C3 => -0.2035,
            C4 => -0.2051,
            C5 => -0.2783,
            C6 => 0.1551,
            C7 => 0.00170,
            C8 => 0.08452,
            C9 => -0.1444,
            C10 => -0.0516,
            C11 => 0.1193,
            C12 => -0.0967,
            C13 => -0.5443,
            C14 => 0.0,
            C15 => 0.2450,
            C16 => 0.1980,
            C17 => 0.0,
            C18 => 0.1581,
            C19 => 0.2955,
            C20 => 0.2713,
            C21 => 0.1360,
            C22 => 0.4619,
            C23 => 0.5437,
            C24 => 0.1893,
            C25 => -0.8186,
            C26 => 0.2640,
            C27 => 0.2148,
            H1 => 0.1230,
            H2 => -0.2677,
            H3 => 0.2142,
            H4 => 0.2980,
            HS => 0.1125,
            N1 => -1.0190,
            N2 => -0.7096,
            N3 => -1.0270,
            N4 => -0.5188,
            N5 => 0.08387,
            N6 => 0.1836,
            N7 => -0.3187,
            N8 => -0.4458,
            N9 => 0.01508,
            N10 => -1.950,
            N11 => -0.3239,
            N12 => -1.119,
            N13 => -0.3396,
            N14 => 0.2887,
            O1 => 0.1552,
            O2 => -0.2893,
            O3 => -0.0684,
            O4 => -0.4195,
            O5 => 0.0335,
            O6 => -0.3339,
            O7 => -1.189,
            O8 => 0.1788,
            O9 => -0.1526,
            O10 => 0.1129,
            O11 => 0.4833,
            O12 => -1.326,
            F => 0.4202,
            Cl => 0.6895,
            Br => 0.8456,
            I => 0.8857,
            Hal => -2.996,
            P => 0.8612,
            S1 => 0.6482,
            S2 => -0.0024,
            S3 => 0.6237,
            Me => -0.3808,
        }
    }
}

/// Sum of atom contributions over every heavy atom and hydrogen.
pub fn crippen_logp(graph: &MoleculeGraph) -> f64 {
    let mol = graph.mol();
    let mut logp = 0.0;
    for idx in mol.atoms() {
        let atom = mol.atom(idx);
        if atom.atomic_num == 1 {
            // Explicit hydrogens are counted from their parent, except
            // unattached ones.
            if mol.degree(idx) == 0 {
                logp += CrippenType::HS.logp();
            } else if mol.neighbors(idx).all(|n| mol.atom(n).atomic_num == 1) {
                logp += CrippenType::H1.logp();
            }
            continue;
        }
        logp += heavy_atom_type(mol, idx).logp();
        let h = f64::from(total_hydrogens(mol, idx));
        logp += h * hydrogen_type(mol, idx).logp();
    }
    logp
}

struct Neighbor<'a> {
    atom: &'a Atom,
    bond: &'a Bond,
    idx: NodeIndex,
}

fn heavy_neighbors<'a>(mol: &'a Mol<Atom, Bond>, idx: NodeIndex) -> Vec<Neighbor<'a>> {
    mol.bonds_of(idx)
        .filter_map(|e| {
            let (a, b) = mol.bond_endpoints(e)?;
            let other = if a == idx { b } else { a };
            let atom = mol.atom(other);
            (atom.atomic_num > 1).then_some(Neighbor {
                atom,
                bond: mol.bond(e),
                idx: other,
            })
        })
        .collect()
}

fn is_heteroatom(n: u8) -> bool {
    matches!(n, 7 | 8 | 15 | 16 | 9 | 17 | 35 | 53)
}

/// Type of a heavy atom.
pub fn heavy_atom_type(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> CrippenType {
    let atom = mol.atom(idx);
    match atom.atomic_num {
        6 => carbon_type(mol, idx),
        7 => nitrogen_type(mol, idx),
        8 => oxygen_type(mol, idx),
        9 | 17 | 35 | 53 if atom.formal_charge != 0 => CrippenType::Hal,
        9 => CrippenType::F,
        17 => CrippenType::Cl,
        35 => CrippenType::Br,
        53 => CrippenType::I,
        15 => CrippenType::P,
        16 if atom.is_aromatic => CrippenType::S3,
        16 if atom.formal_charge != 0 => CrippenType::S2,
        16 => CrippenType::S1,
        _ => CrippenType::Me,
    }
}

fn carbon_type(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> CrippenType {
    use CrippenType::*;
    let atom = mol.atom(idx);
    let h = total_hydrogens(mol, idx);
    let nbrs = heavy_neighbors(mol, idx);

    if atom.is_aromatic {
        if h > 0 {
            return C18;
        }
        let exocyclic: Vec<&Neighbor> = nbrs.iter().filter(|n| !n.bond.is_aromatic).collect();
        let Some(sub) = exocyclic.first() else {
            return C19;
        };
        if sub.bond.order == BondOrder::Double && matches!(sub.atom.atomic_num, 6 | 7 | 8) {
            return C25;
        }
        if sub.atom.is_aromatic {
            return C20;
        }
        return match sub.atom.atomic_num {
            6 => C21,
            7 => C22,
            8 => C23,
            16 => C24,
            9 => C14,
            17 => C15,
            35 => C16,
            53 => C17,
            _ => C13,
        };
    }

    if nbrs.iter().any(|n| n.bond.order == BondOrder::Triple) {
        return C7;
    }
    if let Some(double) = nbrs.iter().find(|n| n.bond.order == BondOrder::Double) {
        if double.atom.atomic_num != 6 {
            return C5;
        }
        let next_to_aromatic = nbrs.iter().any(|n| n.atom.is_aromatic)
            || heavy_neighbors(mol, double.idx).iter().any(|n| n.atom.is_aromatic);
        return if next_to_aromatic { C26 } else { C6 };
    }

    if nbrs.iter().any(|n| n.atom.is_aromatic) {
        let to_aromatic_carbon = nbrs.iter().any(|n| n.atom.is_aromatic && n.atom.atomic_num == 6);
        return match h {
            3 if to_aromatic_carbon => C8,
            3 => C9,
            2 => C10,
            1 => C11,
            _ => C12,
        };
    }
    if nbrs.iter().any(|n| is_heteroatom(n.atom.atomic_num)) {
        return if h >= 2 { C3 } else { C4 };
    }
    if nbrs.iter().any(|n| n.atom.atomic_num != 6) {
        return C27;
    }
    if h >= 2 {
        C1
    } else {
        C2
    }
}

fn nitrogen_type(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> CrippenType {
    use CrippenType::*;
    let atom = mol.atom(idx);
    let h = total_hydrogens(mol, idx);
    let nbrs = heavy_neighbors(mol, idx);

    if atom.is_aromatic {
        return if atom.formal_charge > 0 { N12 } else { N11 };
    }
    if atom.formal_charge > 0 {
        return if h > 0 { N10 } else { N13 };
    }
    if atom.formal_charge < 0 {
        return N14;
    }
    if nbrs.iter().any(|n| n.bond.order == BondOrder::Triple) {
        return N9;
    }
    if nbrs.iter().any(|n| n.bond.order == BondOrder::Double) {
        return if h > 0 { N5 } else { N6 };
    }
    let aromatic = nbrs.iter().any(|n| n.atom.is_aromatic);
    match (h, aromatic) {
        (2.., false) => N1,
        (2.., true) => N3,
        (1, false) => N2,
        (1, true) => N4,
        (_, false) => N7,
        (_, true) => N8,
    }
}

fn oxygen_type(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> CrippenType {
    use CrippenType::*;
    let atom = mol.atom(idx);
    let h = total_hydrogens(mol, idx);
    let nbrs = heavy_neighbors(mol, idx);

    if atom.is_aromatic {
        return O1;
    }
    if atom.formal_charge < 0 {
        let Some(n) = nbrs.first() else {
            return O2;
        };
        return match n.atom.atomic_num {
            7 => O5,
            16 => O6,
            6 if has_double_bonded_oxygen(mol, n.idx) => O12,
            _ => O7,
        };
    }
    if let Some(d) = nbrs.iter().find(|n| n.bond.order == BondOrder::Double) {
        return match d.atom.atomic_num {
            7 | 8 => O5,
            16 | 15 => O6,
            6 if d.atom.is_aromatic => O8,
            6 => {
                let others = heavy_neighbors(mol, d.idx);
                if others.iter().any(|o| o.atom.is_aromatic) {
                    O10
                } else if others
                    .iter()
                    .filter(|o| o.idx != idx && o.atom.atomic_num != 6)
                    .count()
                    >= 2
                {
                    O11
                } else {
                    O9
                }
            }
            _ => O11,
        };
    }
    if h > 0 {
        O2
    } else if nbrs.iter().any(|n| n.atom.is_aromatic) {
        O4
    } else {
        O3
    }
}

fn has_double_bonded_oxygen(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    heavy_neighbors(mol, idx)
        .iter()
        .any(|n| n.atom.atomic_num == 8 && n.bond.order == BondOrder::Double)
}

/// Type shared by every hydrogen on the heavy atom `parent`.
pub fn hydrogen_type(mol: &Mol<Atom, Bond>, parent: NodeIndex) -> CrippenType {
    use CrippenType::*;
    match mol.atom(parent).atomic_num {
        6 => H1,
        7 => H3,
        8 => {
            let nbrs = heavy_neighbors(mol, parent);
            let acidic = nbrs.iter().any(|n| match n.atom.atomic_num {
                8 | 16 => true,
                7 => false,
                _ => heavy_neighbors(mol, n.idx).iter().any(|m| {
                    m.idx != parent
                        && m.bond.order == BondOrder::Double
                        && matches!(m.atom.atomic_num, 6 | 7 | 8 | 16)
                }),
            });
            if acidic {
                H4
            } else if nbrs.iter().any(|n| n.atom.atomic_num == 7) {
                H3
            } else {
                H2
            }
        }
        _ => H2,
    }
}
