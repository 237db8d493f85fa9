//! Topological polar surface area from Ertl's N and O fragment table
//! (J. Med. Chem. 2000, 43, 3714). Sulfur and phosphorus do not
//! contribute.

use petgraph::graph::NodeIndex;

use crate::bond::BondOrder;
use crate::hydrogen::total_hydrogens;
use crate::sanitize::MoleculeGraph;

/// Bonding environment of one polar atom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Environment {
    heavy: u8,
    hydrogens: u8,
    charge: i8,
    aromatic: bool,
    single: u8,
    double: u8,
    triple: u8,
    aromatic_bonds: u8,
    in_three_ring: bool,
}

pub fn tpsa(graph: &MoleculeGraph) -> f64 {
    let mol = graph.mol();
    mol.atoms()
        .filter_map(|idx| {
            let env = environment(graph, idx);
            match mol.atom(idx).atomic_num {
                7 => Some(nitrogen(&env)),
                8 => Some(oxygen(&env)),
                _ => None,
            }
        })
        .fold(0.0, |total, area| total + area)
}

fn environment(graph: &MoleculeGraph, idx: NodeIndex) -> Environment {
    let mol = graph.mol();
    let atom = mol.atom(idx);
    let mut env = Environment {
        hydrogens: total_hydrogens(mol, idx),
        charge: atom.formal_charge,
        aromatic: atom.is_aromatic,
        in_three_ring: graph.rings().is_in_ring_of_size(idx, 3),
        ..Environment::default()
    };
    for e in mol.bonds_of(idx) {
        let Some((a, b)) = mol.bond_endpoints(e) else {
            continue;
        };
        let other = if a == idx { b } else { a };
        if mol.atom(other).atomic_num == 1 {
            continue;
        }
        env.heavy += 1;
        let bond = mol.bond(e);
        if bond.is_aromatic {
            env.aromatic_bonds += 1;
        } else {
            match bond.order {
                BondOrder::Single => env.single += 1,
                BondOrder::Double => env.double += 1,
                BondOrder::Triple => env.triple += 1,
            }
        }
    }
    env
}

fn nitrogen(e: &Environment) -> f64 {
    let bonds = (e.single, e.double, e.triple, e.aromatic_bonds);
    let value = match (e.heavy, e.hydrogens, e.charge) {
        (1, 0, 0) if bonds == (0, 0, 1, 0) => Some(23.79),
        (1, 1, 0) if bonds == (0, 1, 0, 0) => Some(23.85),
        (1, 2, 0) if bonds == (1, 0, 0, 0) => Some(26.02),
        (2, 0, 0) if bonds == (1, 1, 0, 0) => Some(12.36),
        (2, 0, 0) if bonds == (0, 1, 1, 0) => Some(13.60),
        (2, 0, 0) if bonds == (0, 0, 0, 2) => Some(12.89),
        (2, 1, 0) if bonds == (2, 0, 0, 0) && e.in_three_ring => Some(21.94),
        (2, 1, 0) if bonds == (2, 0, 0, 0) => Some(12.03),
        (2, 1, 0) if bonds == (0, 0, 0, 2) => Some(15.79),
        (3, 0, 0) if bonds == (3, 0, 0, 0) && e.in_three_ring => Some(3.01),
        (3, 0, 0) if bonds == (3, 0, 0, 0) => Some(3.24),
        (3, 0, 0) if bonds == (1, 2, 0, 0) => Some(11.68),
        (3, 0, 0) if bonds == (0, 0, 0, 3) => Some(4.41),
        (3, 0, 0) if bonds == (1, 0, 0, 2) => Some(4.93),
        (3, 0, 0) if bonds == (0, 1, 0, 2) => Some(8.39),
        (1, 0, 1) if bonds == (0, 0, 1, 0) => Some(4.36),
        (1, 2, 1) if bonds == (0, 1, 0, 0) => Some(25.59),
        (1, 3, 1) if bonds == (1, 0, 0, 0) => Some(27.64),
        (2, 0, 1) if bonds == (1, 0, 1, 0) => Some(4.36),
        (2, 0, 1) if bonds == (0, 2, 0, 0) => Some(13.60),
        (2, 1, 1) if bonds == (1, 1, 0, 0) => Some(13.97),
        (2, 2, 1) if bonds == (2, 0, 0, 0) => Some(16.61),
        (2, 1, 1) if bonds == (0, 0, 0, 2) => Some(14.14),
        (3, 0, 1) if bonds == (2, 1, 0, 0) => Some(3.01),
        (3, 0, 1) if bonds == (0, 0, 0, 3) => Some(4.10),
        (3, 0, 1) if bonds == (1, 0, 0, 2) => Some(3.88),
        (3, 1, 1) if bonds == (3, 0, 0, 0) => Some(4.44),
        (4, 0, 1) if bonds == (4, 0, 0, 0) => Some(0.0),
        (1, 0, -1) if bonds == (0, 1, 0, 0) => Some(23.79),
        _ => None,
    };
    value.unwrap_or_else(|| 30.5 - 8.2 * f64::from(e.heavy) + 1.5 * f64::from(e.hydrogens))
}

fn oxygen(e: &Environment) -> f64 {
    let bonds = (e.single, e.double, e.aromatic_bonds);
    let value = match (e.heavy, e.hydrogens, e.charge) {
        (1, 0, 0) if bonds == (0, 1, 0) => Some(17.07),
        (1, 1, 0) if bonds == (1, 0, 0) => Some(20.23),
        (1, 0, -1) if bonds == (1, 0, 0) => Some(23.06),
        (2, 0, 0) if bonds == (2, 0, 0) && e.in_three_ring => Some(12.53),
        (2, 0, 0) if bonds == (2, 0, 0) => Some(9.23),
        (2, 0, 0) if bonds == (0, 0, 2) => Some(13.14),
        _ => None,
    };
    value.unwrap_or_else(|| 28.5 - 8.6 * f64::from(e.heavy) + 1.5 * f64::from(e.hydrogens))
}
