//! Kekulization assigns alternating single and double bonds to aromatic
//! systems written with lowercase SMILES atoms.
//!
//! Atoms that still lack one unit of valence must each receive exactly one
//! double bond drawn from their aromatic bonds, which is a perfect matching
//! problem on the aromatic subgraph. Augmenting paths solve the common
//! cases; a bounded backtracking search handles odd cycles (azulene and
//! friends) where plain augmenting paths can get stuck.

use std::collections::{HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex};
use thiserror::Error;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder, SmilesBond, SmilesBondOrder};
use crate::element::Element;
use crate::mol::Mol;

const BACKTRACK_BUDGET: usize = 200_000;

/// No Kekulé structure exists for the aromatic system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KekulizeError {
    #[error("cannot kekulize aromatic system: unmatched atoms {}", format_atoms(.0))]
    Unkekulizable(Vec<NodeIndex>),
}

fn format_atoms(atoms: &[NodeIndex]) -> String {
    let list: Vec<String> = atoms.iter().map(|a| a.index().to_string()).collect();
    format!("[{}]", list.join(", "))
}

type Adjacency = Vec<Vec<(NodeIndex, EdgeIndex)>>;

/// Replace aromatic bonds with concrete single/double bonds. Atom data and
/// bond stereo pass through unchanged; aromatic flags on bonds are left for
/// aromaticity perception to set.
pub fn kekulize(mol: Mol<Atom, SmilesBond>) -> Result<Mol<Atom, Bond>, KekulizeError> {
    let n = mol.atom_count();
    let mut aromatic_adj: Adjacency = vec![Vec::new(); n];
    for e in mol.bonds() {
        if mol.bond(e).order != SmilesBondOrder::Aromatic {
            continue;
        }
        if let Some((a, b)) = mol.bond_endpoints(e) {
            aromatic_adj[a.index()].push((b, e));
            aromatic_adj[b.index()].push((a, e));
        }
    }

    let needs_double: Vec<bool> = mol
        .atoms()
        .map(|v| !aromatic_adj[v.index()].is_empty() && needs_double_bond(&mol, v))
        .collect();

    let mut matched: Vec<Option<EdgeIndex>> = vec![None; n];
    for component in aromatic_components(&mol, &aromatic_adj) {
        let candidates: Vec<NodeIndex> = component
            .into_iter()
            .filter(|v| needs_double[v.index()])
            .collect();

        for &start in &candidates {
            if matched[start.index()].is_none() {
                augment(&mol, &aromatic_adj, &needs_double, &mut matched, start);
            }
        }

        if candidates.iter().any(|v| matched[v.index()].is_none()) {
            for &v in &candidates {
                matched[v.index()] = None;
            }
            let mut budget = BACKTRACK_BUDGET;
            if !backtrack(&aromatic_adj, &needs_double, &mut matched, &candidates, &mut budget) {
                let unmatched = candidates
                    .iter()
                    .copied()
                    .filter(|v| matched[v.index()].is_none())
                    .collect();
                return Err(KekulizeError::Unkekulizable(unmatched));
            }
        }
    }

    let doubles: HashSet<EdgeIndex> = matched.iter().flatten().copied().collect();
    let mut result = Mol::new();
    for node in mol.atoms() {
        result.add_atom(mol.atom(node).clone());
    }
    for edge in mol.bonds() {
        let Some((a, b)) = mol.bond_endpoints(edge) else {
            continue;
        };
        let smiles_bond = mol.bond(edge);
        let order = match smiles_bond.order {
            SmilesBondOrder::Aromatic if doubles.contains(&edge) => BondOrder::Double,
            SmilesBondOrder::Aromatic | SmilesBondOrder::Implicit | SmilesBondOrder::Single => {
                BondOrder::Single
            }
            SmilesBondOrder::Double => BondOrder::Double,
            SmilesBondOrder::Triple => BondOrder::Triple,
        };
        result.add_bond(
            a,
            b,
            Bond {
                order,
                is_aromatic: false,
                stereo: smiles_bond.stereo,
            },
        );
    }
    Ok(result)
}

/// An aromatic atom needs a double bond when it is exactly one unit short
/// of its charge-adjusted valence, or two short as a bare charged atom.
fn needs_double_bond(mol: &Mol<Atom, SmilesBond>, node: NodeIndex) -> bool {
    let atom = mol.atom(node);
    let Some(elem) = Element::from_atomic_num(atom.atomic_num) else {
        return false;
    };
    let used: u8 = mol
        .bonds_of(node)
        .map(|e| mol.bond(e).provisional_valence())
        .sum::<u8>()
        + atom.hydrogen_count;

    let charge = atom.formal_charge as i16;
    let target = elem
        .default_valences()
        .iter()
        .map(|&v| v as i16 + charge)
        .filter(|&v| v > 0)
        .find(|&v| v >= used as i16);

    match target {
        Some(tv) => {
            let gap = tv - used as i16;
            gap == 1 || (gap == 2 && atom.hydrogen_count == 0 && atom.formal_charge != 0)
        }
        None => false,
    }
}

fn aromatic_components(mol: &Mol<Atom, SmilesBond>, adj: &Adjacency) -> Vec<Vec<NodeIndex>> {
    let mut seen = vec![false; mol.atom_count()];
    let mut components = Vec::new();
    for node in mol.atoms() {
        if adj[node.index()].is_empty() || seen[node.index()] {
            continue;
        }
        seen[node.index()] = true;
        let mut stack = vec![node];
        let mut comp = Vec::new();
        while let Some(v) = stack.pop() {
            comp.push(v);
            for &(w, _) in &adj[v.index()] {
                if !seen[w.index()] {
                    seen[w.index()] = true;
                    stack.push(w);
                }
            }
        }
        comp.sort();
        components.push(comp);
    }
    components
}

fn other_end(mol: &Mol<Atom, SmilesBond>, edge: EdgeIndex, from: NodeIndex) -> Option<NodeIndex> {
    let (a, b) = mol.bond_endpoints(edge)?;
    Some(if a == from { b } else { a })
}

fn augment(
    mol: &Mol<Atom, SmilesBond>,
    adj: &Adjacency,
    needs_double: &[bool],
    matched: &mut [Option<EdgeIndex>],
    start: NodeIndex,
) -> bool {
    let n = mol.atom_count();
    let mut prev: Vec<Option<(NodeIndex, EdgeIndex)>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut queue = VecDeque::from([start]);
    visited[start.index()] = true;

    while let Some(u) = queue.pop_front() {
        for &(v, e) in &adj[u.index()] {
            if !needs_double[v.index()] || visited[v.index()] || Some(e) == matched[u.index()] {
                continue;
            }
            visited[v.index()] = true;
            prev[v.index()] = Some((u, e));

            let Some(matched_e) = matched[v.index()] else {
                flip_path(matched, &prev, start, v);
                return true;
            };
            if let Some(w) = other_end(mol, matched_e, v) {
                if !visited[w.index()] {
                    visited[w.index()] = true;
                    prev[w.index()] = Some((v, matched_e));
                    queue.push_back(w);
                }
            }
        }
    }
    false
}

fn flip_path(
    matched: &mut [Option<EdgeIndex>],
    prev: &[Option<(NodeIndex, EdgeIndex)>],
    start: NodeIndex,
    end: NodeIndex,
) {
    let mut cur = end;
    let mut is_new_match = true;
    while cur != start {
        let Some((p, e)) = prev[cur.index()] else {
            return;
        };
        if is_new_match {
            matched[cur.index()] = Some(e);
            matched[p.index()] = Some(e);
        }
        is_new_match = !is_new_match;
        cur = p;
    }
}

fn backtrack(
    adj: &Adjacency,
    needs_double: &[bool],
    matched: &mut [Option<EdgeIndex>],
    candidates: &[NodeIndex],
    budget: &mut usize,
) -> bool {
    let Some(&u) = candidates.iter().find(|v| matched[v.index()].is_none()) else {
        return true;
    };
    if *budget == 0 {
        return false;
    }
    *budget -= 1;

    for &(v, e) in &adj[u.index()] {
        if !needs_double[v.index()] || matched[v.index()].is_some() {
            continue;
        }
        matched[u.index()] = Some(e);
        matched[v.index()] = Some(e);
        if backtrack(adj, needs_double, matched, candidates, budget) {
            return true;
        }
        matched[u.index()] = None;
        matched[v.index()] = None;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn kek(s: &str) -> Result<Mol<Atom, Bond>, KekulizeError> {
        kekulize(parse_smiles(s).unwrap())
    }

    fn count_double_bonds(mol: &Mol<Atom, Bond>) -> usize {
        mol.bonds()
            .filter(|&e| mol.bond(e).order == BondOrder::Double)
            .count()
    }

    fn no_atom_has_two_doubles(mol: &Mol<Atom, Bond>) -> bool {
        mol.atoms().all(|v| {
            mol.bonds_of(v)
                .filter(|&e| mol.bond(e).order == BondOrder::Double)
                .count()
                <= 1
        })
    }

    #[test]
    fn benzene() {
        let mol = kek("c1ccccc1").unwrap();
        assert_eq!(count_double_bonds(&mol), 3);
        assert!(no_atom_has_two_doubles(&mol));
        assert!(mol.atoms().all(|v| mol.atom(v).hydrogen_count == 1));
    }

    #[test]
    fn naphthalene() {
        let mol = kek("c1ccc2ccccc2c1").unwrap();
        assert_eq!(mol.bond_count(), 11);
        assert_eq!(count_double_bonds(&mol), 5);
        assert!(no_atom_has_two_doubles(&mol));
    }

    #[test]
    fn five_membered_heteroaromatics() {
        assert_eq!(count_double_bonds(&kek("[nH]1cccc1").unwrap()), 2);
        assert_eq!(count_double_bonds(&kek("o1cccc1").unwrap()), 2);
        assert_eq!(count_double_bonds(&kek("s1cccc1").unwrap()), 2);
        assert_eq!(count_double_bonds(&kek("c1c[nH]cn1").unwrap()), 2);
    }

    #[test]
    fn pyridine_and_pyridinium() {
        assert_eq!(count_double_bonds(&kek("c1ccncc1").unwrap()), 3);
        assert_eq!(count_double_bonds(&kek("[nH+]1ccccc1").unwrap()), 3);
    }

    #[test]
    fn azulene_needs_odd_cycle_matching() {
        let mol = kek("c1ccc2cccc2cc1").unwrap();
        assert_eq!(count_double_bonds(&mol), 5);
        assert!(no_atom_has_two_doubles(&mol));
    }

    #[test]
    fn cyclopentadienyl_anion() {
        assert_eq!(count_double_bonds(&kek("[cH-]1cccc1").unwrap()), 2);
    }

    #[test]
    fn bare_five_ring_fails() {
        let err = kek("c1cccc1").unwrap_err();
        assert!(matches!(err, KekulizeError::Unkekulizable(ref atoms) if !atoms.is_empty()));
        assert!(err.to_string().starts_with("cannot kekulize aromatic system"));
    }

    #[test]
    fn pyrrole_without_hydrogen_fails() {
        assert!(kek("c1ccnc1").is_err());
    }

    #[test]
    fn non_aromatic_bonds_pass_through() {
        let mol = kek("C=CC#N").unwrap();
        let orders: Vec<BondOrder> = mol.bonds().map(|e| mol.bond(e).order).collect();
        assert_eq!(orders, vec![BondOrder::Double, BondOrder::Single, BondOrder::Triple]);
    }

    #[test]
    fn stereo_survives() {
        let mol = kek("F/C=C/F").unwrap();
        let e = mol
            .bond_between(NodeIndex::new(1), NodeIndex::new(2))
            .unwrap();
        assert!(matches!(mol.bond(e).stereo, crate::bond::BondStereo::Trans(..)));
    }
}
