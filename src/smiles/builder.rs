use petgraph::graph::NodeIndex;

use crate::atom::{Atom, Chirality};
use crate::bond::{BondStereo, SmilesBond, SmilesBondOrder};
use crate::mol::{permutation_parity, Mol};
use crate::smiles::parse_tree::{ParseAtom, ParseTree};
use crate::smiles::tokenizer::{BondToken, ChiralityToken};

/// Turn a parse tree into a graph. Node `i` is the `i`-th atom written.
pub fn build_mol(tree: &ParseTree) -> Mol<Atom, SmilesBond> {
    let mut mol = Mol::new();

    for parse_atom in &tree.atoms {
        mol.add_atom(Atom {
            atomic_num: parse_atom.element.atomic_num(),
            formal_charge: parse_atom.charge,
            isotope: parse_atom.isotope,
            hydrogen_count: 0,
            is_aromatic: parse_atom.is_aromatic,
            chirality: Chirality::None,
        });
    }

    for (i, parse_atom) in tree.atoms.iter().enumerate() {
        for neighbor in parse_atom.neighbors.iter().filter(|n| n.atom_idx > i) {
            let j = neighbor.atom_idx;
            let order = resolve_bond_order(
                neighbor.bond,
                parse_atom.is_aromatic,
                tree.atoms[j].is_aromatic,
            );
            mol.add_bond(
                NodeIndex::new(i),
                NodeIndex::new(j),
                SmilesBond {
                    order,
                    stereo: BondStereo::None,
                },
            );
        }
    }

    resolve_hydrogen_counts(&mut mol, tree);
    resolve_chirality(&mut mol, tree);
    resolve_ez_stereo(&mut mol, tree);

    mol
}

fn resolve_bond_order(
    bond_tok: Option<BondToken>,
    from_aromatic: bool,
    to_aromatic: bool,
) -> SmilesBondOrder {
    match bond_tok {
        Some(BondToken::Single) | Some(BondToken::Up) | Some(BondToken::Down) => {
            SmilesBondOrder::Single
        }
        Some(BondToken::Double) => SmilesBondOrder::Double,
        Some(BondToken::Triple) => SmilesBondOrder::Triple,
        Some(BondToken::Aromatic) => SmilesBondOrder::Aromatic,
        None if from_aromatic && to_aromatic => SmilesBondOrder::Aromatic,
        None => SmilesBondOrder::Implicit,
    }
}

/// Express each `@`/`@@` mark relative to the reference neighbor order
/// documented on [`Chirality`].
fn resolve_chirality(mol: &mut Mol<Atom, SmilesBond>, tree: &ParseTree) {
    let h_sentinel = NodeIndex::end();

    for (i, parse_atom) in tree.atoms.iter().enumerate() {
        if parse_atom.chirality == ChiralityToken::None {
            continue;
        }
        let center = NodeIndex::new(i);
        let implicit_h = mol.atom(center).hydrogen_count;
        let ligands = parse_atom.neighbors.len() + implicit_h as usize;
        if implicit_h > 1 || !(3..=4).contains(&ligands) {
            continue;
        }

        let mut written: Vec<NodeIndex> = parse_atom
            .neighbors
            .iter()
            .map(|n| NodeIndex::new(n.atom_idx))
            .collect();
        if implicit_h == 1 {
            let has_preceding = parse_atom.neighbors.first().is_some_and(|n| n.atom_idx < i);
            written.insert(usize::from(has_preceding), h_sentinel);
        }

        let mut reference = Vec::with_capacity(written.len());
        if implicit_h == 1 {
            reference.push(h_sentinel);
        }
        reference.extend(mol.sorted_neighbors(center));

        let even = permutation_parity(&written, &reference);
        let as_written = match parse_atom.chirality {
            ChiralityToken::CounterClockwise => Chirality::Ccw,
            ChiralityToken::Clockwise => Chirality::Cw,
            ChiralityToken::None => Chirality::None,
        };
        mol.atom_mut(center).chirality = if even {
            as_written
        } else {
            as_written.inverted()
        };
    }
}

fn resolve_ez_stereo(mol: &mut Mol<Atom, SmilesBond>, tree: &ParseTree) {
    let edges: Vec<_> = mol.bonds().collect();
    for edge in edges {
        if mol.bond(edge).order != SmilesBondOrder::Double {
            continue;
        }
        let Some((a, b)) = mol.bond_endpoints(edge) else {
            continue;
        };
        let (begin, end) = if a < b { (a, b) } else { (b, a) };
        let left = directional_neighbor(tree, begin.index(), end.index());
        let right = directional_neighbor(tree, end.index(), begin.index());
        if let (Some((l, l_above)), Some((r, r_above))) = (left, right) {
            let (l, r) = (NodeIndex::new(l), NodeIndex::new(r));
            mol.bond_mut(edge).stereo = if l_above == r_above {
                BondStereo::Cis(l, r)
            } else {
                BondStereo::Trans(l, r)
            };
        }
    }
}

/// First neighbor of `center` (other than `partner`) reached through a `/`
/// or `\` bond, and whether it sits above the double bond.
fn directional_neighbor(tree: &ParseTree, center: usize, partner: usize) -> Option<(usize, bool)> {
    tree.atoms[center]
        .neighbors
        .iter()
        .filter(|n| n.atom_idx != partner)
        .find_map(|n| {
            let up = match n.bond? {
                BondToken::Up => true,
                BondToken::Down => false,
                _ => return None,
            };
            // `/` points up when read left to right, so a neighbor written
            // before the center ends up below it.
            Some((n.atom_idx, up == (n.atom_idx > center)))
        })
}

fn resolve_hydrogen_counts(mol: &mut Mol<Atom, SmilesBond>, tree: &ParseTree) {
    for (i, parse_atom) in tree.atoms.iter().enumerate() {
        let node = NodeIndex::new(i);
        let h_count = if parse_atom.is_bracket {
            parse_atom.hcount.unwrap_or(0)
        } else {
            implicit_hydrogens(mol, node, parse_atom)
        };
        mol.atom_mut(node).hydrogen_count = h_count;
    }
}

/// Organic-subset atoms fill up to the lowest default valence that
/// accommodates their bonds; aromatic atoms give one slot to the pi system.
fn implicit_hydrogens(mol: &Mol<Atom, SmilesBond>, node: NodeIndex, parse_atom: &ParseAtom) -> u8 {
    let bond_order_sum: u8 = mol
        .bonds_of(node)
        .map(|e| mol.bond(e).provisional_valence())
        .sum();

    let Some(target) = parse_atom
        .element
        .default_valences()
        .iter()
        .copied()
        .find(|&v| v >= bond_order_sum)
    else {
        return 0;
    };

    let h = target - bond_order_sum;
    if parse_atom.is_aromatic {
        h.saturating_sub(1)
    } else {
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_tree::build_parse_tree;
    use crate::smiles::tokenizer::tokenize;

    fn parse(s: &str) -> Mol<Atom, SmilesBond> {
        let tokens = tokenize(s).unwrap();
        let tree = build_parse_tree(&tokens).unwrap();
        build_mol(&tree)
    }

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    #[test]
    fn implicit_hydrogens_fill_valence() {
        let mol = parse("CC(=O)O");
        let hs: Vec<u8> = mol.atoms().map(|i| mol.atom(i).hydrogen_count).collect();
        assert_eq!(hs, vec![3, 0, 0, 1]);
    }

    #[test]
    fn bracket_atoms_take_written_hydrogens() {
        assert_eq!(parse("[CH4]").atom(n(0)).hydrogen_count, 4);
        assert_eq!(parse("[C]").atom(n(0)).hydrogen_count, 0);
    }

    #[test]
    fn aromatic_carbons_keep_one_hydrogen() {
        let mol = parse("c1ccccc1");
        assert!(mol.atoms().all(|i| mol.atom(i).hydrogen_count == 1));
        assert!(mol.bonds().all(|e| mol.bond(e).order == SmilesBondOrder::Aromatic));
    }

    #[test]
    fn hypervalent_sulfur_picks_next_valence() {
        let mol = parse("CS(=O)(=O)C");
        assert_eq!(mol.atom(n(1)).hydrogen_count, 0);
    }

    #[test]
    fn trans_and_cis_difluoroethene() {
        let trans = parse("F/C=C/F");
        let e = trans.bond_between(n(1), n(2)).unwrap();
        assert_eq!(trans.bond(e).stereo, BondStereo::Trans(n(0), n(3)));

        let cis = parse("F/C=C\\F");
        let e = cis.bond_between(n(1), n(2)).unwrap();
        assert_eq!(cis.bond(e).stereo, BondStereo::Cis(n(0), n(3)));
    }

    #[test]
    fn branch_directional_bond_flips_sense() {
        let mol = parse("C(/F)=C/F");
        let e = mol.bond_between(n(0), n(2)).unwrap();
        assert_eq!(mol.bond(e).stereo, BondStereo::Cis(n(1), n(3)));
    }

    #[test]
    fn chirality_relative_to_reference_order() {
        // Written order is (N, H, C2, C3); reference order is (H, N, C2, C3).
        let mol = parse("N[C@@H](C)C(=O)O");
        assert_eq!(mol.atom(n(1)).chirality, Chirality::Ccw);
        let mol = parse("N[C@H](C)C(=O)O");
        assert_eq!(mol.atom(n(1)).chirality, Chirality::Cw);
    }

    #[test]
    fn leading_chiral_atom_keeps_hydrogen_first() {
        // Written order (H, F, Cl, Br) already matches the reference order.
        let mol = parse("[C@H](F)(Cl)Br");
        assert_eq!(mol.atom(n(0)).chirality, Chirality::Ccw);
    }
}
