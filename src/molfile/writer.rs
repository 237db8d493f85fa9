use std::io::Write;

use petgraph::graph::NodeIndex;

use super::charge_to_code;
use super::error::MolFileError;
use crate::atom::{Atom, Chirality};
use crate::bond::{Bond, BondOrder};
use crate::element::Element;
use crate::mol::Mol;

/// Properties lines hold at most eight entries each.
const ENTRIES_PER_LINE: usize = 8;

/// Serialize `mol` with one position per atom as a V2000 MOL block.
///
/// Bonds are written in their Kekulé form. Tagged stereocenters with four
/// neighbors get a parity derived from `positions`; atoms without a
/// position are written at the origin.
pub fn write_mol_block(mol: &Mol<Atom, Bond>, positions: &[[f64; 3]], title: &str) -> String {
    let mut out = String::new();
    let title = title.lines().next().unwrap_or("");
    out.push_str(title);
    out.push('\n');
    out.push_str("  moltox          3D\n");
    out.push('\n');
    out.push_str(&format!(
        "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000\n",
        mol.atom_count(),
        mol.bond_count()
    ));

    for idx in mol.atoms() {
        let atom = mol.atom(idx);
        let [x, y, z] = positions.get(idx.index()).copied().unwrap_or([0.0; 3]);
        let symbol = Element::from_atomic_num(atom.atomic_num).map_or("*", Element::symbol);
        out.push_str(&format!(
            "{x:>10.4}{y:>10.4}{z:>10.4} {symbol:<3} 0{:>3}{:>3}  0  0  0  0  0  0  0  0  0\n",
            charge_to_code(atom.formal_charge),
            parity(mol, positions, idx),
        ));
    }

    for e in mol.bonds() {
        let Some((a, b)) = mol.bond_endpoints(e) else {
            continue;
        };
        let order = match mol.bond(e).order {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
        };
        out.push_str(&format!(
            "{:>3}{:>3}{:>3}  0  0  0  0\n",
            a.index() + 1,
            b.index() + 1,
            order
        ));
    }

    let charged: Vec<(usize, i8)> = mol
        .atoms()
        .filter(|&i| mol.atom(i).formal_charge != 0)
        .map(|i| (i.index() + 1, mol.atom(i).formal_charge))
        .collect();
    push_property(&mut out, "CHG", &charged);

    let labelled: Vec<(usize, u16)> = mol
        .atoms()
        .filter(|&i| mol.atom(i).isotope != 0)
        .map(|i| (i.index() + 1, mol.atom(i).isotope))
        .collect();
    push_property(&mut out, "ISO", &labelled);

    out.push_str("M  END\n");
    out
}

/// Write a MOL block followed by the SD record terminator.
pub fn write_mol<W: Write>(
    mut writer: W,
    mol: &Mol<Atom, Bond>,
    positions: &[[f64; 3]],
    title: &str,
) -> Result<(), MolFileError> {
    writer.write_all(write_mol_block(mol, positions, title).as_bytes())?;
    writeln!(writer, "$$$$")?;
    Ok(())
}

fn push_property<T: std::fmt::Display>(out: &mut String, tag: &str, entries: &[(usize, T)]) {
    for chunk in entries.chunks(ENTRIES_PER_LINE) {
        out.push_str(&format!("M  {tag}{:>3}", chunk.len()));
        for (atom, value) in chunk {
            out.push_str(&format!(" {atom:>3} {value:>3}"));
        }
        out.push('\n');
    }
}

/// MDL parity: with the highest-numbered neighbor pointing away from the
/// viewer, the other three in ascending order run clockwise (1) or
/// counterclockwise (2).
fn parity(mol: &Mol<Atom, Bond>, positions: &[[f64; 3]], idx: NodeIndex) -> u8 {
    if mol.atom(idx).chirality == Chirality::None {
        return 0;
    }
    let nbrs = mol.sorted_neighbors(idx);
    if nbrs.len() != 4 {
        return 0;
    }
    let Some(c) = positions.get(idx.index()) else {
        return 0;
    };
    let rel = |n: NodeIndex| -> Option<[f64; 3]> {
        let p = positions.get(n.index())?;
        Some([p[0] - c[0], p[1] - c[1], p[2] - c[2]])
    };
    let (Some(a), Some(b), Some(d)) = (rel(nbrs[0]), rel(nbrs[1]), rel(nbrs[2])) else {
        return 0;
    };
    let cross = [
        b[1] * d[2] - b[2] * d[1],
        b[2] * d[0] - b[0] * d[2],
        b[0] * d[1] - b[1] * d[0],
    ];
    let volume = a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2];
    if volume > 0.0 {
        2
    } else if volume < 0.0 {
        1
    } else {
        0
    }
}
