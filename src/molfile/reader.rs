use std::io::BufRead;

use petgraph::graph::NodeIndex;

use super::code_to_charge;
use super::error::MolFileError;
use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::element::Element;
use crate::mol::Mol;

/// A parsed MOL block. Every hydrogen is an explicit atom.
#[derive(Debug, Clone, PartialEq)]
pub struct MolBlock {
    pub title: String,
    pub mol: Mol<Atom, Bond>,
    pub positions: Vec<[f64; 3]>,
}

type Line = (usize, String);

pub fn read_mol_block(text: &str) -> Result<MolBlock, MolFileError> {
    read_mol(text.as_bytes())
}

/// Read the first record of a V2000 MOL or SD stream.
pub fn read_mol<R: BufRead>(reader: R) -> Result<MolBlock, MolFileError> {
    let lines = collect_first_record(reader)?;
    if lines.len() < 4 {
        return Err(MolFileError::parse(
            lines.len().max(1),
            "MOL block must contain a three-line header and a counts line",
        ));
    }

    let (counts_no, counts) = &lines[3];
    if counts.contains("V3000") {
        return Err(MolFileError::parse(*counts_no, "V3000 is not supported"));
    }
    let atom_count = fixed_field::<usize>(counts, 0..3, *counts_no, "atom count")?;
    let bond_count = fixed_field::<usize>(counts, 3..6, *counts_no, "bond count")?;

    let atom_start = 4;
    let bond_start = atom_start + atom_count;
    if lines.len() < bond_start + bond_count {
        return Err(MolFileError::parse(
            lines.last().map_or(*counts_no, |(ln, _)| *ln),
            "MOL block ended before atoms and bonds were fully specified",
        ));
    }

    let mut mol = Mol::new();
    let mut positions = Vec::with_capacity(atom_count);
    for (ln, raw) in &lines[atom_start..bond_start] {
        let (atom, position) = parse_atom(raw, *ln)?;
        mol.add_atom(atom);
        positions.push(position);
    }
    for (ln, raw) in &lines[bond_start..bond_start + bond_count] {
        parse_bond(&mut mol, raw, *ln)?;
    }
    apply_properties(&mut mol, &lines[bond_start + bond_count..])?;

    Ok(MolBlock {
        title: lines[0].1.trim_end().to_owned(),
        mol,
        positions,
    })
}

fn collect_first_record<R: BufRead>(reader: R) -> Result<Vec<Line>, MolFileError> {
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let content = line?;
        if content.trim() == "$$$$" && !lines.is_empty() {
            break;
        }
        lines.push((i + 1, content));
    }
    Ok(lines)
}

fn fixed_field<T: std::str::FromStr>(
    line: &str,
    range: std::ops::Range<usize>,
    line_no: usize,
    what: &str,
) -> Result<T, MolFileError> {
    line.get(range)
        .map(str::trim)
        .and_then(|s| s.parse::<T>().ok())
        .ok_or_else(|| MolFileError::parse(line_no, format!("invalid {what}")))
}

fn parse_atom(raw: &str, ln: usize) -> Result<(Atom, [f64; 3]), MolFileError> {
    let padded = format!("{raw:<48}");
    let x = fixed_field::<f64>(&padded, 0..10, ln, "x coordinate")?;
    let y = fixed_field::<f64>(&padded, 10..20, ln, "y coordinate")?;
    let z = fixed_field::<f64>(&padded, 20..30, ln, "z coordinate")?;
    let symbol = padded.get(31..34).map_or("", str::trim);
    let element = Element::from_symbol(symbol)
        .ok_or_else(|| MolFileError::parse(ln, format!("unknown element symbol {symbol:?}")))?;

    let charge_field = padded.get(36..39).map_or("", str::trim);
    let formal_charge = if charge_field.is_empty() {
        0
    } else {
        charge_field
            .parse::<u8>()
            .ok()
            .and_then(code_to_charge)
            .ok_or_else(|| MolFileError::parse(ln, "invalid charge code"))?
    };

    let atom = Atom {
        atomic_num: element.atomic_num(),
        formal_charge,
        ..Atom::default()
    };
    Ok((atom, [x, y, z]))
}

fn parse_bond(mol: &mut Mol<Atom, Bond>, raw: &str, ln: usize) -> Result<(), MolFileError> {
    let n = mol.atom_count();
    let a = fixed_field::<usize>(raw, 0..3, ln, "first atom index")?;
    let b = fixed_field::<usize>(raw, 3..6, ln, "second atom index")?;
    let order = match fixed_field::<u8>(raw, 6..9, ln, "bond order")? {
        1 => BondOrder::Single,
        2 => BondOrder::Double,
        3 => BondOrder::Triple,
        other => {
            return Err(MolFileError::parse(ln, format!("unsupported bond order {other}")));
        }
    };
    if a == 0 || b == 0 || a > n || b > n || a == b {
        return Err(MolFileError::parse(
            ln,
            "bond references atom outside declared range",
        ));
    }
    let (a, b) = (NodeIndex::new(a - 1), NodeIndex::new(b - 1));
    if mol.bond_between(a, b).is_some() {
        return Err(MolFileError::parse(ln, "duplicate bond"));
    }
    mol.add_bond(a, b, Bond::with_order(order));
    Ok(())
}

/// `M  CHG` and `M  ISO` lines up to `M  END`. Any `M  CHG` line resets
/// the charges given in the atom block.
fn apply_properties(mol: &mut Mol<Atom, Bond>, lines: &[Line]) -> Result<(), MolFileError> {
    let mut charges_reset = false;
    for (ln, raw) in lines {
        if raw.starts_with("M  END") {
            return Ok(());
        }
        let tag = raw.get(0..6).unwrap_or("");
        if tag != "M  CHG" && tag != "M  ISO" {
            continue;
        }
        let values: Vec<i32> = raw[6..]
            .split_whitespace()
            .map(|t| t.parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|_| MolFileError::parse(*ln, "invalid properties line"))?;
        let Some((&count, pairs)) = values.split_first() else {
            return Err(MolFileError::parse(*ln, "empty properties line"));
        };
        if count < 0 || pairs.len() != 2 * count as usize {
            return Err(MolFileError::parse(*ln, "properties entry count mismatch"));
        }

        if tag == "M  CHG" && !charges_reset {
            let all: Vec<_> = mol.atoms().collect();
            for idx in all {
                mol.atom_mut(idx).formal_charge = 0;
            }
            charges_reset = true;
        }
        for pair in pairs.chunks_exact(2) {
            let atom = usize::try_from(pair[0])
                .ok()
                .filter(|&a| (1..=mol.atom_count()).contains(&a))
                .ok_or_else(|| MolFileError::parse(*ln, "properties line references unknown atom"))?;
            let idx = NodeIndex::new(atom - 1);
            if tag == "M  CHG" {
                mol.atom_mut(idx).formal_charge = i8::try_from(pair[1])
                    .map_err(|_| MolFileError::parse(*ln, "charge out of range"))?;
            } else {
                mol.atom_mut(idx).isotope = u16::try_from(pair[1])
                    .map_err(|_| MolFileError::parse(*ln, "isotope out of range"))?;
            }
        }
    }
    Ok(())
}
