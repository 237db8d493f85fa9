use crate::element::Element;
use crate::smiles::error::SmilesError;
use crate::smiles::tokenizer::{AtomToken, BondToken, ChiralityToken, Token};

#[derive(Debug, Clone)]
pub struct ParseAtom {
    pub element: Element,
    pub is_aromatic: bool,
    pub isotope: u16,
    pub chirality: ChiralityToken,
    pub hcount: Option<u8>,
    pub charge: i8,
    pub is_bracket: bool,
    /// Neighbors in written order; ring closures sit where their digit
    /// appears on this atom.
    pub neighbors: Vec<Neighbor>,
}

#[derive(Debug, Clone)]
pub struct Neighbor {
    pub bond: Option<BondToken>,
    pub atom_idx: usize,
}

#[derive(Debug, Clone)]
pub struct ParseTree {
    pub atoms: Vec<ParseAtom>,
}

struct OpenRing {
    atom: usize,
    bond: Option<BondToken>,
    slot: usize,
}

pub fn build_parse_tree(tokens: &[Token]) -> Result<ParseTree, SmilesError> {
    let mut atoms: Vec<ParseAtom> = Vec::new();
    let mut branch_stack: Vec<(usize, usize)> = Vec::new();
    let mut current: Option<usize> = None;
    let mut pending_bond: Option<BondToken> = None;
    let mut ring_opens: Vec<Option<OpenRing>> = (0..100).map(|_| None).collect();

    for token in tokens {
        match token {
            Token::Atom(atom_tok) => {
                let idx = atoms.len();
                atoms.push(parse_atom_from_token(atom_tok));
                let bond = pending_bond.take();
                if let Some(cur) = current {
                    atoms[cur].neighbors.push(Neighbor { bond, atom_idx: idx });
                    atoms[idx].neighbors.push(Neighbor { bond, atom_idx: cur });
                }
                current = Some(idx);
            }
            Token::Bond(b) => {
                pending_bond = Some(*b);
            }
            Token::RingClosure { bond, digit, pos } => {
                let cur = current.ok_or(SmilesError::InvalidRingBond {
                    digit: *digit,
                    pos: *pos,
                })?;
                let slot = &mut ring_opens[*digit as usize];
                match slot.take() {
                    Some(open) => {
                        let ring_bond = match (*bond, open.bond) {
                            (None, None) => None,
                            (Some(b), None) | (None, Some(b)) => Some(b),
                            (Some(b1), Some(b2)) if b1 == b2 => Some(b1),
                            // `/` at one end and `\` at the other describe the same bond.
                            (Some(BondToken::Up), Some(BondToken::Down))
                            | (Some(BondToken::Down), Some(BondToken::Up)) => *bond,
                            _ => return Err(SmilesError::RingBondConflict { digit: *digit }),
                        };
                        if open.atom == cur
                            || atoms[cur].neighbors.iter().any(|n| n.atom_idx == open.atom)
                        {
                            return Err(SmilesError::InvalidRingClosure { digit: *digit });
                        }
                        atoms[open.atom].neighbors[open.slot] = Neighbor {
                            bond: ring_bond,
                            atom_idx: cur,
                        };
                        atoms[cur].neighbors.push(Neighbor {
                            bond: ring_bond,
                            atom_idx: open.atom,
                        });
                    }
                    None => {
                        let neighbors = &mut atoms[cur].neighbors;
                        let slot_idx = neighbors.len();
                        neighbors.push(Neighbor {
                            bond: None,
                            atom_idx: usize::MAX,
                        });
                        *slot = Some(OpenRing {
                            atom: cur,
                            bond: *bond,
                            slot: slot_idx,
                        });
                    }
                }
            }
            Token::OpenParen(pos) => {
                let cur = current.ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                branch_stack.push((cur, *pos));
            }
            Token::CloseParen(pos) => {
                let (atom, _) = branch_stack
                    .pop()
                    .ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                current = Some(atom);
                pending_bond = None;
            }
            Token::Dot(_) => {
                current = None;
                pending_bond = None;
            }
        }
    }

    if let Some(&(_, pos)) = branch_stack.last() {
        return Err(SmilesError::UnmatchedParen { pos });
    }

    if let Some(digit) = ring_opens.iter().position(Option::is_some) {
        return Err(SmilesError::UnclosedRing {
            digit: digit as u16,
        });
    }

    Ok(ParseTree { atoms })
}

fn parse_atom_from_token(tok: &AtomToken) -> ParseAtom {
    ParseAtom {
        element: tok.element,
        is_aromatic: tok.is_aromatic,
        isotope: tok.isotope,
        chirality: tok.chirality,
        hcount: tok.hcount,
        charge: tok.charge,
        is_bracket: tok.is_bracket,
        neighbors: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::tokenizer::tokenize;

    fn tree(s: &str) -> Result<ParseTree, SmilesError> {
        build_parse_tree(&tokenize(s)?)
    }

    #[test]
    fn chain_neighbors() {
        let t = tree("CC").unwrap();
        assert_eq!(t.atoms.len(), 2);
        assert_eq!(t.atoms[0].neighbors[0].atom_idx, 1);
    }

    #[test]
    fn ring_closure_keeps_digit_position() {
        // Atom 0 writes its ring digit before its chain neighbor.
        let t = tree("C1CCCCC1").unwrap();
        assert_eq!(t.atoms[0].neighbors[0].atom_idx, 5);
        assert_eq!(t.atoms[0].neighbors[1].atom_idx, 1);
        assert!(t.atoms.iter().all(|a| a.neighbors.len() == 2));
    }

    #[test]
    fn branch_neighbors() {
        let t = tree("CC(C)C").unwrap();
        assert_eq!(t.atoms[1].neighbors.len(), 3);
    }

    #[test]
    fn unclosed_ring_error() {
        assert_eq!(tree("C1CC").unwrap_err(), SmilesError::UnclosedRing { digit: 1 });
    }

    #[test]
    fn unmatched_paren_errors() {
        assert!(matches!(tree("C(C"), Err(SmilesError::UnmatchedParen { pos: 1 })));
        assert!(matches!(tree("CC)C"), Err(SmilesError::UnmatchedParen { .. })));
    }

    #[test]
    fn conflicting_ring_bonds() {
        assert!(matches!(
            tree("C=1CCC#1"),
            Err(SmilesError::RingBondConflict { digit: 1 })
        ));
    }

    #[test]
    fn self_closing_ring_is_rejected() {
        assert!(matches!(
            tree("C11"),
            Err(SmilesError::InvalidRingClosure { digit: 1 })
        ));
    }

    #[test]
    fn disconnected_fragments() {
        let t = tree("[Na+].[Cl-]").unwrap();
        assert_eq!(t.atoms.len(), 2);
        assert!(t.atoms.iter().all(|a| a.neighbors.is_empty()));
    }
}
