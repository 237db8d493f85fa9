use crate::element::Element;
use crate::smiles::error::SmilesError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Atom(AtomToken),
    Bond(BondToken),
    RingClosure {
        bond: Option<BondToken>,
        digit: u16,
        pos: usize,
    },
    OpenParen(usize),
    CloseParen(usize),
    Dot(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomToken {
    pub element: Element,
    pub is_aromatic: bool,
    pub isotope: u16,
    pub chirality: ChiralityToken,
    pub hcount: Option<u8>,
    pub charge: i8,
    pub atom_class: u16,
    pub is_bracket: bool,
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChiralityToken {
    None,
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondToken {
    Single,
    Double,
    Triple,
    Aromatic,
    Up,
    Down,
}

// Two-letter symbols must precede their one-letter prefixes.
const ORGANIC_SUBSET: [(&str, Element, bool); 16] = [
    ("Cl", Element::CL, false),
    ("Br", Element::BR, false),
    ("B", Element::B, false),
    ("C", Element::C, false),
    ("N", Element::N, false),
    ("O", Element::O, false),
    ("P", Element::P, false),
    ("S", Element::S, false),
    ("F", Element::F, false),
    ("I", Element::I, false),
    ("b", Element::B, true),
    ("c", Element::C, true),
    ("n", Element::N, true),
    ("o", Element::O, true),
    ("p", Element::P, true),
    ("s", Element::S, true),
];

const BRACKET_AROMATIC: [(&str, Element); 8] = [
    ("se", Element::SE),
    ("te", Element::TE),
    ("b", Element::B),
    ("c", Element::C),
    ("n", Element::N),
    ("o", Element::O),
    ("p", Element::P),
    ("s", Element::S),
];

/// Split a SMILES string into tokens. Scanning stops at the first
/// whitespace character; anything after it is a title and is ignored.
pub fn tokenize(input: &str) -> Result<Vec<Token>, SmilesError> {
    let chars: Vec<char> = input.chars().take_while(|c| !c.is_whitespace()).collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if let Some((element, aromatic, len)) = organic_atom(&chars, i) {
            tokens.push(Token::Atom(bare_atom(element, aromatic, i)));
            i += len;
            continue;
        }
        match chars[i] {
            '[' => {
                let (tok, next) = parse_bracket_atom(&chars, i)?;
                tokens.push(Token::Atom(tok));
                i = next;
            }
            '-' | '=' | '#' | ':' | '/' | '\\' => {
                if !follows_atom(&tokens) {
                    return Err(SmilesError::UnexpectedChar { pos: i, ch: chars[i] });
                }
                let bond = match chars[i] {
                    '-' => BondToken::Single,
                    '=' => BondToken::Double,
                    '#' => BondToken::Triple,
                    ':' => BondToken::Aromatic,
                    '/' => BondToken::Up,
                    _ => BondToken::Down,
                };
                tokens.push(Token::Bond(bond));
                i += 1;
            }
            '(' => {
                tokens.push(Token::OpenParen(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen(i));
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot(i));
                i += 1;
            }
            '%' => {
                let (digit, next) = parse_percent_ring(&chars, i)?;
                let bond = take_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure { bond, digit, pos: i });
                i = next;
            }
            d @ '0'..='9' => {
                let bond = take_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure {
                    bond,
                    digit: d as u16 - '0' as u16,
                    pos: i,
                });
                i += 1;
            }
            ch => return Err(SmilesError::UnexpectedChar { pos: i, ch }),
        }
    }

    if matches!(tokens.last(), Some(Token::Bond(_))) {
        return Err(SmilesError::UnexpectedEnd);
    }
    Ok(tokens)
}

fn organic_atom(chars: &[char], i: usize) -> Option<(Element, bool, usize)> {
    ORGANIC_SUBSET.iter().find_map(|&(sym, element, aromatic)| {
        let len = sym.chars().count();
        let matches = chars.len() >= i + len && sym.chars().zip(&chars[i..]).all(|(a, &b)| a == b);
        matches.then_some((element, aromatic, len))
    })
}

fn bare_atom(element: Element, aromatic: bool, pos: usize) -> AtomToken {
    AtomToken {
        element,
        is_aromatic: aromatic,
        isotope: 0,
        chirality: ChiralityToken::None,
        hcount: None,
        charge: 0,
        atom_class: 0,
        is_bracket: false,
        pos,
    }
}

fn follows_atom(tokens: &[Token]) -> bool {
    matches!(
        tokens.last(),
        Some(Token::Atom(_))
            | Some(Token::RingClosure { .. })
            | Some(Token::CloseParen(_))
            | Some(Token::OpenParen(_))
    )
}

fn take_pending_bond(tokens: &mut Vec<Token>) -> Option<BondToken> {
    match tokens.last() {
        Some(Token::Bond(b)) => {
            let b = *b;
            tokens.pop();
            Some(b)
        }
        _ => None,
    }
}

fn parse_percent_ring(chars: &[char], start: usize) -> Result<(u16, usize), SmilesError> {
    let i = start + 1;
    match (chars.get(i), chars.get(i + 1)) {
        (Some(a), Some(b)) if a.is_ascii_digit() && b.is_ascii_digit() => {
            let digit = (*a as u16 - '0' as u16) * 10 + (*b as u16 - '0' as u16);
            Ok((digit, i + 2))
        }
        _ => Err(SmilesError::UnexpectedChar {
            pos: start,
            ch: '%',
        }),
    }
}

fn parse_bracket_atom(chars: &[char], start: usize) -> Result<(AtomToken, usize), SmilesError> {
    let mut i = start + 1;

    let isotope = parse_isotope(chars, &mut i)?;
    let (element, is_aromatic) = parse_bracket_element(chars, &mut i, start)?;
    let chirality = parse_chirality(chars, &mut i);
    let hcount = parse_hcount(chars, &mut i);
    let charge = parse_charge(chars, &mut i, start)?;
    let atom_class = parse_atom_class(chars, &mut i);

    if chars.get(i) != Some(&']') {
        return Err(SmilesError::UnclosedBracket { pos: start });
    }

    Ok((
        AtomToken {
            element,
            is_aromatic,
            isotope,
            chirality,
            hcount: Some(hcount),
            charge,
            atom_class,
            is_bracket: true,
            pos: start,
        },
        i + 1,
    ))
}

fn parse_isotope(chars: &[char], i: &mut usize) -> Result<u16, SmilesError> {
    let start = *i;
    let mut val: u16 = 0;
    while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        val = val
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as u16))
            .ok_or(SmilesError::InvalidIsotope { pos: start })?;
        *i += 1;
    }
    Ok(val)
}

fn parse_bracket_element(
    chars: &[char],
    i: &mut usize,
    bracket_start: usize,
) -> Result<(Element, bool), SmilesError> {
    let Some(&first) = chars.get(*i) else {
        return Err(SmilesError::UnclosedBracket { pos: bracket_start });
    };

    if first.is_ascii_lowercase() {
        for &(pat, elem) in &BRACKET_AROMATIC {
            let len = pat.len();
            if chars.len() >= *i + len && pat.chars().zip(&chars[*i..]).all(|(a, &b)| a == b) {
                *i += len;
                return Ok((elem, true));
            }
        }
    }

    if first.is_ascii_uppercase() {
        if let Some(&second) = chars.get(*i + 1).filter(|c| c.is_ascii_lowercase()) {
            let sym: String = [first, second].iter().collect();
            if let Some(e) = Element::from_symbol(&sym) {
                *i += 2;
                return Ok((e, false));
            }
        }
        if let Some(e) = Element::from_symbol(&first.to_string()) {
            *i += 1;
            return Ok((e, false));
        }
    }

    Err(SmilesError::InvalidElement {
        pos: *i,
        text: first.to_string(),
    })
}

fn parse_chirality(chars: &[char], i: &mut usize) -> ChiralityToken {
    if chars.get(*i) != Some(&'@') {
        return ChiralityToken::None;
    }
    *i += 1;
    if chars.get(*i) == Some(&'@') {
        *i += 1;
        ChiralityToken::Clockwise
    } else {
        ChiralityToken::CounterClockwise
    }
}

fn parse_hcount(chars: &[char], i: &mut usize) -> u8 {
    if chars.get(*i) != Some(&'H') {
        return 0;
    }
    *i += 1;
    match chars.get(*i).and_then(|c| c.to_digit(10)) {
        Some(d) => {
            *i += 1;
            d as u8
        }
        None => 1,
    }
}

fn parse_charge(chars: &[char], i: &mut usize, bracket_start: usize) -> Result<i8, SmilesError> {
    let sign: i8 = match chars.get(*i) {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Ok(0),
    };
    let sign_char = chars[*i];
    *i += 1;

    let overflow = SmilesError::InvalidCharge { pos: bracket_start };
    if chars.get(*i) == Some(&sign_char) {
        // `++`, `---`: each repeated sign adds one unit.
        let mut magnitude: i8 = 1;
        while chars.get(*i) == Some(&sign_char) {
            magnitude = magnitude.checked_add(1).ok_or(overflow.clone())?;
            *i += 1;
        }
        return Ok(sign * magnitude);
    }

    let mut magnitude: i8 = 0;
    let mut any = false;
    while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        magnitude = magnitude
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as i8))
            .ok_or(overflow.clone())?;
        any = true;
        *i += 1;
    }
    Ok(sign * if any { magnitude } else { 1 })
}

fn parse_atom_class(chars: &[char], i: &mut usize) -> u16 {
    if chars.get(*i) != Some(&':') {
        return 0;
    }
    *i += 1;
    let mut val: u16 = 0;
    while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        val = val.saturating_mul(10).saturating_add(d as u16);
        *i += 1;
    }
    val
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_atom(s: &str) -> AtomToken {
        match tokenize(s).unwrap().into_iter().next() {
            Some(Token::Atom(a)) => a,
            other => panic!("expected atom, got {other:?}"),
        }
    }

    #[test]
    fn organic_subset_prefers_two_letter_symbols() {
        let tokens = tokenize("ClCBr").unwrap();
        let elements: Vec<Element> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Atom(a) => Some(a.element),
                _ => None,
            })
            .collect();
        assert_eq!(elements, vec![Element::CL, Element::C, Element::BR]);
    }

    #[test]
    fn bracket_atom_with_hydrogens_and_charge() {
        let a = first_atom("[NH4+]");
        assert_eq!(a.element, Element::N);
        assert!(a.is_bracket);
        assert_eq!(a.hcount, Some(4));
        assert_eq!(a.charge, 1);
    }

    #[test]
    fn isotope_prefix() {
        let a = first_atom("[13CH4]");
        assert_eq!(a.isotope, 13);
        assert_eq!(a.element, Element::C);
    }

    #[test]
    fn ring_closure_digits() {
        let tokens = tokenize("C1CC1").unwrap();
        assert_eq!(tokens.len(), 5);
        assert!(matches!(&tokens[1], Token::RingClosure { digit: 1, .. }));
        let tokens = tokenize("C%10CC%10").unwrap();
        assert!(matches!(&tokens[1], Token::RingClosure { digit: 10, .. }));
    }

    #[test]
    fn bond_before_ring_digit_is_absorbed() {
        let tokens = tokenize("C=1CCCCC1").unwrap();
        assert!(matches!(
            &tokens[1],
            Token::RingClosure {
                bond: Some(BondToken::Double),
                digit: 1,
                ..
            }
        ));
    }

    #[test]
    fn chirality_marks() {
        assert_eq!(first_atom("[C@@H](F)(Cl)Br").chirality, ChiralityToken::Clockwise);
        assert_eq!(first_atom("[C@H](F)(Cl)Br").chirality, ChiralityToken::CounterClockwise);
    }

    #[test]
    fn aromatic_selenium_in_brackets() {
        let a = first_atom("[se]");
        assert!(a.is_aromatic);
        assert_eq!(a.element, Element::SE);
    }

    #[test]
    fn charge_spellings() {
        assert_eq!(first_atom("[O-]").charge, -1);
        assert_eq!(first_atom("[O-2]").charge, -2);
        assert_eq!(first_atom("[O--]").charge, -2);
        assert_eq!(first_atom("[Fe+3]").charge, 3);
    }

    #[test]
    fn atom_class_is_read() {
        assert_eq!(first_atom("[CH3:7]").atom_class, 7);
    }

    #[test]
    fn text_after_whitespace_is_ignored() {
        assert_eq!(tokenize("CCO ethanol").unwrap().len(), 3);
    }

    #[test]
    fn prose_is_rejected() {
        assert!(matches!(
            tokenize("not_a_smiles"),
            Err(SmilesError::UnexpectedChar { ch: 't', .. })
        ));
    }

    #[test]
    fn dangling_bond_is_rejected() {
        assert_eq!(tokenize("CC="), Err(SmilesError::UnexpectedEnd));
        assert!(tokenize("=C").is_err());
    }

    #[test]
    fn unknown_bracket_element() {
        assert!(matches!(
            tokenize("[Xx]"),
            Err(SmilesError::InvalidElement { .. })
        ));
    }
}
