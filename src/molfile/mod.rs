//! MDL V2000 MOL blocks.

mod error;
mod reader;
mod writer;

pub use error::MolFileError;
pub use reader::{read_mol, read_mol_block, MolBlock};
pub use writer::{write_mol, write_mol_block};

/// Atom-block charge code for a formal charge; `0` outside -3..=3.
pub(crate) fn charge_to_code(charge: i8) -> u8 {
    match charge {
        3 => 1,
        2 => 2,
        1 => 3,
        -1 => 5,
        -2 => 6,
        -3 => 7,
        _ => 0,
    }
}

pub(crate) fn code_to_charge(code: u8) -> Option<i8> {
    match code {
        0 | 4 => Some(0),
        1 => Some(3),
        2 => Some(2),
        3 => Some(1),
        5 => Some(-1),
        6 => Some(-2),
        7 => Some(-3),
        _ => None,
    }
}
