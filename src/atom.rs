/// Tetrahedral handedness of a stereocenter.
///
/// The tag is relative to the atom's *reference neighbor order*: an implicit
/// hydrogen first (if the atom carries exactly one), then the explicit
/// neighbors by ascending node index. Looking from the first reference
/// neighbor toward the center, the remaining three run counterclockwise for
/// [`Chirality::Ccw`] and clockwise for [`Chirality::Cw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Chirality {
    #[default]
    None,
    Cw,
    Ccw,
}

impl Chirality {
    pub fn inverted(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Cw => Self::Ccw,
            Self::Ccw => Self::Cw,
        }
    }
}

/// Default atom type for a molecular graph node.
///
/// # Examples
///
/// ```
/// use moltox::Atom;
///
/// let carbon = Atom {
///     atomic_num: 6,
///     hydrogen_count: 3,
///     ..Atom::default()
/// };
/// assert_eq!(carbon.atomic_num, 6);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    pub atomic_num: u8,
    pub formal_charge: i8,
    /// Mass number, `0` for natural abundance.
    pub isotope: u16,
    /// Implicit (suppressed) hydrogens. Explicit hydrogens are graph nodes.
    pub hydrogen_count: u8,
    pub is_aromatic: bool,
    pub chirality: Chirality,
}

impl Atom {
    pub fn hydrogen() -> Self {
        Self {
            atomic_num: 1,
            ..Self::default()
        }
    }
}

impl crate::traits::HasAtomicNum for Atom {
    fn atomic_num(&self) -> u8 {
        self.atomic_num
    }
}

impl crate::traits::HasFormalCharge for Atom {
    fn formal_charge(&self) -> i8 {
        self.formal_charge
    }
}

impl crate::traits::HasIsotope for Atom {
    fn isotope(&self) -> u16 {
        self.isotope
    }
}

impl crate::traits::HasHydrogenCount for Atom {
    fn hydrogen_count(&self) -> u8 {
        self.hydrogen_count
    }
}

impl crate::traits::HasAromaticity for Atom {
    fn is_aromatic(&self) -> bool {
        self.is_aromatic
    }
}

impl crate::traits::HasChirality for Atom {
    fn chirality(&self) -> Chirality {
        self.chirality
    }
}
