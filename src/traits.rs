use crate::atom::Chirality;
use crate::bond::{BondOrder, BondStereo};

pub trait HasAtomicNum {
    fn atomic_num(&self) -> u8;
}

pub trait HasFormalCharge {
    fn formal_charge(&self) -> i8;
}

pub trait HasIsotope {
    fn isotope(&self) -> u16;
}

pub trait HasChirality {
    fn chirality(&self) -> Chirality;
}

pub trait HasHydrogenCount {
    fn hydrogen_count(&self) -> u8;
}

pub trait HasAromaticity {
    fn is_aromatic(&self) -> bool;
}

pub trait HasBondOrder {
    fn bond_order(&self) -> BondOrder;
}

pub trait HasBondStereo {
    fn bond_stereo(&self) -> BondStereo;
}
