use petgraph::graph::NodeIndex;

/// Kekulé bond order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
}

impl BondOrder {
    pub fn valence_contribution(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }
}

/// Double-bond geometry, given by one reference neighbor on each end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondStereo {
    #[default]
    None,
    Cis(NodeIndex, NodeIndex),
    Trans(NodeIndex, NodeIndex),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bond {
    pub order: BondOrder,
    /// Set by aromaticity perception; `order` still holds the Kekulé form.
    pub is_aromatic: bool,
    pub stereo: BondStereo,
}

impl Bond {
    pub fn with_order(order: BondOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }
}

impl crate::traits::HasBondOrder for Bond {
    fn bond_order(&self) -> BondOrder {
        self.order
    }
}

impl crate::traits::HasBondStereo for Bond {
    fn bond_stereo(&self) -> BondStereo {
        self.stereo
    }
}

/// Bond order as written in SMILES, before kekulization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SmilesBondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
    #[default]
    Implicit,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmilesBond {
    pub order: SmilesBondOrder,
    pub stereo: BondStereo,
}

impl SmilesBond {
    /// Contribution to the bonding valence while the aromatic system is
    /// still unresolved; aromatic and implicit bonds count as single.
    pub fn provisional_valence(&self) -> u8 {
        match self.order {
            SmilesBondOrder::Double => 2,
            SmilesBondOrder::Triple => 3,
            SmilesBondOrder::Single | SmilesBondOrder::Aromatic | SmilesBondOrder::Implicit => 1,
        }
    }
}
