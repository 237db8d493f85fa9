//! DREIDING atom typing and parameter lookup.
//!
//! Atom types follow the DREIDING naming scheme: element symbol padded to
//! two characters with `_`, then a hybridization suffix (`1`, `2`, `3`, or
//! `R` for resonant). Parameters come from the embedded table in
//! `resources/dreiding.toml`, parsed once per process.

use std::collections::HashMap;
use std::sync::OnceLock;

use petgraph::graph::NodeIndex;
use serde::Deserialize;

use super::error::StructureError;
use crate::bond::{Bond, BondOrder};
use crate::element::Element;
use crate::hybridization::Hybridization;
use crate::sanitize::MoleculeGraph;

const DREIDING_TOML: &str = include_str!("../../resources/dreiding.toml");

static DREIDING: OnceLock<Result<ForceFieldParams, String>> = OnceLock::new();

pub const TETRAHEDRAL_ANGLE: f64 = 109.471;

#[derive(Debug, Clone, Deserialize)]
pub struct ForceFieldParams {
    #[serde(default)]
    pub global: GlobalParams,
    #[serde(default)]
    pub atoms: HashMap<String, AtomTypeParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalParams {
    #[serde(default = "default_bond_k")]
    pub bond_k: f64,
    #[serde(default = "default_angle_k")]
    pub angle_k: f64,
    #[serde(default = "default_bond_delta")]
    pub bond_delta: f64,
}

fn default_bond_k() -> f64 {
    700.0
}
fn default_angle_k() -> f64 {
    100.0
}
fn default_bond_delta() -> f64 {
    0.01
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            bond_k: default_bond_k(),
            angle_k: default_angle_k(),
            bond_delta: default_bond_delta(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AtomTypeParams {
    pub bond_radius: f64,
    /// Degrees.
    pub bond_angle: f64,
    pub vdw_r0: f64,
    pub vdw_d0: f64,
}

pub fn load_parameters(text: &str) -> Result<ForceFieldParams, toml::de::Error> {
    toml::from_str(text)
}

/// The embedded parameter table.
pub fn default_parameters() -> Result<&'static ForceFieldParams, StructureError> {
    DREIDING
        .get_or_init(|| load_parameters(DREIDING_TOML).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| StructureError::EmbeddingFailure(format!("DREIDING table unreadable: {e}")))
}

/// Coarse geometry class of a typed atom, taken from its type suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Linear,
    Trigonal,
    Resonant,
    Tetrahedral,
    /// H and halogens.
    Terminal,
}

impl Geometry {
    fn from_label(label: &str) -> Self {
        match label.chars().last() {
            Some('1') => Self::Linear,
            Some('2') => Self::Trigonal,
            Some('R') => Self::Resonant,
            Some('3') => Self::Tetrahedral,
            _ => Self::Terminal,
        }
    }

    pub fn is_planar(self) -> bool {
        matches!(self, Self::Trigonal | Self::Resonant)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedAtom {
    pub label: String,
    pub geometry: Geometry,
    pub params: AtomTypeParams,
}

/// Type every atom of a hydrogen-complete graph.
pub fn assign_types(graph: &MoleculeGraph, params: &ForceFieldParams) -> Vec<TypedAtom> {
    graph
        .mol()
        .atoms()
        .map(|idx| type_atom(graph, idx, params))
        .collect()
}

fn type_atom(graph: &MoleculeGraph, idx: NodeIndex, params: &ForceFieldParams) -> TypedAtom {
    let atom = graph.mol().atom(idx);
    let Some(elem) = Element::from_atomic_num(atom.atomic_num) else {
        return TypedAtom {
            label: "X_3".to_owned(),
            geometry: Geometry::Tetrahedral,
            params: fallback_params(None),
        };
    };

    let (base, suffix) = match elem.atomic_num() {
        1 => ("H_".to_owned(), None),
        9 => ("F_".to_owned(), None),
        17 => ("Cl".to_owned(), None),
        35 => ("Br".to_owned(), None),
        53 => ("I_".to_owned(), None),
        _ => {
            let sym = elem.symbol();
            let base = if sym.len() == 1 {
                format!("{sym}_")
            } else {
                sym.to_owned()
            };
            (base, Some(hybridization_suffix(graph, idx)))
        }
    };

    let label = match suffix {
        Some(c) => format!("{base}{c}"),
        None => base.clone(),
    };
    // S_2, P_R and friends are not tabulated; fall back to the sp3 type.
    let sp3 = format!("{base}3");
    let (label, found) = match params.atoms.get(&label) {
        Some(p) => (label, Some(*p)),
        None => match params.atoms.get(&sp3) {
            Some(p) => (sp3, Some(*p)),
            None => (label, None),
        },
    };

    TypedAtom {
        geometry: Geometry::from_label(&label),
        params: found.unwrap_or_else(|| fallback_params(Some(elem))),
        label,
    }
}

fn hybridization_suffix(graph: &MoleculeGraph, idx: NodeIndex) -> char {
    let mol = graph.mol();
    if mol.atom(idx).is_aromatic {
        return 'R';
    }
    match graph.hybridization(idx) {
        Hybridization::SP => '1',
        Hybridization::SP2 => {
            let multiple = mol
                .bonds_of(idx)
                .any(|e| mol.bond(e).order != BondOrder::Single);
            if multiple {
                '2'
            } else {
                'R'
            }
        }
        _ => '3',
    }
}

fn fallback_params(elem: Option<Element>) -> AtomTypeParams {
    AtomTypeParams {
        bond_radius: elem.and_then(Element::covalent_radius).unwrap_or(1.5),
        bond_angle: TETRAHEDRAL_ANGLE,
        vdw_r0: elem
            .and_then(Element::vdw_radius)
            .map(|r| 2.0 * r)
            .unwrap_or(4.0),
        vdw_d0: 0.1,
    }
}

/// O, S, Se, Te.
pub fn is_oxygen_column(atomic_num: u8) -> bool {
    matches!(atomic_num, 8 | 16 | 34 | 52)
}

/// Equilibrium length of a bond, R_i + R_j - delta.
pub fn bond_length(types: &[TypedAtom], params: &ForceFieldParams, i: usize, j: usize) -> f64 {
    types[i].params.bond_radius + types[j].params.bond_radius - params.global.bond_delta
}

/// Bond multiplicity scaling the stretch constant; aromatic bonds count 1.5.
pub fn bond_multiplicity(bond: &Bond) -> f64 {
    if bond.is_aromatic {
        1.5
    } else {
        f64::from(bond.order.valence_contribution())
    }
}

/// Target value of one bond angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleTarget {
    pub degrees: f64,
    /// Set inside or next to three- to five-membered rings, where the
    /// target is only approximate.
    pub strained: bool,
}

/// Ideal i-j-k angle. `None` for hypervalent centers with more than four
/// neighbors, whose angles are not modelled.
pub fn ideal_angle(
    graph: &MoleculeGraph,
    types: &[TypedAtom],
    i: NodeIndex,
    j: NodeIndex,
    k: NodeIndex,
) -> Option<AngleTarget> {
    let degree = graph.mol().degree(j);
    if degree > 4 {
        return None;
    }
    let rings = graph.rings();
    let polygon = |size: usize| (size as f64 - 2.0) * 180.0 / size as f64;

    if let Some(ring) = rings.smallest_ring_with_atoms(&[i, j, k]).filter(|r| r.len() <= 5) {
        return Some(AngleTarget {
            degrees: polygon(ring.len()),
            strained: true,
        });
    }
    if let Some(size) = rings.smallest_ring_size(j).filter(|&s| s <= 5) {
        // Exocyclic partner of a small-ring atom.
        let degrees = match (degree, size) {
            (3, _) => (360.0 - polygon(size)) / 2.0,
            (_, 3) => 117.0,
            (_, 4) => 113.0,
            _ => 111.0,
        };
        return Some(AngleTarget {
            degrees,
            strained: true,
        });
    }

    let table = types[j.index()].params.bond_angle;
    let degrees = match degree {
        4 => TETRAHEDRAL_ANGLE,
        3 if table > 179.0 => 120.0,
        _ => table,
    };
    Some(AngleTarget {
        degrees,
        strained: false,
    })
}

/// DREIDING torsion parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionParams {
    /// Barrier height in kcal/mol, before division over the bond's torsions.
    pub v_barrier: f64,
    pub periodicity: i32,
    /// Degrees.
    pub phase_offset: f64,
}

/// Torsion about the j-k bond, given the geometry of the central atoms and
/// of the outer atom i.
pub fn torsion_params(
    j: Geometry,
    k: Geometry,
    j_is_oxygen_column: bool,
    k_is_oxygen_column: bool,
    i: Geometry,
    central: &Bond,
) -> Option<TorsionParams> {
    use Geometry::*;
    let params = |v_barrier, periodicity, phase_offset| TorsionParams {
        v_barrier,
        periodicity,
        phase_offset,
    };
    match (j, k) {
        (Tetrahedral, Tetrahedral) => {
            if j_is_oxygen_column && k_is_oxygen_column {
                Some(params(2.0, 2, 90.0))
            } else {
                Some(params(2.0, 3, 180.0))
            }
        }
        (Trigonal | Resonant, Trigonal | Resonant) => {
            if central.is_aromatic {
                Some(params(25.0, 2, 180.0))
            } else if central.order == BondOrder::Double {
                Some(params(45.0, 2, 180.0))
            } else {
                Some(params(5.0, 2, 180.0))
            }
        }
        (Trigonal | Resonant, Tetrahedral) | (Tetrahedral, Trigonal | Resonant) => {
            let sp3_is_oxygen = if j == Tetrahedral {
                j_is_oxygen_column
            } else {
                k_is_oxygen_column
            };
            if sp3_is_oxygen {
                Some(params(2.0, 2, 180.0))
            } else if !i.is_planar() {
                Some(params(2.0, 3, 180.0))
            } else {
                Some(params(1.0, 6, 0.0))
            }
        }
        _ => None,
    }
}
