//! Distance bounds for distance-geometry embedding.

use petgraph::algo::dijkstra;
use petgraph::graph::NodeIndex;

use super::dreiding::{bond_length, ideal_angle, AngleTarget, ForceFieldParams, TypedAtom, TETRAHEDRAL_ANGLE};
use super::stereo::pinned_cis;
use crate::bond::BondOrder;
use crate::element::Element;
use crate::sanitize::MoleculeGraph;

pub const MAX_DISTANCE: f64 = 1000.0;

const BOND_TOLERANCE: f64 = 0.01;
const ANGLE_TOLERANCE: f64 = 0.04;
const STRAINED_ANGLE_TOLERANCE: f64 = 0.1;
const PINNED_TORSION_TOLERANCE: f64 = 0.05;
const FREE_TORSION_TOLERANCE: f64 = 0.06;
const SMOOTHING_TOLERANCE: f64 = 1e-6;

/// Symmetric lower/upper distance bounds over all atom pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceBounds {
    n: usize,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl DistanceBounds {
    pub fn new(n: usize) -> Self {
        let mut upper = vec![MAX_DISTANCE; n * n];
        for i in 0..n {
            upper[i * n + i] = 0.0;
        }
        Self {
            n,
            lower: vec![0.0; n * n],
            upper,
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn lower(&self, i: usize, j: usize) -> f64 {
        self.lower[i * self.n + j]
    }

    pub fn upper(&self, i: usize, j: usize) -> f64 {
        self.upper[i * self.n + j]
    }

    pub fn set(&mut self, i: usize, j: usize, lower: f64, upper: f64) {
        let n = self.n;
        self.lower[i * n + j] = lower;
        self.lower[j * n + i] = lower;
        self.upper[i * n + j] = upper;
        self.upper[j * n + i] = upper;
    }

    /// Tighten bounds with the triangle inequality. Returns the first pair
    /// whose lower bound ends up above its upper bound.
    pub fn smooth(&mut self) -> Result<(), (usize, usize)> {
        let n = self.n;
        for k in 0..n {
            for i in 0..n {
                if i == k {
                    continue;
                }
                for j in (i + 1)..n {
                    if j == k {
                        continue;
                    }
                    let u_ik = self.upper(i, k);
                    let u_kj = self.upper(k, j);
                    let mut u = self.upper(i, j);
                    if u_ik + u_kj < u {
                        u = u_ik + u_kj;
                    }
                    let mut l = self.lower(i, j);
                    let via_i = self.lower(i, k) - u_kj;
                    let via_j = self.lower(j, k) - u_ik;
                    l = l.max(via_i).max(via_j);
                    if l > u + SMOOTHING_TOLERANCE {
                        return Err((i, j));
                    }
                    self.set(i, j, l, u);
                }
            }
        }
        Ok(())
    }
}

/// All-pairs bond counts; `u32::MAX` between disconnected atoms.
pub fn topological_distances(graph: &MoleculeGraph) -> Vec<Vec<u32>> {
    let mol = graph.mol();
    let n = mol.atom_count();
    mol.atoms()
        .map(|start| {
            let reached = dijkstra(mol.graph(), start, None, |_| 1u32);
            (0..n)
                .map(|j| {
                    reached
                        .get(&NodeIndex::new(j))
                        .copied()
                        .unwrap_or(u32::MAX)
                })
                .collect()
        })
        .collect()
}

/// Raw (unsmoothed) bounds for a hydrogen-complete graph. `vdw_scale`
/// multiplies the van der Waals radius sum used as the lower bound of
/// pairs four or more bonds apart.
pub fn build_bounds(
    graph: &MoleculeGraph,
    types: &[TypedAtom],
    params: &ForceFieldParams,
    topo: &[Vec<u32>],
    vdw_scale: f64,
) -> DistanceBounds {
    let mol = graph.mol();
    let n = mol.atom_count();
    let mut bounds = DistanceBounds::new(n);
    let length = |a: usize, b: usize| bond_length(types, params, a, b);

    for i in 0..n {
        for j in (i + 1)..n {
            let (ni, nj) = (NodeIndex::new(i), NodeIndex::new(j));
            match topo[i][j] {
                1 => {
                    let r0 = length(i, j);
                    bounds.set(i, j, r0 - BOND_TOLERANCE, r0 + BOND_TOLERANCE);
                }
                2 => {
                    let Some(center) = common_neighbor(graph, ni, nj) else {
                        continue;
                    };
                    let (a, b) = (length(i, center.index()), length(center.index(), j));
                    match ideal_angle(graph, types, ni, center, nj) {
                        Some(target) => {
                            let d = law_of_cosines(a, b, target.degrees);
                            let tol = angle_tolerance(target);
                            bounds.set(i, j, d - tol, d + tol);
                        }
                        None => {
                            // Hypervalent center: anything from cis to linear.
                            bounds.set(i, j, law_of_cosines(a, b, 80.0), a + b);
                        }
                    }
                }
                3 => {
                    let Some([_, j1, k1, _]) = path_of_three(graph, topo, ni, nj) else {
                        continue;
                    };
                    let (lo, hi) = torsion_window(graph, types, params, [ni, j1, k1, nj]);
                    bounds.set(i, j, lo, hi);
                }
                u32::MAX => {}
                _ => {
                    let lo = vdw_scale * (vdw_radius(mol.atom(ni).atomic_num) + vdw_radius(mol.atom(nj).atomic_num));
                    bounds.set(i, j, lo, MAX_DISTANCE);
                }
            }
        }
    }
    bounds
}

fn angle_tolerance(target: AngleTarget) -> f64 {
    if target.strained {
        STRAINED_ANGLE_TOLERANCE
    } else {
        ANGLE_TOLERANCE
    }
}

fn vdw_radius(atomic_num: u8) -> f64 {
    Element::from_atomic_num(atomic_num)
        .and_then(Element::vdw_radius)
        .unwrap_or(1.7)
}

fn law_of_cosines(a: f64, b: f64, degrees: f64) -> f64 {
    (a * a + b * b - 2.0 * a * b * degrees.to_radians().cos()).sqrt()
}

fn common_neighbor(graph: &MoleculeGraph, a: NodeIndex, b: NodeIndex) -> Option<NodeIndex> {
    let mol = graph.mol();
    mol.sorted_neighbors(a)
        .into_iter()
        .find(|&c| mol.bond_between(c, b).is_some())
}

/// First path i-j-k-l of three bonds, by ascending neighbor index.
fn path_of_three(
    graph: &MoleculeGraph,
    topo: &[Vec<u32>],
    i: NodeIndex,
    l: NodeIndex,
) -> Option<[NodeIndex; 4]> {
    let mol = graph.mol();
    mol.sorted_neighbors(i)
        .into_iter()
        .filter(|j| topo[j.index()][l.index()] == 2)
        .find_map(|j| {
            mol.sorted_neighbors(j)
                .into_iter()
                .find(|k| *k != i && topo[k.index()][l.index()] == 1)
                .map(|k| [i, j, k, l])
        })
}

/// Distances for the outer atoms of i-j-k-l at 0° and 180° dihedral.
fn cis_trans_distances(a: f64, b: f64, c: f64, theta1: f64, theta2: f64) -> (f64, f64) {
    let (s1, c1) = theta1.to_radians().sin_cos();
    let (s2, c2) = theta2.to_radians().sin_cos();
    let x = b - c * c2 - a * c1;
    let cis = (x * x + (c * s2 - a * s1).powi(2)).sqrt();
    let trans = (x * x + (c * s2 + a * s1).powi(2)).sqrt();
    (cis, trans)
}

fn torsion_window(
    graph: &MoleculeGraph,
    types: &[TypedAtom],
    params: &ForceFieldParams,
    path: [NodeIndex; 4],
) -> (f64, f64) {
    let [i, j, k, l] = path;
    let length = |a: NodeIndex, b: NodeIndex| bond_length(types, params, a.index(), b.index());
    let angle = |a, b, c| {
        ideal_angle(graph, types, a, b, c)
            .map(|t| t.degrees)
            .unwrap_or(TETRAHEDRAL_ANGLE)
    };
    let (cis, trans) = cis_trans_distances(
        length(i, j),
        length(j, k),
        length(k, l),
        angle(i, j, k),
        angle(j, k, l),
    );

    let pinned = pinned_cis(graph, i, j, k, l).or_else(|| planar_ring_side(graph, i, j, k, l));
    match pinned {
        Some(true) => (cis - PINNED_TORSION_TOLERANCE, cis + PINNED_TORSION_TOLERANCE),
        Some(false) => (trans - PINNED_TORSION_TOLERANCE, trans + PINNED_TORSION_TOLERANCE),
        None => (cis - FREE_TORSION_TOLERANCE, trans + FREE_TORSION_TOLERANCE),
    }
}

/// For a planar ring bond j-k: i and l are cis when both or neither lie in
/// the ring.
fn planar_ring_side(
    graph: &MoleculeGraph,
    i: NodeIndex,
    j: NodeIndex,
    k: NodeIndex,
    l: NodeIndex,
) -> Option<bool> {
    let mol = graph.mol();
    let bond = mol.bond(mol.bond_between(j, k)?);
    let ring = graph.rings().smallest_ring_with_bond(j, k)?;
    let planar = bond.is_aromatic || (bond.order == BondOrder::Double && ring.len() <= 7);
    if !planar {
        return None;
    }
    Some(ring.contains(&i) == ring.contains(&l))
}
