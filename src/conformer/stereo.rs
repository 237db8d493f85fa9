//! Stereo constraints on a hydrogen-complete graph and their geometric
//! measures.

use nalgebra::Vector3;
use petgraph::graph::NodeIndex;

use crate::atom::Chirality;
use crate::bond::BondStereo;
use crate::sanitize::MoleculeGraph;

pub(crate) fn point(x: &[f64], i: usize) -> Vector3<f64> {
    Vector3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2])
}

pub(crate) fn accumulate(grad: &mut [f64], i: usize, v: &Vector3<f64>) {
    grad[3 * i] += v.x;
    grad[3 * i + 1] += v.y;
    grad[3 * i + 2] += v.z;
}

/// A tagged tetrahedral center with four explicit neighbors.
///
/// `neighbors` are the last three entries of the reference order; the
/// signed volume they span around the center is negative for `Ccw` and
/// positive for `Cw`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiralCenter {
    pub center: usize,
    pub neighbors: [usize; 3],
    /// `+1.0` or `-1.0`.
    pub sign: f64,
}

impl ChiralCenter {
    /// (p1 - c) . ((p2 - c) x (p3 - c))
    pub fn volume(&self, x: &[f64]) -> f64 {
        let c = point(x, self.center);
        let [a, b, d] = self.neighbors.map(|n| point(x, n) - c);
        a.dot(&b.cross(&d))
    }

    pub fn is_satisfied(&self, x: &[f64]) -> bool {
        self.sign * self.volume(x) > 0.0
    }

    /// Add `scale` times the gradient of [`ChiralCenter::volume`] to `grad`.
    pub(crate) fn accumulate_volume_gradient(&self, x: &[f64], scale: f64, grad: &mut [f64]) {
        let c = point(x, self.center);
        let [a, b, d] = self.neighbors.map(|n| point(x, n) - c);
        let ga = b.cross(&d) * scale;
        let gb = d.cross(&a) * scale;
        let gd = a.cross(&b) * scale;
        accumulate(grad, self.neighbors[0], &ga);
        accumulate(grad, self.neighbors[1], &gb);
        accumulate(grad, self.neighbors[2], &gd);
        accumulate(grad, self.center, &(-(ga + gb + gd)));
    }
}

/// Chiral centers of a hydrogen-complete graph. Three-coordinate centers
/// are left unconstrained.
pub fn chiral_centers(graph: &MoleculeGraph) -> Vec<ChiralCenter> {
    let mol = graph.mol();
    mol.atoms()
        .filter_map(|idx| {
            let sign = match mol.atom(idx).chirality {
                Chirality::Ccw => -1.0,
                Chirality::Cw => 1.0,
                Chirality::None => return None,
            };
            let nbrs = mol.sorted_neighbors(idx);
            if nbrs.len() != 4 {
                return None;
            }
            Some(ChiralCenter {
                center: idx.index(),
                neighbors: [nbrs[1].index(), nbrs[2].index(), nbrs[3].index()],
                sign,
            })
        })
        .collect()
}

/// A double bond j=k with reference neighbors i (on j) and l (on k).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleBondStereo {
    pub atoms: [usize; 4],
    pub cis: bool,
}

impl DoubleBondStereo {
    pub fn is_satisfied(&self, x: &[f64]) -> bool {
        let [i, j, k, l] = self.atoms;
        let phi = dihedral(x, i, j, k, l);
        (phi.abs() < std::f64::consts::FRAC_PI_2) == self.cis
    }
}

pub fn double_bond_stereo(graph: &MoleculeGraph) -> Vec<DoubleBondStereo> {
    let mol = graph.mol();
    mol.bonds()
        .filter_map(|e| {
            let (a, b) = mol.bond_endpoints(e)?;
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let (refs, cis) = match mol.bond(e).stereo {
                BondStereo::Cis(l, r) => ((l, r), true),
                BondStereo::Trans(l, r) => ((l, r), false),
                BondStereo::None => return None,
            };
            Some(DoubleBondStereo {
                atoms: [refs.0.index(), lo.index(), hi.index(), refs.1.index()],
                cis,
            })
        })
        .collect()
}

/// Whether i and l should sit cis across the j-k bond, if the bond's
/// stereo pins it. `i` is bonded to `j`, `l` to `k`.
pub fn pinned_cis(
    graph: &MoleculeGraph,
    i: NodeIndex,
    j: NodeIndex,
    k: NodeIndex,
    l: NodeIndex,
) -> Option<bool> {
    let mol = graph.mol();
    let edge = mol.bond_between(j, k)?;
    let (stereo_cis, ref_lo, ref_hi) = match mol.bond(edge).stereo {
        BondStereo::Cis(a, b) => (true, a, b),
        BondStereo::Trans(a, b) => (false, a, b),
        BondStereo::None => return None,
    };
    let (i_ref, l_ref) = if j < k {
        (i == ref_lo, l == ref_hi)
    } else {
        (i == ref_hi, l == ref_lo)
    };
    Some(stereo_cis == (i_ref == l_ref))
}

/// Signed i-j-k-l dihedral in radians, in (-pi, pi].
pub fn dihedral(x: &[f64], i: usize, j: usize, k: usize, l: usize) -> f64 {
    let b1 = point(x, j) - point(x, i);
    let b2 = point(x, k) - point(x, j);
    let b3 = point(x, l) - point(x, k);
    let m = b1.cross(&b2);
    let n = b2.cross(&b3);
    let y = b2.norm() * b1.dot(&n);
    y.atan2(m.dot(&n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dihedral_signs() {
        // i above j, l rotated about the j-k axis.
        let cis = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        assert_abs_diff_eq!(dihedral(&cis, 0, 1, 2, 3), 0.0, epsilon = 1e-12);
        let trans = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, -1.0, 0.0];
        assert_abs_diff_eq!(dihedral(&trans, 0, 1, 2, 3).abs(), std::f64::consts::PI, epsilon = 1e-12);
        let plus = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0];
        let minus = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, -1.0];
        let p = dihedral(&plus, 0, 1, 2, 3);
        let m = dihedral(&minus, 0, 1, 2, 3);
        assert_abs_diff_eq!(p.abs(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(p, -m, epsilon = 1e-12);
    }

    #[test]
    fn chiral_centers_need_four_neighbors() {
        let graph = MoleculeGraph::from_smiles("N[C@@H](C)C(=O)O")
            .unwrap()
            .with_hydrogens();
        let centers = chiral_centers(&graph);
        assert_eq!(centers.len(), 1);
        assert_eq!(centers[0].center, 1);

        let graph = MoleculeGraph::from_smiles("C[S@](=O)CC").unwrap().with_hydrogens();
        assert!(chiral_centers(&graph).is_empty());
    }

    #[test]
    fn enantiomers_have_opposite_signs() {
        let r = MoleculeGraph::from_smiles("F[C@](Cl)(Br)I").unwrap();
        let s = MoleculeGraph::from_smiles("F[C@@](Cl)(Br)I").unwrap();
        let cr = chiral_centers(&r)[0];
        let cs = chiral_centers(&s)[0];
        assert_eq!(cr.neighbors, cs.neighbors);
        assert_eq!(cr.sign, -cs.sign);
    }

    #[test]
    fn double_bond_references() {
        let graph = MoleculeGraph::from_smiles("F/C=C\\F").unwrap().with_hydrogens();
        let db = double_bond_stereo(&graph);
        assert_eq!(db, vec![DoubleBondStereo { atoms: [0, 1, 2, 3], cis: true }]);

        let n = NodeIndex::new;
        assert_eq!(pinned_cis(&graph, n(0), n(1), n(2), n(3)), Some(true));
        // H on C1 against F on C2 flips the relation.
        let h1 = graph
            .mol()
            .neighbors(n(1))
            .find(|&x| graph.mol().atom(x).atomic_num == 1)
            .unwrap();
        assert_eq!(pinned_cis(&graph, h1, n(1), n(2), n(3)), Some(false));
        assert_eq!(pinned_cis(&graph, n(3), n(2), n(1), h1), Some(false));
        assert_eq!(pinned_cis(&graph, n(0), n(1), n(0), n(3)), None);
    }
}
