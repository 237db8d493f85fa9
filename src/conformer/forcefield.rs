//! DREIDING energy expression: harmonic bonds, cosine-harmonic angles,
//! torsions and Lennard-Jones 12-6 van der Waals, plus a flat-bottomed
//! restraint that keeps tagged stereocenters on their side.

use petgraph::graph::NodeIndex;

use super::dreiding::{
    bond_length, bond_multiplicity, ideal_angle, is_oxygen_column, torsion_params,
    ForceFieldParams, TypedAtom,
};
use super::minimize::Objective;
use super::stereo::{accumulate, dihedral, point, ChiralCenter};
use crate::sanitize::MoleculeGraph;

#[derive(Debug, Clone, Copy, PartialEq)]
struct BondTerm {
    i: usize,
    j: usize,
    k: f64,
    r0: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AngleForm {
    /// K / (2 sin^2 theta0) * (cos theta - cos theta0)^2
    Cosine { c: f64, cos0: f64 },
    /// K (1 + cos theta)
    Linear { k: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AngleTerm {
    i: usize,
    j: usize,
    k: usize,
    form: AngleForm,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TorsionTerm {
    atoms: [usize; 4],
    v: f64,
    n: f64,
    phi0: f64,
}

/// Signed volumes below this (Å^3) are penalized. Tetrahedral centers sit
/// near 2.
const CHIRAL_FLOOR: f64 = 0.8;
/// kcal/mol/Å^6
const CHIRAL_K: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct VdwTerm {
    i: usize,
    j: usize,
    r0: f64,
    d0: f64,
}

/// Energy terms for one hydrogen-complete molecule, in kcal/mol and Å.
#[derive(Debug, Clone, Default)]
pub struct ForceField {
    bonds: Vec<BondTerm>,
    angles: Vec<AngleTerm>,
    torsions: Vec<TorsionTerm>,
    vdw: Vec<VdwTerm>,
    chiral: Vec<ChiralCenter>,
}

impl ForceField {
    pub fn new(
        graph: &MoleculeGraph,
        types: &[TypedAtom],
        params: &ForceFieldParams,
        topo: &[Vec<u32>],
    ) -> Self {
        let mol = graph.mol();
        let mut ff = Self::default();

        for e in mol.bonds() {
            let Some((a, b)) = mol.bond_endpoints(e) else {
                continue;
            };
            let (i, j) = (a.index(), b.index());
            ff.bonds.push(BondTerm {
                i,
                j,
                k: params.global.bond_k * bond_multiplicity(mol.bond(e)),
                r0: bond_length(types, params, i, j),
            });
        }

        for center in mol.atoms() {
            let nbrs = mol.sorted_neighbors(center);
            for (x, &a) in nbrs.iter().enumerate() {
                for &b in &nbrs[x + 1..] {
                    let Some(target) = ideal_angle(graph, types, a, center, b) else {
                        continue;
                    };
                    let form = if target.degrees > 179.0 {
                        AngleForm::Linear {
                            k: params.global.angle_k,
                        }
                    } else {
                        let theta0 = target.degrees.to_radians();
                        AngleForm::Cosine {
                            c: params.global.angle_k / (2.0 * theta0.sin().powi(2)),
                            cos0: theta0.cos(),
                        }
                    };
                    ff.angles.push(AngleTerm {
                        i: a.index(),
                        j: center.index(),
                        k: b.index(),
                        form,
                    });
                }
            }
        }

        for e in mol.bonds() {
            let Some((j, k)) = mol.bond_endpoints(e) else {
                continue;
            };
            ff.add_torsions(graph, types, j, k);
        }

        let n = mol.atom_count();
        for i in 0..n {
            for j in (i + 1)..n {
                if topo[i][j] < 3 || topo[i][j] == u32::MAX {
                    continue;
                }
                let (pi, pj) = (types[i].params, types[j].params);
                ff.vdw.push(VdwTerm {
                    i,
                    j,
                    r0: (pi.vdw_r0 * pj.vdw_r0).sqrt(),
                    d0: (pi.vdw_d0 * pj.vdw_d0).sqrt(),
                });
            }
        }
        ff
    }

    fn add_torsions(&mut self, graph: &MoleculeGraph, types: &[TypedAtom], j: NodeIndex, k: NodeIndex) {
        let mol = graph.mol();
        let outer_j: Vec<NodeIndex> = mol.sorted_neighbors(j).into_iter().filter(|&x| x != k).collect();
        let outer_k: Vec<NodeIndex> = mol.sorted_neighbors(k).into_iter().filter(|&x| x != j).collect();
        if outer_j.is_empty() || outer_k.is_empty() {
            return;
        }
        let Some(edge) = mol.bond_between(j, k) else {
            return;
        };
        let central = mol.bond(edge);
        let count = (outer_j.len() * outer_k.len()) as f64;
        for &i in &outer_j {
            let Some(tp) = torsion_params(
                types[j.index()].geometry,
                types[k.index()].geometry,
                is_oxygen_column(mol.atom(j).atomic_num),
                is_oxygen_column(mol.atom(k).atomic_num),
                types[i.index()].geometry,
                central,
            ) else {
                continue;
            };
            for &l in &outer_k {
                if l == i {
                    continue;
                }
                self.torsions.push(TorsionTerm {
                    atoms: [i.index(), j.index(), k.index(), l.index()],
                    v: tp.v_barrier / count,
                    n: f64::from(tp.periodicity),
                    phi0: tp.phase_offset.to_radians(),
                });
            }
        }
    }

    /// Hold each center in `centers` on the side its tag asks for.
    pub fn with_chiral_restraints(mut self, centers: &[ChiralCenter]) -> Self {
        self.chiral = centers.to_vec();
        self
    }

    pub fn restraint_count(&self) -> usize {
        self.chiral.len()
    }

    pub fn term_counts(&self) -> [usize; 4] {
        [
            self.bonds.len(),
            self.angles.len(),
            self.torsions.len(),
            self.vdw.len(),
        ]
    }
}

impl Objective for ForceField {
    fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        grad.fill(0.0);
        let mut energy = 0.0;

        for t in &self.bonds {
            let d = point(x, t.i) - point(x, t.j);
            let r = d.norm().max(1e-12);
            let dr = r - t.r0;
            energy += 0.5 * t.k * dr * dr;
            let g = d * (t.k * dr / r);
            accumulate(grad, t.i, &g);
            accumulate(grad, t.j, &(-g));
        }

        for t in &self.angles {
            let pj = point(x, t.j);
            let a = point(x, t.i) - pj;
            let b = point(x, t.k) - pj;
            let (ra, rb) = (a.norm().max(1e-12), b.norm().max(1e-12));
            let cos = (a.dot(&b) / (ra * rb)).clamp(-1.0, 1.0);
            let de_dcos = match t.form {
                AngleForm::Cosine { c, cos0 } => {
                    energy += c * (cos - cos0).powi(2);
                    2.0 * c * (cos - cos0)
                }
                AngleForm::Linear { k } => {
                    energy += k * (1.0 + cos);
                    k
                }
            };
            let gi = (b / (ra * rb) - a * (cos / (ra * ra))) * de_dcos;
            let gk = (a / (ra * rb) - b * (cos / (rb * rb))) * de_dcos;
            accumulate(grad, t.i, &gi);
            accumulate(grad, t.k, &gk);
            accumulate(grad, t.j, &(-(gi + gk)));
        }

        for t in &self.torsions {
            let [i, j, k, l] = t.atoms;
            let phi = dihedral(x, i, j, k, l);
            let arg = t.n * (phi - t.phi0);
            energy += 0.5 * t.v * (1.0 - arg.cos());
            let de_dphi = 0.5 * t.v * t.n * arg.sin();

            let b1 = point(x, j) - point(x, i);
            let b2 = point(x, k) - point(x, j);
            let b3 = point(x, l) - point(x, k);
            let m = b1.cross(&b2);
            let n = b2.cross(&b3);
            let (m2, n2, b2_sq) = (m.norm_squared(), n.norm_squared(), b2.norm_squared());
            if m2 < 1e-12 || n2 < 1e-12 || b2_sq < 1e-12 {
                continue;
            }
            let b2_len = b2_sq.sqrt();
            let di = m * (-b2_len / m2);
            let dl = n * (b2_len / n2);
            let p = b1.dot(&b2) / b2_sq;
            let q = b3.dot(&b2) / b2_sq;
            let dj = di * (-(1.0 + p)) + dl * q;
            let dk = di * p - dl * (1.0 + q);
            accumulate(grad, i, &(di * de_dphi));
            accumulate(grad, j, &(dj * de_dphi));
            accumulate(grad, k, &(dk * de_dphi));
            accumulate(grad, l, &(dl * de_dphi));
        }

        for t in &self.vdw {
            let d = point(x, t.i) - point(x, t.j);
            let r = d.norm().max(1e-6);
            let rho = t.r0 / r;
            let rho6 = rho.powi(6);
            let rho12 = rho6 * rho6;
            energy += t.d0 * (rho12 - 2.0 * rho6);
            // dE/dr = -12 D0 (rho^12 - rho^6) / r
            let de_dr = -12.0 * t.d0 * (rho12 - rho6) / r;
            let g = d * (de_dr / r);
            accumulate(grad, t.i, &g);
            accumulate(grad, t.j, &(-g));
        }

        for c in &self.chiral {
            let short = CHIRAL_FLOOR - c.sign * c.volume(x);
            if short <= 0.0 {
                continue;
            }
            energy += CHIRAL_K * short * short;
            c.accumulate_volume_gradient(x, -2.0 * CHIRAL_K * short * c.sign, grad);
        }

        energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformer::bounds::topological_distances;
    use crate::conformer::dreiding::{assign_types, default_parameters};
    use crate::conformer::stereo::chiral_centers;

    fn force_field(smiles: &str) -> (ForceField, usize) {
        let graph = MoleculeGraph::from_smiles(smiles).unwrap().with_hydrogens();
        let params = default_parameters().unwrap();
        let types = assign_types(&graph, params);
        let topo = topological_distances(&graph);
        (ForceField::new(&graph, &types, params, &topo), graph.atom_count())
    }

    /// Atoms on an irregular helix, about 1.5 Å apart and never collinear.
    fn scattered(n: usize) -> Vec<f64> {
        (0..n)
            .flat_map(|a| {
                let t = a as f64;
                [
                    0.9 * t + 0.1 * (3.1 * t).sin(),
                    1.2 * t.sin(),
                    1.2 * t.cos() + 0.1 * (2.3 * t).cos(),
                ]
            })
            .collect()
    }

    fn assert_gradient_matches(ff: &ForceField, x: &[f64]) {
        let mut grad = vec![0.0; x.len()];
        ff.evaluate(x, &mut grad);
        let mut scratch = vec![0.0; x.len()];
        let h = 1e-6;
        for c in 0..x.len() {
            let mut plus = x.to_vec();
            let mut minus = x.to_vec();
            plus[c] += h;
            minus[c] -= h;
            let numeric = (ff.evaluate(&plus, &mut scratch) - ff.evaluate(&minus, &mut scratch)) / (2.0 * h);
            let tol = 1e-4 * numeric.abs().max(1.0);
            assert!(
                (numeric - grad[c]).abs() < tol,
                "coordinate {c}: analytic {} vs numeric {numeric}",
                grad[c]
            );
        }
    }

    #[test]
    fn term_counts_for_ethane() {
        let (ff, n) = force_field("CC");
        assert_eq!(n, 8);
        // 7 bonds, 12 angles, 9 H-C-C-H torsions, 9 H...H 1-4 pairs.
        assert_eq!(ff.term_counts(), [7, 12, 9, 9]);
    }

    #[test]
    fn analytic_gradient_matches_finite_differences() {
        for smiles in ["CCO", "C=CC#N", "c1ccccc1F", "CC(=O)N"] {
            let (ff, n) = force_field(smiles);
            assert_gradient_matches(&ff, &scattered(n));
        }
    }

    #[test]
    fn chiral_restraint_gradient_matches_finite_differences() {
        let graph = MoleculeGraph::from_smiles("O[C@H]1CC[C@@H](O)CC1").unwrap().with_hydrogens();
        let params = default_parameters().unwrap();
        let types = assign_types(&graph, params);
        let topo = topological_distances(&graph);
        let centers = chiral_centers(&graph);
        assert_eq!(centers.len(), 2);
        let ff = ForceField::new(&graph, &types, params, &topo).with_chiral_restraints(&centers);
        assert_eq!(ff.restraint_count(), 2);
        assert_gradient_matches(&ff, &scattered(graph.atom_count()));
    }

    #[test]
    fn inverted_center_costs_energy() {
        // Center at the origin, substituents on the corners of a tetrahedron.
        let graph = MoleculeGraph::from_smiles("F[C@](Cl)(Br)I").unwrap();
        let centers = chiral_centers(&graph);
        let restrained = ForceField::default().with_chiral_restraints(&centers);
        let tetra = [
            [1.0, 1.0, 1.0],
            [1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
        ];
        let place = |mirror: f64| {
            let mut x = vec![0.0; 15];
            for (slot, v) in [0usize, 2, 3, 4].iter().zip(tetra) {
                x[3 * slot] = v[0] * mirror;
                x[3 * slot + 1] = v[1];
                x[3 * slot + 2] = v[2];
            }
            x
        };
        let mut g = vec![0.0; 15];
        let (right, wrong) = if centers[0].is_satisfied(&place(1.0)) {
            (place(1.0), place(-1.0))
        } else {
            (place(-1.0), place(1.0))
        };
        assert_eq!(restrained.evaluate(&right, &mut g), 0.0);
        assert!(restrained.evaluate(&wrong, &mut g) > 100.0);
    }

    #[test]
    fn staggered_ethane_beats_eclipsed() {
        let (ff, _) = force_field("CC");
        let build = |twist: f64| {
            let mut x = vec![0.0, 0.0, 0.0, 1.53, 0.0, 0.0];
            for h in 0..3 {
                let a = (120.0 * h as f64).to_radians();
                x.extend([-0.36, 1.03 * a.cos(), 1.03 * a.sin()]);
            }
            for h in 0..3 {
                let a = (120.0 * h as f64 + twist).to_radians();
                x.extend([1.89, 1.03 * a.cos(), 1.03 * a.sin()]);
            }
            x
        };
        let mut g = vec![0.0; 24];
        let staggered = ff.evaluate(&build(60.0), &mut g);
        let eclipsed = ff.evaluate(&build(0.0), &mut g);
        assert!(staggered < eclipsed);
    }
}
