//! Distance-geometry embedding.
//!
//! Bounds are smoothed, trial distances drawn uniformly inside them, and
//! the metric matrix built from those distances is projected onto its
//! three largest eigenvectors. The raw coordinates are then refined
//! against the bounds and the chiral volume constraints.

use std::hash::Hasher;

use nalgebra::{DMatrix, SymmetricEigen};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::bounds::{build_bounds, DistanceBounds};
use super::dreiding::{ForceFieldParams, TypedAtom};
use super::error::StructureError;
use super::minimize::{steepest_descent, MinimizerSettings, Objective};
use super::stereo::{accumulate, point, ChiralCenter};
use crate::sanitize::MoleculeGraph;

const VDW_SCALE: f64 = 0.7;
const CHIRAL_TARGET: f64 = 0.5;
const JITTER: f64 = 0.05;

const REFINEMENT: MinimizerSettings = MinimizerSettings {
    max_iterations: 400,
    gradient_tolerance: 1e-3,
    energy_tolerance: 1e-9,
    max_step: 0.3,
};

/// 64-bit FNV-1a.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl Hasher for Fnv1a {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
}

/// Stable seed for a heavy-atom graph: elements, charges and hydrogen
/// counts of the atoms, then bond endpoints and orders, in input order.
pub fn graph_seed(graph: &MoleculeGraph) -> u64 {
    let mol = graph.mol();
    let mut h = Fnv1a::default();
    for idx in mol.atoms() {
        let a = mol.atom(idx);
        h.write(&[a.atomic_num, a.formal_charge as u8, a.hydrogen_count]);
    }
    for e in mol.bonds() {
        if let Some((a, b)) = mol.bond_endpoints(e) {
            h.write(&(a.index() as u32).to_le_bytes());
            h.write(&(b.index() as u32).to_le_bytes());
            h.write(&[mol.bond(e).order.valence_contribution()]);
        }
    }
    h.finish()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Flat `[x0, y0, z0, x1, ...]`.
    pub coords: Vec<f64>,
    /// Seed of the attempt that produced `coords`.
    pub seed: u64,
}

/// Smoothed bounds, retrying once with halved van der Waals radii.
pub fn smoothed_bounds(
    graph: &MoleculeGraph,
    types: &[TypedAtom],
    params: &ForceFieldParams,
    topo: &[Vec<u32>],
) -> Result<DistanceBounds, StructureError> {
    let mut last_conflict = (0, 0);
    for scale in [VDW_SCALE, VDW_SCALE / 2.0] {
        let mut bounds = build_bounds(graph, types, params, topo, scale);
        match bounds.smooth() {
            Ok(()) => return Ok(bounds),
            Err(pair) => {
                debug!(scale, i = pair.0, j = pair.1, "distance bounds infeasible");
                last_conflict = pair;
            }
        }
    }
    Err(StructureError::EmbeddingFailure(format!(
        "distance bounds between atoms {} and {} cannot be satisfied",
        last_conflict.0, last_conflict.1
    )))
}

/// Embed with successive seeds `seed, seed + 1, ...` until one attempt
/// yields coordinates with every stereocenter correct.
pub fn embed(
    bounds: &DistanceBounds,
    chiral: &[ChiralCenter],
    seed: u64,
    max_attempts: u32,
) -> Result<Embedding, StructureError> {
    for attempt in 0..max_attempts.max(1) {
        let attempt_seed = seed.wrapping_add(u64::from(attempt));
        let mut rng = ChaCha8Rng::seed_from_u64(attempt_seed);
        match try_embed(bounds, chiral, &mut rng) {
            Some(coords) => {
                debug!(attempt, seed = attempt_seed, "embedding accepted");
                return Ok(Embedding {
                    coords,
                    seed: attempt_seed,
                });
            }
            None => debug!(attempt, seed = attempt_seed, "embedding attempt rejected"),
        }
    }
    Err(StructureError::EmbeddingFailure(format!(
        "no acceptable coordinates after {} attempts",
        max_attempts.max(1)
    )))
}

fn try_embed(bounds: &DistanceBounds, chiral: &[ChiralCenter], rng: &mut ChaCha8Rng) -> Option<Vec<f64>> {
    if bounds.is_empty() {
        return Some(Vec::new());
    }
    let n = bounds.len();
    match n {
        1 => return Some(vec![0.0; 3]),
        2 => {
            let d = 0.5 * (bounds.lower(0, 1) + bounds.upper(0, 1));
            return Some(vec![0.0, 0.0, 0.0, d, 0.0, 0.0]);
        }
        _ => {}
    }

    let mut dist = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let (lo, hi) = (bounds.lower(i, j), bounds.upper(i, j));
            let d = lo + (hi - lo) * rng.gen::<f64>();
            dist[(i, j)] = d;
            dist[(j, i)] = d;
        }
    }

    let mut coords = metric_embedding(&dist)?;
    for c in coords.iter_mut() {
        *c += rng.gen_range(-JITTER..JITTER);
    }

    let wrong = chiral.iter().filter(|c| !c.is_satisfied(&coords)).count();
    if 2 * wrong > chiral.len() {
        for z in coords.iter_mut().skip(2).step_by(3) {
            *z = -*z;
        }
    }

    let error = DistanceGeometryError { bounds, chiral };
    steepest_descent(&error, &mut coords, &REFINEMENT).ok()?;

    let sane = coords.iter().all(|c| c.is_finite());
    (sane && chiral.iter().all(|c| c.is_satisfied(&coords))).then_some(coords)
}

/// Coordinates from the three largest eigenpairs of the metric matrix.
fn metric_embedding(dist: &DMatrix<f64>) -> Option<Vec<f64>> {
    let n = dist.nrows();
    let sq = dist.map(|d| d * d);
    let total: f64 = sq.iter().sum::<f64>() / 2.0;
    let nf = n as f64;
    let d0: Vec<f64> = (0..n)
        .map(|i| sq.row(i).sum() / nf - total / (nf * nf))
        .collect();
    let metric = DMatrix::from_fn(n, n, |i, j| 0.5 * (d0[i] + d0[j] - sq[(i, j)]));

    let eigen = SymmetricEigen::new(metric);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    if eigen.eigenvalues[order[0]] <= 1e-8 {
        return None;
    }

    let mut coords = vec![0.0; 3 * n];
    for (axis, &col) in order.iter().take(3).enumerate() {
        let scale = eigen.eigenvalues[col].max(0.0).sqrt();
        for i in 0..n {
            coords[3 * i + axis] = scale * eigen.eigenvectors[(i, col)];
        }
    }
    Some(coords)
}

/// Penalty for bound violations plus wrong-handed chiral volumes.
struct DistanceGeometryError<'a> {
    bounds: &'a DistanceBounds,
    chiral: &'a [ChiralCenter],
}

impl Objective for DistanceGeometryError<'_> {
    fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        grad.fill(0.0);
        let n = self.bounds.len();
        let mut error = 0.0;

        for i in 0..n {
            for j in (i + 1)..n {
                let d = point(x, i) - point(x, j);
                let d2 = d.norm_squared();
                let (lo, hi) = (self.bounds.lower(i, j), self.bounds.upper(i, j));
                let de_dd2 = if d2 > hi * hi {
                    let t = d2 / (hi * hi) - 1.0;
                    error += t * t;
                    2.0 * t / (hi * hi)
                } else if d2 < lo * lo {
                    let lo2 = lo * lo;
                    let t = 2.0 * lo2 / (lo2 + d2) - 1.0;
                    error += t * t;
                    2.0 * t * (-2.0 * lo2 / (lo2 + d2).powi(2))
                } else {
                    continue;
                };
                let g = d * (2.0 * de_dd2);
                accumulate(grad, i, &g);
                accumulate(grad, j, &(-g));
            }
        }

        for c in self.chiral {
            let sv = c.sign * c.volume(x);
            if sv >= CHIRAL_TARGET {
                continue;
            }
            let diff = sv - CHIRAL_TARGET;
            error += diff * diff;
            c.accumulate_volume_gradient(x, 2.0 * diff * c.sign, grad);
        }

        error
    }
}
