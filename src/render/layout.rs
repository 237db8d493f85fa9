//! 2D coordinates for depiction, in bond-length units.
//!
//! Rings are laid down as regular polygons (a fused ring shares its edge
//! with the ring already placed), chains grow as 120° zigzags and
//! fragments are set side by side. A short relaxation then separates any
//! atoms that ended up on top of each other.

use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};

use nalgebra::Vector2;
use petgraph::graph::NodeIndex;

use crate::bond::BondOrder;
use crate::hybridization::Hybridization;
use crate::sanitize::MoleculeGraph;

const RELAX_ITERATIONS: usize = 100;
const RELAX_STEP: f64 = 0.25;
/// Non-bonded atoms closer than this are pushed apart.
const CONTACT: f64 = 0.9;
const FRAGMENT_GAP: f64 = 1.5;

type Point = Vector2<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Layout2D {
    positions: Vec<Point>,
}

impl Layout2D {
    pub fn compute(graph: &MoleculeGraph) -> Self {
        let mol = graph.mol();
        let mut placed: Vec<Option<Point>> = vec![None; mol.atom_count()];
        let mut ring_done = vec![false; graph.rings().num_rings()];
        let mut left = 0.0;

        for fragment in mol.fragments() {
            place_fragment(graph, fragment[0], &mut placed, &mut ring_done);
            let mut coords: Vec<Point> = fragment
                .iter()
                .map(|a| placed[a.index()].unwrap_or_else(Point::zeros))
                .collect();
            relax(graph, &fragment, &mut coords);

            let (min, max) = bounds(&coords);
            let shift = Point::new(left - min.x, -(min.y + max.y) / 2.0);
            for (a, c) in fragment.iter().zip(&coords) {
                placed[a.index()] = Some(c + shift);
            }
            left += max.x - min.x + FRAGMENT_GAP;
        }

        Self {
            positions: placed.into_iter().map(|p| p.unwrap_or_else(Point::zeros)).collect(),
        }
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    /// Canvas coordinates (y down) centered in a `width` x `height` box
    /// with `margin` pixels kept free and bonds at most `max_bond` long.
    pub fn fit(&self, width: f64, height: f64, margin: f64, max_bond: f64) -> Vec<(f64, f64)> {
        if self.positions.is_empty() {
            return Vec::new();
        }
        let (min, max) = bounds(&self.positions);
        let span = max - min;
        let mut scale = max_bond;
        if span.x > 0.0 {
            scale = scale.min((width - 2.0 * margin) / span.x);
        }
        if span.y > 0.0 {
            scale = scale.min((height - 2.0 * margin) / span.y);
        }
        let center = (min + max) / 2.0;
        self.positions
            .iter()
            .map(|p| {
                let q = (p - center) * scale;
                (width / 2.0 + q.x, height / 2.0 - q.y)
            })
            .collect()
    }
}

fn bounds(points: &[Point]) -> (Point, Point) {
    let mut min = Point::repeat(f64::INFINITY);
    let mut max = Point::repeat(f64::NEG_INFINITY);
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    if points.is_empty() {
        (Point::zeros(), Point::zeros())
    } else {
        (min, max)
    }
}

fn unit(angle: f64) -> Point {
    Point::new(angle.cos(), angle.sin())
}

fn angle_of(v: &Point) -> f64 {
    v.y.atan2(v.x)
}

fn place_fragment(
    graph: &MoleculeGraph,
    root: NodeIndex,
    placed: &mut [Option<Point>],
    ring_done: &mut [bool],
) {
    let mol = graph.mol();
    let rings = graph.rings().rings();
    placed[root.index()] = Some(Point::zeros());
    let mut queue = VecDeque::from([root]);

    while let Some(v) = queue.pop_front() {
        for (r, ring) in rings.iter().enumerate() {
            if ring_done[r] || !ring.contains(&v) {
                continue;
            }
            ring_done[r] = true;
            queue.extend(place_ring(graph, ring, placed));
        }

        let fresh: Vec<NodeIndex> = mol
            .sorted_neighbors(v)
            .into_iter()
            .filter(|n| placed[n.index()].is_none())
            .collect();
        place_substituents(graph, v, &fresh, placed);
        queue.extend(fresh);
    }
}

/// Lay `ring` down as a regular polygon through its placed atoms. Returns
/// the atoms it placed; rings with more than one placed edge are left to
/// the chain rules.
fn place_ring(graph: &MoleculeGraph, ring: &[NodeIndex], placed: &mut [Option<Point>]) -> Vec<NodeIndex> {
    let mol = graph.mol();
    let n = ring.len();
    let at = |a: NodeIndex, placed: &[Option<Point>]| placed[a.index()];
    let anchored: Vec<usize> = (0..n).filter(|&i| at(ring[i], &*placed).is_some()).collect();
    let radius = 1.0 / (2.0 * (PI / n as f64).sin());
    let step = TAU / n as f64;

    // Walk order starting at the first anchor, plus the polygon center and
    // the angle of the first anchor around it.
    let (order, center, start, direction) = match anchored.as_slice() {
        [i] => {
            let p = ring[*i];
            let Some(pp) = at(p, &*placed) else {
                return Vec::new();
            };
            let outward = outward_direction(graph, p, pp, placed);
            let center = pp + outward * radius;
            let order: Vec<NodeIndex> = (0..n).map(|k| ring[(i + k) % n]).collect();
            (order, center, angle_of(&(pp - center)), 1.0)
        }
        [i, j] if (j - i == 1) || (*i == 0 && *j == n - 1) => {
            let (a, b) = if j - i == 1 { (ring[*i], ring[*j]) } else { (ring[*j], ring[*i]) };
            let (Some(pa), Some(pb)) = (at(a, &*placed), at(b, &*placed)) else {
                return Vec::new();
            };
            let mid = (pa + pb) / 2.0;
            let along = pb - pa;
            let mut perp = Point::new(-along.y, along.x).normalize();
            let others: Vec<Point> = [a, b]
                .iter()
                .flat_map(|&x| mol.neighbors(x))
                .filter(|&x| x != a && x != b)
                .filter_map(|x| at(x, &*placed))
                .collect();
            if !others.is_empty() {
                let centroid = others.iter().sum::<Point>() / others.len() as f64;
                if perp.dot(&(centroid - mid)) > 0.0 {
                    perp = -perp;
                }
            }
            let apothem = 1.0 / (2.0 * (PI / n as f64).tan());
            let center = mid + perp * apothem;
            let start_index = ring.iter().position(|&x| x == a).unwrap_or(0);
            let forward = ring[(start_index + 1) % n] == b;
            let order: Vec<NodeIndex> = (0..n)
                .map(|k| {
                    if forward {
                        ring[(start_index + k) % n]
                    } else {
                        ring[(start_index + n - k) % n]
                    }
                })
                .collect();
            let theta_a = angle_of(&(pa - center));
            let theta_b = angle_of(&(pb - center));
            let delta = (theta_b - theta_a + PI).rem_euclid(TAU) - PI;
            (order, center, theta_a, delta.signum())
        }
        _ => return Vec::new(),
    };

    let mut fresh = Vec::new();
    for (k, &atom) in order.iter().enumerate() {
        if placed[atom.index()].is_none() {
            placed[atom.index()] = Some(center + unit(start + direction * step * k as f64) * radius);
            fresh.push(atom);
        }
    }
    fresh
}

/// Direction pointing away from the already placed neighbors of `atom`.
fn outward_direction(graph: &MoleculeGraph, atom: NodeIndex, at: Point, placed: &[Option<Point>]) -> Point {
    let sum: Point = graph
        .mol()
        .neighbors(atom)
        .filter_map(|n| placed[n.index()])
        .map(|q| (q - at).normalize())
        .sum();
    if sum.norm() < 1e-6 {
        Point::new(1.0, 0.0)
    } else {
        -sum.normalize()
    }
}

fn is_linear(graph: &MoleculeGraph, atom: NodeIndex) -> bool {
    if graph.hybridization(atom) == Hybridization::SP {
        return true;
    }
    let mol = graph.mol();
    mol.bonds_of(atom)
        .filter(|&e| mol.bond(e).order == BondOrder::Double)
        .count()
        >= 2
}

fn place_substituents(graph: &MoleculeGraph, v: NodeIndex, fresh: &[NodeIndex], placed: &mut [Option<Point>]) {
    let mol = graph.mol();
    let Some(p) = placed[v.index()] else {
        return;
    };
    let k = fresh.len();
    if k == 0 {
        return;
    }
    let anchors: Vec<(NodeIndex, Point)> = mol
        .sorted_neighbors(v)
        .into_iter()
        .filter(|n| !fresh.contains(n))
        .filter_map(|n| placed[n.index()].map(|q| (n, q)))
        .collect();

    let angles: Vec<f64> = match anchors.as_slice() {
        [] if k == 1 => vec![-PI / 6.0],
        [] => (0..k).map(|i| TAU * i as f64 / k as f64 - PI / 6.0).collect(),
        [(parent, q)] if k == 1 => {
            let back = angle_of(&(q - p));
            if is_linear(graph, v) {
                vec![back + PI]
            } else {
                let grandparent = mol
                    .sorted_neighbors(*parent)
                    .into_iter()
                    .filter(|&g| g != v)
                    .find_map(|g| placed[g.index()]);
                let (left, right) = (back + TAU / 3.0, back - TAU / 3.0);
                match grandparent {
                    Some(g) if (p + unit(left) - g).norm() > (p + unit(right) - g).norm() => vec![left],
                    _ => vec![right],
                }
            }
        }
        _ => {
            let mut taken: Vec<f64> = anchors
                .iter()
                .map(|(_, q)| angle_of(&(q - p)).rem_euclid(TAU))
                .collect();
            taken.sort_by(f64::total_cmp);
            let (mut gap_start, mut gap) = (taken[taken.len() - 1], taken[0] + TAU - taken[taken.len() - 1]);
            for w in taken.windows(2) {
                if w[1] - w[0] > gap {
                    gap_start = w[0];
                    gap = w[1] - w[0];
                }
            }
            (1..=k).map(|i| gap_start + gap * i as f64 / (k + 1) as f64).collect()
        }
    };

    for (&atom, angle) in fresh.iter().zip(angles) {
        placed[atom.index()] = Some(p + unit(angle));
    }
}

/// Bond springs plus contact repulsion for a fixed number of steps.
fn relax(graph: &MoleculeGraph, fragment: &[NodeIndex], coords: &mut [Point]) {
    let mol = graph.mol();
    let local = |a: NodeIndex| fragment.binary_search(&a).ok();
    let bonds: Vec<(usize, usize)> = mol
        .bonds()
        .filter_map(|e| mol.bond_endpoints(e))
        .filter_map(|(a, b)| Some((local(a)?, local(b)?)))
        .collect();
    let n = coords.len();

    for _ in 0..RELAX_ITERATIONS {
        let mut force = vec![Point::zeros(); n];
        for &(i, j) in &bonds {
            let d = coords[j] - coords[i];
            let r = d.norm();
            if r > 1e-9 {
                let f = d * ((r - 1.0) / r);
                force[i] += f;
                force[j] -= f;
            }
        }
        let mut moved = false;
        for i in 0..n {
            for j in (i + 1)..n {
                if bonds.contains(&(i, j)) || bonds.contains(&(j, i)) {
                    continue;
                }
                let d = coords[j] - coords[i];
                let r = d.norm();
                if r >= CONTACT {
                    continue;
                }
                moved = true;
                let dir = if r > 1e-9 { d / r } else { unit(i as f64 + j as f64) };
                let f = dir * (CONTACT - r);
                force[i] -= f;
                force[j] += f;
            }
        }
        let strained = force.iter().any(|f| f.norm() > 1e-6);
        if !moved && !strained {
            break;
        }
        for (c, f) in coords.iter_mut().zip(&force) {
            *c += f * RELAX_STEP;
        }
    }
}
