use std::collections::{BTreeMap, VecDeque};

use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;

use crate::mol::Mol;

/// Smallest set of smallest rings.
///
/// Candidate cycles come from Horton's construction (a shortest path from
/// every vertex to both ends of every edge), sorted by size; a candidate
/// joins the set when its edge vector is independent over GF(2) of the
/// rings already chosen.
#[derive(Debug, Clone, Default)]
pub struct RingInfo {
    rings: Vec<Vec<NodeIndex>>,
}

impl RingInfo {
    pub fn sssr<A, B>(mol: &Mol<A, B>) -> Self {
        let num_expected = Self::expected_ring_count(mol);
        if num_expected == 0 {
            return Self::default();
        }

        let mut basis = CycleBasis::default();
        let mut rings = Vec::with_capacity(num_expected);
        for ring in horton_candidates(mol) {
            if rings.len() == num_expected {
                break;
            }
            if basis.insert(edge_vector(&ring, mol)) {
                rings.push(normalize_ring(&ring));
            }
        }
        rings.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        Self { rings }
    }

    /// Cyclomatic number: bonds − atoms + fragments.
    pub fn expected_ring_count<A, B>(mol: &Mol<A, B>) -> usize {
        let v = mol.atom_count();
        let e = mol.bond_count();
        let c = connected_components(mol.graph());
        (e + c).saturating_sub(v)
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }

    pub fn is_ring_atom(&self, atom: NodeIndex) -> bool {
        self.rings.iter().any(|ring| ring.contains(&atom))
    }

    pub fn is_ring_bond(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.rings.iter().any(|ring| ring_has_edge(ring, a, b))
    }

    pub fn smallest_ring_size(&self, atom: NodeIndex) -> Option<usize> {
        self.rings
            .iter()
            .filter(|ring| ring.contains(&atom))
            .map(Vec::len)
            .min()
    }

    pub fn is_in_ring_of_size(&self, atom: NodeIndex, size: usize) -> bool {
        self.rings
            .iter()
            .any(|ring| ring.len() == size && ring.contains(&atom))
    }

    /// Smallest ring that contains the bond `a`-`b`.
    pub fn smallest_ring_with_bond(&self, a: NodeIndex, b: NodeIndex) -> Option<&[NodeIndex]> {
        self.rings
            .iter()
            .filter(|ring| ring_has_edge(ring, a, b))
            .min_by_key(|ring| ring.len())
            .map(Vec::as_slice)
    }

    /// Smallest ring holding all of `atoms`.
    pub fn smallest_ring_with_atoms(&self, atoms: &[NodeIndex]) -> Option<&[NodeIndex]> {
        self.rings
            .iter()
            .filter(|ring| atoms.iter().all(|a| ring.contains(a)))
            .min_by_key(|ring| ring.len())
            .map(Vec::as_slice)
    }

    /// Consecutive atom pairs around a ring, closing back to the start.
    pub fn ring_edges(ring: &[NodeIndex]) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
        let len = ring.len();
        (0..len).map(move |i| (ring[i], ring[(i + 1) % len]))
    }
}

fn ring_has_edge(ring: &[NodeIndex], a: NodeIndex, b: NodeIndex) -> bool {
    RingInfo::ring_edges(ring).any(|(x, y)| (x == a && y == b) || (x == b && y == a))
}

/// Row-reduced GF(2) basis keyed by each row's lowest set bit.
#[derive(Default)]
struct CycleBasis {
    rows: BTreeMap<usize, Vec<u64>>,
}

impl CycleBasis {
    fn insert(&mut self, mut v: Vec<u64>) -> bool {
        while let Some(p) = lowest_bit(&v) {
            match self.rows.get(&p) {
                Some(row) => xor_into(&mut v, row),
                None => {
                    self.rows.insert(p, v);
                    return true;
                }
            }
        }
        false
    }
}

fn lowest_bit(bv: &[u64]) -> Option<usize> {
    bv.iter()
        .enumerate()
        .find(|(_, w)| **w != 0)
        .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
}

fn xor_into(a: &mut [u64], b: &[u64]) {
    for (aw, bw) in a.iter_mut().zip(b) {
        *aw ^= *bw;
    }
}

fn edge_vector<A, B>(ring: &[NodeIndex], mol: &Mol<A, B>) -> Vec<u64> {
    let mut bv = vec![0u64; mol.bond_count().div_ceil(64)];
    for (a, b) in RingInfo::ring_edges(ring) {
        if let Some(edge) = mol.bond_between(a, b) {
            let idx = edge.index();
            bv[idx / 64] |= 1u64 << (idx % 64);
        }
    }
    bv
}

fn horton_candidates<A, B>(mol: &Mol<A, B>) -> Vec<Vec<NodeIndex>> {
    let n = mol.atom_count();
    let trees: Vec<BfsTree> = (0..n).map(|s| BfsTree::new(mol, NodeIndex::new(s))).collect();

    let mut candidates: Vec<Vec<NodeIndex>> = Vec::new();
    for edge in mol.bonds() {
        let Some((u, v)) = mol.bond_endpoints(edge) else {
            continue;
        };
        for tree in &trees {
            let (Some(path_u), Some(path_v)) = (tree.path_to(u), tree.path_to(v)) else {
                continue;
            };
            if path_u.len() + path_v.len() < 4 {
                continue;
            }
            // Both paths start at the root; anything else shared makes the
            // closed walk degenerate.
            if path_u[1..].iter().any(|x| path_v[1..].contains(x)) {
                continue;
            }
            let mut ring = path_u;
            ring.extend(path_v[1..].iter().rev());
            candidates.push(ring);
        }
    }

    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    candidates.dedup();
    candidates
}

struct BfsTree {
    root: NodeIndex,
    parent: Vec<Option<NodeIndex>>,
    reached: Vec<bool>,
}

impl BfsTree {
    fn new<A, B>(mol: &Mol<A, B>, root: NodeIndex) -> Self {
        let n = mol.atom_count();
        let mut parent = vec![None; n];
        let mut reached = vec![false; n];
        reached[root.index()] = true;
        let mut queue = VecDeque::from([root]);
        while let Some(cur) = queue.pop_front() {
            for nb in mol.sorted_neighbors(cur) {
                if !reached[nb.index()] {
                    reached[nb.index()] = true;
                    parent[nb.index()] = Some(cur);
                    queue.push_back(nb);
                }
            }
        }
        Self {
            root,
            parent,
            reached,
        }
    }

    /// Shortest path root → `dst`, inclusive at both ends.
    fn path_to(&self, dst: NodeIndex) -> Option<Vec<NodeIndex>> {
        if !self.reached[dst.index()] {
            return None;
        }
        let mut path = vec![dst];
        let mut cur = dst;
        while cur != self.root {
            cur = self.parent[cur.index()]?;
            path.push(cur);
        }
        path.reverse();
        Some(path)
    }
}

/// Rotate so the lowest index comes first, then orient toward the smaller
/// neighbor.
fn normalize_ring(ring: &[NodeIndex]) -> Vec<NodeIndex> {
    let Some(min_pos) = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, idx)| idx)
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    let len = ring.len();
    let mut normalized: Vec<NodeIndex> = (0..len).map(|i| ring[(min_pos + i) % len]).collect();
    if len > 2 && normalized[1] > normalized[len - 1] {
        normalized[1..].reverse();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::from_smiles;

    fn ring_sizes(smiles: &str) -> Vec<usize> {
        let mol = from_smiles(smiles).unwrap();
        RingInfo::sssr(&mol).rings().iter().map(Vec::len).collect()
    }

    #[test]
    fn acyclic_has_no_rings() {
        assert!(ring_sizes("CCCC").is_empty());
    }

    #[test]
    fn monocycles() {
        assert_eq!(ring_sizes("C1CC1"), vec![3]);
        assert_eq!(ring_sizes("c1ccccc1"), vec![6]);
    }

    #[test]
    fn fused_and_bridged() {
        assert_eq!(ring_sizes("c1ccc2ccccc2c1"), vec![6, 6]);
        assert_eq!(ring_sizes("C1CC2CCC1C2"), vec![5, 5]);
    }

    #[test]
    fn spiro() {
        assert_eq!(ring_sizes("C1CCC2(C1)CCCC2"), vec![5, 5]);
    }

    #[test]
    fn ring_membership_queries() {
        let mol = from_smiles("CC1CCCCC1").unwrap();
        let info = RingInfo::sssr(&mol);
        let n = NodeIndex::new;
        assert!(!info.is_ring_atom(n(0)));
        assert!(info.is_ring_atom(n(1)));
        assert!(info.is_ring_bond(n(1), n(6)));
        assert!(!info.is_ring_bond(n(0), n(1)));
        assert_eq!(info.smallest_ring_size(n(3)), Some(6));
        assert!(info.is_in_ring_of_size(n(3), 6));
        assert!(!info.is_in_ring_of_size(n(3), 3));
    }

    #[test]
    fn normalized_rings_start_at_lowest_index() {
        let mol = from_smiles("C1CCCCC1").unwrap();
        let info = RingInfo::sssr(&mol);
        assert_eq!(info.rings()[0][0], NodeIndex::new(0));
    }

    #[test]
    fn smallest_ring_lookups() {
        let mol = from_smiles("C1Cc2ccccc2C1").unwrap();
        let info = RingInfo::sssr(&mol);
        let n = NodeIndex::new;
        assert_eq!(info.smallest_ring_with_bond(n(2), n(7)).map(<[_]>::len), Some(5));
        assert_eq!(info.smallest_ring_with_bond(n(3), n(4)).map(<[_]>::len), Some(6));
        assert!(info.smallest_ring_with_bond(n(0), n(3)).is_none());
        assert_eq!(info.smallest_ring_with_atoms(&[n(1), n(2), n(7)]).map(<[_]>::len), Some(5));
        assert!(info.smallest_ring_with_atoms(&[n(0), n(4)]).is_none());
    }
}
