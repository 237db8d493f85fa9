use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

/// Undirected molecular graph, generic over atom and bond payloads.
///
/// Node and edge indices are stable: atoms and bonds are only ever added,
/// so an index obtained from one `Mol` stays valid in clones of it.
pub struct Mol<A, B> {
    graph: UnGraph<A, B>,
}

impl<A, B> Mol<A, B> {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
        }
    }

    pub fn graph(&self) -> &UnGraph<A, B> {
        &self.graph
    }

    pub fn atom(&self, idx: NodeIndex) -> &A {
        &self.graph[idx]
    }

    pub fn atom_mut(&mut self, idx: NodeIndex) -> &mut A {
        &mut self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &B {
        &self.graph[idx]
    }

    pub fn bond_mut(&mut self, idx: EdgeIndex) -> &mut B {
        &mut self.graph[idx]
    }

    pub fn add_atom(&mut self, atom: A) -> NodeIndex {
        self.graph.add_node(atom)
    }

    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: B) -> EdgeIndex {
        self.graph.add_edge(a, b, bond)
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    /// Neighbors by ascending node index.
    pub fn sorted_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut nbrs: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        nbrs.sort();
        nbrs
    }

    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph.neighbors(idx).count()
    }

    pub fn bonds_of(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edges(idx).map(|e| e.id())
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    /// Connected components, each sorted by node index, ordered by their
    /// lowest atom.
    pub fn fragments(&self) -> Vec<Vec<NodeIndex>> {
        let n = self.atom_count();
        let mut seen = vec![false; n];
        let mut out = Vec::new();
        for start in self.atoms() {
            if seen[start.index()] {
                continue;
            }
            seen[start.index()] = true;
            let mut stack = vec![start];
            let mut comp = Vec::new();
            while let Some(v) = stack.pop() {
                comp.push(v);
                for w in self.graph.neighbors(v) {
                    if !seen[w.index()] {
                        seen[w.index()] = true;
                        stack.push(w);
                    }
                }
            }
            comp.sort();
            out.push(comp);
        }
        out
    }

    /// Copy of the graph with the atom payload transformed.
    pub fn map_atoms<A2>(&self, mut f: impl FnMut(NodeIndex, &A) -> A2) -> Mol<A2, B>
    where
        B: Clone,
    {
        Mol {
            graph: self.graph.map(|i, a| f(i, a), |_, b| b.clone()),
        }
    }
}

impl<A: Clone, B: Clone> Clone for Mol<A, B> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
        }
    }
}

impl<A, B> Default for Mol<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: PartialEq, B: PartialEq> PartialEq for Mol<A, B> {
    fn eq(&self, other: &Self) -> bool {
        if self.atom_count() != other.atom_count() || self.bond_count() != other.bond_count() {
            return false;
        }
        self.atoms().all(|idx| self.atom(idx) == other.atom(idx))
            && self.bonds().all(|idx| {
                self.bond(idx) == other.bond(idx)
                    && self.bond_endpoints(idx) == other.bond_endpoints(idx)
            })
    }
}

impl<A: std::fmt::Debug, B: std::fmt::Debug> std::fmt::Debug for Mol<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mol")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .finish()
    }
}

/// `true` when `to` is an even permutation of `from`. Sequences with
/// different lengths or elements compare as odd.
pub(crate) fn permutation_parity<T: Eq>(from: &[T], to: &[T]) -> bool {
    let n = from.len();
    if n != to.len() {
        return false;
    }
    let mut perm = Vec::with_capacity(n);
    for f in from {
        match to.iter().position(|t| t == f) {
            Some(p) => perm.push(p),
            None => return false,
        }
    }
    let mut visited = vec![false; n];
    let mut swaps = 0usize;
    for i in 0..n {
        if visited[i] {
            continue;
        }
        let mut cycle_len = 0;
        let mut j = i;
        while !visited[j] {
            visited[j] = true;
            j = perm[j];
            cycle_len += 1;
        }
        swaps += cycle_len - 1;
    }
    swaps % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_of_identity_and_swap() {
        assert!(permutation_parity(&[1, 2, 3, 4], &[1, 2, 3, 4]));
        assert!(!permutation_parity(&[1, 2, 3, 4], &[2, 1, 3, 4]));
        assert!(permutation_parity(&[1, 2, 3], &[2, 3, 1]));
    }

    #[test]
    fn moving_first_of_four_to_end_is_odd() {
        assert!(!permutation_parity(&[0, 1, 2, 3], &[1, 2, 3, 0]));
    }

    #[test]
    fn fragments_are_split() {
        let mut mol = Mol::<u8, ()>::new();
        let a = mol.add_atom(6);
        let b = mol.add_atom(6);
        let c = mol.add_atom(11);
        mol.add_bond(a, b, ());
        let frags = mol.fragments();
        assert_eq!(frags, vec![vec![a, b], vec![c]]);
    }
}
