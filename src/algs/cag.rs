//! The per-block component adjacency graph (CAG) and its builder.
//!
//! A CAG node stands for one provisional label that was seen touching a
//! neighbor block; its `root` pointer doubles as the union-find parent
//! during reduction, and its edge list records the labels observed across
//! the border. Interior-only components never enter the graph; they are
//! final the moment the two-pass scan ends.

use hashbrown::HashMap;
use itertools::iproduct;

use crate::data::CellField;
use crate::topology::{BlockGrid, Face, Label};

/// One live node of the component adjacency graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CagNode {
    pub id: Label,
    /// Union-find pointer; a root points to itself. Lower roots win merges.
    pub root: Label,
    /// Cross-block adjacencies; `None` marks a consumed edge.
    pub edges: Vec<Option<Label>>,
}

impl CagNode {
    pub fn new(id: Label, edges: Vec<Label>) -> Self {
        Self {
            id,
            root: id,
            edges: edges.into_iter().map(Some).collect(),
        }
    }
}

/// The per-block graph, keyed by node id.
#[derive(Clone, Debug, Default)]
pub struct Cag {
    nodes: HashMap<Label, CagNode>,
}

impl Cag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: Label) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: Label) -> Option<&CagNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: Label) -> Option<&mut CagNode> {
        self.nodes.get_mut(&id)
    }

    /// Inserts `node`, replacing any node with the same id. Received nodes
    /// are authoritative over stale local copies.
    pub fn insert(&mut self, node: CagNode) {
        self.nodes.insert(node.id, node);
    }

    pub fn remove(&mut self, id: Label) -> Option<CagNode> {
        self.nodes.remove(&id)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Node ids in ascending order, for deterministic traversal and wire
    /// serialization.
    pub fn ids_sorted(&self) -> Vec<Label> {
        let mut ids: Vec<Label> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Root of `id` with path compression. Ids whose chain leaves the graph
    /// are treated as their own root; that only happens to dangling inputs,
    /// never to ids inserted through [`Cag::insert`].
    pub fn find(&mut self, id: Label) -> Label {
        let mut root = id;
        loop {
            match self.nodes.get(&root) {
                Some(n) if n.root != root => root = n.root,
                _ => break,
            }
        }
        let mut cur = id;
        while cur != root {
            let Some(n) = self.nodes.get_mut(&cur) else {
                break;
            };
            cur = n.root;
            n.root = root;
        }
        root
    }

    /// Merges the components of `a` and `b`; the lower root wins.
    pub fn union(&mut self, a: Label, b: Label) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (winner, loser) = if ra < rb { (ra, rb) } else { (rb, ra) };
        if let Some(n) = self.nodes.get_mut(&loser) {
            n.root = winner;
        }
    }
}

/// Pointer table: the per-block label → root map that survives the CAG and
/// alone drives the final rewrite. Seeded to identity over the ids a block
/// owns; each id is owned by exactly one table at any time.
#[derive(Clone, Debug, Default)]
pub struct PointerTable {
    map: HashMap<Label, Label>,
}

impl PointerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity table over `ids`.
    pub fn identity(ids: &[Label]) -> Self {
        Self {
            map: ids.iter().map(|&l| (l, l)).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: Label) -> bool {
        self.map.contains_key(&id)
    }

    /// Records (or updates) the resolution of `id`.
    pub fn set_root(&mut self, id: Label, root: Label) {
        self.map.insert(id, root);
    }

    pub fn root_of(&self, id: Label) -> Option<Label> {
        self.map.get(&id).copied()
    }

    /// Entries in ascending id order, for deterministic serialization.
    pub fn iter_sorted(&self) -> Vec<(Label, Label)> {
        let mut entries: Vec<(Label, Label)> = self.map.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_unstable();
        entries
    }
}

/// Deduplicated edge accumulator for one local label. The cache shortcut
/// covers the common case of one ghost component matched by a run of
/// consecutive border cells.
#[derive(Clone, Debug, Default)]
pub(crate) struct EdgeList {
    cache: Option<Label>,
    edges: Vec<Label>,
}

impl EdgeList {
    pub(crate) fn try_add_edge(&mut self, to: Label) {
        if self.cache == Some(to) {
            return;
        }
        self.cache = Some(to);
        if !self.edges.contains(&to) {
            self.edges.push(to);
        }
    }

    pub(crate) fn into_edges(self) -> Vec<Label> {
        self.edges
    }
}

/// In-plane neighborhood of a ghost cell: the facing interior cell plus its
/// eight in-plane neighbors. Together with the face normal these are the
/// causal-equivalent directions of the two-pass stencil, pointed across the
/// border.
const IN_PLANE: [[isize; 2]; 9] = [
    [0, 0],
    [-1, -1],
    [0, -1],
    [1, -1],
    [-1, 0],
    [1, 0],
    [-1, 1],
    [0, 1],
    [1, 1],
];

/// Builds the block's CAG and its identity pointer table.
///
/// For every face with a real neighbor, walks the ghost plane; every ghost
/// cell with a defined label is matched against the interior cells adjacent
/// to it (any layer) on equal *input* values, and each match records a
/// deduplicated edge from the interior label to the ghost label.
pub fn build_cag<V>(
    grid: &BlockGrid,
    block: usize,
    values: &[CellField<Option<V>>],
    labels: &[CellField<Option<Label>>],
    canonical: &[Label],
) -> (Cag, PointerTable)
where
    V: Copy + PartialEq,
{
    let layers = values.len();
    let size = values[0].size();
    let mut acc: HashMap<Label, EdgeList> = canonical
        .iter()
        .map(|&l| (l, EdgeList::default()))
        .collect();

    for face in Face::ALL {
        if grid.neighbor(block, face).is_none() {
            continue;
        }
        let axis = face.axis();
        let (u, v) = face.tangents();
        let (ghost_n, inner_n) = if face.step() > 0 {
            (size[axis] as isize, size[axis] as isize - 1)
        } else {
            (-1, 0)
        };
        for (pv, pu) in iproduct!(0..size[v] as isize, 0..size[u] as isize) {
            let mut ghost = [0isize; 3];
            ghost[axis] = ghost_n;
            ghost[u] = pu;
            ghost[v] = pv;
            for l in 0..layers {
                let Some(ghost_label) = labels[l].get(ghost) else {
                    continue;
                };
                let Some(ghost_value) = values[l].get(ghost) else {
                    continue;
                };
                for ln in 0..layers {
                    for d in IN_PLANE {
                        let (cu, cv) = (pu + d[0], pv + d[1]);
                        if !(0..size[u] as isize).contains(&cu)
                            || !(0..size[v] as isize).contains(&cv)
                        {
                            continue;
                        }
                        let mut cell = [0isize; 3];
                        cell[axis] = inner_n;
                        cell[u] = cu;
                        cell[v] = cv;
                        let Some(cell_label) = labels[ln].get(cell) else {
                            continue;
                        };
                        if values[ln].get(cell) != Some(ghost_value) {
                            continue;
                        }
                        if let Some(list) = acc.get_mut(&cell_label) {
                            list.try_add_edge(ghost_label);
                        }
                    }
                }
            }
        }
    }

    let mut cag = Cag::new();
    for (id, list) in acc {
        let edges = list.into_edges();
        if !edges.is_empty() {
            cag.insert(CagNode::new(id, edges));
        }
    }
    (cag, PointerTable::identity(canonical))
}
