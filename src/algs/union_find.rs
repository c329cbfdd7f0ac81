//! Array-backed union-find over small 1-indexed provisional labels.
//!
//! Used by the two-pass scan to merge label collisions inside one block and
//! to compress the surviving roots into a dense, offset-based canonical
//! numbering. Merge direction is fixed: the *lower* root absorbs the higher
//! one, which is what makes the final labels deterministic across ranks.

use crate::recolor_error::RecolorError;
use crate::topology::Label;

#[derive(Clone, Debug, Default)]
pub struct UnionFind {
    /// `parent[i]` is the parent of id `i + 1`; roots point to themselves.
    parent: Vec<u32>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids minted so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Mints a fresh singleton id (1-indexed).
    pub fn make_set(&mut self) -> u32 {
        let id = self.parent.len() as u32 + 1;
        self.parent.push(id);
        id
    }

    /// Root of `id`, with full path compression.
    pub fn find(&mut self, id: u32) -> u32 {
        let mut root = id;
        while self.parent[root as usize - 1] != root {
            root = self.parent[root as usize - 1];
        }
        let mut cur = id;
        while cur != root {
            let next = self.parent[cur as usize - 1];
            self.parent[cur as usize - 1] = root;
            cur = next;
        }
        root
    }

    /// Merges the sets of `a` and `b`; the lower root becomes the parent.
    pub fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        if ra < rb {
            self.parent[rb as usize - 1] = ra;
        } else {
            self.parent[ra as usize - 1] = rb;
        }
    }

    /// Compresses all roots into dense canonical labels `offset+1 ..=
    /// offset+k`, visiting roots in ascending numeric order.
    ///
    /// Returns the per-id lookup table (index `i` maps provisional id
    /// `i + 1` to its canonical label) and the list of canonical labels.
    pub fn make_lookup_table(
        &mut self,
        offset: u64,
    ) -> Result<(Vec<Label>, Vec<Label>), RecolorError> {
        let n = self.parent.len();
        let roots: Vec<u32> = (1..=n as u32).map(|i| self.find(i)).collect();
        let mut distinct = roots.clone();
        distinct.sort_unstable();
        distinct.dedup();
        // rank_of[root] = dense 1-based rank in ascending root order
        let mut rank_of = vec![0u64; n + 1];
        for (rank, &root) in distinct.iter().enumerate() {
            rank_of[root as usize] = rank as u64 + 1;
        }
        let lookup = roots
            .iter()
            .map(|&r| Label::new(offset + rank_of[r as usize]))
            .collect::<Result<Vec<_>, _>>()?;
        let canonical = (1..=distinct.len() as u64)
            .map(|rank| Label::new(offset + rank))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((lookup, canonical))
    }
}
