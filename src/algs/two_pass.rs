//! Two-pass intra-block connected-component labeling.
//!
//! First pass: scan the block interior in raster order (z, y, x ascending,
//! x fastest) and, for every active cell and layer, collect merge candidates
//! from the causally prior half of the 26-neighborhood, the neighbors the
//! scan has already visited. A neighbor is a candidate when any layer's
//! input value there equals the cell's input value. No candidate mints a new
//! provisional label; one candidate is reused; several are unioned.
//!
//! Second pass: compress all provisional labels through
//! [`UnionFind::make_lookup_table`] into the block's globally disjoint label
//! range and rewrite the output field in place.
//!
//! The halo is never consulted here; cross-block merging is the reduction
//! tree's job.

use itertools::iproduct;

use crate::data::CellField;
use crate::recolor_error::RecolorError;
use crate::topology::Label;

use super::union_find::UnionFind;

/// The causal half of the 26-neighborhood: every offset with a smaller
/// raster index than the center, in scan order.
pub(crate) const CAUSAL_OFFSETS: [[isize; 3]; 13] = [
    [-1, -1, -1],
    [0, -1, -1],
    [1, -1, -1],
    [-1, 0, -1],
    [0, 0, -1],
    [1, 0, -1],
    [-1, 1, -1],
    [0, 1, -1],
    [1, 1, -1],
    [-1, -1, 0],
    [0, -1, 0],
    [1, -1, 0],
    [-1, 0, 0],
];

/// Labels every active cell of every layer with a provisional label unique
/// within `offset+1 ..= offset + block_volume * layers`, such that two
/// 26-connected same-value cells inside the block share a label.
///
/// Returns the canonical provisional labels in use, for CAG construction.
pub fn two_pass_label<V>(
    values: &[CellField<Option<V>>],
    labels: &mut [CellField<Option<Label>>],
    offset: u64,
) -> Result<Vec<Label>, RecolorError>
where
    V: Copy + PartialEq,
{
    if values.is_empty() || values.len() != labels.len() {
        return Err(RecolorError::EmptyLayers);
    }
    let layers = values.len();
    let size = values[0].size();

    for field in labels.iter_mut() {
        field.fill(None);
    }

    let mut uf = UnionFind::new();
    let mut merger: Vec<u32> = Vec::with_capacity(4 * layers);

    for (z, y, x) in iproduct!(
        0..size[2] as isize,
        0..size[1] as isize,
        0..size[0] as isize
    ) {
        let at = [x, y, z];
        for l in 0..layers {
            let Some(value) = values[l].get(at) else {
                continue;
            };
            merger.clear();
            for ln in 0..layers {
                for d in CAUSAL_OFFSETS {
                    let q = [x + d[0], y + d[1], z + d[2]];
                    if !values[ln].in_interior(q) {
                        continue;
                    }
                    if values[ln].get(q) != Some(value) {
                        continue;
                    }
                    if let Some(neighbor) = labels[ln].get(q) {
                        merger.push(neighbor.get() as u32);
                    }
                }
            }
            let assigned = match merger.as_slice() {
                [] => uf.make_set(),
                &[only] => only,
                candidates => {
                    for pair in candidates.windows(2) {
                        if pair[0] != pair[1] {
                            uf.union(pair[0], pair[1]);
                        }
                    }
                    candidates[0]
                }
            };
            labels[l].set(at, Some(Label::new(assigned as u64)?));
        }
    }

    let (lookup, canonical) = uf.make_lookup_table(offset)?;
    for field in labels.iter_mut() {
        for (z, y, x) in iproduct!(
            0..size[2] as isize,
            0..size[1] as isize,
            0..size[0] as isize
        ) {
            if let Some(prov) = field.get([x, y, z]) {
                field.set([x, y, z], Some(lookup[prov.get() as usize - 1]));
            }
        }
    }
    Ok(canonical)
}
