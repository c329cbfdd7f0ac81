//! Face-plane extraction and insertion for the label border exchange.
//!
//! A label plane travels as `u64` words with 0 standing in for "no label",
//! matching the sentinel reserved by [`Label`]. Plane cells are emitted with
//! the higher tangential axis slowest, so sender and receiver agree on the
//! layout without any per-plane header.

use crate::recolor_error::RecolorError;
use crate::topology::{Face, Label};
use itertools::iproduct;

use super::field::CellField;

/// Number of cells in the face plane of a block of `size`.
#[inline]
pub fn plane_len(size: [usize; 3], face: Face) -> usize {
    let (u, v) = face.tangents();
    size[u] * size[v]
}

#[inline]
fn plane_cell(face: Face, normal: isize, pu: isize, pv: isize) -> [isize; 3] {
    let (u, v) = face.tangents();
    let mut at = [0isize; 3];
    at[face.axis()] = normal;
    at[u] = pu;
    at[v] = pv;
    at
}

/// Appends the interior border plane at `face` to `out`.
pub fn read_border_plane(field: &CellField<Option<Label>>, face: Face, out: &mut Vec<u64>) {
    let size = field.size();
    let (u, v) = face.tangents();
    let normal = if face.step() > 0 {
        size[face.axis()] as isize - 1
    } else {
        0
    };
    out.reserve(plane_len(size, face));
    for (pv, pu) in iproduct!(0..size[v] as isize, 0..size[u] as isize) {
        let cell = field.get(plane_cell(face, normal, pu, pv));
        out.push(cell.map_or(0, Label::get));
    }
}

/// Writes a received plane into the halo layer just outside `face`.
pub fn write_halo_plane(
    field: &mut CellField<Option<Label>>,
    face: Face,
    words: &[u64],
) -> Result<(), RecolorError> {
    let size = field.size();
    let (u, v) = face.tangents();
    if words.len() != plane_len(size, face) {
        return Err(RecolorError::TruncatedMessage { at: words.len() });
    }
    let normal = if face.step() > 0 {
        size[face.axis()] as isize
    } else {
        -1
    };
    let mut it = words.iter();
    for (pv, pu) in iproduct!(0..size[v] as isize, 0..size[u] as isize) {
        let &w = it.next().expect("plane length checked above");
        let cell = if w == 0 { None } else { Some(Label::new(w)?) };
        field.set(plane_cell(face, normal, pu, pv), cell);
    }
    Ok(())
}

/// Fills the halo layer outside `face` with the sentinel. This is the
/// boundary-condition application for faces without a real neighbor.
pub fn fill_halo_plane(field: &mut CellField<Option<Label>>, face: Face) {
    let size = field.size();
    let (u, v) = face.tangents();
    let normal = if face.step() > 0 {
        size[face.axis()] as isize
    } else {
        -1
    };
    for (pv, pu) in iproduct!(0..size[v] as isize, 0..size[u] as isize) {
        field.set(plane_cell(face, normal, pu, pv), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(v: u64) -> Option<Label> {
        Some(Label::new(v).unwrap())
    }

    #[test]
    fn border_plane_roundtrips_into_neighbor_halo() {
        let mut a = CellField::new([2, 2, 2], None);
        // fill a's +x border with distinct labels
        let mut v = 10;
        for z in 0..2 {
            for y in 0..2 {
                a.set([1, y, z], label(v));
                v += 1;
            }
        }
        let mut plane = Vec::new();
        read_border_plane(&a, Face::XPlus, &mut plane);
        assert_eq!(plane.len(), 4);

        // the neighbor to the -x side of b is a; write into b's -x halo
        let mut b = CellField::new([2, 2, 2], None);
        write_halo_plane(&mut b, Face::XMinus, &plane).unwrap();
        let mut v = 10;
        for z in 0..2 {
            for y in 0..2 {
                assert_eq!(b.get([-1, y, z]), label(v));
                v += 1;
            }
        }
    }

    #[test]
    fn sentinel_cells_survive_the_trip() {
        let mut a = CellField::new([2, 1, 1], None);
        a.set([1, 0, 0], label(5));
        let mut plane = Vec::new();
        read_border_plane(&a, Face::YPlus, &mut plane);
        assert_eq!(plane, vec![0, 5]); // x-fastest over the y border
        plane.clear();
        read_border_plane(&a, Face::XMinus, &mut plane);
        assert_eq!(plane, vec![0]); // only (0, 0, 0), which is unlabeled
        plane.clear();
        read_border_plane(&a, Face::XPlus, &mut plane);
        assert_eq!(plane, vec![5]);
    }

    #[test]
    fn wrong_plane_size_is_rejected() {
        let mut f = CellField::new([2, 2, 2], None);
        assert!(matches!(
            write_halo_plane(&mut f, Face::ZPlus, &[0, 0, 0]),
            Err(RecolorError::TruncatedMessage { .. })
        ));
    }

    #[test]
    fn fill_clears_one_halo_plane() {
        let mut f = CellField::new([2, 2, 2], None);
        f.set([-1, 0, 0], label(9));
        f.set([2, 0, 0], label(8));
        fill_halo_plane(&mut f, Face::XMinus);
        assert_eq!(f.get([-1, 0, 0]), None);
        assert_eq!(f.get([2, 0, 0]), label(8));
    }
}
