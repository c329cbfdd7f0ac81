//! Grid-of-blocks topology: block ids, coordinates, and face neighbors.
//!
//! Blocks tile the global structured grid as a `dims[0] x dims[1] x dims[2]`
//! lattice. Ids raster through the lattice x-fastest, matching the layout of
//! the cells inside each block. Face neighbors wrap around periodic axes; a
//! wrap that lands back on the block itself (axis extent 1), or that crosses
//! a non-periodic domain edge, yields no neighbor; such faces take the
//! sentinel boundary fill instead of a border exchange.

use serde::{Deserialize, Serialize};

/// One of the six axis-aligned block faces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    XPlus,
    XMinus,
    YPlus,
    YMinus,
    ZPlus,
    ZMinus,
}

impl Face {
    /// All faces, in a fixed traversal order.
    pub const ALL: [Face; 6] = [
        Face::XPlus,
        Face::XMinus,
        Face::YPlus,
        Face::YMinus,
        Face::ZPlus,
        Face::ZMinus,
    ];

    /// Axis the face is normal to (0 = x, 1 = y, 2 = z).
    #[inline]
    pub const fn axis(self) -> usize {
        match self {
            Face::XPlus | Face::XMinus => 0,
            Face::YPlus | Face::YMinus => 1,
            Face::ZPlus | Face::ZMinus => 2,
        }
    }

    /// Outward step along the normal axis: `+1` or `-1`.
    #[inline]
    pub const fn step(self) -> isize {
        match self {
            Face::XPlus | Face::YPlus | Face::ZPlus => 1,
            Face::XMinus | Face::YMinus | Face::ZMinus => -1,
        }
    }

    /// The face on the opposite side of the block.
    #[inline]
    pub const fn opposite(self) -> Face {
        match self {
            Face::XPlus => Face::XMinus,
            Face::XMinus => Face::XPlus,
            Face::YPlus => Face::YMinus,
            Face::YMinus => Face::YPlus,
            Face::ZPlus => Face::ZMinus,
            Face::ZMinus => Face::ZPlus,
        }
    }

    /// The two in-plane (tangential) axes, ascending.
    #[inline]
    pub const fn tangents(self) -> (usize, usize) {
        match self.axis() {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        }
    }
}

/// The lattice of blocks a run is decomposed into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockGrid {
    dims: [usize; 3],
    periodic: [bool; 3],
}

impl BlockGrid {
    /// A fully periodic block lattice (the common multiphase-solver setup).
    pub fn new(dims: [usize; 3]) -> Self {
        Self::with_periodicity(dims, [true; 3])
    }

    /// A block lattice with per-axis periodicity.
    pub fn with_periodicity(dims: [usize; 3], periodic: [bool; 3]) -> Self {
        debug_assert!(dims.iter().all(|&d| d > 0), "empty block lattice");
        Self { dims, periodic }
    }

    /// Lattice extents per axis.
    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Per-axis periodicity flags.
    #[inline]
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Total number of blocks.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Lattice coordinates of a block id.
    #[inline]
    pub fn coords(&self, block: usize) -> [usize; 3] {
        let [gx, gy, _] = self.dims;
        [block % gx, (block / gx) % gy, block / (gx * gy)]
    }

    /// Block id at lattice coordinates.
    #[inline]
    pub fn id_at(&self, at: [usize; 3]) -> usize {
        let [gx, gy, _] = self.dims;
        at[0] + gx * (at[1] + gy * at[2])
    }

    /// The block across `face`, or `None` when the face has no real
    /// neighbor (non-periodic domain edge, or a periodic wrap back onto the
    /// block itself).
    pub fn neighbor(&self, block: usize, face: Face) -> Option<usize> {
        let axis = face.axis();
        let mut c = self.coords(block);
        let stepped = c[axis] as isize + face.step();
        let extent = self.dims[axis] as isize;
        c[axis] = if (0..extent).contains(&stepped) {
            stepped as usize
        } else if self.periodic[axis] {
            stepped.rem_euclid(extent) as usize
        } else {
            return None;
        };
        let n = self.id_at(c);
        (n != block).then_some(n)
    }

    /// Contiguous, balanced block → rank assignment for `ranks` processes.
    pub fn contiguous_ranks(&self, ranks: usize) -> Vec<usize> {
        let blocks = self.block_count();
        debug_assert!(ranks > 0);
        (0..blocks).map(|b| b * ranks / blocks).collect()
    }
}
