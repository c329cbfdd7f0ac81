//! # grid-recolor
//!
//! grid-recolor assigns globally unique, globally consistent labels to the
//! connected components of a per-cell scalar field partitioned across the
//! blocks of a structured 3D grid — distributed connected-component
//! labeling ("recoloring") for multiphase solvers and similar block-wise
//! codes. Each block labels its interior with a sequential two-pass scan,
//! discovers which of its components touch neighbor blocks, and a pairwise
//! binary-tree reduction contracts those per-block component adjacency
//! graphs into one global equivalence relation in `O(log blocks)`
//! communication rounds, without ever materializing the global graph on one
//! process.
//!
//! ## Features
//! - 26-connected, multi-layer labeling over [`data::CellField`] blocks
//! - Deterministic results: merge ties always resolve to the lowest label
//! - Pluggable communication backends (serial, in-process threads, MPI)
//! - Non-power-of-two block counts via fold-in/fold-out reduction rounds
//!
//! ## Usage
//! Build a [`domain::Domain`] for the blocks a process owns, fill the
//! per-layer input fields, and call [`algs::recolor::recolor`]. Active
//! cells come back labeled in place; `None` cells stay inactive. Enable
//! the `mpi-support` feature for the MPI transport:
//!
//! ```toml
//! [dependencies]
//! grid-recolor = "0.2"
//! # features = ["mpi-support"]
//! ```

pub mod algs;
pub mod data;
pub mod domain;
pub mod recolor_error;
pub mod topology;

/// A convenient prelude importing the most-used types.
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{CommTag, Communicator, NoComm, ThreadComm, Wait};
    pub use crate::algs::recolor::recolor;
    pub use crate::algs::reduction::partners::{partner_schedule, round_count};
    pub use crate::data::CellField;
    pub use crate::domain::{BlockData, Domain};
    pub use crate::recolor_error::RecolorError;
    pub use crate::topology::{BlockGrid, Face, Label};
}
