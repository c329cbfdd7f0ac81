//! Block-lattice topology and component identifiers.

pub mod block;
pub mod label;

pub use block::{BlockGrid, Face};
pub use label::Label;
