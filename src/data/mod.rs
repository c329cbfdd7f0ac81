//! Per-block cell storage and halo plane transfer.

pub mod field;
pub mod halo;

pub use field::CellField;
