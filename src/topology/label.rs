//! `Label`: a strong, zero-cost handle for connected-component ids.
//!
//! Every component, provisional or canonical, is identified by a positive
//! integer. `Label` wraps a nonzero `u64` so that 0 stays reserved as the
//! "no component" sentinel, and cell fields can store `Option<Label>` at no
//! size cost (the `None` niche occupies the reserved zero).
//!
//! On the reduction wire, labels travel as `i64` words so that the negative
//! framing sentinels (`-1` edge-list end, `-2` message end) can share the
//! stream; see [`crate::algs::wire`].

use crate::recolor_error::RecolorError;
use std::{fmt, num::NonZeroU64};

/// Identifier of a connected component.
///
/// # Memory layout
/// `repr(transparent)` over `NonZeroU64`: same ABI and alignment as a
/// `u64`, and `Option<Label>` is also `u64`-sized.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct Label(NonZeroU64);

impl Label {
    /// Creates a new `Label` from a raw `u64` value.
    ///
    /// # Errors
    /// Returns [`RecolorError::InvalidLabel`] if `raw == 0`.
    #[inline]
    pub fn new(raw: u64) -> Result<Self, RecolorError> {
        NonZeroU64::new(raw)
            .map(Label)
            .ok_or(RecolorError::InvalidLabel)
    }

    /// Returns the inner `u64` value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// The label as a signed wire word.
    #[inline]
    pub(crate) fn to_wire(self) -> i64 {
        self.get() as i64
    }

    /// Decodes a wire word back into a label. Zero and the negative framing
    /// sentinels are rejected.
    #[inline]
    pub(crate) fn from_wire(w: i64) -> Result<Self, RecolorError> {
        if w <= 0 {
            return Err(RecolorError::InvalidLabel);
        }
        Label::new(w as u64)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Label").field(&self.get()).finish()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}
