//! RecolorError: unified error type for grid-recolor public APIs.
//!
//! Every public entry point returns `Result<_, RecolorError>`; the library
//! itself never panics. Protocol violations are reported rather than
//! asserted, but they indicate broken reduction bookkeeping and are not
//! recoverable; callers are expected to abort the run.

use thiserror::Error;

/// Unified error type for grid-recolor operations.
#[derive(Debug, Error)]
pub enum RecolorError {
    /// Attempted to construct a `Label` with value zero (reserved sentinel).
    #[error("Label must be non-zero (0 is reserved as the inactive sentinel)")]
    InvalidLabel,
    /// Block cell counts must be equal along all three axes for the
    /// distributed path; callers dispatch their iterative fallback on this.
    #[error("block shape {size:?} is not cubic")]
    NonCubicBlock {
        /// Interior cell counts per axis.
        size: [usize; 3],
    },
    /// A block has zero cells along some axis.
    #[error("block shape {size:?} has an empty axis")]
    EmptyBlock { size: [usize; 3] },
    /// At least one layer is required.
    #[error("at least one layer is required")]
    EmptyLayers,
    /// The block-to-rank table does not cover the block grid.
    #[error("rank table covers {actual} blocks, topology has {expected}")]
    BlockCountMismatch { expected: usize, actual: usize },
    /// A block id was queried that this domain does not own.
    #[error("block {block} is not owned by this domain")]
    UnknownBlock { block: usize },
    /// A layer index beyond the configured layer count.
    #[error("layer {layer} out of range ({layers} layers)")]
    UnknownLayer { layer: usize, layers: usize },
    /// A cell coordinate outside the block's interior-plus-halo index space.
    #[error("cell {at:?} outside block index space")]
    CellOutOfRange { at: [isize; 3] },
    /// Communication with a peer rank failed or returned malformed data.
    #[error("communication error with rank {neighbor}: {source}")]
    Comm {
        neighbor: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A reduction message ended mid-record.
    #[error("truncated reduction message at word {at}")]
    TruncatedMessage { at: usize },
    /// Reduction-tree bookkeeping is inconsistent (e.g. a non-empty CAG
    /// after the final round). Not recoverable.
    #[error("reduction protocol violated at block {block}: {detail}")]
    Protocol { block: usize, detail: String },
}

impl RecolorError {
    /// Shorthand for a communication failure with a formatted report.
    pub(crate) fn comm(neighbor: usize, msg: impl Into<String>) -> Self {
        RecolorError::Comm {
            neighbor,
            source: msg.into().into(),
        }
    }
}
