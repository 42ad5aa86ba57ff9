//! Unified error type.

use crate::cell::CellId;

/// The error type returned by nagare's fallible operations.
///
/// Application-level outcomes (a 404, a validation message shown to a user)
/// are expressed as [`Response`](crate::Response) values, not as `Error`s.
/// This type surfaces pipeline-authoring bugs and carries opaque collaborator
/// failures through [`run`](crate::Pipeline::run) unmodified.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A hook (`use_manager`, `use_cell`, `use_cell_value`) was evaluated
    /// outside the dynamic extent of any `run`.
    #[error("hook called outside of a running pipeline")]
    OutsideRun,

    /// Every middleware called `next()` and the pipeline has no default
    /// output configured.
    #[error("all middleware called next() and no default output is configured")]
    Exhausted,

    /// The value stored under a cell's id does not have the cell's type.
    #[error("cell {id:?} holds a value of a different type")]
    CellTypeMismatch {
        /// Identity of the offending cell.
        id: CellId,
    },

    /// An opaque collaborator error. The core neither catches nor interprets
    /// these; they propagate to the caller of `run` as-is.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wraps a collaborator error so it can travel through the chain.
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Other(err.into())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
