//! Plating errors

use crate::float_types::Real;
use crate::plate::SolidId;

/// Everything that can go wrong while splitting, plating, picking or saving.
///
/// Degenerate solids (fewer than three vertices) are not an error: adding one
/// yields [`AddOutcome::Skipped`](crate::plate::AddOutcome::Skipped).
#[derive(Debug, thiserror::Error)]
pub enum PlateError {
    /// Writing a merged plate failed (permissions, disk full, ...)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No solid with this id is on the plate
    #[error("no solid with id {0} on the plate")]
    UnknownSolid(SolidId),

    /// A solid's bounds contain NaN or infinite coordinates, so no open position can be searched for
    #[error("solid bounds are not finite")]
    NonFiniteBounds,

    /// A placement transform has no inverse, so rays cannot be mapped into its local space
    #[error("placement transform is not invertible")]
    NonInvertibleTransform,

    /// Fan triangulation was asked to require convex faces and this one is not
    #[error("face {face} is not a convex planar polygon")]
    NonConvexFace { face: usize },

    /// Indicates an inconsistency while building a triangle mesh
    #[error("triangle mesh: {0}")]
    TriMesh(#[from] crate::float_types::parry3d::shape::TriMeshBuilderError),

    /// Another mutating job is already running on this plate
    #[error("a plate job is already running")]
    Busy,

    /// The job observed a cancellation request at a checkpoint
    #[error("operation cancelled")]
    Cancelled,

    /// The worker thread panicked before reporting a result
    #[error("plate worker panicked")]
    WorkerPanicked,

    /// A [`PlatingConfig`](crate::config::PlatingConfig) value is out of range
    #[error("invalid plating config: {field} = {value}")]
    InvalidConfig { field: &'static str, value: Real },

    /// A [`PlatingConfig`](crate::config::PlatingConfig) could not be parsed
    #[error("invalid plating config: {0}")]
    Config(#[from] serde_json::Error),
}
