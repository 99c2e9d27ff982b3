//! Mesh decomposition and automatic **build-plate layout** for 3D printing.
//!
//! - [split](split): break a loaded mesh into its disjoint connected solids
//! - [plate](plate) and [placement](placement): put solids on a finite bed without
//!   their footprints colliding, drop them onto the bed, center and auto-arrange them
//! - [merge](merge): combine a plate into one mesh, by boolean union or by plain
//!   face concatenation
//! - [pick](pick): ray hit-testing of the solids on a plate
//! - [worker](worker): run plate edits on a background thread and swap the result in
//!
//! Meshes come in and go out as in-memory [`Mesh`] values; file formats are
//! left to the caller through [`export::MeshWriter`].
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//! - **parallel**: use rayon for world-bounds computation across solids

#![forbid(unsafe_code)]
#![warn(unused)]
#![warn(clippy::approx_constant, clippy::all)]

pub mod config;
pub mod csg;
pub mod errors;
pub mod export;
pub mod float_types;
pub mod merge;
pub mod mesh;
pub mod pick;
pub mod placement;
pub mod plate;
pub mod progress;
pub mod split;
pub mod worker;

#[cfg(any(
    all(feature = "f64", feature = "f32"),
    not(any(feature = "f64", feature = "f32"))
))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use config::{FaceTriangulation, PlatingConfig};
pub use errors::PlateError;
pub use merge::MergeMode;
pub use mesh::Mesh;
pub use pick::{PlateHit, PlatePickTree, SolidPickIndex};
pub use plate::{AddOutcome, PlacedSolid, Plate, PlatingMetadata, SolidId};
pub use split::{split_connected, split_connected_with};
pub use worker::{Commit, JobContext, JobStatus, PlateJob, PlateSession, ProgressUpdate};
