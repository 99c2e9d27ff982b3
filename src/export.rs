//! Handing finished plates to a mesh file writer.
//!
//! File formats live outside this crate. A writer only has to turn one
//! world-space [`Mesh`] into bytes at a path.

use crate::errors::PlateError;
use crate::merge::MergeMode;
use crate::mesh::Mesh;
use crate::plate::Plate;
use crate::progress::{ProgressFn, sub_range};
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// External mesh file writer.
pub trait MeshWriter {
    fn write_mesh(&mut self, mesh: &Mesh, path: &Path) -> io::Result<()>;
}

impl<F> MeshWriter for F
where
    F: FnMut(&Mesh, &Path) -> io::Result<()>,
{
    fn write_mesh(&mut self, mesh: &Mesh, path: &Path) -> io::Result<()> {
        self(mesh, path)
    }
}

/// Bake every placement, merge the plate and write the result to `path`.
///
/// The first 90% of the progress range covers merging. Write failures come
/// back as [`PlateError::Io`] with the original error kind intact.
pub fn save_merged(
    plate: &Plate,
    writer: &mut dyn MeshWriter,
    path: &Path,
    mode: MergeMode,
    progress: &mut ProgressFn<'_>,
) -> Result<Mesh, PlateError> {
    let merged = plate.merged(mode, &mut sub_range(progress, 0.0, 0.9));

    if let Err(err) = writer.write_mesh(&merged, path) {
        warn!(path = %path.display(), kind = ?err.kind(), "saving merged plate failed");
        return Err(err.into());
    }
    progress(1.0, "Saved");

    info!(
        path = %path.display(),
        faces = merged.face_count(),
        ?mode,
        "merged plate saved"
    );
    Ok(merged)
}
