//! The build plate: every solid with its placement and plating metadata.
//!
//! Solids are kept in one `Vec<PlacedSolid>` keyed by a stable [`SolidId`];
//! mesh, transform and metadata of a solid always travel together. Meshes are
//! `Arc`-shared so cloning a plate for a background job copies no geometry.

use crate::config::PlatingConfig;
use crate::errors::PlateError;
use crate::float_types::{Real, parry3d::bounding_volume::Aabb, parry3d::query::Ray};
use crate::merge::{MergeMode, merge};
use crate::mesh::Mesh;
use crate::pick::{PlateHit, PlatePickTree, SolidPickIndex};
use crate::placement;
use crate::progress::{ProgressFn, sub_range};
use crate::split::split_connected_with;
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Stable handle of a solid on a [`Plate`]. Never reused within one plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SolidId(pub u64);

impl fmt::Display for SolidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-solid plating record.
#[derive(Clone)]
pub struct PlatingMetadata {
    /// Scale last applied through [`Plate::scale_solid`]
    pub scale: Vector3<Real>,
    /// Gap kept around this solid's footprint by the open-position search and
    /// arrange. Copied from the plate's clearance when the solid is added.
    pub spacing: Real,
    /// Ray-pick index in the solid's local space, once built
    pub pick_index: Option<Arc<SolidPickIndex>>,
}

impl PlatingMetadata {
    pub fn new(spacing: Real) -> Self {
        PlatingMetadata {
            scale: Vector3::repeat(1.0),
            spacing,
            pick_index: None,
        }
    }
}

impl fmt::Debug for PlatingMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatingMetadata")
            .field("scale", &self.scale)
            .field("spacing", &self.spacing)
            .field("pick_index", &self.pick_index.as_ref().map(|i| i.triangle_count()))
            .finish()
    }
}

/// A solid on the plate: local-space mesh, placement and metadata.
#[derive(Debug, Clone)]
pub struct PlacedSolid {
    pub id: SolidId,
    pub mesh: Arc<Mesh>,
    /// Column-vector placement, `world = transform * local`
    pub transform: Matrix4<Real>,
    pub metadata: PlatingMetadata,
}

impl PlacedSolid {
    /// World-space bounds, every vertex transformed.
    pub fn world_bounds(&self) -> Aabb {
        self.mesh.transformed_bounding_box(&self.transform)
    }

    /// Copy of the mesh with the placement baked in.
    pub fn world_mesh(&self) -> Mesh {
        self.mesh.transform(&self.transform)
    }

    /// Apply `translation` after the current placement.
    pub fn translate(&mut self, translation: &Vector3<Real>) {
        self.transform = Matrix4::new_translation(translation) * self.transform;
    }
}

/// Result of [`Plate::add_solid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Placed(SolidId),
    /// The mesh had fewer than three vertices; the plate is unchanged.
    Skipped { vertex_count: usize },
}

impl AddOutcome {
    pub fn id(&self) -> Option<SolidId> {
        match self {
            AddOutcome::Placed(id) => Some(*id),
            AddOutcome::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Plate {
    solids: Vec<PlacedSolid>,
    next_id: u64,
    config: PlatingConfig,
}

impl Plate {
    /// An empty plate. `config` is taken as is; run [`PlatingConfig::validate`]
    /// first when it comes from outside.
    pub fn new(config: PlatingConfig) -> Self {
        Plate {
            solids: Vec::new(),
            next_id: 0,
            config,
        }
    }

    pub fn config(&self) -> &PlatingConfig {
        &self.config
    }

    /// Replace the configuration after [validating](PlatingConfig::validate) it.
    /// Solids already on the plate keep the spacing they were placed with.
    pub fn set_config(&mut self, config: PlatingConfig) -> Result<(), PlateError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.solids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solids.is_empty()
    }

    /// All solids in plate order.
    pub fn solids(&self) -> &[PlacedSolid] {
        &self.solids
    }

    pub fn get(&self, id: SolidId) -> Option<&PlacedSolid> {
        self.solids.iter().find(|s| s.id == id)
    }

    pub fn ids(&self) -> Vec<SolidId> {
        self.solids.iter().map(|s| s.id).collect()
    }

    fn index_of(&self, id: SolidId) -> Result<usize, PlateError> {
        self.solids
            .iter()
            .position(|s| s.id == id)
            .ok_or(PlateError::UnknownSolid(id))
    }

    fn allocate_id(&mut self) -> SolidId {
        let id = SolidId(self.next_id);
        self.next_id += 1;
        id
    }

    fn new_solid(&mut self, mesh: Arc<Mesh>, transform: Matrix4<Real>) -> PlacedSolid {
        PlacedSolid {
            id: self.allocate_id(),
            mesh,
            transform,
            metadata: PlatingMetadata::new(self.config.clearance),
        }
    }

    /// Add a solid, find it an open spot next to the solids already on the
    /// plate and drop it onto the bed. Meshes with fewer than three vertices
    /// are skipped and leave the plate untouched.
    pub fn add_solid(
        &mut self,
        mesh: impl Into<Arc<Mesh>>,
        initial_transform: Matrix4<Real>,
    ) -> Result<AddOutcome, PlateError> {
        let mesh = mesh.into();
        if mesh.vertex_count() < 3 {
            debug!(vertices = mesh.vertex_count(), "skipping degenerate solid");
            return Ok(AddOutcome::Skipped {
                vertex_count: mesh.vertex_count(),
            });
        }

        let solid = self.new_solid(mesh, initial_transform);
        let id = solid.id;
        self.solids.push(solid);
        let index = self.solids.len() - 1;

        if let Err(err) = placement::move_to_open_position(&mut self.solids, index, &self.config) {
            self.solids.pop();
            return Err(err);
        }
        placement::place_on_bed(&mut self.solids[index], self.config.bed_height, false);

        debug!(%id, "solid placed");
        Ok(AddOutcome::Placed(id))
    }

    /// Take a solid off the plate.
    pub fn remove(&mut self, id: SolidId) -> Result<PlacedSolid, PlateError> {
        let index = self.index_of(id)?;
        Ok(self.solids.remove(index))
    }

    /// Add a copy of a solid in the next open position. The copy shares the
    /// mesh and pick index of the original.
    pub fn duplicate(&mut self, id: SolidId) -> Result<SolidId, PlateError> {
        let source = self.solids[self.index_of(id)?].clone();
        let copy = PlacedSolid {
            id: self.allocate_id(),
            ..source
        };
        let copy_id = copy.id;
        self.solids.push(copy);
        let index = self.solids.len() - 1;

        if let Err(err) = placement::move_to_open_position(&mut self.solids, index, &self.config) {
            self.solids.pop();
            return Err(err);
        }
        placement::place_on_bed(&mut self.solids[index], self.config.bed_height, false);
        Ok(copy_id)
    }

    /// Replace a solid by its connected components, each keeping the
    /// original placement. A single-component solid is left as it is.
    pub fn split_solid(
        &mut self,
        id: SolidId,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Vec<SolidId>, PlateError> {
        let index = self.index_of(id)?;
        let components =
            split_connected_with(&self.solids[index].mesh, self.config.weld_tolerance, progress);
        if components.len() <= 1 {
            return Ok(vec![id]);
        }

        let original = self.solids.remove(index);
        let parts: Vec<PlacedSolid> = components
            .into_iter()
            .map(|component| {
                let mut part = self.new_solid(Arc::new(component), original.transform);
                part.metadata.scale = original.metadata.scale;
                part.metadata.spacing = original.metadata.spacing;
                part
            })
            .collect();
        let ids = parts.iter().map(|p| p.id).collect::<Vec<_>>();
        self.solids.splice(index..index, parts);

        info!(%id, parts = ids.len(), "solid split");
        Ok(ids)
    }

    /// Drop a solid onto the bed, optionally centering it on the origin in XY.
    pub fn place_on_bed(&mut self, id: SolidId, also_center_xy: bool) -> Result<(), PlateError> {
        let index = self.index_of(id)?;
        placement::place_on_bed(&mut self.solids[index], self.config.bed_height, also_center_xy);
        Ok(())
    }

    /// Move a solid vertically so its lowest point sits at `z`.
    pub fn place_at_height(&mut self, id: SolidId, z: Real) -> Result<(), PlateError> {
        let index = self.index_of(id)?;
        placement::place_at_height(&mut self.solids[index], z);
        Ok(())
    }

    /// Re-run the open-position search for one solid against all the others.
    pub fn move_to_open_position(&mut self, id: SolidId) -> Result<(), PlateError> {
        let index = self.index_of(id)?;
        placement::move_to_open_position(&mut self.solids, index, &self.config)
    }

    /// Center the whole group on the origin in XY.
    pub fn center_xy(&mut self) {
        placement::center_xy(&mut self.solids);
    }

    /// Lay every solid out afresh, largest first, then center the group on
    /// the configured bed center.
    pub fn arrange(&mut self, progress: &mut ProgressFn<'_>) -> Result<(), PlateError> {
        placement::arrange(&mut self.solids, &self.config, progress, &mut || Ok(()))
    }

    /// [`Plate::arrange`] with a cancellation checkpoint between solids.
    pub fn arrange_with(
        &mut self,
        progress: &mut ProgressFn<'_>,
        checkpoint: &mut dyn FnMut() -> Result<(), PlateError>,
    ) -> Result<(), PlateError> {
        placement::arrange(&mut self.solids, &self.config, progress, checkpoint)
    }

    pub fn set_transform(&mut self, id: SolidId, transform: Matrix4<Real>) -> Result<(), PlateError> {
        let index = self.index_of(id)?;
        self.solids[index].transform = transform;
        Ok(())
    }

    /// Apply `m` (a rotation, scale, ...) about the center of the solid's world bounds.
    pub fn apply_at_center(&mut self, id: SolidId, m: &Matrix4<Real>) -> Result<(), PlateError> {
        let index = self.index_of(id)?;
        let solid = &mut self.solids[index];
        solid.transform = placement::apply_at_center(&solid.transform, &solid.world_bounds(), m);
        Ok(())
    }

    /// Scale a solid about its bounds center to an absolute `scale` and record
    /// it; the solid is dropped back onto the bed afterwards.
    pub fn scale_solid(&mut self, id: SolidId, scale: Vector3<Real>) -> Result<(), PlateError> {
        let index = self.index_of(id)?;
        let solid = &mut self.solids[index];
        let relative = scale.component_div(&solid.metadata.scale);
        if !relative.iter().all(|c| c.is_finite() && *c != 0.0) {
            return Err(PlateError::NonInvertibleTransform);
        }

        let bounds = solid.world_bounds();
        solid.transform = placement::apply_at_center(
            &solid.transform,
            &bounds,
            &Matrix4::new_nonuniform_scaling(&relative),
        );
        solid.metadata.scale = scale;
        placement::place_on_bed(solid, self.config.bed_height, false);
        Ok(())
    }

    /// Build (or rebuild) the pick index of one solid.
    pub fn build_pick_index(
        &mut self,
        id: SolidId,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Arc<SolidPickIndex>, PlateError> {
        let index = self.index_of(id)?;
        let solid = &mut self.solids[index];
        let pick = Arc::new(SolidPickIndex::build(
            &solid.mesh,
            self.config.face_triangulation,
            progress,
        )?);
        solid.metadata.pick_index = Some(pick.clone());
        Ok(pick)
    }

    /// Build pick indices for every solid that has none yet.
    pub fn build_pick_indices(&mut self, progress: &mut ProgressFn<'_>) -> Result<(), PlateError> {
        let pending: Vec<SolidId> = self
            .solids
            .iter()
            .filter(|s| s.metadata.pick_index.is_none())
            .map(|s| s.id)
            .collect();
        let share = 1.0 / pending.len().max(1) as Real;
        for (i, id) in pending.into_iter().enumerate() {
            self.build_pick_index(id, &mut sub_range(progress, i as Real * share, share))?;
        }
        Ok(())
    }

    /// Plate-level hit-test tree over every solid with a pick index.
    pub fn pick_tree(&self) -> Result<PlatePickTree, PlateError> {
        PlatePickTree::build(&self.solids)
    }

    /// Closest solid face hit by a world-space ray.
    pub fn cast_ray(&self, ray: &Ray, max_distance: Real) -> Result<Option<PlateHit>, PlateError> {
        Ok(self.pick_tree()?.cast_ray(ray, max_distance))
    }

    /// Every solid with its placement baked in.
    pub fn world_meshes(&self) -> Vec<Mesh> {
        self.solids.iter().map(PlacedSolid::world_mesh).collect()
    }

    /// All solids merged into one world-space mesh.
    pub fn merged(&self, mode: MergeMode, progress: &mut ProgressFn<'_>) -> Mesh {
        merge(&self.world_meshes(), mode, self.config.weld_tolerance, progress)
    }
}
