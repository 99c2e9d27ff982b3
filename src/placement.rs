//! Moving solids around the bed: open-position spiral search, bed drop, XY
//! centering and auto-arrange.
//!
//! All positions are world-space. A placement offset is always applied after
//! the solid's existing transform (`transform = T(offset) * transform`), so
//! world bounds move by exactly the offset.

use crate::config::PlatingConfig;
use crate::errors::PlateError;
use crate::float_types::{
    Real, TAU,
    parry3d::bounding_volume::{Aabb, BoundingVolume},
};
use crate::plate::PlacedSolid;
use crate::progress::ProgressFn;
use nalgebra::{Matrix4, Point3, Vector3};
use tracing::{debug, info_span, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// `aabb` grown by `margin` on every side in X and Y only.
pub fn inflate_xy(aabb: &Aabb, margin: Real) -> Aabb {
    let grow = Vector3::new(margin, margin, 0.0);
    Aabb::new(aabb.mins - grow, aabb.maxs + grow)
}

/// Whether two boxes' X and Y extents intersect with positive size in both
/// axes. Boxes that merely touch do not overlap.
pub fn overlaps_xy(a: &Aabb, b: &Aabb) -> bool {
    let x = a.maxs.x.min(b.maxs.x) - a.mins.x.max(b.mins.x);
    let y = a.maxs.y.min(b.maxs.y) - a.mins.y.max(b.mins.y);
    x > 0.0 && y > 0.0
}

fn is_finite(aabb: &Aabb) -> bool {
    aabb.mins.coords.iter().chain(aabb.maxs.coords.iter()).all(|c| c.is_finite())
}

fn translated(aabb: &Aabb, offset: &Vector3<Real>) -> Aabb {
    Aabb::new(aabb.mins + *offset, aabb.maxs + *offset)
}

/// World bounds of every solid, in plate order.
pub fn world_bounds(solids: &[PlacedSolid]) -> Vec<Aabb> {
    #[cfg(feature = "parallel")]
    let bounds = solids.par_iter().map(PlacedSolid::world_bounds).collect();

    #[cfg(not(feature = "parallel"))]
    let bounds = solids.iter().map(PlacedSolid::world_bounds).collect();

    bounds
}

/// Union of several boxes; `None` for an empty list.
pub fn union_bounds<'a, I>(boxes: I) -> Option<Aabb>
where
    I: IntoIterator<Item = &'a Aabb>,
{
    boxes
        .into_iter()
        .fold(None, |acc: Option<Aabb>, b| Some(acc.map_or(*b, |a| a.merged(b))))
}

/// Spiral-search the XY offset that moves `candidate` clear of every obstacle.
///
/// Both the candidate and the obstacles are inflated by the clearance. Probes
/// start at the current position, then walk `angle_steps` angles around
/// rings whose radius grows by the candidate's smaller inflated footprint
/// side. The search always terminates for finite input.
pub fn find_open_offset(
    candidate: &Aabb,
    obstacles: &[Aabb],
    config: &PlatingConfig,
) -> Result<Vector3<Real>, PlateError> {
    let probe = inflate_xy(candidate, config.clearance);
    let obstacles: Vec<Aabb> = obstacles
        .iter()
        .map(|o| inflate_xy(o, config.clearance))
        .collect();
    spiral_search(&probe, &obstacles, config)
}

/// Spiral search over footprints that already carry their spacing.
fn spiral_search(
    probe: &Aabb,
    obstacles: &[Aabb],
    config: &PlatingConfig,
) -> Result<Vector3<Real>, PlateError> {
    if !is_finite(probe) || !obstacles.iter().all(is_finite) {
        return Err(PlateError::NonFiniteBounds);
    }

    let extents = probe.extents();
    let ring = config.ring_distance(extents.x, extents.y);
    let steps = config.angle_steps.max(1);
    let angle_increment = TAU / steps as Real;

    let collides = |offset: &Vector3<Real>| {
        let moved = translated(probe, offset);
        obstacles.iter().any(|o| overlaps_xy(&moved, o))
    };

    let mut offset = Vector3::zeros();
    let mut radius: Real = 0.0;
    let mut step = 0u32;
    let mut probes = 1usize;
    while collides(&offset) {
        // every angle lands on the same spot at radius zero
        if radius == 0.0 {
            radius = ring;
            step = 0;
        } else {
            step += 1;
            if step >= steps {
                step = 0;
                radius += ring;
            }
        }
        let angle = angle_increment * step as Real;
        offset = Vector3::new(radius * angle.cos(), radius * angle.sin(), 0.0);
        probes += 1;
    }

    trace!(probes, radius, "open position found");
    Ok(offset)
}

/// World footprint of `solid` grown by its own spacing. Negative spacing counts as zero.
fn spaced_footprint(solid: &PlacedSolid) -> Aabb {
    inflate_xy(&solid.world_bounds(), solid.metadata.spacing.max(0.0))
}

/// Move `solids[index]` to the nearest open position on the spiral, testing
/// against every other solid on the plate. Each footprint is grown by its
/// solid's own spacing.
pub fn move_to_open_position(
    solids: &mut [PlacedSolid],
    index: usize,
    config: &PlatingConfig,
) -> Result<(), PlateError> {
    let candidate = spaced_footprint(&solids[index]);
    let obstacles: Vec<Aabb> = solids
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, s)| spaced_footprint(s))
        .collect();

    let offset = spiral_search(&candidate, &obstacles, config)?;
    solids[index].translate(&offset);
    Ok(())
}

/// Lower the solid so its world-space minimum Z equals `bed_height`, and
/// optionally move its XY center to the origin.
pub fn place_on_bed(solid: &mut PlacedSolid, bed_height: Real, also_center_xy: bool) {
    let bounds = solid.world_bounds();
    let mut offset = Vector3::new(0.0, 0.0, bed_height - bounds.mins.z);
    if also_center_xy {
        let center = bounds.center();
        offset.x = -center.x;
        offset.y = -center.y;
    }
    solid.translate(&offset);
}

/// Move the solid vertically so its world-space minimum Z equals `z`.
pub fn place_at_height(solid: &mut PlacedSolid, z: Real) {
    place_on_bed(solid, z, false);
}

/// Translate every solid so the union of their bounds is centered on the
/// origin in XY. Z is left alone.
pub fn center_xy(solids: &mut [PlacedSolid]) {
    let bounds = world_bounds(solids);
    let Some(total) = union_bounds(&bounds) else {
        return;
    };
    let center = total.center();
    let offset = Vector3::new(-center.x, -center.y, 0.0);
    for solid in solids.iter_mut() {
        solid.translate(&offset);
    }
}

/// `m` applied about `position`: `T(position) * m * T(-position) * transform`.
pub fn apply_at_position(
    transform: &Matrix4<Real>,
    m: &Matrix4<Real>,
    position: &Point3<Real>,
) -> Matrix4<Real> {
    Matrix4::new_translation(&position.coords)
        * m
        * Matrix4::new_translation(&-position.coords)
        * transform
}

/// `m` applied about the center of `bounds` (usually the solid's world bounds).
pub fn apply_at_center(
    transform: &Matrix4<Real>,
    bounds: &Aabb,
    m: &Matrix4<Real>,
) -> Matrix4<Real> {
    apply_at_position(transform, m, &bounds.center())
}

/// Lay all solids out from scratch.
///
/// Solids are handled largest XY footprint first. Each one has its lower-left
/// corner moved to the origin, is pushed clear of the solids arranged before
/// it and dropped on the bed. The finished group is centered on
/// `config.bed_center`. `checkpoint` runs before every solid and aborts the
/// arrangement when it fails.
pub fn arrange(
    solids: &mut [PlacedSolid],
    config: &PlatingConfig,
    progress: &mut ProgressFn<'_>,
    checkpoint: &mut dyn FnMut() -> Result<(), PlateError>,
) -> Result<(), PlateError> {
    let _span = info_span!("arrange", solids = solids.len()).entered();
    if solids.is_empty() {
        return Ok(());
    }

    let bounds = world_bounds(solids);
    let footprint = |b: &Aabb| {
        let e = b.extents();
        e.x.max(e.y)
    };
    let mut order: Vec<usize> = (0..solids.len()).collect();
    order.sort_by(|&a, &b| footprint(&bounds[b]).total_cmp(&footprint(&bounds[a])));

    let mut arranged: Vec<Aabb> = Vec::with_capacity(solids.len());
    for (done, &index) in order.iter().enumerate() {
        checkpoint()?;

        let solid = &mut solids[index];
        let start = solid.world_bounds();
        solid.translate(&Vector3::new(-start.mins.x, -start.mins.y, 0.0));

        let offset = spiral_search(&spaced_footprint(solid), &arranged, config)?;
        solid.translate(&offset);
        place_on_bed(solid, config.bed_height, false);
        arranged.push(spaced_footprint(solid));

        progress((done + 1) as Real / solids.len() as Real, "Arranging Parts");
    }

    center_xy(solids);
    let bed_offset = Vector3::new(config.bed_center.x, config.bed_center.y, 0.0);
    for solid in solids.iter_mut() {
        solid.translate(&bed_offset);
    }
    debug!(center = ?config.bed_center, "arranged");
    Ok(())
}
