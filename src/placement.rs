//! Conflict handling and instantiation of single placements.

use glam::{Quat, Vec2, Vec3};
use rand::Rng;

use crate::error::{HostError, PaintError};
use crate::geometry::{Bounds, Transform, PENETRATION_EPSILON};
use crate::host::{ObjectId, PaintHost, SceneObjects};
use crate::marker::{MarkerRecord, PaintMarker};
use crate::palette::{PaletteId, TemplateId};
use crate::plane::{PaintPlane, WORLD_UP};
use crate::query::surface_below;
use crate::relax::{resolve_overlap, RelaxReport};
use crate::settings::{ConflictPolicy, PainterSettings};

/// Fraction of the footprint within which Stack refuses to place.
pub const CONFLICT_TOLERANCE: f32 = 0.5;
/// Fraction of the footprint within which Replace removes an existing marker.
pub const REPLACE_TOLERANCE: f32 = 0.3;

pub const PLACE_UNDO_LABEL: &str = "Paint Place";
pub const REPLACE_UNDO_LABEL: &str = "Paint Replace";

/// Everything a placement needs to know about the current selection.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    pub palette: &'a PaletteId,
    pub template: &'a TemplateId,
    pub palette_index: usize,
    pub footprint: Vec3,
    pub plane: &'a PaintPlane,
    pub settings: &'a PainterSettings,
}

impl PlacementContext<'_> {
    fn tolerance(&self, factor: f32) -> Vec2 {
        Vec2::new(
            self.footprint.x.abs().max(0.01),
            self.footprint.z.abs().max(0.01),
        ) * factor
    }

    /// Lateral offset of a same-palette marker from `point`, if it lies
    /// inside the tolerance window.
    fn offset_within(&self, record: &MarkerRecord, point: Vec3, factor: f32) -> Option<Vec2> {
        if !record.belongs_to(self.palette) {
            return None;
        }
        let offset = self.plane.lateral(record.reference_center() - point);
        let window = self.tolerance(factor);
        (offset.x.abs() <= window.x && offset.y.abs() <= window.y).then_some(offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed(ObjectId),
    /// Stack policy found the cell occupied.
    Blocked,
}

/// Whether Stack policy would refuse to place at `point`. Never true under
/// Replace, which clears the cell instead.
pub fn has_conflict<H: SceneObjects + ?Sized>(
    host: &H,
    ctx: &PlacementContext<'_>,
    point: Vec3,
) -> bool {
    if ctx.settings.conflict_policy == ConflictPolicy::Replace {
        return false;
    }
    host.markers()
        .iter()
        .any(|record| ctx.offset_within(record, point, CONFLICT_TOLERANCE).is_some())
}

/// Destroys the same-palette marker closest to `point` within the replace
/// window and returns its id.
pub fn replace_existing_at<H: PaintHost + ?Sized>(
    host: &mut H,
    ctx: &PlacementContext<'_>,
    point: Vec3,
) -> Option<ObjectId> {
    let markers = host.markers();
    let victim = markers
        .iter()
        .filter_map(|record| {
            ctx.offset_within(record, point, REPLACE_TOLERANCE)
                .map(|offset| (record, offset.length_squared()))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(record, _)| record)?;

    log::debug!(
        "replacing {} at {} (intended {}) with a new instance at {point}",
        victim.id,
        victim.position,
        victim.marker.world_center
    );
    host.destroy_undoable(victim.id, REPLACE_UNDO_LABEL)
        .then_some(victim.id)
}

/// Places one instance at `point`, honouring the conflict policy.
pub fn place_at<H, R>(
    host: &mut H,
    ctx: &PlacementContext<'_>,
    rng: &mut R,
    point: Vec3,
    normal: Vec3,
) -> Result<PlaceOutcome, PaintError>
where
    H: PaintHost + ?Sized,
    R: Rng,
{
    match ctx.settings.conflict_policy {
        ConflictPolicy::Stack => {
            if has_conflict(host, ctx, point) {
                log::debug!("cell at {point} is occupied, not stacking");
                return Ok(PlaceOutcome::Blocked);
            }
        }
        ConflictPolicy::Replace => {
            replace_existing_at(host, ctx, point);
        }
    }
    place_unchecked(host, ctx, rng, point, normal, true).map(|(id, _)| PlaceOutcome::Placed(id))
}

/// Instantiates without a conflict check, then adds colliders and optionally
/// relaxes overlap.
pub fn place_unchecked<H, R>(
    host: &mut H,
    ctx: &PlacementContext<'_>,
    rng: &mut R,
    point: Vec3,
    normal: Vec3,
    relax: bool,
) -> Result<(ObjectId, Option<RelaxReport>), PaintError>
where
    H: PaintHost + ?Sized,
    R: Rng,
{
    let id = instantiate_at(host, ctx, rng, point, normal)?;
    let settings = ctx.settings;
    if settings.auto_colliders {
        host.ensure_colliders(id, settings.convex_colliders);
    }
    let report = (relax && settings.avoid_overlap).then(|| {
        resolve_overlap(
            host,
            id,
            ctx.footprint,
            ctx.plane,
            settings.max_push_iterations,
            settings.max_push_distance,
        )
    });
    Ok((id, report))
}

/// Rotation of a new instance: the authored rotation with its up axis turned
/// onto `normal`, then an optional yaw in degrees about the alignment axis.
pub fn placement_rotation(
    authored: Quat,
    normal: Vec3,
    align_to_normal: bool,
    yaw_degrees: Option<f32>,
) -> Quat {
    let mut rotation = authored;
    if align_to_normal {
        let up = (authored * WORLD_UP).normalize_or_zero();
        if up != Vec3::ZERO {
            rotation = Quat::from_rotation_arc(up, normal) * authored;
        }
    }
    if let Some(yaw) = yaw_degrees {
        let axis = if align_to_normal {
            normal
        } else {
            rotation * WORLD_UP
        };
        rotation = Quat::from_axis_angle(axis.normalize_or_zero(), yaw.to_radians()) * rotation;
    }
    rotation.normalize()
}

fn instantiation_error(template: &TemplateId) -> impl FnOnce(HostError) -> PaintError + '_ {
    move |source| PaintError::Instantiation {
        template: template.clone(),
        source,
    }
}

/// Creates the selected template so its bottom rests on the surface at
/// `point`, and tags it with a marker.
pub fn instantiate_at<H, R>(
    host: &mut H,
    ctx: &PlacementContext<'_>,
    rng: &mut R,
    point: Vec3,
    normal: Vec3,
) -> Result<ObjectId, PaintError>
where
    H: PaintHost + ?Sized,
    R: Rng,
{
    let template = ctx.template;
    let settings = ctx.settings;
    let normal = normal.try_normalize().unwrap_or(WORLD_UP);

    let id = host
        .instantiate(template)
        .map_err(instantiation_error(template))?;
    host.register_created(id, PLACE_UNDO_LABEL);

    let authored = host.transform(id).unwrap_or_default().rotation;
    let yaw = settings
        .randomize_yaw
        .then(|| rng.gen_range(0.0..=settings.random_yaw_max_degrees.max(0.0)));
    let rotation = placement_rotation(authored, normal, settings.align_to_normal, yaw);

    let local_bottom = host
        .template_local_bounds(template)
        .unwrap_or(Bounds::UNIT)
        .bottom();
    let mut transform = Transform::new(point - rotation * local_bottom, rotation);

    let surface = surface_below(host, point, normal, settings.placement_mask, id)
        .map(|hit| hit.point)
        .unwrap_or(point);
    let along = (transform.transform_point(local_bottom) - surface).dot(normal);
    if along.abs() > PENETRATION_EPSILON {
        transform.position -= normal * along;
    }
    host.set_transform(id, transform)
        .map_err(instantiation_error(template))?;

    host.attach_marker(
        id,
        PaintMarker {
            size: ctx.footprint,
            template: template.clone(),
            palette_index: ctx.palette_index,
            world_center: point,
            palette: ctx.palette.clone(),
        },
    )
    .map_err(instantiation_error(template))?;

    log::debug!("placed {template} as {id} at {}", transform.position);
    Ok(id)
}
