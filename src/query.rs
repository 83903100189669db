use glam::Vec3;

use crate::geometry::Ray;
use crate::host::{LayerMask, ObjectId, RayHit, SceneObjects, SceneQuery};
use crate::plane::WORLD_UP;

/// Reach of the cursor ray into the scene.
pub const SCENE_RAY_DISTANCE: f32 = 10_000.0;
/// Height above the target the corrective ray starts from.
pub const CORRECTIVE_RAY_HEIGHT: f32 = 5.0;
pub const CORRECTIVE_RAY_DISTANCE: f32 = 5_000.0;

/// Surface point under the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub normal: Vec3,
    /// `None` when the hit came from the ground plane fallback.
    pub object: Option<ObjectId>,
}

impl From<RayHit> for SurfaceHit {
    fn from(hit: RayHit) -> Self {
        Self {
            point: hit.point,
            normal: hit.normal,
            object: Some(hit.object),
        }
    }
}

fn sorted_hits<H: SceneQuery + ?Sized>(
    host: &H,
    ray: &Ray,
    max_distance: f32,
    mask: LayerMask,
) -> Vec<RayHit> {
    let mut hits = host.raycast_all(ray, max_distance, mask);
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Resolves the cursor ray to a paintable surface.
///
/// Unmarked geometry wins over painted instances so the brush paints onto the
/// level rather than onto its own output. With nothing hit, the ray falls back
/// to the ground plane through the origin.
pub fn raycast_scene<H>(host: &H, ray: &Ray, mask: LayerMask) -> Option<SurfaceHit>
where
    H: SceneQuery + SceneObjects + ?Sized,
{
    if ray.is_degenerate() {
        return None;
    }
    let hits = sorted_hits(host, ray, SCENE_RAY_DISTANCE, mask);
    let preferred = hits
        .iter()
        .find(|hit| host.marker(hit.object).is_none())
        .or_else(|| hits.first());
    match preferred {
        Some(hit) => Some(SurfaceHit::from(*hit)),
        None => ground_plane_hit(ray),
    }
}

pub fn ground_plane_hit(ray: &Ray) -> Option<SurfaceHit> {
    let denominator = ray.direction.dot(WORLD_UP);
    if denominator.abs() < 1e-6 {
        return None;
    }
    let distance = -ray.origin.dot(WORLD_UP) / denominator;
    if distance < 0.0 {
        return None;
    }
    Some(SurfaceHit {
        point: ray.at(distance),
        normal: WORLD_UP,
        object: None,
    })
}

/// Casts back down onto the surface a new instance should rest on.
///
/// The ray starts [`CORRECTIVE_RAY_HEIGHT`] above `point` along `normal` and
/// ignores only `skip`, so painted instances below count as surfaces.
pub fn surface_below<H: SceneQuery + ?Sized>(
    host: &H,
    point: Vec3,
    normal: Vec3,
    mask: LayerMask,
    skip: ObjectId,
) -> Option<SurfaceHit> {
    let ray = Ray::new(point + normal * CORRECTIVE_RAY_HEIGHT, -normal);
    if ray.is_degenerate() {
        return None;
    }
    sorted_hits(host, &ray, CORRECTIVE_RAY_DISTANCE, mask)
        .into_iter()
        .find(|hit| hit.object != skip)
        .map(SurfaceHit::from)
}

/// Narrow-phase push that moves `a` out of `b` within the painting plane.
///
/// Each penetrating collider pair contributes its separation direction,
/// flattened onto the plane, scaled by depth plus ten percent. The result is
/// the average of the usable contributions.
pub fn collider_push<H: SceneQuery + ?Sized>(
    host: &H,
    a: ObjectId,
    b: ObjectId,
    plane_normal: Vec3,
) -> Option<Vec3> {
    let mut total = Vec3::ZERO;
    let mut count = 0usize;
    for penetration in host.penetrations(a, b) {
        let flattened = penetration.direction
            - plane_normal * penetration.direction.dot(plane_normal);
        let direction = flattened.normalize_or_zero();
        if direction.length_squared() > 0.001 {
            total += direction * penetration.depth * 1.1;
            count += 1;
        }
    }
    (count > 0).then(|| total / count as f32)
}
