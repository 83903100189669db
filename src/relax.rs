//! Bounded overlap relaxation for freshly placed instances.
//!
//! Each iteration sums one push per overlapping neighbour and moves the new
//! instance by the clamped sum. This is a heuristic with a fixed cost, not a
//! collision-free solver: it stops after the iteration budget even when
//! neighbours still overlap.

use glam::{Vec2, Vec3};

use crate::host::{ObjectId, SceneObjects, SceneQuery};
use crate::plane::PaintPlane;
use crate::query::collider_push;
use crate::snap::marker_footprint;

/// Pushes at or below this squared length are discarded.
pub const MIN_PUSH_SQUARED: f32 = 0.001;
/// Iterations whose summed push is at or below this squared length settle.
pub const SETTLED_SQUARED: f32 = 1e-6;
const BOX_OVERSHOOT: f32 = 1.05;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RelaxReport {
    /// Displacement steps applied.
    pub iterations: u32,
    pub displacement: Vec3,
    /// `false` when the iteration budget ran out first.
    pub settled: bool,
}

fn half_footprint(size: Vec3) -> Vec2 {
    Vec2::new(size.x, size.z) * 0.5
}

/// Lateral box test on the painting plane. Touching boxes overlap.
pub fn lateral_boxes_overlap(
    a_position: Vec3,
    a_size: Vec3,
    b_position: Vec3,
    b_size: Vec3,
    plane: &PaintPlane,
) -> bool {
    let reach = half_footprint(a_size) + half_footprint(b_size);
    let distance = (plane.lateral(a_position) - plane.lateral(b_position)).abs();
    distance.x <= reach.x && distance.y <= reach.y
}

/// Push that moves box `a` off box `b` along the axis with the smaller
/// penetration, with a five percent overshoot. Zero when the boxes do not
/// strictly overlap.
pub fn box_push(
    a_position: Vec3,
    a_size: Vec3,
    b_position: Vec3,
    b_size: Vec3,
    plane: &PaintPlane,
) -> Vec3 {
    let reach = half_footprint(a_size) + half_footprint(b_size);
    let delta = plane.lateral(a_position) - plane.lateral(b_position);
    let overlap = reach - delta.abs();
    if overlap.x <= 0.0 || overlap.y <= 0.0 {
        return Vec3::ZERO;
    }
    let away = |d: f32| if d < 0.0 { -1.0 } else { 1.0 };
    if overlap.x < overlap.y {
        plane.axis_x * (overlap.x * away(delta.x) * BOX_OVERSHOOT)
    } else {
        plane.axis_z * (overlap.y * away(delta.y) * BOX_OVERSHOOT)
    }
}

/// Moves `instance` away from every other live marker.
///
/// The collider pass only runs for neighbours the box test did not flag.
pub fn resolve_overlap<H>(
    host: &mut H,
    instance: ObjectId,
    footprint: Vec3,
    plane: &PaintPlane,
    max_iterations: u32,
    max_distance: f32,
) -> RelaxReport
where
    H: SceneQuery + SceneObjects + ?Sized,
{
    let mut report = RelaxReport::default();
    if footprint == Vec3::ZERO {
        report.settled = true;
        return report;
    }

    for _ in 0..max_iterations {
        let Some(mut transform) = host.transform(instance) else {
            break;
        };
        let mut accumulated = Vec3::ZERO;
        for other in host.markers() {
            if other.id == instance {
                continue;
            }
            let other_size = marker_footprint(host, &other);
            let push = if lateral_boxes_overlap(
                transform.position,
                footprint,
                other.position,
                other_size,
                plane,
            ) {
                box_push(transform.position, footprint, other.position, other_size, plane)
            } else {
                collider_push(host, instance, other.id, plane.normal).unwrap_or(Vec3::ZERO)
            };
            if push.length_squared() > MIN_PUSH_SQUARED {
                accumulated += push;
            }
        }

        if accumulated.length_squared() <= SETTLED_SQUARED {
            report.settled = true;
            break;
        }
        let step = accumulated.clamp_length_max(max_distance.max(0.0));
        transform.position += step;
        if host.set_transform(instance, transform).is_err() {
            break;
        }
        report.iterations += 1;
        report.displacement += step;
    }

    log::debug!(
        "relaxed {instance} in {} iteration(s), moved {} (settled: {})",
        report.iterations,
        report.displacement,
        report.settled
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::DataModel;
    use crate::geometry::{Bounds, Transform};
    use crate::marker::PaintMarker;
    use crate::palette::{PaletteId, TemplateId};
    use crate::scene::TemplateDef;
    use glam::Quat;

    fn spawn(model: &mut DataModel, at: Vec3, size: Vec3) -> ObjectId {
        let template = TemplateId::new("crate");
        if model.template_local_bounds(&template).is_none() {
            model.add_template(TemplateDef::boxed(
                template.clone(),
                Bounds::new(Vec3::new(0.0, 0.5, 0.0), Vec3::ONE),
            ));
        }
        let id = model.instantiate(&template).unwrap();
        model
            .set_transform(id, Transform::new(at, Quat::IDENTITY))
            .unwrap();
        model.ensure_colliders(id, true);
        model
            .attach_marker(
                id,
                PaintMarker {
                    size,
                    template,
                    palette_index: 0,
                    world_center: at,
                    palette: PaletteId::new("props"),
                },
            )
            .unwrap();
        id
    }

    fn lateral_gap(model: &DataModel, a: ObjectId, b: ObjectId, plane: &PaintPlane) -> Vec2 {
        let a = model.transform(a).unwrap().position;
        let b = model.transform(b).unwrap().position;
        (plane.lateral(a) - plane.lateral(b)).abs()
    }

    #[test]
    fn touching_boxes_count_as_overlap_but_do_not_push() {
        let plane = PaintPlane::horizontal(0.0);
        let a = Vec3::new(1.0, 0.0, 0.0);
        assert!(lateral_boxes_overlap(a, Vec3::ONE, Vec3::ZERO, Vec3::ONE, &plane));
        assert_eq!(box_push(a, Vec3::ONE, Vec3::ZERO, Vec3::ONE, &plane), Vec3::ZERO);
        let apart = Vec3::new(1.2, 0.0, 0.0);
        assert!(!lateral_boxes_overlap(apart, Vec3::ONE, Vec3::ZERO, Vec3::ONE, &plane));
    }

    #[test]
    fn push_follows_smaller_penetration() {
        let plane = PaintPlane::horizontal(0.0);
        let push = box_push(
            Vec3::new(0.1, 0.0, 0.8),
            Vec3::ONE,
            Vec3::ZERO,
            Vec3::ONE,
            &plane,
        );
        // Lateral x runs along world -Z, so the push moves towards +Z.
        assert!((push - Vec3::new(0.0, 0.0, 0.2 * 1.05)).length() < 1e-4);
    }

    #[test]
    fn coincident_instances_are_separated() {
        let mut model = DataModel::new();
        let plane = PaintPlane::horizontal(0.0);
        let first = spawn(&mut model, Vec3::ZERO, Vec3::ONE);
        let second = spawn(&mut model, Vec3::ZERO, Vec3::ONE);

        let report = resolve_overlap(&mut model, second, Vec3::ONE, &plane, 8, 3.0);
        assert!(report.settled);
        assert_eq!(report.iterations, 1);
        let gap = lateral_gap(&model, first, second, &plane);
        assert!(gap.x >= 1.0 - 1e-3 || gap.y >= 1.0 - 1e-3);
    }

    #[test]
    fn each_step_respects_the_distance_cap() {
        let mut model = DataModel::new();
        let plane = PaintPlane::horizontal(0.0);
        spawn(&mut model, Vec3::ZERO, Vec3::splat(4.0));
        let second = spawn(&mut model, Vec3::ZERO, Vec3::splat(4.0));

        let report = resolve_overlap(&mut model, second, Vec3::splat(4.0), &plane, 1, 0.5);
        assert_eq!(report.iterations, 1);
        assert!(!report.settled);
        assert!(report.displacement.length() <= 0.5 + 1e-5);
    }

    #[test]
    fn zero_iterations_leave_the_instance_alone() {
        let mut model = DataModel::new();
        let plane = PaintPlane::horizontal(0.0);
        spawn(&mut model, Vec3::ZERO, Vec3::ONE);
        let second = spawn(&mut model, Vec3::ZERO, Vec3::ONE);
        let report = resolve_overlap(&mut model, second, Vec3::ONE, &plane, 0, 3.0);
        assert_eq!(report.iterations, 0);
        assert_eq!(model.transform(second).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn collider_pass_catches_rotated_neighbours() {
        let mut model = DataModel::new();
        let plane = PaintPlane::horizontal(0.0);
        let first = spawn(&mut model, Vec3::ZERO, Vec3::splat(0.1));
        model
            .set_transform(
                first,
                Transform::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_4)),
            )
            .unwrap();
        let second = spawn(&mut model, Vec3::new(0.9, 0.0, 0.0), Vec3::splat(0.1));

        let report = resolve_overlap(&mut model, second, Vec3::splat(0.1), &plane, 8, 3.0);
        assert!(report.iterations >= 1);
        let moved = model.transform(second).unwrap().position;
        assert!(moved.x > 0.9);
    }
}
