use glam::{Vec2, Vec3};

use crate::host::SceneObjects;
use crate::marker::{nearest_marker, MarkerRecord};
use crate::plane::PaintPlane;

/// Smallest step the local snap will quantize to.
pub const MIN_SNAP_STEP: f32 = 0.1;

/// Quantizes `point` to the cells of a single reference marker.
///
/// The step per axis is the marker's lateral footprint plus `spacing`. On
/// horizontal planes the height is pinned to the plane's fixed height.
pub fn snap_with_reference(
    point: Vec3,
    origin: Vec3,
    footprint: Vec3,
    plane: &PaintPlane,
    spacing: f32,
) -> Vec3 {
    let step = Vec2::new(
        (footprint.x.abs() + spacing).max(MIN_SNAP_STEP),
        (footprint.z.abs() + spacing).max(MIN_SNAP_STEP),
    );
    let cells = (plane.lateral(point - origin) / step).round() * step;
    plane.pin_height(plane.offset(origin, cells))
}

/// Footprint recorded on a marker, or the object's world bounds for markers
/// that never recorded one.
pub fn marker_footprint<H: SceneObjects + ?Sized>(host: &H, record: &MarkerRecord) -> Vec3 {
    if record.marker.size != Vec3::ZERO {
        return record.marker.size;
    }
    host.object_world_bounds(record.id)
        .map(|bounds| bounds.size())
        .unwrap_or(Vec3::ONE)
}

/// Local snap against the nearest marker of any palette.
///
/// Returns `None` when the scene holds no markers.
pub fn snap_to_nearest<H: SceneObjects + ?Sized>(
    host: &H,
    point: Vec3,
    plane: &PaintPlane,
    spacing: f32,
) -> Option<Vec3> {
    let markers = host.markers();
    let nearest = nearest_marker(&markers, point)?;
    let origin = nearest.reference_center();
    let footprint = marker_footprint(host, nearest);
    let snapped = snap_with_reference(point, origin, footprint, plane, spacing);
    log::debug!("snapped {point} to {snapped} around {} ({origin})", nearest.id);
    Some(snapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::DataModel;
    use crate::geometry::{Bounds, Transform};
    use crate::host::SceneObjects;
    use crate::marker::PaintMarker;
    use crate::palette::{PaletteId, TemplateId};
    use crate::scene::TemplateDef;
    use glam::Quat;

    #[test]
    fn snaps_to_footprint_cells() {
        let plane = PaintPlane::horizontal(0.0);
        let snapped = snap_with_reference(
            Vec3::new(2.9, 0.0, 3.1),
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 2.0),
            &plane,
            0.0,
        );
        assert!((snapped - Vec3::new(2.0, 0.0, 4.0)).length() < 1e-4);
    }

    #[test]
    fn spacing_widens_the_step_and_height_is_pinned() {
        let plane = PaintPlane::horizontal(1.25);
        let snapped = snap_with_reference(
            Vec3::new(2.6, 9.0, -0.2),
            Vec3::ZERO,
            Vec3::ONE,
            &plane,
            1.0,
        );
        assert!((snapped - Vec3::new(2.0, 1.25, 0.0)).length() < 1e-4);
    }

    #[test]
    fn tiny_footprints_use_the_minimum_step() {
        let plane = PaintPlane::horizontal(0.0);
        let snapped =
            snap_with_reference(Vec3::new(0.26, 0.0, 0.0), Vec3::ZERO, Vec3::ZERO, &plane, 0.0);
        assert!((snapped.x - 0.3).abs() < 1e-4);
    }

    #[test]
    fn empty_scene_does_not_snap() {
        let model = DataModel::new();
        let plane = PaintPlane::horizontal(0.0);
        assert!(snap_to_nearest(&model, Vec3::new(1.0, 0.0, 1.0), &plane, 1.0).is_none());
    }

    #[test]
    fn unsized_marker_uses_world_bounds() {
        let mut model = DataModel::new();
        let template = TemplateId::new("slab");
        model.add_template(TemplateDef::boxed(
            template.clone(),
            Bounds::new(Vec3::new(0.0, 0.25, 0.0), Vec3::new(3.0, 0.5, 3.0)),
        ));
        let id = model.instantiate(&template).unwrap();
        model
            .set_transform(id, Transform::new(Vec3::ZERO, Quat::IDENTITY))
            .unwrap();
        model
            .attach_marker(
                id,
                PaintMarker {
                    size: Vec3::ZERO,
                    template,
                    palette_index: 0,
                    world_center: Vec3::ZERO,
                    palette: PaletteId::new("props"),
                },
            )
            .unwrap();

        let plane = PaintPlane::horizontal(0.0);
        let snapped = snap_to_nearest(&model, Vec3::new(0.0, 0.0, 2.0), &plane, 0.0).unwrap();
        assert!((snapped - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-4);
    }
}
