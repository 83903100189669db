//! Painting plane derived from the surface under the cursor.
//!
//! Every component that reasons about spacing works in the two lateral axes
//! returned by [`lateral_axes`]. Grid inference, snapping, conflict tests and
//! overlap relaxation must agree on this convention, so it lives here and
//! nowhere else.

use glam::{Vec2, Vec3};

pub const WORLD_UP: Vec3 = Vec3::Y;
pub const WORLD_RIGHT: Vec3 = Vec3::X;

/// `normal · up` above this marks a floor-like plane.
pub const HORIZONTAL_THRESHOLD: f32 = 0.9;

/// Inclusive slack applied to rectangle containment tests.
pub const RECT_MARGIN: f32 = 1e-3;

/// Lateral axis pair for a plane normal: `x = n × up`, or `n × right` when the
/// normal is nearly vertical, and `z = n × x`.
pub fn lateral_axes(normal: Vec3) -> (Vec3, Vec3) {
    let normal = normal.normalize_or_zero();
    let normal = if normal == Vec3::ZERO { WORLD_UP } else { normal };
    let mut axis_x = normal.cross(WORLD_UP);
    if axis_x.length_squared() < 0.001 {
        axis_x = normal.cross(WORLD_RIGHT);
    }
    let axis_x = axis_x.normalize();
    let axis_z = normal.cross(axis_x).normalize();
    (axis_x, axis_z)
}

/// Per-frame painting plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintPlane {
    pub normal: Vec3,
    pub axis_x: Vec3,
    pub axis_z: Vec3,
    /// Height enforced on horizontal planes so area operations do not drift.
    pub fixed_height: Option<f32>,
}

impl Default for PaintPlane {
    fn default() -> Self {
        Self::new(WORLD_UP, None)
    }
}

impl PaintPlane {
    pub fn new(normal: Vec3, fixed_height: Option<f32>) -> Self {
        let normal = if normal.length_squared() > 0.0001 {
            normal.normalize()
        } else {
            WORLD_UP
        };
        let (axis_x, axis_z) = lateral_axes(normal);
        Self {
            normal,
            axis_x,
            axis_z,
            fixed_height,
        }
    }

    pub fn horizontal(height: f32) -> Self {
        Self::new(WORLD_UP, Some(height))
    }

    pub fn is_horizontal(&self) -> bool {
        self.normal.dot(WORLD_UP) > HORIZONTAL_THRESHOLD
    }

    /// Coordinates of `v` along the lateral axes.
    pub fn lateral(&self, v: Vec3) -> Vec2 {
        Vec2::new(v.dot(self.axis_x), v.dot(self.axis_z))
    }

    pub fn offset(&self, origin: Vec3, lateral: Vec2) -> Vec3 {
        origin + self.axis_x * lateral.x + self.axis_z * lateral.y
    }

    /// Replaces the height with the fixed height on horizontal planes.
    pub fn pin_height(&self, mut point: Vec3) -> Vec3 {
        if let Some(height) = self.fixed_height {
            if self.is_horizontal() {
                point.y = height;
            }
        }
        point
    }

    pub fn closest_point(&self, point: Vec3, plane_origin: Vec3) -> Vec3 {
        let distance = self.normal.dot(point - plane_origin);
        point - self.normal * distance
    }
}

/// Rectangle on a painting plane spanned by two drag corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateralRect {
    /// World position of the corner with the smallest lateral coordinates.
    pub base: Vec3,
    pub width: f32,
    pub height: f32,
    min: Vec2,
}

impl LateralRect {
    pub fn from_corners(plane: &PaintPlane, start: Vec3, end: Vec3) -> Self {
        let local = plane.lateral(end - start);
        let base = plane.offset(start, local.min(Vec2::ZERO));
        Self {
            base,
            width: local.x.abs(),
            height: local.y.abs(),
            min: plane.lateral(base),
        }
    }

    pub fn contains(&self, plane: &PaintPlane, point: Vec3) -> bool {
        let local = plane.lateral(point) - self.min;
        local.x >= -RECT_MARGIN
            && local.x <= self.width + RECT_MARGIN
            && local.y >= -RECT_MARGIN
            && local.y <= self.height + RECT_MARGIN
    }

    pub fn corners(&self, plane: &PaintPlane) -> [Vec3; 4] {
        [
            self.base,
            plane.offset(self.base, Vec2::new(self.width, 0.0)),
            plane.offset(self.base, Vec2::new(self.width, self.height)),
            plane.offset(self.base, Vec2::new(0.0, self.height)),
        ]
    }
}
