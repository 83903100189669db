use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Overlap below this depth counts as touching, not penetrating.
pub const PENETRATION_EPSILON: f32 = 1e-4;

/// World-space ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// A ray with no usable direction cannot hit anything.
    pub fn is_degenerate(&self) -> bool {
        self.direction.length_squared() < f32::EPSILON
    }
}

/// Axis-aligned bounds stored as center and half extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Bounds {
    /// Unit cube around the origin, used when a template has no geometry.
    pub const UNIT: Self = Self {
        center: Vec3::ZERO,
        extents: Vec3::splat(0.5),
    };

    pub fn new(center: Vec3, size: Vec3) -> Self {
        Self {
            center,
            extents: size.abs() * 0.5,
        }
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            extents: (max - min).abs() * 0.5,
        }
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    pub fn size(&self) -> Vec3 {
        self.extents * 2.0
    }

    /// Center of the face facing local `-Y`.
    pub fn bottom(&self) -> Vec3 {
        Vec3::new(self.center.x, self.center.y - self.extents.y, self.center.z)
    }

    pub fn encapsulate(&mut self, other: &Bounds) {
        *self = Self::from_min_max(self.min().min(other.min()), self.max().max(other.max()));
    }

    /// Union of every bounds in the iterator, `None` when it is empty.
    pub fn union<'a>(mut parts: impl Iterator<Item = &'a Bounds>) -> Option<Bounds> {
        let mut result = *parts.next()?;
        for part in parts {
            result.encapsulate(part);
        }
        Some(result)
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let c = self.center;
        let e = self.extents;
        [
            c + Vec3::new(e.x, e.y, e.z),
            c + Vec3::new(e.x, e.y, -e.z),
            c + Vec3::new(e.x, -e.y, e.z),
            c + Vec3::new(e.x, -e.y, -e.z),
            c + Vec3::new(-e.x, e.y, e.z),
            c + Vec3::new(-e.x, e.y, -e.z),
            c + Vec3::new(-e.x, -e.y, e.z),
            c + Vec3::new(-e.x, -e.y, -e.z),
        ]
    }

    /// Re-fits an axis-aligned box around the transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> Bounds {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for corner in self.corners() {
            let point = matrix.transform_point3(corner);
            min = min.min(point);
            max = max.max(point);
        }
        Self::from_min_max(min, max)
    }
}

/// Rigid transform of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }
}

/// Result of a narrow-phase overlap test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Unit direction along which the first volume must move to separate.
    pub direction: Vec3,
    pub depth: f32,
}

/// Box collider in the local space of its owner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxCollider {
    pub center: Vec3,
    pub half_extents: Vec3,
    #[serde(default)]
    pub convex: bool,
}

impl BoxCollider {
    pub fn from_bounds(bounds: &Bounds, convex: bool) -> Self {
        Self {
            center: bounds.center,
            half_extents: bounds.extents,
            convex,
        }
    }

    pub fn world_box(&self, transform: &Transform) -> OrientedBox {
        OrientedBox {
            center: transform.transform_point(self.center),
            half_extents: self.half_extents,
            rotation: transform.rotation,
        }
    }
}

/// Oriented box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
}

impl OrientedBox {
    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.rotation * Vec3::X,
            self.rotation * Vec3::Y,
            self.rotation * Vec3::Z,
        ]
    }

    /// Slab test in box space. Returns the entry distance and the world normal
    /// of the entered face. Rays starting inside the box report no hit.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<(f32, Vec3)> {
        let inverse = self.rotation.inverse();
        let origin = inverse * (ray.origin - self.center);
        let direction = inverse * ray.direction;

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_axis = 0;
        let mut enter_sign = 0.0;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let h = self.half_extents[axis];
            if d.abs() < 1e-8 {
                if o.abs() > h {
                    return None;
                }
                continue;
            }
            let mut t0 = (-h - o) / d;
            let mut t1 = (h - o) / d;
            let mut face = -1.0;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                face = 1.0;
            }
            if t0 > t_enter {
                t_enter = t0;
                enter_axis = axis;
                enter_sign = face;
            }
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        if !t_enter.is_finite() || t_enter < 0.0 || t_enter > max_distance {
            return None;
        }
        let mut local_normal = Vec3::ZERO;
        local_normal[enter_axis] = enter_sign;
        Some((t_enter, self.rotation * local_normal))
    }

    fn projected_radius(&self, axis: Vec3) -> f32 {
        self.axes()
            .iter()
            .enumerate()
            .map(|(i, local)| self.half_extents[i] * local.dot(axis).abs())
            .sum()
    }

    /// Separating-axis test over the 15 candidate axes of two boxes.
    pub fn penetration(&self, other: &OrientedBox) -> Option<Penetration> {
        let a = self.axes();
        let b = other.axes();
        let mut candidates = Vec::with_capacity(15);
        candidates.extend_from_slice(&a);
        candidates.extend_from_slice(&b);
        for axis_a in &a {
            for axis_b in &b {
                let cross = axis_a.cross(*axis_b);
                if cross.length_squared() > 1e-6 {
                    candidates.push(cross.normalize());
                }
            }
        }

        let delta = self.center - other.center;
        let mut best: Option<Penetration> = None;
        for axis in candidates {
            let distance = delta.dot(axis);
            let overlap =
                self.projected_radius(axis) + other.projected_radius(axis) - distance.abs();
            if overlap <= PENETRATION_EPSILON {
                return None;
            }
            if best.map_or(true, |current| overlap < current.depth) {
                let direction = if distance < 0.0 { -axis } else { axis };
                best = Some(Penetration {
                    direction,
                    depth: overlap,
                });
            }
        }
        best
    }
}
