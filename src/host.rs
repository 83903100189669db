//! Boundary between the painter and the editor that embeds it.
//!
//! The engine never holds scene state of its own. Every algorithm re-queries
//! the host, so instances placed or destroyed earlier in the same batch are
//! visible to later steps.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::geometry::{Bounds, Penetration, Ray, Transform};
use crate::marker::{MarkerRecord, PaintMarker};
use crate::palette::TemplateId;

/// Opaque handle of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One bit per object layer.
pub type LayerMask = u32;

pub const ALL_LAYERS: LayerMask = u32::MAX;

/// Identifier of an undo group. Groups are allocated in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UndoGroup(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub object: ObjectId,
}

/// Spatial queries against the scene.
pub trait SceneQuery {
    /// Every hit along the ray within `max_distance`, in any order.
    fn raycast_all(&self, ray: &Ray, max_distance: f32, mask: LayerMask) -> Vec<RayHit>;

    /// Penetrations of each collider of `a` against each collider of `b`.
    /// Directions point from `b` towards `a`.
    fn penetrations(&self, a: ObjectId, b: ObjectId) -> Vec<Penetration>;
}

/// Object lifecycle and marker storage.
pub trait SceneObjects {
    /// Creates an instance with the template's authored transform.
    fn instantiate(&mut self, template: &TemplateId) -> Result<ObjectId, HostError>;
    /// Removes an object without recording undo.
    fn destroy(&mut self, id: ObjectId) -> bool;
    fn transform(&self, id: ObjectId) -> Option<Transform>;
    fn set_transform(&mut self, id: ObjectId, transform: Transform) -> Result<(), HostError>;
    /// Union of the template's render parts in its local space.
    fn template_local_bounds(&self, template: &TemplateId) -> Option<Bounds>;
    fn object_world_bounds(&self, id: ObjectId) -> Option<Bounds>;
    fn attach_marker(&mut self, id: ObjectId, marker: PaintMarker) -> Result<(), HostError>;
    fn marker(&self, id: ObjectId) -> Option<PaintMarker>;
    /// Markers of active objects only.
    fn markers(&self) -> Vec<MarkerRecord>;
    fn is_active(&self, id: ObjectId) -> bool;
    /// Adds a box collider per render part to objects without colliders.
    fn ensure_colliders(&mut self, id: ObjectId, convex: bool);
}

/// Editor undo history.
pub trait UndoLog {
    /// Group the next recorded operation will belong to.
    fn current_group(&self) -> UndoGroup;
    fn set_group_name(&mut self, name: &str);
    /// Merges every group recorded since `group` into it.
    fn collapse_since(&mut self, group: UndoGroup);
    fn register_created(&mut self, id: ObjectId, label: &str);
    /// Destroys the object and records the destruction. Returns `false` when
    /// the object did not exist.
    fn destroy_undoable(&mut self, id: ObjectId, label: &str) -> bool;
}

/// Everything the painter needs from its host.
pub trait PaintHost: SceneQuery + SceneObjects + UndoLog {}

impl<T> PaintHost for T where T: SceneQuery + SceneObjects + UndoLog {}
