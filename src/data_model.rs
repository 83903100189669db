use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use glam::{Quat, Vec3};
use parking_lot::RwLock;

use crate::error::HostError;
use crate::geometry::{Bounds, BoxCollider, Penetration, Ray, Transform};
use crate::host::{
    LayerMask, ObjectId, RayHit, SceneObjects, SceneQuery, UndoGroup, UndoLog,
};
use crate::marker::{MarkerRecord, PaintMarker};
use crate::palette::TemplateId;
use crate::scene::{SceneObject, SurfaceDef, TemplateDef};

#[derive(Debug, Clone)]
enum UndoOp {
    Created(ObjectId),
    Destroyed(ObjectId, SceneObject),
}

#[derive(Debug, Clone)]
struct UndoEntry {
    group: UndoGroup,
    label: String,
    op: UndoOp,
}

#[derive(Debug, Clone)]
enum RedoOp {
    Recreate(ObjectId, SceneObject),
    Destroy(ObjectId),
}

#[derive(Debug, Clone)]
struct RedoBatch {
    group: UndoGroup,
    /// In the order the operations were first recorded.
    ops: Vec<(String, RedoOp)>,
}

#[derive(Debug, Default)]
struct World {
    templates: HashMap<TemplateId, TemplateDef>,
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: u64,
    next_group: u64,
    group_names: HashMap<UndoGroup, String>,
    history: Vec<UndoEntry>,
    redo: Vec<RedoBatch>,
}

impl World {
    fn allocate_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    fn record(&mut self, label: &str, op: UndoOp) {
        let group = UndoGroup(self.next_group);
        self.next_group += 1;
        self.redo.clear();
        self.history.push(UndoEntry {
            group,
            label: label.to_string(),
            op,
        });
    }
}

/// Thread-safe in-memory scene implementing every host trait the painter
/// needs. Clones share the same world.
#[derive(Debug, Default)]
pub struct DataModel {
    world: Arc<RwLock<World>>,
}

impl Clone for DataModel {
    fn clone(&self) -> Self {
        Self {
            world: Arc::clone(&self.world),
        }
    }
}

impl DataModel {
    /// Creates an empty data model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a template.
    pub fn add_template(&self, template: TemplateDef) {
        self.world
            .write()
            .templates
            .insert(template.id.clone(), template);
    }

    pub fn template_count(&self) -> usize {
        self.world.read().templates.len()
    }

    /// Adds an object outside of the undo history.
    pub fn add_object(&self, object: SceneObject) -> ObjectId {
        let mut world = self.world.write();
        let id = world.allocate_id();
        world.objects.insert(id, object);
        id
    }

    /// Adds a static box surface with a matching collider.
    pub fn add_surface(
        &self,
        name: &str,
        position: Vec3,
        rotation: Quat,
        size: Vec3,
        layer: u32,
    ) -> ObjectId {
        let part = Bounds::new(Vec3::ZERO, size);
        self.add_object(SceneObject {
            name: name.to_string(),
            transform: Transform::new(position, rotation),
            parts: vec![part],
            colliders: vec![BoxCollider::from_bounds(&part, false)],
            layer,
            ..SceneObject::default()
        })
    }

    pub fn add_surface_def(&self, surface: &SurfaceDef) -> ObjectId {
        self.add_surface(
            &surface.name,
            surface.position,
            surface.rotation,
            surface.size,
            surface.layer,
        )
    }

    /// Returns a clone of the requested object.
    pub fn object(&self, id: ObjectId) -> Option<SceneObject> {
        self.world.read().objects.get(&id).cloned()
    }

    /// Snapshot of every object ordered by id.
    pub fn all_objects(&self) -> Vec<(ObjectId, SceneObject)> {
        self.world
            .read()
            .objects
            .iter()
            .map(|(id, object)| (*id, object.clone()))
            .collect()
    }

    pub fn object_count(&self) -> usize {
        self.world.read().objects.len()
    }

    /// Number of active objects carrying a marker.
    pub fn marker_count(&self) -> usize {
        self.world
            .read()
            .objects
            .values()
            .filter(|object| object.active && object.marker.is_some())
            .count()
    }

    pub fn set_active(&self, id: ObjectId, active: bool) -> bool {
        let mut world = self.world.write();
        match world.objects.get_mut(&id) {
            Some(object) => {
                object.active = active;
                true
            }
            None => false,
        }
    }

    pub fn has_colliders(&self, id: ObjectId) -> bool {
        self.world
            .read()
            .objects
            .get(&id)
            .is_some_and(|object| !object.colliders.is_empty())
    }

    /// Name of the most recent undo group, falling back to the label of its
    /// last operation.
    pub fn undo_name(&self) -> Option<String> {
        let world = self.world.read();
        let last = world.history.last()?;
        Some(
            world
                .group_names
                .get(&last.group)
                .cloned()
                .unwrap_or_else(|| last.label.clone()),
        )
    }

    /// Number of groups that `undo` can revert.
    pub fn undo_depth(&self) -> usize {
        let world = self.world.read();
        let mut groups: Vec<UndoGroup> = world.history.iter().map(|entry| entry.group).collect();
        groups.dedup();
        groups.len()
    }

    /// Reverts the most recent group. Returns `false` when there is nothing
    /// to undo.
    pub fn undo(&self) -> bool {
        let mut world = self.world.write();
        let Some(group) = world.history.last().map(|entry| entry.group) else {
            return false;
        };

        let mut ops = Vec::new();
        while world.history.last().is_some_and(|entry| entry.group == group) {
            let Some(entry) = world.history.pop() else {
                break;
            };
            match entry.op {
                UndoOp::Created(id) => {
                    if let Some(object) = world.objects.remove(&id) {
                        ops.push((entry.label, RedoOp::Recreate(id, object)));
                    }
                }
                UndoOp::Destroyed(id, object) => {
                    world.objects.insert(id, object);
                    ops.push((entry.label, RedoOp::Destroy(id)));
                }
            }
        }
        ops.reverse();
        log::debug!("undid group {} ({} operation(s))", group.0, ops.len());
        world.redo.push(RedoBatch { group, ops });
        true
    }

    /// Re-applies the most recently undone group.
    pub fn redo(&self) -> bool {
        let mut world = self.world.write();
        let Some(batch) = world.redo.pop() else {
            return false;
        };
        for (label, op) in batch.ops {
            let op = match op {
                RedoOp::Recreate(id, object) => {
                    world.objects.insert(id, object);
                    UndoOp::Created(id)
                }
                RedoOp::Destroy(id) => match world.objects.remove(&id) {
                    Some(object) => UndoOp::Destroyed(id, object),
                    None => continue,
                },
            };
            world.history.push(UndoEntry {
                group: batch.group,
                label,
                op,
            });
        }
        true
    }
}

impl SceneQuery for DataModel {
    fn raycast_all(&self, ray: &Ray, max_distance: f32, mask: LayerMask) -> Vec<RayHit> {
        if ray.is_degenerate() {
            return Vec::new();
        }
        let world = self.world.read();
        let mut hits = Vec::new();
        for (id, object) in &world.objects {
            if !object.active || !layer_in_mask(object.layer, mask) {
                continue;
            }
            for collider in &object.colliders {
                let world_box = collider.world_box(&object.transform);
                if let Some((distance, normal)) = world_box.raycast(ray, max_distance) {
                    hits.push(RayHit {
                        point: ray.at(distance),
                        normal,
                        distance,
                        object: *id,
                    });
                }
            }
        }
        hits
    }

    fn penetrations(&self, a: ObjectId, b: ObjectId) -> Vec<Penetration> {
        let world = self.world.read();
        let (Some(first), Some(second)) = (world.objects.get(&a), world.objects.get(&b)) else {
            return Vec::new();
        };
        let mut result = Vec::new();
        for collider_a in &first.colliders {
            let box_a = collider_a.world_box(&first.transform);
            for collider_b in &second.colliders {
                let box_b = collider_b.world_box(&second.transform);
                result.extend(box_a.penetration(&box_b));
            }
        }
        result
    }
}

fn layer_in_mask(layer: u32, mask: LayerMask) -> bool {
    1u32.checked_shl(layer).is_some_and(|bit| mask & bit != 0)
}

impl SceneObjects for DataModel {
    fn instantiate(&mut self, template: &TemplateId) -> Result<ObjectId, HostError> {
        let mut world = self.world.write();
        let definition = world
            .templates
            .get(template)
            .ok_or_else(|| HostError::UnknownTemplate(template.clone()))?;
        let next = ObjectId(world.next_id + 1);
        let object = SceneObject::from_template(format!("{template} {next}"), definition);
        let id = world.allocate_id();
        world.objects.insert(id, object);
        Ok(id)
    }

    fn destroy(&mut self, id: ObjectId) -> bool {
        self.world.write().objects.remove(&id).is_some()
    }

    fn transform(&self, id: ObjectId) -> Option<Transform> {
        self.world.read().objects.get(&id).map(|object| object.transform)
    }

    fn set_transform(&mut self, id: ObjectId, transform: Transform) -> Result<(), HostError> {
        let mut world = self.world.write();
        let object = world
            .objects
            .get_mut(&id)
            .ok_or(HostError::UnknownObject(id))?;
        object.transform = transform;
        Ok(())
    }

    fn template_local_bounds(&self, template: &TemplateId) -> Option<Bounds> {
        self.world.read().templates.get(template)?.local_bounds()
    }

    fn object_world_bounds(&self, id: ObjectId) -> Option<Bounds> {
        self.world.read().objects.get(&id)?.world_bounds()
    }

    fn attach_marker(&mut self, id: ObjectId, marker: PaintMarker) -> Result<(), HostError> {
        let mut world = self.world.write();
        let object = world
            .objects
            .get_mut(&id)
            .ok_or(HostError::UnknownObject(id))?;
        object.marker = Some(marker);
        Ok(())
    }

    fn marker(&self, id: ObjectId) -> Option<PaintMarker> {
        self.world.read().objects.get(&id)?.marker.clone()
    }

    fn markers(&self) -> Vec<MarkerRecord> {
        self.world
            .read()
            .objects
            .iter()
            .filter(|(_, object)| object.active)
            .filter_map(|(id, object)| {
                object.marker.as_ref().map(|marker| MarkerRecord {
                    id: *id,
                    marker: marker.clone(),
                    position: object.transform.position,
                })
            })
            .collect()
    }

    fn is_active(&self, id: ObjectId) -> bool {
        self.world
            .read()
            .objects
            .get(&id)
            .is_some_and(|object| object.active)
    }

    fn ensure_colliders(&mut self, id: ObjectId, convex: bool) {
        let mut world = self.world.write();
        let Some(object) = world.objects.get_mut(&id) else {
            return;
        };
        if object.colliders.is_empty() {
            object.colliders = object
                .parts
                .iter()
                .map(|part| BoxCollider::from_bounds(part, convex))
                .collect();
        }
    }
}

impl UndoLog for DataModel {
    fn current_group(&self) -> UndoGroup {
        UndoGroup(self.world.read().next_group)
    }

    fn set_group_name(&mut self, name: &str) {
        let mut world = self.world.write();
        let group = UndoGroup(world.next_group);
        world.group_names.insert(group, name.to_string());
    }

    fn collapse_since(&mut self, group: UndoGroup) {
        let mut world = self.world.write();
        let mut recorded = false;
        for entry in world.history.iter_mut().rev() {
            if entry.group < group {
                break;
            }
            entry.group = group;
            recorded = true;
        }
        // A name set for a group that recorded nothing must not leak onto
        // the next operation.
        if !recorded {
            world.group_names.remove(&group);
        }
    }

    fn register_created(&mut self, id: ObjectId, label: &str) {
        self.world.write().record(label, UndoOp::Created(id));
    }

    fn destroy_undoable(&mut self, id: ObjectId, label: &str) -> bool {
        let mut world = self.world.write();
        let Some(object) = world.objects.remove(&id) else {
            return false;
        };
        world.record(label, UndoOp::Destroyed(id, object));
        true
    }
}
