use glam::Mat4;
use id_arena::Arena;

use crate::error::OperatorError;
use crate::scene_graph::modifier::ModifierKind;
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::transform::Transform;

pub const DEFAULT_COLLECTION: &str = "Scene Collection";

#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    pub object_ids: Vec<ObjectId>,
}

/// Object table of the scene. Objects are owned here and refer to each other
/// by id only; removed objects stay in the arena as tombstones so stale ids
/// resolve to nothing.
pub struct Scene {
    pub objects: Arena<Object3D>,
    collections: Vec<Collection>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            collections: vec![Collection {
                name: DEFAULT_COLLECTION.to_string(),
                object_ids: Vec::new(),
            }],
        }
    }

    pub fn add_object(&mut self, mut object: Object3D) -> ObjectId {
        object.name = self.unique_name(&object.name, None);
        let parent_id = object.parent_id.take();
        object.child_ids.clear();

        let id = self.objects.alloc(object);
        self.collections[0].object_ids.push(id);

        if parent_id.is_some() {
            self.set_object_parent(id, parent_id);
        }

        id
    }

    /// Adds an object parented to `parent`; its transform stays parent-relative.
    pub fn add_child(&mut self, parent: ObjectId, object: Object3D) -> ObjectId {
        let id = self.add_object(object);
        self.set_object_parent(id, Some(parent));
        id
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id).filter(|object| !object.removed)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.get_mut(id).filter(|object| !object.removed)
    }

    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.iter_objects()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    pub fn iter_objects(&self) -> impl Iterator<Item = (ObjectId, &Object3D)> {
        self.objects.iter().filter(|(_, object)| !object.removed)
    }

    pub fn object_count(&self) -> usize {
        self.iter_objects().count()
    }

    pub fn root_objects(&self) -> Vec<ObjectId> {
        self.iter_objects()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// The object and all its descendants, depth first, parents before children.
    pub fn subtree(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.collect_subtree(root, &mut out);
        out
    }

    fn collect_subtree(&self, id: ObjectId, out: &mut Vec<ObjectId>) {
        if let Some(object) = self.get_object(id) {
            out.push(id);
            for &child_id in &object.child_ids {
                self.collect_subtree(child_id, out);
            }
        }
    }

    pub fn is_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = self.get_object(id).and_then(|object| object.parent_id);
        while let Some(parent_id) = current {
            if parent_id == ancestor {
                return true;
            }
            current = self.get_object(parent_id).and_then(|object| object.parent_id);
        }
        false
    }

    /// Returns `name` if free, otherwise the first free `stem.NNN`.
    pub fn unique_name(&self, name: &str, exclude: Option<ObjectId>) -> String {
        let taken = |candidate: &str| {
            self.iter_objects()
                .any(|(id, object)| Some(id) != exclude && object.name == candidate)
        };

        if !taken(name) {
            return name.to_string();
        }

        let stem = split_numeric_suffix(name);
        (1..)
            .map(|n| format!("{stem}.{n:03}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    pub fn rename(&mut self, id: ObjectId, name: &str) -> Option<String> {
        let unique = self.unique_name(name, Some(id));
        let object = self.get_object_mut(id)?;
        object.name = unique.clone();
        Some(unique)
    }

    /// Sets the parent of an object and updates child relationships.
    /// Refuses to create cycles.
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) -> bool {
        if let Some(new_parent_id) = new_parent_id {
            if new_parent_id == child_id
                || self.is_ancestor(child_id, new_parent_id)
                || self.get_object(new_parent_id).is_none()
            {
                return false;
            }
        }

        // Remove from old parent's children list
        if let Some(child) = self.get_object(child_id) {
            if let Some(old_parent_id) = child.parent_id {
                if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                    old_parent.child_ids.retain(|&id| id != child_id);
                }
            }
        } else {
            return false;
        }

        // Set new parent and add to new parent's children list
        if let Some(child) = self.get_object_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.get_object_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }

        true
    }

    pub fn world_matrix(&self, id: ObjectId) -> Option<Mat4> {
        let object = self.get_object(id)?;
        let local = object.transform.local_matrix();
        match object.parent_id {
            Some(parent_id) => Some(self.world_matrix(parent_id).unwrap_or(Mat4::IDENTITY) * local),
            None => Some(local),
        }
    }

    pub fn set_world_matrix(&mut self, id: ObjectId, world: Mat4) -> bool {
        let parent_world = self
            .get_object(id)
            .and_then(|object| object.parent_id)
            .and_then(|parent_id| self.world_matrix(parent_id))
            .unwrap_or(Mat4::IDENTITY);

        match self.get_object_mut(id) {
            Some(object) => {
                object.transform = Transform::from_matrix(parent_world.inverse() * world);
                true
            }
            None => false,
        }
    }

    /// Re-parents an object without moving it in world space.
    pub fn set_parent_keep_transform(
        &mut self,
        child_id: ObjectId,
        new_parent_id: Option<ObjectId>,
    ) -> bool {
        let Some(world) = self.world_matrix(child_id) else {
            return false;
        };

        self.set_object_parent(child_id, new_parent_id) && self.set_world_matrix(child_id, world)
    }

    /// Deletes an object. Children are unparented in place.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<(), OperatorError> {
        let object = self.get_object(id).ok_or(OperatorError::ObjectNotFound)?;
        if object.library_linked {
            return Err(OperatorError::LinkedData(object.name.clone()));
        }

        for child_id in object.child_ids.clone() {
            self.set_parent_keep_transform(child_id, None);
        }
        self.set_object_parent(id, None);
        self.unlink_from_collections(id);

        if let Some(object) = self.get_object_mut(id) {
            object.removed = true;
            object.mesh = None;
            object.modifiers.clear();
        }

        // Armature modifiers must not keep pointing at a deleted rig.
        for (_, other) in self.objects.iter_mut() {
            for modifier in &mut other.modifiers {
                if let ModifierKind::Armature { object } = &mut modifier.kind {
                    if *object == Some(id) {
                        *object = None;
                    }
                }
            }
        }

        Ok(())
    }

    pub fn unlink_from_collections(&mut self, id: ObjectId) -> usize {
        let mut unlinked = 0;
        for collection in &mut self.collections {
            let before = collection.object_ids.len();
            collection.object_ids.retain(|&object_id| object_id != id);
            unlinked += before - collection.object_ids.len();
        }
        unlinked
    }

    pub fn is_linked_to_scene(&self, id: ObjectId) -> bool {
        self.collections
            .iter()
            .any(|collection| collection.object_ids.contains(&id))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// "Cube.001" -> "Cube"; names without a numeric suffix are returned as is.
fn split_numeric_suffix(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, suffix))
            if !stem.is_empty() && !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            stem
        }
        _ => name,
    }
}
