//! Object-level join and hierarchy duplication for the in-memory host.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::OperatorError;
use crate::scene_graph::{ModifierKind, ObjectId, Scene};

/// Merges the mesh data of `others` into `target` and deletes `others`.
///
/// Positions are moved into the target's local space. Children of deleted
/// objects are re-parented onto the target in place, and the target itself
/// moves up to its nearest surviving ancestor if one of its ancestors is
/// consumed.
pub fn join_objects(
    scene: &mut Scene,
    target: ObjectId,
    others: &[ObjectId],
) -> Result<(), OperatorError> {
    let consumed = others
        .iter()
        .copied()
        .filter(|&id| id != target)
        .collect::<HashSet<_>>();

    if scene.get_object(target).and_then(|o| o.mesh.as_ref()).is_none() {
        return Err(OperatorError::invalid_context("join", "active object has no mesh data"));
    }

    let mut ancestor = scene.get_object(target).and_then(|o| o.parent_id);
    while let Some(id) = ancestor.filter(|id| consumed.contains(id)) {
        ancestor = scene.get_object(id).and_then(|o| o.parent_id);
    }
    if ancestor != scene.get_object(target).and_then(|o| o.parent_id) {
        scene.set_parent_keep_transform(target, ancestor);
    }

    let target_inverse = scene
        .world_matrix(target)
        .ok_or(OperatorError::ObjectNotFound)?
        .inverse();

    // Keep the caller's order so the merged vertex layout is deterministic.
    let ordered = others
        .iter()
        .copied()
        .filter(|id| consumed.contains(id))
        .collect::<Vec<_>>();

    for &id in &ordered {
        let Some(world) = scene.world_matrix(id) else {
            continue;
        };
        let Some(source) = scene.get_object_mut(id).and_then(|o| o.mesh.take()) else {
            continue;
        };

        if let Some(mesh) = scene.get_object_mut(target).and_then(|o| o.mesh.as_mut()) {
            mesh.append(&source, target_inverse * world);
        }
        debug!(
            "Joined {} faces into {:?}",
            source.num_faces(),
            scene.get_object(target).map(|o| o.name.as_str())
        );
    }

    for &id in &ordered {
        let children = scene
            .get_object(id)
            .map(|o| o.child_ids.clone())
            .unwrap_or_default();
        for child in children {
            if child != target && !consumed.contains(&child) {
                scene.set_parent_keep_transform(child, Some(target));
            }
        }
    }

    for &id in &ordered {
        scene.remove_object(id)?;
    }

    Ok(())
}

/// Copies `root` and all its descendants next to the original. Armature
/// modifiers that target an object inside the copied subtree are pointed at
/// the copy. Returns the copy of `root`.
pub fn duplicate_hierarchy(scene: &mut Scene, root: ObjectId) -> Option<ObjectId> {
    let originals = scene.subtree(root);
    if originals.is_empty() {
        return None;
    }

    let mut copies = HashMap::new();
    for &id in &originals {
        let mut copy = scene.get_object(id)?.clone();
        copy.parent_id = None;
        copy.child_ids.clear();
        copy.library_linked = false;
        let copy_id = scene.add_object(copy);
        copies.insert(id, copy_id);
    }

    for &id in &originals {
        let parent = scene.get_object(id)?.parent_id;
        let copy_parent = match parent {
            Some(parent) => copies.get(&parent).copied().or(Some(parent)),
            None => None,
        };
        scene.set_object_parent(copies[&id], copy_parent);
    }

    for &copy_id in copies.values() {
        if let Some(object) = scene.get_object_mut(copy_id) {
            for modifier in &mut object.modifiers {
                if let ModifierKind::Armature { object: Some(target) } = &mut modifier.kind {
                    if let Some(&remapped) = copies.get(target) {
                        *target = remapped;
                    }
                }
            }
        }
    }

    copies.get(&root).copied()
}
