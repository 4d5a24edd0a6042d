//! Subtree discovery.

use std::collections::{BTreeSet, HashSet};

use crate::host::SceneQuery;
use crate::scene_graph::ObjectId;

/// Every mesh in the subtree of `root`, root included when it is a mesh, in
/// depth-first order without duplicates. Empty when `root` is absent.
pub fn collect_meshes<Q: SceneQuery + ?Sized>(scene: &Q, root: Option<ObjectId>) -> Vec<ObjectId> {
    let Some(root) = root.filter(|&root| scene.exists(root)) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    if scene.is_mesh(root) {
        found.push(root);
    }
    collect_descendant_meshes(scene, root, &mut found);

    let mut seen = HashSet::new();
    found.retain(|id| seen.insert(*id));
    found
}

fn collect_descendant_meshes<Q: SceneQuery + ?Sized>(
    scene: &Q,
    parent: ObjectId,
    out: &mut Vec<ObjectId>,
) {
    for &child in scene.children(parent) {
        if scene.is_mesh(child) {
            out.push(child);
        }
        collect_descendant_meshes(scene, child, out);
    }
}

/// Names of `root` and every descendant, captured before anything mutates
/// the hierarchy.
pub fn collect_subtree_names<Q: SceneQuery + ?Sized>(scene: &Q, root: ObjectId) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_names(scene, root, &mut names);
    names
}

fn collect_names<Q: SceneQuery + ?Sized>(scene: &Q, id: ObjectId, names: &mut BTreeSet<String>) {
    let Some(name) = scene.name(id) else {
        return;
    };
    names.insert(name.to_string());
    for &child in scene.children(id) {
        collect_names(scene, child, names);
    }
}
