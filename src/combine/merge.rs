//! Selection, join and rig repair.

use log::{debug, info, warn};

use crate::combine::rig::{armature_binding, armature_modifier_index};
use crate::error::{PipelineError, Result};
use crate::host::{Host, Mode, SceneQuery};
use crate::scene_graph::{Modifier, ObjectId};

pub const ARMATURE_MODIFIER_NAME: &str = "Armature";

/// The mesh that survives the join: the first one already bound to
/// `dominant`, or the first mesh when none is.
pub fn choose_active<Q: SceneQuery + ?Sized>(
    scene: &Q,
    meshes: &[ObjectId],
    dominant: Option<ObjectId>,
) -> Option<ObjectId> {
    dominant
        .and_then(|rig| {
            meshes
                .iter()
                .copied()
                .find(|&mesh| armature_binding(scene, mesh) == Some(rig))
        })
        .or_else(|| meshes.first().copied())
}

pub fn join_meshes<H: Host + ?Sized>(
    host: &mut H,
    meshes: &[ObjectId],
    dominant: Option<ObjectId>,
) -> Result<ObjectId> {
    let active = choose_active(host, meshes, dominant).ok_or(PipelineError::NoMeshChildren)?;

    if host.mode() != Mode::Object {
        if let Err(err) = host.set_mode(Mode::Object) {
            warn!("Could not switch to object mode before joining: {}", err);
        }
    }

    host.deselect_all();
    for &mesh in meshes {
        if !host.select(mesh) {
            warn!("Could not select {:?} for joining", host.name(mesh));
        }
    }
    host.set_active(Some(active));

    debug!(
        "Joining {} meshes into {}",
        meshes.len(),
        host.name(active).unwrap_or("?")
    );

    match host.join() {
        Ok(status) if status.is_finished() => {}
        Ok(status) => {
            warn!("Join returned {:?}", status);
            return Err(PipelineError::JoinFailed);
        }
        Err(err) => {
            warn!("Join rejected: {}", err);
            return Err(PipelineError::JoinFailed);
        }
    }

    host.active()
        .filter(|&joined| host.is_mesh(joined))
        .ok_or(PipelineError::JoinedObjectNotFound)
}

/// Makes sure `mesh` deforms with `rig`, adding an armature modifier when it
/// has no usable one.
pub fn bind_rig<H: Host + ?Sized>(host: &mut H, mesh: ObjectId, rig: ObjectId) -> Result<()> {
    let index = match armature_modifier_index(host, mesh) {
        Some(index) => index,
        None => {
            let index = host
                .add_modifier(mesh, Modifier::armature(ARMATURE_MODIFIER_NAME, Some(rig)))
                .map_err(|err| PipelineError::RigBindingFailed(err.to_string()))?;
            info!(
                "Added armature modifier to {}",
                host.name(mesh).unwrap_or("?")
            );
            index
        }
    };

    host.set_armature_target(mesh, index, Some(rig))
        .map_err(|err| PipelineError::RigBindingFailed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SceneHost;
    use crate::scene_graph::{MeshData, Object3D, Scene};

    fn bound_mesh(name: &str, rig: ObjectId) -> Object3D {
        Object3D::mesh(name, MeshData::quad())
            .with_modifier(Modifier::armature(ARMATURE_MODIFIER_NAME, Some(rig)))
    }

    #[test]
    fn active_prefers_mesh_bound_to_dominant_rig() {
        let mut scene = Scene::new();
        let rig = scene.add_object(Object3D::armature("Rig"));
        let loose = scene.add_object(Object3D::mesh("Loose", MeshData::quad()));
        let body = scene.add_object(bound_mesh("Body", rig));
        let head = scene.add_object(bound_mesh("Head", rig));

        assert_eq!(choose_active(&scene, &[loose, body, head], Some(rig)), Some(body));
        assert_eq!(choose_active(&scene, &[loose, body, head], None), Some(loose));
        assert_eq!(choose_active(&scene, &[], Some(rig)), None);
    }

    #[test]
    fn active_defaults_to_first_when_nothing_is_bound() {
        let mut scene = Scene::new();
        let rig = scene.add_object(Object3D::armature("Rig"));
        let a = scene.add_object(Object3D::mesh("A", MeshData::quad()));
        let b = scene.add_object(Object3D::mesh("B", MeshData::quad()));

        assert_eq!(choose_active(&scene, &[a, b], Some(rig)), Some(a));
    }

    #[test]
    fn join_keeps_chosen_active() {
        let mut scene = Scene::new();
        let rig = scene.add_object(Object3D::armature("Rig"));
        let a = scene.add_object(Object3D::mesh("A", MeshData::quad()));
        let b = scene.add_object(bound_mesh("B", rig));
        let mut host = SceneHost::new(scene);

        let joined = join_meshes(&mut host, &[a, b], Some(rig)).unwrap();

        assert_eq!(joined, b);
        assert!(!host.exists(a));
        assert_eq!(host.mesh_data(b).unwrap().num_faces(), 4);
        assert_eq!(host.mode(), Mode::Object);
    }

    #[test]
    fn cancelled_join_is_an_error() {
        let mut scene = Scene::new();
        let a = scene.add_object(Object3D::mesh("A", MeshData::quad()));
        let mut linked = Object3D::mesh("Linked", MeshData::quad());
        linked.library_linked = true;
        let b = scene.add_object(linked);
        let mut host = SceneHost::new(scene);

        assert_eq!(
            join_meshes(&mut host, &[a, b], None),
            Err(PipelineError::JoinFailed)
        );
        assert!(host.exists(b));
    }

    #[test]
    fn bind_rig_adds_missing_modifier() {
        let mut scene = Scene::new();
        let rig = scene.add_object(Object3D::armature("Rig"));
        let mesh = scene.add_object(
            Object3D::mesh("Body", MeshData::quad())
                .with_modifier(Modifier::armature(ARMATURE_MODIFIER_NAME, None)),
        );
        let mut host = SceneHost::new(scene);

        bind_rig(&mut host, mesh, rig).unwrap();
        bind_rig(&mut host, mesh, rig).unwrap();

        let modifiers = host.modifiers(mesh);
        assert_eq!(modifiers.len(), 2);
        assert_eq!(modifiers[1].armature_target(), Some(rig));
        assert_eq!(armature_binding(&host, mesh), Some(rig));
    }

    #[test]
    fn bind_rig_retargets_existing_modifier() {
        let mut scene = Scene::new();
        let old_rig = scene.add_object(Object3D::armature("Old"));
        let rig = scene.add_object(Object3D::armature("Rig"));
        let mesh = scene.add_object(bound_mesh("Body", old_rig));
        let mut host = SceneHost::new(scene);

        bind_rig(&mut host, mesh, rig).unwrap();

        assert_eq!(host.modifiers(mesh).len(), 1);
        assert_eq!(armature_binding(&host, mesh), Some(rig));
    }
}
