use std::collections::BTreeSet;

use log::{debug, warn};

use crate::host::{Host, SceneQuery};

/// Removes every object named in `names` except those in `keep`.
///
/// Names are looked up again at removal time, so objects the join already
/// consumed are skipped. When an object cannot be removed it is unlinked
/// from its collections instead. Returns how many objects were removed or
/// unlinked.
pub fn remove_by_name<H: Host + ?Sized>(
    host: &mut H,
    names: &BTreeSet<String>,
    keep: &BTreeSet<String>,
) -> usize {
    let mut removed = 0;

    for name in names.difference(keep) {
        let Some(id) = host.find_object(name) else {
            debug!("{} already gone", name);
            continue;
        };

        match host.remove_object(id) {
            Ok(()) => {
                debug!("Removed {}", name);
                removed += 1;
            }
            Err(err) => {
                warn!("Could not remove {} ({}), unlinking instead", name, err);
                match host.unlink_from_collections(id) {
                    Ok(0) => {}
                    Ok(_) => removed += 1,
                    Err(err) => warn!("Could not unlink {}: {}", name, err),
                }
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SceneHost;
    use crate::scene_graph::{MeshData, Object3D, Scene};

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn keeps_protected_names() {
        let mut scene = Scene::new();
        let root = scene.add_object(Object3D::empty("Root"));
        let rig = scene.add_child(root, Object3D::armature("Rig"));
        let body = scene.add_child(root, Object3D::mesh("Body", MeshData::quad()));
        let prop = scene.add_child(root, Object3D::mesh("Prop", MeshData::quad()));
        let mut host = SceneHost::new(scene);

        let removed = remove_by_name(
            &mut host,
            &names(&["Root", "Rig", "Body", "Prop", "Consumed"]),
            &names(&["Body", "Rig"]),
        );

        assert_eq!(removed, 2);
        assert!(!host.exists(root));
        assert!(!host.exists(prop));
        assert!(host.exists(rig));
        assert!(host.exists(body));
    }

    #[test]
    fn linked_objects_are_unlinked_instead() {
        let mut scene = Scene::new();
        let mut linked = Object3D::empty("Linked");
        linked.library_linked = true;
        let id = scene.add_object(linked);
        let mut host = SceneHost::new(scene);

        let removed = remove_by_name(&mut host, &names(&["Linked"]), &BTreeSet::new());

        assert_eq!(removed, 1);
        assert!(host.exists(id));
        assert!(!host.scene.is_linked_to_scene(id));
    }
}
