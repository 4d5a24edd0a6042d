use std::collections::HashMap;
use std::path::Path;

use glam::{Mat4, Quat, Vec2, Vec3};
use gltf::buffer;
use itertools::Itertools;
use log::{debug, info, warn};

use crate::error::ImportError;
use crate::scene_graph::mesh_data::MeshData;
use crate::scene_graph::modifier::Modifier;
use crate::scene_graph::object3d::{Object3D, ObjectId, ObjectKind};
use crate::scene_graph::scene::Scene;
use crate::scene_graph::transform::Transform;

pub type Buffers<'a> = &'a [buffer::Data];

pub const IMPORTED_UV_LAYER: &str = "UVMap";

impl Scene {
    pub fn load_gltf(path: impl AsRef<Path>) -> Result<Scene, ImportError> {
        let (document, buffers, _images) = gltf::import(path.as_ref())?;
        let gltf_scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or(ImportError::NoScene)?;

        let mut scene = Scene::new();
        let roots = scene.spawn_gltf_scene(&document, &buffers, &gltf_scene)?;
        info!(
            "Loaded {} ({} root objects, {} objects)",
            path.as_ref().display(),
            roots.len(),
            scene.object_count()
        );

        Ok(scene)
    }

    /// Spawns every node of `gltf_scene`, then turns skins into armatures.
    /// Returns the ids of the spawned root objects.
    pub fn spawn_gltf_scene(
        &mut self,
        document: &gltf::Document,
        buffers: Buffers,
        gltf_scene: &gltf::Scene,
    ) -> Result<Vec<ObjectId>, ImportError> {
        let mut node_objects = HashMap::new();
        let mut roots = Vec::new();

        for node in gltf_scene.nodes() {
            roots.push(self.spawn_gltf_node(buffers, &node, None, &mut node_objects)?);
        }

        for skin in document.skins() {
            let skin_name = skin
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("Armature.{}", skin.index()));

            let armature_id = match skin
                .skeleton()
                .and_then(|node| node_objects.get(&node.index()).copied())
            {
                Some(id) => {
                    if let Some(object) = self.get_object_mut(id) {
                        object.kind = ObjectKind::Armature;
                    }
                    id
                }
                None => self.add_object(Object3D::armature(skin_name)),
            };

            for node in document.nodes() {
                let uses_skin = node.skin().map(|s| s.index()) == Some(skin.index());
                if !uses_skin {
                    continue;
                }
                if let Some(object) = node_objects
                    .get(&node.index())
                    .and_then(|&id| self.get_object_mut(id))
                {
                    debug!("Binding {} to skin {}", object.name, skin.index());
                    object
                        .modifiers
                        .push(Modifier::armature("Armature", Some(armature_id)));
                }
            }
        }

        Ok(roots)
    }

    fn spawn_gltf_node(
        &mut self,
        buffers: Buffers,
        node: &gltf::Node,
        parent: Option<ObjectId>,
        node_objects: &mut HashMap<usize, ObjectId>,
    ) -> Result<ObjectId, ImportError> {
        let node_name = node
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("Node.{}", node.index()));
        let (translation, rotation, scale) = node.transform().decomposed();

        let mut object = match node.mesh() {
            Some(mesh) => Object3D::mesh(node_name.clone(), mesh_from_gltf(&mesh, buffers)?),
            None => Object3D::empty(node_name),
        };
        object.transform = Transform::from_trs(
            Vec3::from(translation),
            Quat::from_array(rotation),
            Vec3::from(scale),
        );

        let object_id = match parent {
            Some(parent_id) => self.add_child(parent_id, object),
            None => self.add_object(object),
        };
        node_objects.insert(node.index(), object_id);

        for child in node.children() {
            self.spawn_gltf_node(buffers, &child, Some(object_id), node_objects)?;
        }

        Ok(object_id)
    }
}

/// Groups a triangle list into faces. Every index must name a vertex; a
/// trailing partial triangle is dropped.
fn triangles(
    mesh_name: &str,
    indices: &[u32],
    vertices: usize,
) -> Result<Vec<[u32; 3]>, ImportError> {
    if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertices) {
        return Err(ImportError::IndexOutOfRange {
            mesh: mesh_name.to_string(),
            index,
            vertices,
        });
    }

    let leftover = indices.len() % 3;
    if leftover != 0 {
        warn!(
            "Mesh '{}': dropping {} indices of an incomplete triangle",
            mesh_name, leftover
        );
    }

    Ok(indices[..indices.len() - leftover]
        .iter()
        .copied()
        .tuples()
        .map(|(a, b, c)| [a, b, c])
        .collect())
}

/// Concatenates every triangle primitive of a glTF mesh into one payload.
fn mesh_from_gltf(mesh: &gltf::Mesh, buffers: Buffers) -> Result<MeshData, ImportError> {
    let mesh_name = mesh
        .name()
        .map(String::from)
        .unwrap_or_else(|| format!("Mesh.{}", mesh.index()));
    let mut data = MeshData::default();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            return Err(ImportError::UnsupportedPrimitive {
                mesh: mesh_name,
                mode: primitive.mode(),
            });
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions = reader
            .read_positions()
            .ok_or_else(|| ImportError::MissingPositions(mesh_name.clone()))?
            .map(Vec3::from)
            .collect::<Vec<Vec3>>();

        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
            None => (0..positions.len() as u32).collect(),
        };
        let faces = triangles(&mesh_name, &indices, positions.len())?;

        let tex_coords = reader
            .read_tex_coords(0)
            .map(|coords| coords.into_f32().map(Vec2::from).collect::<Vec<Vec2>>());

        let mut part = MeshData::new(positions, faces);
        if let Some(tex_coords) = tex_coords {
            let corners = part
                .faces
                .iter()
                .flat_map(|face| {
                    face.map(|vertex| {
                        tex_coords
                            .get(vertex as usize)
                            .copied()
                            .unwrap_or(Vec2::ZERO)
                    })
                })
                .collect::<Vec<_>>();
            let index = part.add_uv_layer(IMPORTED_UV_LAYER);
            part.set_uv_coords(index, corners);
        }

        data.append(&part, Mat4::IDENTITY);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    // One triangle: three positions, then u16 indices [0, 1, 7] padded to four bytes.
    const BAD_INDEX_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "Broken", "mesh": 0 }],
        "meshes": [{
            "name": "Broken",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }]
        }],
        "buffers": [{
            "byteLength": 44,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAcAAAA="
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;

    #[test]
    fn triangles_group_indices() {
        let faces = triangles("Quad", &[0, 1, 2, 0, 2, 3], 4).unwrap();
        assert_eq!(faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn incomplete_triangle_is_dropped() {
        let faces = triangles("Strip", &[0, 1, 2, 2, 1], 3).unwrap();
        assert_eq!(faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let err = triangles("Broken", &[0, 1, 7], 3).unwrap_err();
        assert!(matches!(
            err,
            ImportError::IndexOutOfRange { index: 7, vertices: 3, .. }
        ));
    }

    #[test]
    fn document_with_bad_index_fails_to_spawn() {
        let (document, buffers, _images) = gltf::import_slice(BAD_INDEX_GLTF.as_bytes()).unwrap();
        let gltf_scene = document.default_scene().unwrap();

        let mut scene = Scene::new();
        let err = scene
            .spawn_gltf_scene(&document, &buffers, &gltf_scene)
            .unwrap_err();

        assert!(matches!(
            err,
            ImportError::IndexOutOfRange { ref mesh, index: 7, vertices: 3 } if mesh == "Broken"
        ));
    }
}
