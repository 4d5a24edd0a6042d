//! Face grouping used by the unwrap and pack operators.

use std::collections::{HashMap, HashSet, VecDeque};

use glam::{Vec2, Vec3};

use crate::scene_graph::{MeshData, UvLayer};

const UV_EPSILON: f32 = 1e-6;

type EdgeKey = (u32, u32);

fn edge_key(a: u32, b: u32) -> EdgeKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn face_edges(face: [u32; 3]) -> [(u32, u32); 3] {
    [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])]
}

/// Edge -> faces using it, restricted to `faces`.
fn edge_faces(mesh: &MeshData, faces: &[usize]) -> HashMap<EdgeKey, Vec<usize>> {
    let mut edges: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
    for &face in faces {
        for (a, b) in face_edges(mesh.faces[face]) {
            edges.entry(edge_key(a, b)).or_default().push(face);
        }
    }
    edges
}

fn unit_normal(mesh: &MeshData, face: usize) -> Vec3 {
    mesh.face_normal(face).try_normalize().unwrap_or(Vec3::Z)
}

/// Groups edge-connected faces whose normals stay within `angle_limit`
/// degrees of the normal of the face that started the group.
pub fn islands_by_normal(mesh: &MeshData, faces: &[usize], angle_limit: f32) -> Vec<Vec<usize>> {
    let cos_limit = angle_limit.to_radians().cos();
    let edges = edge_faces(mesh, faces);
    let mut visited = HashSet::new();
    let mut islands = Vec::new();

    for &seed in faces {
        if !visited.insert(seed) {
            continue;
        }

        let seed_normal = unit_normal(mesh, seed);
        let mut island = vec![seed];
        let mut queue = VecDeque::from([seed]);

        while let Some(face) = queue.pop_front() {
            for (a, b) in face_edges(mesh.faces[face]) {
                let Some(neighbours) = edges.get(&edge_key(a, b)) else {
                    continue;
                };
                for &neighbour in neighbours {
                    if visited.contains(&neighbour) {
                        continue;
                    }
                    if unit_normal(mesh, neighbour).dot(seed_normal) >= cos_limit {
                        visited.insert(neighbour);
                        island.push(neighbour);
                        queue.push_back(neighbour);
                    }
                }
            }
        }

        islands.push(island);
    }

    islands
}

fn corner_uv(mesh: &MeshData, layer: &UvLayer, face: usize, vertex: u32) -> Option<Vec2> {
    let corner = mesh.faces[face].iter().position(|&v| v == vertex)?;
    layer.coords.get(face * 3 + corner).copied()
}

/// Groups faces that share an edge with matching UVs on both ends.
pub fn islands_by_uv(mesh: &MeshData, layer: &UvLayer, faces: &[usize]) -> Vec<Vec<usize>> {
    let edges = edge_faces(mesh, faces);
    let index_of = faces
        .iter()
        .enumerate()
        .map(|(i, &face)| (face, i))
        .collect::<HashMap<_, _>>();
    let mut parents = (0..faces.len()).collect::<Vec<_>>();

    fn find(parents: &mut [usize], mut i: usize) -> usize {
        while parents[i] != i {
            parents[i] = parents[parents[i]];
            i = parents[i];
        }
        i
    }

    for (&(a, b), users) in &edges {
        for (i, &first) in users.iter().enumerate() {
            for &second in &users[i + 1..] {
                let connected = [a, b].iter().all(|&vertex| {
                    match (
                        corner_uv(mesh, layer, first, vertex),
                        corner_uv(mesh, layer, second, vertex),
                    ) {
                        (Some(u), Some(v)) => u.abs_diff_eq(v, UV_EPSILON),
                        _ => false,
                    }
                });
                if connected {
                    let root_a = find(&mut parents, index_of[&first]);
                    let root_b = find(&mut parents, index_of[&second]);
                    parents[root_a] = root_b;
                }
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root = HashMap::new();
    for (i, &face) in faces.iter().enumerate() {
        let root = find(&mut parents, i);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(face);
    }
    groups
}
