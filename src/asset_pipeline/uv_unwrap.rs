//! Planar-projection unwrapping for the in-memory host.

use glam::{Vec2, Vec3};
use log::debug;

use crate::asset_pipeline::uv_islands::{islands_by_normal, islands_by_uv};
use crate::asset_pipeline::uv_pack::{pack_islands, UvIsland};
use crate::scene_graph::MeshData;

fn project(points: [Vec3; 3], normal: Vec3) -> [Vec2; 3] {
    let normal = normal.try_normalize().unwrap_or(Vec3::Z);
    let (tangent, bitangent) = normal.any_orthonormal_pair();
    points.map(|point| Vec2::new(point.dot(tangent), point.dot(bitangent)))
}

fn write_islands(mesh: &mut MeshData, islands: &[UvIsland]) -> bool {
    let Some(layer) = mesh.active_uv_layer_mut() else {
        return false;
    };
    for island in islands {
        for (&face, &uvs) in island.faces.iter().zip(&island.corners) {
            layer.set_face_uvs(face, uvs);
        }
    }
    true
}

/// Splits `faces` into islands by normal angle, projects each island onto the
/// plane of its mean normal and packs the result into the active UV layer.
///
/// `area_weight` in [0, 1] blends the mean normal from per-face to
/// area-weighted.
pub fn smart_project(
    mesh: &mut MeshData,
    faces: &[usize],
    angle_limit: f32,
    island_margin: f32,
    area_weight: f32,
) -> bool {
    if faces.is_empty() || mesh.active_uv_layer().is_none() {
        return false;
    }

    let area_weight = area_weight.clamp(0.0, 1.0);
    let mut islands = islands_by_normal(mesh, faces, angle_limit)
        .into_iter()
        .map(|island_faces| {
            let normal = island_faces
                .iter()
                .map(|&face| {
                    let weight = 1.0 - area_weight + area_weight * mesh.face_area(face);
                    mesh.face_normal(face).normalize_or_zero() * weight
                })
                .sum::<Vec3>();
            let corners = island_faces
                .iter()
                .map(|&face| project(mesh.face_positions(face), normal))
                .collect();
            UvIsland::new(island_faces, corners)
        })
        .collect::<Vec<_>>();

    debug!("Smart project: {} islands from {} faces", islands.len(), faces.len());

    pack_islands(&mut islands, island_margin, true) && write_islands(mesh, &islands)
}

/// Gives every face its own island, projected onto its own plane, and packs
/// them into the active UV layer.
pub fn lightmap_pack(mesh: &mut MeshData, faces: &[usize], margin: f32) -> bool {
    if faces.is_empty() || mesh.active_uv_layer().is_none() {
        return false;
    }

    let mut islands = faces
        .iter()
        .map(|&face| {
            let corners = project(mesh.face_positions(face), mesh.face_normal(face));
            UvIsland::new(vec![face], vec![corners])
        })
        .collect::<Vec<_>>();

    debug!("Lightmap pack: {} faces", faces.len());

    pack_islands(&mut islands, margin, true) && write_islands(mesh, &islands)
}

/// Re-packs the existing islands of the active UV layer.
pub fn repack(mesh: &mut MeshData, faces: &[usize], margin: f32, rotate: bool) -> bool {
    let Some(layer) = mesh.active_uv_layer() else {
        return false;
    };
    if faces.is_empty() {
        return false;
    }

    let mut islands = islands_by_uv(mesh, layer, faces)
        .into_iter()
        .map(|island_faces| {
            let corners = island_faces
                .iter()
                .map(|&face| layer.face_uvs(face))
                .collect();
            UvIsland::new(island_faces, corners)
        })
        .collect::<Vec<_>>();

    debug!("Pack islands: {} islands", islands.len());

    pack_islands(&mut islands, margin, rotate) && write_islands(mesh, &islands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rect;

    fn cube_with_layer() -> (MeshData, Vec<usize>) {
        let mut cube = MeshData::cube();
        cube.add_uv_layer("LightmapUV");
        let faces = (0..cube.num_faces()).collect();
        (cube, faces)
    }

    fn face_rects(mesh: &MeshData) -> Vec<Rect> {
        let layer = mesh.active_uv_layer().unwrap();
        (0..mesh.num_faces())
            .map(|face| Rect::from_points(layer.face_uvs(face)).unwrap())
            .collect()
    }

    #[test]
    fn smart_project_keeps_uvs_in_unit_square() {
        let (mut cube, faces) = cube_with_layer();

        assert!(smart_project(&mut cube, &faces, 66.0, 14.0 / 4096.0, 0.0));

        let unit = Rect::new(Vec2::ZERO, Vec2::ONE);
        for uv in &cube.active_uv_layer().unwrap().coords {
            assert!(unit.contains_point(*uv), "{uv}");
        }
    }

    #[test]
    fn lightmap_pack_gives_each_face_its_own_space() {
        let (mut cube, faces) = cube_with_layer();

        assert!(lightmap_pack(&mut cube, &faces, 0.01));

        let rects = face_rects(&cube);
        for (i, rect) in rects.iter().enumerate() {
            for other in &rects[i + 1..] {
                assert!(!rect.overlaps(other));
            }
        }
    }

    #[test]
    fn operators_need_faces_and_a_layer() {
        let mut cube = MeshData::cube();
        let faces = (0..cube.num_faces()).collect::<Vec<_>>();
        assert!(!lightmap_pack(&mut cube, &faces, 0.0));

        cube.add_uv_layer("UVMap");
        assert!(!smart_project(&mut cube, &[], 66.0, 0.0, 0.0));
    }

    #[test]
    fn repack_after_projection_stays_in_bounds() {
        let (mut cube, faces) = cube_with_layer();
        assert!(smart_project(&mut cube, &faces, 66.0, 0.0, 0.0));

        assert!(repack(&mut cube, &faces, 0.02, true));

        let unit = Rect::new(Vec2::ZERO, Vec2::ONE);
        assert!(cube
            .active_uv_layer()
            .unwrap()
            .coords
            .iter()
            .all(|uv| unit.contains_point(*uv)));
    }
}
