//! Armature binding resolution across the candidate meshes.

use log::{debug, info};

use crate::error::{PipelineError, Result};
use crate::host::SceneQuery;
use crate::scene_graph::{ObjectId, ObjectKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RigResolution {
    pub meshes: Vec<ObjectId>,
    pub dominant: Option<ObjectId>,
}

/// Index of the first armature modifier whose target is an armature object.
pub fn armature_modifier_index<Q: SceneQuery + ?Sized>(scene: &Q, mesh: ObjectId) -> Option<usize> {
    if !scene.is_mesh(mesh) {
        return None;
    }
    scene.modifiers(mesh).iter().position(|modifier| {
        modifier
            .armature_target()
            .is_some_and(|target| scene.kind(target) == Some(ObjectKind::Armature))
    })
}

pub fn armature_binding<Q: SceneQuery + ?Sized>(scene: &Q, mesh: ObjectId) -> Option<ObjectId> {
    let index = armature_modifier_index(scene, mesh)?;
    scene.modifiers(mesh)[index].armature_target()
}

/// Distinct bindings with their counts, in first-encountered order.
fn binding_counts(bindings: &[Option<ObjectId>]) -> Vec<(Option<ObjectId>, usize)> {
    let mut counts: Vec<(Option<ObjectId>, usize)> = Vec::new();
    for &binding in bindings {
        match counts.iter_mut().find(|(seen, _)| *seen == binding) {
            Some((_, count)) => *count += 1,
            None => counts.push((binding, 1)),
        }
    }
    counts
}

/// Most frequent binding; ties go to the one encountered first.
fn most_common(counts: &[(Option<ObjectId>, usize)]) -> Option<ObjectId> {
    let mut best: Option<(Option<ObjectId>, usize)> = None;
    for &(binding, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((binding, count));
        }
    }
    best.and_then(|(binding, _)| binding)
}

fn binding_name<Q: SceneQuery + ?Sized>(scene: &Q, binding: Option<ObjectId>) -> String {
    binding
        .and_then(|rig| scene.name(rig))
        .unwrap_or("None")
        .to_string()
}

/// Picks the rig the joined mesh will be bound to.
///
/// With a single distinct binding (all static, or all on one rig) every mesh
/// is kept. Otherwise `require_same` aborts with the list of rigs found, and
/// without it only meshes bound to the most common rig are kept.
pub fn resolve_rig<Q: SceneQuery + ?Sized>(
    scene: &Q,
    meshes: Vec<ObjectId>,
    require_same: bool,
) -> Result<RigResolution> {
    let bindings = meshes
        .iter()
        .map(|&mesh| armature_binding(scene, mesh))
        .collect::<Vec<_>>();
    let counts = binding_counts(&bindings);

    if counts.len() <= 1 {
        let dominant = counts.first().and_then(|&(binding, _)| binding);
        debug!(
            "Single binding for {} meshes: {}",
            meshes.len(),
            binding_name(scene, dominant)
        );
        return Ok(RigResolution { meshes, dominant });
    }

    if require_same {
        let names = counts
            .iter()
            .map(|&(binding, _)| binding_name(scene, binding))
            .collect();
        return Err(PipelineError::MultipleArmatures { names });
    }

    let dominant = most_common(&counts);
    let kept = meshes
        .iter()
        .zip(&bindings)
        .filter(|(_, &binding)| binding == dominant)
        .map(|(&mesh, _)| mesh)
        .collect::<Vec<_>>();

    if kept.is_empty() {
        return Err(PipelineError::NoCommonArmature);
    }

    info!(
        "Keeping {} of {} meshes bound to dominant armature {}",
        kept.len(),
        meshes.len(),
        binding_name(scene, dominant)
    );

    Ok(RigResolution {
        meshes: kept,
        dominant,
    })
}
