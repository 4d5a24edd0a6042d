//! The join-children-and-unwrap pipeline.
//!
//! Starting from the host's active object, [`join_children_with_lightmap`]
//! collects every mesh in its subtree, settles on one armature binding,
//! joins the meshes, gives the result a packed `LightmapUV` layer, and
//! optionally deletes the original hierarchy.

use std::collections::BTreeSet;
use std::fmt;

use log::{info, warn};

use crate::config::JoinOptions;
use crate::error::{PipelineError, Result};
use crate::host::{Host, Mode, SceneQuery};
use crate::scene_graph::ObjectId;

pub mod cleanup;
pub mod collector;
pub mod lightmap;
pub mod merge;
pub mod rig;

pub use lightmap::{LightmapSettings, UnwrapTier, LIGHTMAP_UV_NAME};

pub const COMBINED_SUFFIX: &str = "_Combined";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Skinned,
    Static,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Skinned => write!(f, "Skinned"),
            JoinKind::Static => write!(f, "Static"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinReport {
    pub object: ObjectId,
    pub name: String,
    pub kind: JoinKind,
    pub armature: Option<String>,
    pub merged_meshes: usize,
    /// `None` when both unwrap strategies failed.
    pub uv_tier: Option<UnwrapTier>,
    pub removed_objects: usize,
    pub atlas_size: u32,
    pub margin_px: u32,
}

impl JoinReport {
    pub fn uv_ok(&self) -> bool {
        self.uv_tier.is_some()
    }
}

impl fmt::Display for JoinReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} join | LightmapUV {} | {}px / {}px",
            self.kind,
            if self.uv_ok() { "OK" } else { "fallback" },
            self.atlas_size,
            self.margin_px
        )
    }
}

/// `Name.001` becomes `Name_Combined`. `None` when the base name already
/// carries the suffix.
pub fn combined_name(name: &str) -> Option<String> {
    let base = name.split('.').next().unwrap_or(name);
    if base.ends_with(COMBINED_SUFFIX) {
        None
    } else {
        Some(format!("{}{}", base, COMBINED_SUFFIX))
    }
}

fn duplicate_root<H: Host + ?Sized>(host: &mut H, root: ObjectId) -> Result<ObjectId> {
    host.deselect_all();
    host.select(root);
    host.set_active(Some(root));

    match host.duplicate_hierarchy() {
        Ok(status) if status.is_finished() => {}
        Ok(status) => {
            return Err(PipelineError::DuplicateFailed(format!(
                "duplicate returned {:?}",
                status
            )))
        }
        Err(err) => return Err(PipelineError::DuplicateFailed(err.to_string())),
    }

    let copy = host
        .active()
        .ok_or_else(|| PipelineError::DuplicateFailed("no active copy".to_string()))?;
    info!(
        "Duplicated {} as {}",
        host.name(root).unwrap_or("?"),
        host.name(copy).unwrap_or("?")
    );
    Ok(copy)
}

/// Joins every mesh under the active object into one and generates its
/// lightmap UV layer.
///
/// Aborts leave the scene as it was when the failure was detected; nothing
/// already applied is rolled back.
pub fn join_children_with_lightmap<H: Host + ?Sized>(
    host: &mut H,
    options: &JoinOptions,
) -> Result<JoinReport> {
    let options = options.clamped();
    let original_root = host.active().ok_or(PipelineError::NoActiveObject)?;

    if host.mode() != Mode::Object {
        if let Err(err) = host.set_mode(Mode::Object) {
            warn!("Could not switch to object mode: {}", err);
        }
    }

    let subtree_names = if options.delete_original_subtree {
        collector::collect_subtree_names(host, original_root)
    } else {
        BTreeSet::new()
    };

    let root = if options.duplicate_first {
        duplicate_root(host, original_root)?
    } else {
        original_root
    };

    let meshes = collector::collect_meshes(host, Some(root));
    if meshes.is_empty() {
        return Err(PipelineError::NoMeshChildren);
    }
    info!(
        "Found {} meshes under {}",
        meshes.len(),
        host.name(root).unwrap_or("?")
    );

    let rig::RigResolution { meshes, dominant } =
        rig::resolve_rig(host, meshes, options.require_same_armature)?;

    // The root may be consumed by the join.
    let root_parent = host.parent(root);
    let merged_meshes = meshes.len();

    let joined = merge::join_meshes(host, &meshes, dominant)?;
    if let Some(rig) = dominant {
        merge::bind_rig(host, joined, rig)?;
    }

    let uv_tier = lightmap::generate_lightmap_uv(host, joined, &options.lightmap_settings())?;

    if let Err(err) = host.set_parent_keep_transform(joined, root_parent) {
        warn!("Could not move joined mesh next to the root: {}", err);
    }

    let armature = dominant.and_then(|rig| host.name(rig).map(str::to_string));

    let removed_objects = if options.delete_original_subtree {
        let mut keep = BTreeSet::new();
        keep.extend(host.name(joined).map(str::to_string));
        keep.extend(armature.clone());
        cleanup::remove_by_name(host, &subtree_names, &keep)
    } else {
        0
    };

    let current = host.name(joined).unwrap_or_default().to_string();
    let name = match combined_name(&current) {
        Some(wanted) => host.rename(joined, &wanted).unwrap_or_else(|err| {
            warn!("Could not rename {}: {}", current, err);
            current.clone()
        }),
        None => current,
    };

    let report = JoinReport {
        object: joined,
        name,
        kind: if dominant.is_some() {
            JoinKind::Skinned
        } else {
            JoinKind::Static
        },
        armature,
        merged_meshes,
        uv_tier,
        removed_objects,
        atlas_size: options.atlas_size,
        margin_px: options.margin_px,
    };
    info!("{} -> {}", report, report.name);

    Ok(report)
}
