//! The capabilities the join pipeline needs from a 3D host application.
//!
//! [`SceneQuery`] is the read-only view of the object hierarchy used by the
//! collection and rig-resolution stages. [`Host`] adds the ambient editor
//! state (selection, active object, mode) and the native operators the
//! pipeline delegates to. [`SceneHost`] implements both over an in-memory
//! [`Scene`](crate::scene_graph::Scene).

use glam::Mat4;

use crate::error::OperatorError;
use crate::scene_graph::{MeshData, Modifier, ObjectId, ObjectKind};

pub mod mode_guard;
pub mod scene_host;

pub use mode_guard::EditModeGuard;
pub use scene_host::{HostContext, HostSupport, SceneHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Object,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
    Finished,
    Cancelled,
}

impl OperatorStatus {
    pub fn is_finished(self) -> bool {
        self == OperatorStatus::Finished
    }
}

pub type OperatorResult = Result<OperatorStatus, OperatorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackContext {
    AllFaces,
    SelectedFaces,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightmapPackParams {
    pub context: PackContext,
    /// [`SceneHost`] only ever edits one mesh, so it ignores this.
    pub pack_in_one: bool,
    pub new_uv_layer: bool,
    pub apply_image: Option<bool>,
    pub image_px_size: u32,
    /// Margin as a division of the UV square; `None` leaves the host default.
    pub margin_div: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmartProjectParams {
    pub angle_limit: f32,
    pub island_margin: f32,
    pub area_weight: Option<f32>,
    /// Ignored by [`SceneHost`], which has no images to take an aspect from.
    pub use_aspect: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackIslandsParams {
    pub rotate: bool,
    pub margin: f32,
    /// Ignored by [`SceneHost`]: unselected islands never move there.
    pub pin_unselected: bool,
}

pub trait SceneQuery {
    fn name(&self, id: ObjectId) -> Option<&str>;

    fn kind(&self, id: ObjectId) -> Option<ObjectKind>;

    fn parent(&self, id: ObjectId) -> Option<ObjectId>;

    fn children(&self, id: ObjectId) -> &[ObjectId];

    fn modifiers(&self, id: ObjectId) -> &[Modifier];

    fn find_object(&self, name: &str) -> Option<ObjectId>;

    fn world_matrix(&self, id: ObjectId) -> Option<Mat4>;

    fn mesh_data(&self, id: ObjectId) -> Option<&MeshData>;

    fn exists(&self, id: ObjectId) -> bool {
        self.kind(id).is_some()
    }

    fn is_mesh(&self, id: ObjectId) -> bool {
        self.kind(id) == Some(ObjectKind::Mesh)
    }
}

/// Editor state and native operators of the host.
///
/// Operators report `Ok(Finished)` or `Ok(Cancelled)` when they ran, and
/// `Err` when the host rejected the call itself (bad parameters, wrong mode,
/// protected data).
pub trait Host: SceneQuery {
    fn mode(&self) -> Mode;

    fn set_mode(&mut self, mode: Mode) -> Result<(), OperatorError>;

    fn active(&self) -> Option<ObjectId>;

    fn set_active(&mut self, id: Option<ObjectId>);

    fn selected(&self) -> &[ObjectId];

    fn deselect_all(&mut self);

    fn select(&mut self, id: ObjectId) -> bool;

    /// Selects all geometry of the edited mesh. Edit mode only.
    fn select_all_geometry(&mut self) -> OperatorResult;

    /// Duplicates the active object and its descendants; the copy of the
    /// active object becomes active.
    fn duplicate_hierarchy(&mut self) -> OperatorResult;

    fn join(&mut self) -> OperatorResult;

    fn lightmap_pack(&mut self, params: &LightmapPackParams) -> OperatorResult;

    fn smart_project(&mut self, params: &SmartProjectParams) -> OperatorResult;

    fn pack_islands(&mut self, params: &PackIslandsParams) -> OperatorResult;

    fn add_modifier(&mut self, id: ObjectId, modifier: Modifier) -> Result<usize, OperatorError>;

    fn set_armature_target(
        &mut self,
        id: ObjectId,
        modifier_index: usize,
        target: Option<ObjectId>,
    ) -> Result<(), OperatorError>;

    fn new_uv_layer(&mut self, id: ObjectId, name: &str) -> Result<usize, OperatorError>;

    fn set_active_uv_layer(&mut self, id: ObjectId, index: usize) -> Result<(), OperatorError>;

    fn set_active_render_uv_layer(
        &mut self,
        id: ObjectId,
        index: usize,
    ) -> Result<(), OperatorError>;

    fn set_parent_keep_transform(
        &mut self,
        id: ObjectId,
        parent: Option<ObjectId>,
    ) -> Result<(), OperatorError>;

    /// Renames an object and returns the name the host actually assigned.
    fn rename(&mut self, id: ObjectId, name: &str) -> Result<String, OperatorError>;

    fn remove_object(&mut self, id: ObjectId) -> Result<(), OperatorError>;

    /// Unlinks the object from every collection; returns how many held it.
    fn unlink_from_collections(&mut self, id: ObjectId) -> Result<usize, OperatorError>;
}
