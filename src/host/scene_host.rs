use glam::Mat4;
use log::debug;

use crate::asset_pipeline::{mesh_join, uv_unwrap};
use crate::error::OperatorError;
use crate::host::{
    Host, LightmapPackParams, Mode, OperatorResult, OperatorStatus, PackContext,
    PackIslandsParams, SceneQuery, SmartProjectParams,
};
use crate::scene_graph::{MeshData, Modifier, ModifierKind, ObjectId, ObjectKind, Scene};

/// Margin used by `lightmap_pack` when no divisor is given, in pixels.
const DEFAULT_LIGHTMAP_MARGIN_PX: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HostContext {
    pub active: Option<ObjectId>,
    pub selected: Vec<ObjectId>,
    pub mode: Mode,
}

impl Default for HostContext {
    fn default() -> Self {
        Self {
            active: None,
            selected: Vec::new(),
            mode: Mode::Object,
        }
    }
}

/// Optional operator parameters this host accepts. Older hosts reject some
/// of them, which callers must handle by retrying without.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSupport {
    pub lightmap_pack: bool,
    pub lightmap_pack_margin_div: bool,
    pub lightmap_pack_apply_image: bool,
    pub smart_project_area_weight: bool,
    pub render_uv_assignment: bool,
}

impl Default for HostSupport {
    fn default() -> Self {
        Self {
            lightmap_pack: true,
            lightmap_pack_margin_div: true,
            lightmap_pack_apply_image: true,
            smart_project_area_weight: true,
            render_uv_assignment: true,
        }
    }
}

pub struct SceneHost {
    pub scene: Scene,
    pub support: HostSupport,
    context: HostContext,
}

impl SceneHost {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            support: HostSupport::default(),
            context: HostContext::default(),
        }
    }

    pub fn with_support(mut self, support: HostSupport) -> Self {
        self.support = support;
        self
    }

    pub fn context(&self) -> &HostContext {
        &self.context
    }

    pub fn into_scene(self) -> Scene {
        self.scene
    }

    fn require_mode(&self, operator: &'static str, mode: Mode) -> Result<(), OperatorError> {
        if self.context.mode != mode {
            return Err(OperatorError::invalid_context(
                operator,
                format!("requires {:?} mode", mode),
            ));
        }
        Ok(())
    }

    /// The mesh being edited, plus the faces an operator should touch.
    fn edit_mesh(
        &mut self,
        operator: &'static str,
        context: PackContext,
    ) -> Result<(&mut MeshData, Vec<usize>), OperatorError> {
        self.require_mode(operator, Mode::Edit)?;
        let active = self
            .context
            .active
            .ok_or_else(|| OperatorError::invalid_context(operator, "no active object"))?;
        let mesh = self
            .scene
            .get_object_mut(active)
            .and_then(|object| object.mesh.as_mut())
            .ok_or_else(|| OperatorError::invalid_context(operator, "active object is not a mesh"))?;

        let faces = match context {
            PackContext::AllFaces => (0..mesh.num_faces()).collect(),
            PackContext::SelectedFaces => mesh.selected_faces(),
        };
        Ok((mesh, faces))
    }

    fn mesh_mut(&mut self, id: ObjectId) -> Result<&mut MeshData, OperatorError> {
        let object = self
            .scene
            .get_object_mut(id)
            .ok_or(OperatorError::ObjectNotFound)?;
        if object.library_linked {
            return Err(OperatorError::LinkedData(object.name.clone()));
        }
        object
            .mesh
            .as_mut()
            .ok_or_else(|| OperatorError::invalid_context("uv_layers", "object has no mesh data"))
    }
}

fn finished_if(done: bool) -> OperatorStatus {
    if done {
        OperatorStatus::Finished
    } else {
        OperatorStatus::Cancelled
    }
}

impl SceneQuery for Scene {
    fn name(&self, id: ObjectId) -> Option<&str> {
        self.get_object(id).map(|object| object.name.as_str())
    }

    fn kind(&self, id: ObjectId) -> Option<ObjectKind> {
        self.get_object(id).map(|object| object.kind)
    }

    fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.get_object(id).and_then(|object| object.parent_id)
    }

    fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.get_object(id)
            .map(|object| object.child_ids.as_slice())
            .unwrap_or(&[])
    }

    fn modifiers(&self, id: ObjectId) -> &[Modifier] {
        self.get_object(id)
            .map(|object| object.modifiers.as_slice())
            .unwrap_or(&[])
    }

    fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.get_object_by_name(name)
    }

    fn world_matrix(&self, id: ObjectId) -> Option<Mat4> {
        Scene::world_matrix(self, id)
    }

    fn mesh_data(&self, id: ObjectId) -> Option<&MeshData> {
        self.get_object(id).and_then(|object| object.mesh.as_ref())
    }
}

impl SceneQuery for SceneHost {
    fn name(&self, id: ObjectId) -> Option<&str> {
        self.scene.name(id)
    }

    fn kind(&self, id: ObjectId) -> Option<ObjectKind> {
        self.scene.kind(id)
    }

    fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        SceneQuery::parent(&self.scene, id)
    }

    fn children(&self, id: ObjectId) -> &[ObjectId] {
        SceneQuery::children(&self.scene, id)
    }

    fn modifiers(&self, id: ObjectId) -> &[Modifier] {
        self.scene.modifiers(id)
    }

    fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.scene.find_object(name)
    }

    fn world_matrix(&self, id: ObjectId) -> Option<Mat4> {
        self.scene.world_matrix(id)
    }

    fn mesh_data(&self, id: ObjectId) -> Option<&MeshData> {
        self.scene.mesh_data(id)
    }
}

impl Host for SceneHost {
    fn mode(&self) -> Mode {
        self.context.mode
    }

    fn set_mode(&mut self, mode: Mode) -> Result<(), OperatorError> {
        if mode == Mode::Edit {
            let editable = self
                .context
                .active
                .and_then(|id| self.scene.get_object(id))
                .is_some_and(|object| object.is_mesh() && !object.library_linked);
            if !editable {
                return Err(OperatorError::invalid_context(
                    "mode_set",
                    "edit mode needs an active, local mesh object",
                ));
            }
        }
        debug!("Mode {:?} -> {:?}", self.context.mode, mode);
        self.context.mode = mode;
        Ok(())
    }

    fn active(&self) -> Option<ObjectId> {
        self.context
            .active
            .filter(|&id| self.scene.get_object(id).is_some())
    }

    fn set_active(&mut self, id: Option<ObjectId>) {
        self.context.active = id.filter(|&id| self.scene.get_object(id).is_some());
    }

    fn selected(&self) -> &[ObjectId] {
        &self.context.selected
    }

    fn deselect_all(&mut self) {
        self.context.selected.clear();
    }

    fn select(&mut self, id: ObjectId) -> bool {
        if self.scene.get_object(id).is_none() {
            return false;
        }
        if !self.context.selected.contains(&id) {
            self.context.selected.push(id);
        }
        true
    }

    fn select_all_geometry(&mut self) -> OperatorResult {
        let (mesh, _) = self.edit_mesh("select_all", PackContext::AllFaces)?;
        mesh.select_all_faces(true);
        Ok(OperatorStatus::Finished)
    }

    fn duplicate_hierarchy(&mut self) -> OperatorResult {
        self.require_mode("duplicate", Mode::Object)?;
        let Some(active) = self.active() else {
            return Ok(OperatorStatus::Cancelled);
        };

        let Some(copy) = mesh_join::duplicate_hierarchy(&mut self.scene, active) else {
            return Ok(OperatorStatus::Cancelled);
        };

        self.context.selected = vec![copy];
        self.context.active = Some(copy);
        Ok(OperatorStatus::Finished)
    }

    fn join(&mut self) -> OperatorResult {
        self.require_mode("join", Mode::Object)?;
        let Some(active) = self.active() else {
            return Ok(OperatorStatus::Cancelled);
        };

        self.context
            .selected
            .retain(|&id| self.scene.get_object(id).is_some());
        let selected = self.context.selected.clone();

        let joinable = selected.contains(&active)
            && selected.iter().all(|&id| {
                self.scene
                    .get_object(id)
                    .is_some_and(|object| object.is_mesh() && !object.library_linked)
            });
        if !joinable {
            debug!("Join cancelled: selection is not all local meshes including the active one");
            return Ok(OperatorStatus::Cancelled);
        }

        mesh_join::join_objects(&mut self.scene, active, &selected)?;
        self.context.selected = vec![active];
        Ok(OperatorStatus::Finished)
    }

    fn lightmap_pack(&mut self, params: &LightmapPackParams) -> OperatorResult {
        if !self.support.lightmap_pack {
            return Err(OperatorError::invalid_context(
                "lightmap_pack",
                "operator not available",
            ));
        }
        if params.margin_div.is_some() && !self.support.lightmap_pack_margin_div {
            return Err(OperatorError::UnsupportedParameter {
                operator: "lightmap_pack",
                parameter: "PREF_MARGIN_DIV",
            });
        }
        if params.apply_image.is_some() && !self.support.lightmap_pack_apply_image {
            return Err(OperatorError::UnsupportedParameter {
                operator: "lightmap_pack",
                parameter: "PREF_APPLY_IMAGE",
            });
        }

        let margin = match params.margin_div {
            Some(divisor) if divisor > 0.0 => 1.0 / divisor,
            _ => DEFAULT_LIGHTMAP_MARGIN_PX / params.image_px_size.max(1) as f32,
        };

        let (mesh, faces) = self.edit_mesh("lightmap_pack", params.context)?;
        if params.new_uv_layer {
            let index = mesh.add_uv_layer("lightmap");
            mesh.set_active_uv_index(index);
        }
        Ok(finished_if(uv_unwrap::lightmap_pack(mesh, &faces, margin)))
    }

    fn smart_project(&mut self, params: &SmartProjectParams) -> OperatorResult {
        if params.area_weight.is_some() && !self.support.smart_project_area_weight {
            return Err(OperatorError::UnsupportedParameter {
                operator: "smart_project",
                parameter: "area_weight",
            });
        }

        let (mesh, faces) = self.edit_mesh("smart_project", PackContext::SelectedFaces)?;
        Ok(finished_if(uv_unwrap::smart_project(
            mesh,
            &faces,
            params.angle_limit,
            params.island_margin,
            params.area_weight.unwrap_or(0.0),
        )))
    }

    fn pack_islands(&mut self, params: &PackIslandsParams) -> OperatorResult {
        let (mesh, faces) = self.edit_mesh("pack_islands", PackContext::SelectedFaces)?;
        Ok(finished_if(uv_unwrap::repack(
            mesh,
            &faces,
            params.margin,
            params.rotate,
        )))
    }

    fn add_modifier(&mut self, id: ObjectId, modifier: Modifier) -> Result<usize, OperatorError> {
        let object = self
            .scene
            .get_object_mut(id)
            .ok_or(OperatorError::ObjectNotFound)?;
        if object.library_linked {
            return Err(OperatorError::LinkedData(object.name.clone()));
        }
        object.modifiers.push(modifier);
        Ok(object.modifiers.len() - 1)
    }

    fn set_armature_target(
        &mut self,
        id: ObjectId,
        modifier_index: usize,
        target: Option<ObjectId>,
    ) -> Result<(), OperatorError> {
        let object = self
            .scene
            .get_object_mut(id)
            .ok_or(OperatorError::ObjectNotFound)?;
        match object.modifiers.get_mut(modifier_index).map(|m| &mut m.kind) {
            Some(ModifierKind::Armature { object }) => {
                *object = target;
                Ok(())
            }
            _ => Err(OperatorError::invalid_context(
                "modifier",
                format!("modifier {} is not an armature modifier", modifier_index),
            )),
        }
    }

    fn new_uv_layer(&mut self, id: ObjectId, name: &str) -> Result<usize, OperatorError> {
        Ok(self.mesh_mut(id)?.add_uv_layer(name))
    }

    fn set_active_uv_layer(&mut self, id: ObjectId, index: usize) -> Result<(), OperatorError> {
        if self.mesh_mut(id)?.set_active_uv_index(index) {
            Ok(())
        } else {
            Err(OperatorError::invalid_context(
                "uv_layers",
                format!("no UV layer at index {}", index),
            ))
        }
    }

    fn set_active_render_uv_layer(
        &mut self,
        id: ObjectId,
        index: usize,
    ) -> Result<(), OperatorError> {
        if !self.support.render_uv_assignment {
            return Err(OperatorError::UnsupportedParameter {
                operator: "uv_layers",
                parameter: "active_render",
            });
        }
        if self.mesh_mut(id)?.set_active_render_uv_index(index) {
            Ok(())
        } else {
            Err(OperatorError::invalid_context(
                "uv_layers",
                format!("no UV layer at index {}", index),
            ))
        }
    }

    fn set_parent_keep_transform(
        &mut self,
        id: ObjectId,
        parent: Option<ObjectId>,
    ) -> Result<(), OperatorError> {
        if self.scene.set_parent_keep_transform(id, parent) {
            Ok(())
        } else {
            Err(OperatorError::invalid_context("parent_set", "invalid parent"))
        }
    }

    fn rename(&mut self, id: ObjectId, name: &str) -> Result<String, OperatorError> {
        self.scene.rename(id, name).ok_or(OperatorError::ObjectNotFound)
    }

    fn remove_object(&mut self, id: ObjectId) -> Result<(), OperatorError> {
        self.scene.remove_object(id)?;
        self.context.selected.retain(|&selected| selected != id);
        if self.context.active == Some(id) {
            self.context.active = None;
        }
        Ok(())
    }

    fn unlink_from_collections(&mut self, id: ObjectId) -> Result<usize, OperatorError> {
        if self.scene.get_object(id).is_none() {
            return Err(OperatorError::ObjectNotFound);
        }
        Ok(self.scene.unlink_from_collections(id))
    }
}
