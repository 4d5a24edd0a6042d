//! Lightmap UV channel creation and the two-tier unwrap.
//!
//! Tier 1 is the host's lightmap packer. When it is disabled or does not
//! finish, Tier 2 runs a smart projection followed by an island pack, and
//! both steps have to finish for the tier to count. The host is back in
//! object mode when [`generate_lightmap_uv`] returns, whichever way it exits.

use std::fmt;

use log::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::host::{
    EditModeGuard, Host, LightmapPackParams, OperatorResult, PackContext, PackIslandsParams,
    SceneQuery, SmartProjectParams,
};
use crate::scene_graph::ObjectId;

pub const LIGHTMAP_UV_NAME: &str = "LightmapUV";

pub const SMART_PROJECT_ANGLE_LIMIT: f32 = 66.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightmapSettings {
    pub atlas_size: u32,
    pub margin_px: u32,
    pub use_lightmap_pack: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapTier {
    LightmapPack,
    SmartProject,
}

impl fmt::Display for UnwrapTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnwrapTier::LightmapPack => write!(f, "lightmap pack"),
            UnwrapTier::SmartProject => write!(f, "smart project"),
        }
    }
}

/// Island margin as a fraction of UV space.
pub fn uv_margin(atlas_size: u32, margin_px: u32) -> f32 {
    margin_px as f32 / atlas_size.max(1) as f32
}

/// Margin for the lightmap packer, expressed as a divisor of the UV square.
pub fn margin_divisor(atlas_size: u32, margin_px: u32) -> f32 {
    (atlas_size as f32 / (margin_px as f32).max(1.0)).max(1.0)
}

/// Finds or creates the lightmap layer and makes it active. Making it the
/// render layer is best-effort.
pub fn ensure_lightmap_uv<H: Host + ?Sized>(host: &mut H, mesh: ObjectId) -> Result<usize> {
    let existing = host
        .mesh_data(mesh)
        .ok_or(PipelineError::JoinedObjectNotFound)?
        .uv_layer_index(LIGHTMAP_UV_NAME);

    let index = match existing {
        Some(index) => index,
        None => {
            let index = host
                .new_uv_layer(mesh, LIGHTMAP_UV_NAME)
                .map_err(|err| PipelineError::UvChannelFailed(err.to_string()))?;
            debug!("Created UV layer {} at index {}", LIGHTMAP_UV_NAME, index);
            index
        }
    };

    host.set_active_uv_layer(mesh, index)
        .map_err(|err| PipelineError::UvChannelFailed(err.to_string()))?;

    if let Err(err) = host.set_active_render_uv_layer(mesh, index) {
        warn!("Could not make {} the render UV layer: {}", LIGHTMAP_UV_NAME, err);
    }

    Ok(index)
}

fn finished(operator: &str, result: OperatorResult) -> bool {
    match result {
        Ok(status) => {
            debug!("{}: {:?}", operator, status);
            status.is_finished()
        }
        Err(err) => {
            warn!("{} failed: {}", operator, err);
            false
        }
    }
}

fn try_lightmap_pack<H: Host + ?Sized>(host: &mut H, settings: &LightmapSettings) -> bool {
    let params = LightmapPackParams {
        context: PackContext::AllFaces,
        pack_in_one: true,
        new_uv_layer: false,
        apply_image: Some(false),
        image_px_size: settings.atlas_size,
        margin_div: Some(margin_divisor(settings.atlas_size, settings.margin_px)),
    };

    match host.lightmap_pack(&params) {
        Ok(status) => status.is_finished(),
        Err(err) => {
            debug!("lightmap_pack rejected full parameters ({}), retrying", err);
            let reduced = LightmapPackParams {
                apply_image: None,
                margin_div: None,
                ..params
            };
            finished("lightmap_pack", host.lightmap_pack(&reduced))
        }
    }
}

fn smart_project_and_pack<H: Host + ?Sized>(host: &mut H, settings: &LightmapSettings) -> bool {
    let margin = uv_margin(settings.atlas_size, settings.margin_px);

    let params = SmartProjectParams {
        angle_limit: SMART_PROJECT_ANGLE_LIMIT,
        island_margin: margin,
        area_weight: Some(0.0),
        use_aspect: true,
    };
    let projected = match host.smart_project(&params) {
        Err(err) if params.area_weight.is_some() => {
            debug!("smart_project rejected area weight ({}), retrying", err);
            host.smart_project(&SmartProjectParams {
                area_weight: None,
                ..params
            })
        }
        other => other,
    };
    let projected = finished("smart_project", projected);

    let packed = finished(
        "pack_islands",
        host.pack_islands(&PackIslandsParams {
            rotate: true,
            margin,
            pin_unselected: false,
        }),
    );

    projected && packed
}

/// Gives `mesh` a packed lightmap UV layer. Returns the tier that succeeded,
/// or `None` when both failed; the layer exists either way.
pub fn generate_lightmap_uv<H: Host + ?Sized>(
    host: &mut H,
    mesh: ObjectId,
    settings: &LightmapSettings,
) -> Result<Option<UnwrapTier>> {
    ensure_lightmap_uv(host, mesh)?;
    host.set_active(Some(mesh));

    let mut editing = match EditModeGuard::enter(host) {
        Ok(guard) => guard,
        Err(err) => {
            warn!("Could not enter edit mode for unwrapping: {}", err);
            return Ok(None);
        }
    };

    if let Err(err) = editing.select_all_geometry() {
        warn!("Could not select all geometry: {}", err);
    }

    if settings.use_lightmap_pack && try_lightmap_pack(&mut *editing, settings) {
        info!("Lightmap UV packed with {}", UnwrapTier::LightmapPack);
        return Ok(Some(UnwrapTier::LightmapPack));
    }

    if smart_project_and_pack(&mut *editing, settings) {
        info!("Lightmap UV packed with {}", UnwrapTier::SmartProject);
        return Ok(Some(UnwrapTier::SmartProject));
    }

    warn!("Both lightmap unwrap strategies failed");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::error::OperatorError;
    use crate::host::{HostSupport, Mode, OperatorStatus, SceneHost};
    use crate::scene_graph::{MeshData, Modifier, Object3D, ObjectKind, Scene};

    const SETTINGS: LightmapSettings = LightmapSettings {
        atlas_size: 4096,
        margin_px: 14,
        use_lightmap_pack: true,
    };

    fn host_with(mesh: MeshData, support: HostSupport) -> (SceneHost, ObjectId) {
        let mut scene = Scene::new();
        let id = scene.add_object(Object3D::mesh("Merged", mesh));
        (SceneHost::new(scene).with_support(support), id)
    }

    fn lightmap_layers(host: &SceneHost, id: ObjectId) -> usize {
        host.mesh_data(id)
            .unwrap()
            .uv_layers()
            .iter()
            .filter(|layer| layer.name == LIGHTMAP_UV_NAME)
            .count()
    }

    fn assert_in_unit_square(host: &SceneHost, id: ObjectId) {
        let layer = host.mesh_data(id).unwrap().uv_layer(LIGHTMAP_UV_NAME).unwrap();
        for uv in &layer.coords {
            assert!(uv.x >= -1e-4 && uv.x <= 1.0 + 1e-4, "{:?}", uv);
            assert!(uv.y >= -1e-4 && uv.y <= 1.0 + 1e-4, "{:?}", uv);
        }
    }

    type HostResult<T, E> = std::result::Result<T, E>;

    /// Records the unwrap operator calls it forwards, and can cancel
    /// `lightmap_pack` or `pack_islands` instead of forwarding them.
    struct RecordingHost {
        inner: SceneHost,
        cancel_lightmap_pack: bool,
        cancel_pack_islands: bool,
        lightmap_packs: Vec<LightmapPackParams>,
        smart_projects: Vec<SmartProjectParams>,
        island_packs: Vec<PackIslandsParams>,
    }

    impl RecordingHost {
        fn new(inner: SceneHost) -> Self {
            RecordingHost {
                inner,
                cancel_lightmap_pack: false,
                cancel_pack_islands: false,
                lightmap_packs: Vec::new(),
                smart_projects: Vec::new(),
                island_packs: Vec::new(),
            }
        }
    }

    impl SceneQuery for RecordingHost {
        fn name(&self, id: ObjectId) -> Option<&str> {
            self.inner.name(id)
        }

        fn kind(&self, id: ObjectId) -> Option<ObjectKind> {
            self.inner.kind(id)
        }

        fn parent(&self, id: ObjectId) -> Option<ObjectId> {
            self.inner.parent(id)
        }

        fn children(&self, id: ObjectId) -> &[ObjectId] {
            self.inner.children(id)
        }

        fn modifiers(&self, id: ObjectId) -> &[Modifier] {
            self.inner.modifiers(id)
        }

        fn find_object(&self, name: &str) -> Option<ObjectId> {
            self.inner.find_object(name)
        }

        fn world_matrix(&self, id: ObjectId) -> Option<Mat4> {
            self.inner.world_matrix(id)
        }

        fn mesh_data(&self, id: ObjectId) -> Option<&MeshData> {
            self.inner.mesh_data(id)
        }
    }

    impl Host for RecordingHost {
        fn mode(&self) -> Mode {
            self.inner.mode()
        }

        fn set_mode(&mut self, mode: Mode) -> HostResult<(), OperatorError> {
            self.inner.set_mode(mode)
        }

        fn active(&self) -> Option<ObjectId> {
            self.inner.active()
        }

        fn set_active(&mut self, id: Option<ObjectId>) {
            self.inner.set_active(id)
        }

        fn selected(&self) -> &[ObjectId] {
            self.inner.selected()
        }

        fn deselect_all(&mut self) {
            self.inner.deselect_all()
        }

        fn select(&mut self, id: ObjectId) -> bool {
            self.inner.select(id)
        }

        fn select_all_geometry(&mut self) -> OperatorResult {
            self.inner.select_all_geometry()
        }

        fn duplicate_hierarchy(&mut self) -> OperatorResult {
            self.inner.duplicate_hierarchy()
        }

        fn join(&mut self) -> OperatorResult {
            self.inner.join()
        }

        fn lightmap_pack(&mut self, params: &LightmapPackParams) -> OperatorResult {
            self.lightmap_packs.push(params.clone());
            if self.cancel_lightmap_pack {
                return Ok(OperatorStatus::Cancelled);
            }
            self.inner.lightmap_pack(params)
        }

        fn smart_project(&mut self, params: &SmartProjectParams) -> OperatorResult {
            self.smart_projects.push(params.clone());
            self.inner.smart_project(params)
        }

        fn pack_islands(&mut self, params: &PackIslandsParams) -> OperatorResult {
            self.island_packs.push(params.clone());
            if self.cancel_pack_islands {
                return Ok(OperatorStatus::Cancelled);
            }
            self.inner.pack_islands(params)
        }

        fn add_modifier(
            &mut self,
            id: ObjectId,
            modifier: Modifier,
        ) -> HostResult<usize, OperatorError> {
            self.inner.add_modifier(id, modifier)
        }

        fn set_armature_target(
            &mut self,
            id: ObjectId,
            modifier_index: usize,
            target: Option<ObjectId>,
        ) -> HostResult<(), OperatorError> {
            self.inner.set_armature_target(id, modifier_index, target)
        }

        fn new_uv_layer(&mut self, id: ObjectId, name: &str) -> HostResult<usize, OperatorError> {
            self.inner.new_uv_layer(id, name)
        }

        fn set_active_uv_layer(
            &mut self,
            id: ObjectId,
            index: usize,
        ) -> HostResult<(), OperatorError> {
            self.inner.set_active_uv_layer(id, index)
        }

        fn set_active_render_uv_layer(
            &mut self,
            id: ObjectId,
            index: usize,
        ) -> HostResult<(), OperatorError> {
            self.inner.set_active_render_uv_layer(id, index)
        }

        fn set_parent_keep_transform(
            &mut self,
            id: ObjectId,
            parent: Option<ObjectId>,
        ) -> HostResult<(), OperatorError> {
            self.inner.set_parent_keep_transform(id, parent)
        }

        fn rename(&mut self, id: ObjectId, name: &str) -> HostResult<String, OperatorError> {
            self.inner.rename(id, name)
        }

        fn remove_object(&mut self, id: ObjectId) -> HostResult<(), OperatorError> {
            self.inner.remove_object(id)
        }

        fn unlink_from_collections(&mut self, id: ObjectId) -> HostResult<usize, OperatorError> {
            self.inner.unlink_from_collections(id)
        }
    }

    fn recording_cube() -> (RecordingHost, ObjectId) {
        let (host, id) = host_with(MeshData::cube(), HostSupport::default());
        (RecordingHost::new(host), id)
    }

    #[test]
    fn lightmap_pack_gets_full_parameters() {
        let (mut host, id) = recording_cube();

        let tier = generate_lightmap_uv(&mut host, id, &SETTINGS).unwrap();

        assert_eq!(tier, Some(UnwrapTier::LightmapPack));
        assert_eq!(host.lightmap_packs.len(), 1);
        let params = &host.lightmap_packs[0];
        assert_eq!(params.context, PackContext::AllFaces);
        assert!(params.pack_in_one);
        assert!(!params.new_uv_layer);
        assert_eq!(params.apply_image, Some(false));
        assert_eq!(params.image_px_size, 4096);
        let divisor = params.margin_div.unwrap();
        assert!((divisor - 292.571_43).abs() < 1e-3, "{}", divisor);
        assert!(host.smart_projects.is_empty());
        assert!(host.island_packs.is_empty());
    }

    #[test]
    fn cancelled_lightmap_pack_runs_projection_with_margin() {
        let (mut host, id) = recording_cube();
        host.cancel_lightmap_pack = true;

        let tier = generate_lightmap_uv(&mut host, id, &SETTINGS).unwrap();

        assert_eq!(tier, Some(UnwrapTier::SmartProject));
        // Cancelled is not a rejection, so no reduced retry.
        assert_eq!(host.lightmap_packs.len(), 1);

        let margin = 14.0 / 4096.0;
        assert_eq!(host.smart_projects.len(), 1);
        let projection = &host.smart_projects[0];
        assert_eq!(projection.angle_limit, 66.0);
        assert!((projection.island_margin - margin).abs() < 1e-7);
        assert_eq!(projection.area_weight, Some(0.0));
        assert!(projection.use_aspect);

        assert_eq!(host.island_packs.len(), 1);
        let packing = &host.island_packs[0];
        assert!(packing.rotate);
        assert!((packing.margin - margin).abs() < 1e-7);
        assert!(!packing.pin_unselected);
    }

    #[test]
    fn cancelled_island_pack_fails_the_projection_tier() {
        let (mut host, id) = recording_cube();
        host.cancel_lightmap_pack = true;
        host.cancel_pack_islands = true;

        let tier = generate_lightmap_uv(&mut host, id, &SETTINGS).unwrap();

        assert_eq!(tier, None);
        assert_eq!(host.smart_projects.len(), 1);
        assert_eq!(host.island_packs.len(), 1);
        assert_eq!(host.mode(), Mode::Object);
        assert_eq!(
            host.mesh_data(id).unwrap().active_uv_index(),
            host.mesh_data(id).unwrap().uv_layer_index(LIGHTMAP_UV_NAME)
        );
    }

    #[test]
    fn margin_conversions() {
        assert!((uv_margin(4096, 14) - 0.003418).abs() < 1e-5);
        assert_eq!(uv_margin(0, 14), 14.0);
        assert!((margin_divisor(4096, 14) - 292.571_43).abs() < 1e-3);
        assert_eq!(margin_divisor(4096, 0), 4096.0);
        assert_eq!(margin_divisor(64, 128), 1.0);
    }

    #[test]
    fn ensure_reuses_existing_layer() {
        let (mut host, id) = host_with(MeshData::quad(), HostSupport::default());
        host.new_uv_layer(id, "UVMap").unwrap();

        let first = ensure_lightmap_uv(&mut host, id).unwrap();
        let second = ensure_lightmap_uv(&mut host, id).unwrap();

        assert_eq!(first, 1);
        assert_eq!(first, second);
        assert_eq!(lightmap_layers(&host, id), 1);
        let mesh = host.mesh_data(id).unwrap();
        assert_eq!(mesh.active_uv_index(), Some(1));
        assert_eq!(mesh.active_render_uv_index(), Some(1));
    }

    #[test]
    fn render_assignment_is_best_effort() {
        let support = HostSupport {
            render_uv_assignment: false,
            ..HostSupport::default()
        };
        let (mut host, id) = host_with(MeshData::quad(), support);
        host.new_uv_layer(id, "UVMap").unwrap();

        let index = ensure_lightmap_uv(&mut host, id).unwrap();

        let mesh = host.mesh_data(id).unwrap();
        assert_eq!(mesh.active_uv_index(), Some(index));
        assert_eq!(mesh.active_render_uv_index(), Some(0));
    }

    #[test]
    fn lightmap_pack_is_preferred() {
        let (mut host, id) = host_with(MeshData::cube(), HostSupport::default());

        let tier = generate_lightmap_uv(&mut host, id, &SETTINGS).unwrap();

        assert_eq!(tier, Some(UnwrapTier::LightmapPack));
        assert_eq!(host.mode(), Mode::Object);
        assert_eq!(lightmap_layers(&host, id), 1);
        assert_in_unit_square(&host, id);
    }

    #[test]
    fn rejected_parameters_retry_reduced() {
        let support = HostSupport {
            lightmap_pack_margin_div: false,
            lightmap_pack_apply_image: false,
            ..HostSupport::default()
        };
        let (mut host, id) = host_with(MeshData::cube(), support);

        let tier = generate_lightmap_uv(&mut host, id, &SETTINGS).unwrap();

        assert_eq!(tier, Some(UnwrapTier::LightmapPack));
        assert_eq!(host.mode(), Mode::Object);
    }

    #[test]
    fn falls_back_to_smart_project() {
        let support = HostSupport {
            lightmap_pack: false,
            smart_project_area_weight: false,
            ..HostSupport::default()
        };
        let (mut host, id) = host_with(MeshData::cube(), support);

        let tier = generate_lightmap_uv(&mut host, id, &SETTINGS).unwrap();

        assert_eq!(tier, Some(UnwrapTier::SmartProject));
        assert_eq!(host.mode(), Mode::Object);
        assert_in_unit_square(&host, id);
    }

    #[test]
    fn disabled_packer_goes_straight_to_fallback() {
        let (mut host, id) = host_with(MeshData::cube(), HostSupport::default());
        let settings = LightmapSettings {
            use_lightmap_pack: false,
            ..SETTINGS
        };

        let tier = generate_lightmap_uv(&mut host, id, &settings).unwrap();

        assert_eq!(tier, Some(UnwrapTier::SmartProject));
    }

    #[test]
    fn faceless_mesh_fails_both_tiers_in_object_mode() {
        let empty = MeshData::new(vec![Vec3::ZERO], Vec::new());
        let (mut host, id) = host_with(empty, HostSupport::default());

        let tier = generate_lightmap_uv(&mut host, id, &SETTINGS).unwrap();

        assert_eq!(tier, None);
        assert_eq!(host.mode(), Mode::Object);
        assert_eq!(lightmap_layers(&host, id), 1);
    }
}
