use std::ops::RangeInclusive;

use log::warn;

use crate::combine::lightmap::LightmapSettings;

pub const ATLAS_SIZE_RANGE: RangeInclusive<u32> = 64..=16384;
pub const MARGIN_PX_RANGE: RangeInclusive<u32> = 0..=128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOptions {
    pub atlas_size: u32,
    pub margin_px: u32,
    pub use_lightmap_pack: bool,
    /// Abort when meshes are bound to different armatures instead of keeping
    /// only the dominant one.
    pub require_same_armature: bool,
    pub duplicate_first: bool,
    pub delete_original_subtree: bool,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            atlas_size: 4096,
            margin_px: 14,
            use_lightmap_pack: true,
            require_same_armature: true,
            duplicate_first: false,
            delete_original_subtree: false,
        }
    }
}

impl JoinOptions {
    pub fn clamped(&self) -> Self {
        let atlas_size = clamp_logged("atlas size", self.atlas_size, &ATLAS_SIZE_RANGE);
        let margin_px = clamp_logged("margin", self.margin_px, &MARGIN_PX_RANGE);
        Self {
            atlas_size,
            margin_px,
            ..self.clone()
        }
    }

    pub fn lightmap_settings(&self) -> LightmapSettings {
        LightmapSettings {
            atlas_size: self.atlas_size,
            margin_px: self.margin_px,
            use_lightmap_pack: self.use_lightmap_pack,
        }
    }
}

fn clamp_logged(what: &str, value: u32, range: &RangeInclusive<u32>) -> u32 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        warn!(
            "{} {}px out of range {}..={}, using {}px",
            what,
            value,
            range.start(),
            range.end(),
            clamped
        );
    }
    clamped
}
