use crate::texture::TextureInfo;

/// Lighting parameters for the material.
#[derive(Debug, Clone)]
pub enum MaterialAssetData {
    /// The standard lighting model for GLTF.
    Pbr {
        base_color_factor: [f32; 4],
        base_color_texture: Option<TextureInfo>,
        metallic_factor: f32,
        roughness_factor: f32,
    },
    /// GLTF KHR_materials_unlit. The simplest lighting model.
    Unlit {
        base_color_factor: [f32; 4],
        base_color_texture: Option<TextureInfo>,
    },
    /// Flat single-color material from serialized-scene JSON.
    Basic { color: [f32; 4] },
}

#[derive(Debug, Clone, Copy, Default)]
pub enum MaterialAlphaMode {
    #[default]
    Opaque,
    // Alpha cutoff
    Mask(f32),
    Blend,
}

#[derive(Debug, Clone)]
pub struct MaterialAsset {
    pub name: Option<String>,
    pub data: MaterialAssetData,
    pub alpha_mode: MaterialAlphaMode,
    pub double_sided: bool,
}
