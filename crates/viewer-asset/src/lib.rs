//! Asset handling for the model viewer.
//!
//! This library turns downloaded bytes into a displayable scene graph.
//! It provides a node structure which is structured upon GLTF, decoders
//! for GLB, GLTF-with-external-buffers, serialized-scene JSON and ZIP
//! bundles, and the bounds normalization that re-centers arbitrary
//! assets about the origin. Temporary in-memory buffers are exposed to
//! decoders through revocable blob locators so that loaders which only
//! resolve resources by locator string can address downloaded data.

pub mod archive;
pub mod blob;
pub mod bounds;
#[cfg(feature = "zip")]
pub mod bundle;
pub mod index;
/// Scene decoders for the supported source formats.
pub mod loader;
pub mod material;
pub mod mesh;
pub mod node;
pub mod normalize;
pub mod primitive;
pub mod scene;
pub mod texture;

#[derive(Debug, Clone)]
pub struct LoadParams {
    pub disable_unlit: bool,
    pub manifest_extension: String,
    pub buffer_extension: String,
}

impl Default for LoadParams {
    fn default() -> Self {
        Self {
            disable_unlit: false,
            manifest_extension: String::from("gltf"),
            buffer_extension: String::from("bin"),
        }
    }
}
