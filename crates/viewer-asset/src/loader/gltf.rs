use std::{collections::HashMap, io::Cursor, sync::Arc};

use glam::{Mat4, Quat, Vec3};
use gltf::{
    image::Format,
    material::AlphaMode,
    mesh::Mode,
    scene::Transform,
    texture::{MagFilter, MinFilter, WrappingMode},
    Document, Gltf, Material, Mesh, Node, Primitive, Scene, Texture,
};
use image::{guess_format, DynamicImage, GenericImageView, ImageFormat, ImageReader};
use log::debug;
use serde_json::Value;

use crate::{
    blob::{BlobHandle, BlobStore},
    material::{MaterialAlphaMode, MaterialAsset, MaterialAssetData},
    mesh::MeshAsset,
    node::{DecomposedTransform, MatrixNodeTransform, NodeAsset, NodeTransform},
    primitive::{PrimitiveAsset, PrimitiveAssetAttributes, PrimitiveAssetMode},
    scene::SceneAsset,
    texture::{
        SamplerAsset, TextureAsset, TextureAssetFormat, TextureInfo, TextureMagFilter,
        TextureMinFilter, TextureWrappingMode,
    },
    LoadParams,
};

use super::{scheme::Scheme, DecodeError, ExternalBuffer};

/// Extensions the decoder set attached to this pipeline can satisfy. A
/// manifest requiring anything else fails before buffer loading.
/// Texture transforms are not carried through to [`TextureInfo`], so
/// KHR_texture_transform is deliberately absent.
const SUPPORTED_EXTENSIONS: &[&str] = &["KHR_materials_unlit"];

fn check_required_extensions(root: &Value) -> Result<(), DecodeError> {
    let Some(required) = root.get("extensionsRequired").and_then(Value::as_array) else {
        return Ok(());
    };
    for extension in required {
        let Some(name) = extension.as_str() else {
            return Err(DecodeError::BadManifest(String::from(
                "extensionsRequired entry is not a string",
            )));
        };
        if !SUPPORTED_EXTENSIONS.contains(&name) {
            return Err(DecodeError::UnsupportedExtension(name.to_string()));
        }
    }
    Ok(())
}

/// Relative buffer URIs of a text manifest, in buffer order. The caller
/// uses this to fetch sidecar buffers before decoding.
pub fn manifest_buffer_uris(manifest: &[u8]) -> Result<Vec<String>, DecodeError> {
    let root: Value = serde_json::from_slice(manifest)?;
    let mut uris = Vec::new();
    if let Some(buffers) = root.get("buffers").and_then(Value::as_array) {
        for buffer in buffers {
            if let Some(uri) = buffer.get("uri").and_then(Value::as_str) {
                if !uri.contains(':') {
                    uris.push(uri.to_string());
                }
            }
        }
    }
    Ok(uris)
}

fn matches_uri(name: &str, uri: &str) -> bool {
    name == uri || name.ends_with(&format!("/{}", uri))
}

/// Rewrite every relative buffer URI that has a supplied sidecar buffer
/// to a freshly materialized blob locator. The returned handles keep
/// the locators alive; dropping them revokes every one.
pub(crate) fn rewrite_buffer_uris(
    root: &mut Value,
    external: &[ExternalBuffer<'_>],
    store: &BlobStore,
) -> Vec<BlobHandle> {
    let mut handles = Vec::new();
    let Some(buffers) = root.get_mut("buffers").and_then(Value::as_array_mut) else {
        return handles;
    };
    for buffer in buffers {
        let Some(uri) = buffer.get("uri").and_then(Value::as_str) else {
            continue;
        };
        if uri.contains(':') {
            // data: and blob: references are already locators
            continue;
        }
        let Some(found) = external.iter().find(|buffer| matches_uri(buffer.name, uri)) else {
            continue;
        };
        let handle = store.create(found.data.to_vec());
        debug!("buffer {} rewritten to {}", uri, handle.locator());
        buffer["uri"] = Value::String(handle.locator().to_string());
        handles.push(handle);
    }
    handles
}

/// Load a GLB container from a slice.
pub fn load_glb(raw: &[u8], params: &LoadParams, store: &BlobStore) -> Result<SceneAsset, DecodeError> {
    // The container is read back through a typed blob locator so its
    // lifetime is governed by one revocable handle.
    let handle = store.create(raw.to_vec());
    let result = (|| {
        let scheme = Scheme::try_from(handle.locator())?;
        let data = scheme
            .load(store)
            .ok_or_else(|| DecodeError::ResourceNotFound(handle.locator().to_string()))?
            .1;
        let (document, buffers, images) = gltf::import_slice(&data)?;
        let mut loader = SceneLoader::new(&buffers, &images, params);
        loader.load(&document)
    })();
    drop(handle);
    result
}

/// Load a GLTF text manifest with externally supplied buffers.
///
/// Buffer references inside the manifest are resolved by locator only,
/// so each supplied buffer is published under a temporary blob locator
/// and the manifest's URI is rewritten, textually, before parsing. The
/// locators are revoked when decoding finishes, whether it succeeded
/// or not.
pub fn load_gltf(
    manifest: &[u8],
    external: &[ExternalBuffer<'_>],
    params: &LoadParams,
    store: &BlobStore,
) -> Result<SceneAsset, DecodeError> {
    let mut root: Value = serde_json::from_slice(manifest)?;
    check_required_extensions(&root)?;

    let handles = rewrite_buffer_uris(&mut root, external, store);
    let rewritten = serde_json::to_vec(&root)?;
    let result = load_rewritten_manifest(&rewritten, params, store);
    drop(handles);
    result
}

fn load_rewritten_manifest(
    manifest: &[u8],
    params: &LoadParams,
    store: &BlobStore,
) -> Result<SceneAsset, DecodeError> {
    let gltf = Gltf::from_slice(manifest)?;

    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let uri = match buffer.source() {
            gltf::buffer::Source::Bin => {
                return Err(DecodeError::BadManifest(String::from(
                    "text manifest references a GLB BIN chunk",
                )))
            }
            gltf::buffer::Source::Uri(uri) => uri,
        };
        let scheme = Scheme::try_from(uri)?;

        // If MIME is specified, check the MIME
        if let Scheme::Data(Some(mime), _) = &scheme {
            if !mime.eq_ignore_ascii_case("application/octet-stream")
                && !mime.eq_ignore_ascii_case("application/gltf-buffer")
            {
                return Err(DecodeError::BadBufferMime(
                    uri.to_string(),
                    Some(mime.to_string()),
                ));
            }
        }

        let Some((_mime, mut data)) = scheme.load(store) else {
            return Err(DecodeError::ResourceNotFound(uri.to_string()));
        };

        // Pad the data to 4 bytes with zeroes
        while data.len() % 4 != 0 {
            data.push(0);
        }

        buffers.push(gltf::buffer::Data(data));
    }

    let mut images = Vec::new();
    for (index, image) in gltf.images().enumerate() {
        match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let buffer_index = view.buffer().index();
                let buffer = buffers.get(buffer_index).ok_or(
                    DecodeError::ImageBufferOutOfBounds(index, buffer_index, buffers.len()),
                )?;
                let start = view.offset();
                let end = start + view.length();
                let data = buffer.0.get(start..end).ok_or(
                    DecodeError::ImageBufferOutOfBounds(index, buffer_index, buffers.len()),
                )?;

                let source = format!("buffer #{}", buffer_index);
                let image_format = ImageFormat::from_mime_type(mime_type)
                    .ok_or_else(|| DecodeError::BadImageMime(source.clone(), mime_type.into()))?;
                images.push(decode_image(&source, data, image_format)?);
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let scheme = Scheme::try_from(uri)?;
                let Some((load_mime, data)) = scheme.load(store) else {
                    return Err(DecodeError::ResourceNotFound(uri.to_string()));
                };

                let mime = mime_type.or(load_mime);
                let image_format = if let Some(mime) = mime {
                    ImageFormat::from_mime_type(mime)
                        .ok_or_else(|| DecodeError::BadImageMime(uri.to_string(), mime.into()))?
                } else {
                    guess_format(&data)
                        .map_err(|error| DecodeError::BadImage(uri.to_string(), error))?
                };
                images.push(decode_image(uri, &data, image_format)?);
            }
        }
    }

    let mut loader = SceneLoader::new(&buffers, &images, params);
    loader.load(&gltf.document)
}

fn decode_image(
    source: &str,
    data: &[u8],
    format: ImageFormat,
) -> Result<gltf::image::Data, DecodeError> {
    let mut reader = ImageReader::new(Cursor::new(data));
    reader.set_format(format);
    let image = reader
        .decode()
        .map_err(|error| DecodeError::BadImage(source.to_string(), error))?;

    let format = match image {
        DynamicImage::ImageLuma8(_) => Format::R8,
        DynamicImage::ImageLumaA8(_) => Format::R8G8,
        DynamicImage::ImageRgb8(_) => Format::R8G8B8,
        DynamicImage::ImageRgba8(_) => Format::R8G8B8A8,
        DynamicImage::ImageLuma16(_) => Format::R16,
        DynamicImage::ImageLumaA16(_) => Format::R16G16,
        DynamicImage::ImageRgb16(_) => Format::R16G16B16,
        DynamicImage::ImageRgba16(_) => Format::R16G16B16A16,
        DynamicImage::ImageRgb32F(_) => Format::R32G32B32FLOAT,
        DynamicImage::ImageRgba32F(_) => Format::R32G32B32A32FLOAT,
        _unsupported => {
            return Err(DecodeError::BadImageMime(
                source.to_string(),
                String::from("unknown"),
            ))
        }
    };
    let (width, height) = image.dimensions();
    let pixels = image.into_bytes();
    Ok(gltf::image::Data {
        format,
        width,
        height,
        pixels,
    })
}

struct SceneLoader<'a> {
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    params: &'a LoadParams,
    textures: HashMap<usize, Arc<TextureAsset>>,
    materials: HashMap<usize, Arc<MaterialAsset>>,
}

impl<'a> SceneLoader<'a> {
    fn new(
        buffers: &'a [gltf::buffer::Data],
        images: &'a [gltf::image::Data],
        params: &'a LoadParams,
    ) -> Self {
        Self {
            buffers,
            images,
            params,
            textures: HashMap::new(),
            materials: HashMap::new(),
        }
    }

    fn load_texture(&mut self, texture: Texture<'_>) -> Result<Arc<TextureAsset>, DecodeError> {
        let index = texture.index();
        if let Some(loaded) = self.textures.get(&index) {
            return Ok(loaded.clone());
        }

        let source_index = texture.source().index();
        let image = self
            .images
            .get(source_index)
            .ok_or(DecodeError::ImageBufferOutOfBounds(
                source_index,
                source_index,
                self.images.len(),
            ))?;
        let format = match image.format {
            Format::R8 => TextureAssetFormat::Ru8,
            Format::R8G8 => TextureAssetFormat::Rgu8,
            Format::R8G8B8 => TextureAssetFormat::Rgbu8,
            Format::R8G8B8A8 => TextureAssetFormat::Rgbau8,
            Format::R16 => TextureAssetFormat::Ru16,
            Format::R16G16 => TextureAssetFormat::Rgu16,
            Format::R16G16B16 => TextureAssetFormat::Rgbu16,
            Format::R16G16B16A16 => TextureAssetFormat::Rgbau16,
            unsupported => return Err(DecodeError::UnsupportedTextureFormat(unsupported)),
        };

        let sampler = texture.sampler();
        let sampler = SamplerAsset {
            mag_filter: match sampler.mag_filter() {
                Some(MagFilter::Nearest) => TextureMagFilter::Nearest,
                _ => TextureMagFilter::Linear,
            },
            min_filter: match sampler.min_filter() {
                Some(
                    MinFilter::Linear
                    | MinFilter::LinearMipmapNearest
                    | MinFilter::LinearMipmapLinear,
                ) => TextureMinFilter::Linear,
                _ => TextureMinFilter::Nearest,
            },
            wrap_x: wrapping_mode(sampler.wrap_s()),
            wrap_y: wrapping_mode(sampler.wrap_t()),
        };

        let loaded = Arc::new(TextureAsset {
            name: texture.name().map(str::to_string),
            size: (image.width, image.height),
            format,
            data: image.pixels.clone(),
            sampler,
        });
        self.textures.insert(index, loaded.clone());
        Ok(loaded)
    }

    fn load_material(&mut self, material: Material<'_>) -> Result<Arc<MaterialAsset>, DecodeError> {
        let index = material.index().unwrap_or_default();
        if let Some(loaded) = self.materials.get(&index) {
            return Ok(loaded.clone());
        }

        let pbr = material.pbr_metallic_roughness();
        let base_color_texture = match pbr.base_color_texture() {
            Some(info) => {
                let texture = self.load_texture(info.texture())?;
                Some(TextureInfo {
                    texture,
                    tex_coord: info.tex_coord() as usize,
                })
            }
            None => None,
        };

        let data = if material.unlit() && !self.params.disable_unlit {
            MaterialAssetData::Unlit {
                base_color_factor: pbr.base_color_factor(),
                base_color_texture,
            }
        } else {
            MaterialAssetData::Pbr {
                base_color_factor: pbr.base_color_factor(),
                base_color_texture,
                metallic_factor: pbr.metallic_factor(),
                roughness_factor: pbr.roughness_factor(),
            }
        };

        let loaded = Arc::new(MaterialAsset {
            name: material.name().map(str::to_string),
            data,
            alpha_mode: match material.alpha_mode() {
                AlphaMode::Opaque => MaterialAlphaMode::Opaque,
                AlphaMode::Mask => MaterialAlphaMode::Mask(material.alpha_cutoff().unwrap_or(0.5)),
                AlphaMode::Blend => MaterialAlphaMode::Blend,
            },
            double_sided: material.double_sided(),
        });
        self.materials.insert(index, loaded.clone());
        Ok(loaded)
    }

    fn load_primitive(&mut self, primitive: Primitive<'_>) -> Result<PrimitiveAsset, DecodeError> {
        let mode = match primitive.mode() {
            Mode::Points => PrimitiveAssetMode::Points,
            Mode::Lines => PrimitiveAssetMode::LineList,
            Mode::LineStrip => PrimitiveAssetMode::LineStrip,
            Mode::Triangles => PrimitiveAssetMode::TriangleList,
            Mode::TriangleStrip => PrimitiveAssetMode::TriangleStrip,
            unsupported => return Err(DecodeError::UnsupportedPrimitiveMode(unsupported)),
        };

        let material = match primitive.material().index() {
            Some(_) => Some(self.load_material(primitive.material())?),
            None => None,
        };

        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

        let position = reader
            .read_positions()
            .map(|positions| positions.collect())
            .unwrap_or_default();
        let normal = reader
            .read_normals()
            .map(|normals| normals.collect())
            .unwrap_or_default();

        let mut tex_coord = Vec::new();
        let mut set = 0;
        while let Some(coords) = reader.read_tex_coords(set) {
            tex_coord.push(coords.into_f32().collect());
            set += 1;
        }

        let mut color = Vec::new();
        let mut set = 0;
        while let Some(colors) = reader.read_colors(set) {
            color.push(
                colors
                    .into_rgba_f32()
                    .map(|rgba| rgba.map(|value| value.clamp(0.0, 1.0)))
                    .collect(),
            );
            set += 1;
        }

        let indices = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect());

        Ok(PrimitiveAsset {
            attributes: PrimitiveAssetAttributes {
                position,
                normal,
                tex_coord,
                color,
            },
            indices,
            material,
            mode,
        })
    }

    fn load_mesh(&mut self, mesh: Mesh<'_>) -> Result<MeshAsset, DecodeError> {
        let primitives = mesh
            .primitives()
            .map(|primitive| self.load_primitive(primitive))
            .collect::<Result<_, _>>()?;
        Ok(MeshAsset {
            name: mesh.name().map(str::to_string),
            primitives,
        })
    }

    fn load_node(&mut self, node: Node<'_>) -> Result<NodeAsset, DecodeError> {
        let transform = match node.transform() {
            Transform::Matrix { matrix } => {
                NodeTransform::Matrix(MatrixNodeTransform(Mat4::from_cols_array_2d(&matrix)))
            }
            Transform::Decomposed {
                translation,
                rotation,
                scale,
            } => NodeTransform::Decomposed(DecomposedTransform {
                translation: Vec3::from_array(translation),
                rotation: Quat::from_array(rotation),
                scale: Vec3::from_array(scale),
            }),
        };
        let mesh = match node.mesh() {
            Some(mesh) => Some(self.load_mesh(mesh)?),
            None => None,
        };
        let children = node
            .children()
            .map(|child| self.load_node(child))
            .collect::<Result<_, _>>()?;
        Ok(NodeAsset {
            name: node.name().map(str::to_string),
            transform: Some(transform),
            mesh,
            children,
        })
    }

    fn load_scene(&mut self, scene: Scene<'_>) -> Result<SceneAsset, DecodeError> {
        let nodes = scene
            .nodes()
            .map(|node| self.load_node(node))
            .collect::<Result<_, _>>()?;
        Ok(SceneAsset {
            name: scene.name().map(str::to_string),
            root_transform: DecomposedTransform::default(),
            nodes,
        })
    }

    fn load(&mut self, document: &Document) -> Result<SceneAsset, DecodeError> {
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or(DecodeError::NoScene)?;
        self.load_scene(scene)
    }
}

fn wrapping_mode(mode: WrappingMode) -> TextureWrappingMode {
    match mode {
        WrappingMode::ClampToEdge => TextureWrappingMode::ClampToEdge,
        WrappingMode::MirroredRepeat => TextureWrappingMode::MirroredRepeat,
        WrappingMode::Repeat => TextureWrappingMode::Repeat,
    }
}

#[cfg(test)]
mod test {
    use serde_json::{json, Value};

    use super::{load_glb, load_gltf, manifest_buffer_uris, rewrite_buffer_uris};
    use crate::{
        blob::{BlobStore, BLOB_SCHEME},
        bounds::scene_bounds,
        loader::{DecodeError, ExternalBuffer},
        LoadParams,
    };

    fn triangle_buffer() -> Vec<u8> {
        let positions: [f32; 9] = [-1.0, -1.0, -1.0, 1.0, 0.0, 2.0, 3.0, 3.0, 3.0];
        positions
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect()
    }

    fn manifest(buffer_uri: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0 }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
            "buffers": [{ "byteLength": 36, "uri": buffer_uri }],
            "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
            "accessors": [{
                "bufferView": 0,
                "byteOffset": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [-1.0, -1.0, -1.0],
                "max": [3.0, 3.0, 3.0]
            }]
        }))
        .unwrap()
    }

    fn glb(manifest: &[u8], buffer: &[u8]) -> Vec<u8> {
        let mut json_chunk = manifest.to_vec();
        while json_chunk.len() % 4 != 0 {
            json_chunk.push(b' ');
        }
        let mut bin_chunk = buffer.to_vec();
        while bin_chunk.len() % 4 != 0 {
            bin_chunk.push(0);
        }

        let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json_chunk);
        out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin_chunk);
        out
    }

    #[test]
    fn text_manifest_with_external_buffer() {
        let store = BlobStore::new();
        let buffer = triangle_buffer();
        let scene = load_gltf(
            &manifest("mesh.bin"),
            &[ExternalBuffer {
                name: "mesh.bin",
                data: &buffer,
            }],
            &LoadParams::default(),
            &store,
        )
        .unwrap();

        let bounds = scene_bounds(&scene).unwrap();
        assert!(!bounds.is_degenerate());
        assert_eq!(store.created(), store.revoked());
        assert_eq!(store.live(), 0);
    }

    #[test]
    fn rewrite_replaces_relative_uri_with_blob_locator() {
        let store = BlobStore::new();
        let buffer = triangle_buffer();
        let mut root: Value = serde_json::from_slice(&manifest("mesh.bin")).unwrap();
        let handles = rewrite_buffer_uris(
            &mut root,
            &[ExternalBuffer {
                name: "mesh.bin",
                data: &buffer,
            }],
            &store,
        );
        assert_eq!(handles.len(), 1);
        let uri = root["buffers"][0]["uri"].as_str().unwrap();
        assert!(uri.starts_with(BLOB_SCHEME));
        assert_ne!(uri, "mesh.bin");
    }

    #[test]
    fn missing_external_buffer_fails_and_leaks_nothing() {
        let store = BlobStore::new();
        let error = load_gltf(&manifest("mesh.bin"), &[], &LoadParams::default(), &store)
            .unwrap_err();
        assert!(matches!(error, DecodeError::ResourceNotFound(uri) if uri == "mesh.bin"));
        assert_eq!(store.created(), store.revoked());
    }

    #[test]
    fn data_uri_buffer_needs_no_rewrite() {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let store = BlobStore::new();
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            STANDARD.encode(triangle_buffer())
        );
        let scene = load_gltf(&manifest(&uri), &[], &LoadParams::default(), &store).unwrap();
        assert!(scene_bounds(&scene).is_some());
    }

    #[test]
    fn required_draco_extension_is_rejected() {
        let store = BlobStore::new();
        let mut root: Value = serde_json::from_slice(&manifest("mesh.bin")).unwrap();
        root["extensionsRequired"] = serde_json::json!(["KHR_draco_mesh_compression"]);
        let manifest = serde_json::to_vec(&root).unwrap();

        let error = load_gltf(&manifest, &[], &LoadParams::default(), &store).unwrap_err();
        assert!(
            matches!(error, DecodeError::UnsupportedExtension(name)
                if name == "KHR_draco_mesh_compression")
        );
        // Rejected before any locator was materialized
        assert_eq!(store.created(), 0);
    }

    #[test]
    fn required_texture_transform_is_rejected() {
        let store = BlobStore::new();
        let mut root: Value = serde_json::from_slice(&manifest("mesh.bin")).unwrap();
        root["extensionsRequired"] = serde_json::json!(["KHR_texture_transform"]);
        let manifest = serde_json::to_vec(&root).unwrap();

        let error = load_gltf(&manifest, &[], &LoadParams::default(), &store).unwrap_err();
        assert!(
            matches!(error, DecodeError::UnsupportedExtension(name)
                if name == "KHR_texture_transform")
        );
    }

    #[test]
    fn glb_container_decodes_directly() {
        let store = BlobStore::new();
        let mut root: Value = serde_json::from_slice(&manifest("unused")).unwrap();
        root["buffers"] = serde_json::json!([{ "byteLength": 36 }]);
        let manifest = serde_json::to_vec(&root).unwrap();

        let scene = load_glb(
            &glb(&manifest, &triangle_buffer()),
            &LoadParams::default(),
            &store,
        )
        .unwrap();
        let bounds = scene_bounds(&scene).unwrap();
        assert!(!bounds.is_degenerate());
        assert_eq!(store.created(), store.revoked());
    }

    #[test]
    fn buffer_uris_are_listed_for_prefetch() {
        let uris = manifest_buffer_uris(&manifest("mesh.bin")).unwrap();
        assert_eq!(uris, vec![String::from("mesh.bin")]);

        let uris = manifest_buffer_uris(&manifest("data:application/octet-stream;base64,AA=="))
            .unwrap();
        assert!(uris.is_empty());
    }
}
