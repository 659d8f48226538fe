//! Generic serialized-scene decoder.
//!
//! Decodes the object-tree JSON layout used by web scene editors:
//! `geometries` and `materials` tables keyed by uuid, plus an `object`
//! tree whose nodes carry 16-float column-major matrices and reference
//! geometry and material by uuid. Both buffer-attribute geometry and
//! the legacy flat `vertices` list are accepted.

use std::{collections::HashMap, sync::Arc};

use glam::Mat4;
use serde::Deserialize;

use crate::{
    blob::BlobStore,
    material::{MaterialAlphaMode, MaterialAsset, MaterialAssetData},
    mesh::MeshAsset,
    node::{MatrixNodeTransform, NodeAsset, NodeTransform},
    primitive::{PrimitiveAsset, PrimitiveAssetAttributes, PrimitiveAssetMode},
    scene::SceneAsset,
};

use super::{chunk_vec3, scheme::Scheme, DecodeError};

#[derive(Debug, Deserialize)]
struct SerializedDocument {
    #[serde(default)]
    geometries: Vec<SerializedGeometry>,
    #[serde(default)]
    materials: Vec<SerializedMaterial>,
    object: SerializedObject,
}

#[derive(Debug, Deserialize)]
struct SerializedGeometry {
    uuid: String,
    #[serde(default)]
    data: Option<GeometryData>,
    // Legacy layout: flat vertex position list
    #[serde(default)]
    vertices: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize, Default)]
struct GeometryData {
    #[serde(default)]
    attributes: GeometryAttributes,
    #[serde(default)]
    index: Option<IndexAttribute>,
}

#[derive(Debug, Deserialize, Default)]
struct GeometryAttributes {
    #[serde(default)]
    position: Option<FloatAttribute>,
    #[serde(default)]
    normal: Option<FloatAttribute>,
    #[serde(default)]
    uv: Option<FloatAttribute>,
}

#[derive(Debug, Deserialize)]
struct FloatAttribute {
    #[serde(rename = "itemSize")]
    item_size: usize,
    array: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct IndexAttribute {
    array: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct SerializedMaterial {
    uuid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<u32>,
    #[serde(default)]
    transparent: bool,
    #[serde(default)]
    opacity: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaterialRef {
    One(String),
    Many(Vec<String>),
}

impl MaterialRef {
    fn first(&self) -> Option<&str> {
        match self {
            MaterialRef::One(uuid) => Some(uuid),
            MaterialRef::Many(uuids) => uuids.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerializedObject {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    matrix: Option<Vec<f32>>,
    #[serde(default)]
    geometry: Option<String>,
    #[serde(default)]
    material: Option<MaterialRef>,
    #[serde(default)]
    children: Vec<SerializedObject>,
}

/// Decode a serialized scene object. The raw bytes are read back
/// through one temporary blob locator, revoked before returning.
pub fn load_json(raw: &[u8], store: &BlobStore) -> Result<SceneAsset, DecodeError> {
    let handle = store.create(raw.to_vec());
    let result = (|| {
        let scheme = Scheme::try_from(handle.locator())?;
        let data = scheme
            .load(store)
            .ok_or_else(|| DecodeError::ResourceNotFound(handle.locator().to_string()))?
            .1;
        let document: SerializedDocument = serde_json::from_slice(&data)?;
        build_scene(document)
    })();
    drop(handle);
    result
}

fn color_to_rgba(color: u32, opacity: Option<f32>) -> [f32; 4] {
    let r = ((color >> 16) & 0xff) as f32 / 255.0;
    let g = ((color >> 8) & 0xff) as f32 / 255.0;
    let b = (color & 0xff) as f32 / 255.0;
    [r, g, b, opacity.unwrap_or(1.0).clamp(0.0, 1.0)]
}

fn build_scene(document: SerializedDocument) -> Result<SceneAsset, DecodeError> {
    let geometries: HashMap<&str, &SerializedGeometry> = document
        .geometries
        .iter()
        .map(|geometry| (geometry.uuid.as_str(), geometry))
        .collect();
    let materials: HashMap<&str, Arc<MaterialAsset>> = document
        .materials
        .iter()
        .map(|material| {
            let asset = Arc::new(MaterialAsset {
                name: material.name.clone(),
                data: MaterialAssetData::Basic {
                    color: color_to_rgba(material.color.unwrap_or(0xffffff), material.opacity),
                },
                alpha_mode: if material.transparent {
                    MaterialAlphaMode::Blend
                } else {
                    MaterialAlphaMode::Opaque
                },
                double_sided: false,
            });
            (material.uuid.as_str(), asset)
        })
        .collect();

    let root = &document.object;
    let (name, nodes) = if root.kind == "Scene" {
        let nodes = root
            .children
            .iter()
            .map(|child| build_node(child, &geometries, &materials))
            .collect::<Result<_, _>>()?;
        (root.name.clone(), nodes)
    } else {
        (None, vec![build_node(root, &geometries, &materials)?])
    };

    Ok(SceneAsset {
        name,
        root_transform: Default::default(),
        nodes,
    })
}

fn build_node(
    object: &SerializedObject,
    geometries: &HashMap<&str, &SerializedGeometry>,
    materials: &HashMap<&str, Arc<MaterialAsset>>,
) -> Result<NodeAsset, DecodeError> {
    let transform = match &object.matrix {
        Some(matrix) => {
            let matrix: [f32; 16] = matrix.as_slice().try_into().map_err(|_| {
                DecodeError::BadManifest(format!(
                    "object matrix has {} elements, expected 16",
                    matrix.len()
                ))
            })?;
            Some(NodeTransform::Matrix(MatrixNodeTransform(
                Mat4::from_cols_array(&matrix),
            )))
        }
        None => None,
    };

    let mesh = match (object.kind.as_str(), &object.geometry) {
        ("Mesh", Some(uuid)) => {
            let geometry = geometries
                .get(uuid.as_str())
                .ok_or_else(|| DecodeError::ResourceNotFound(uuid.clone()))?;
            let material = object
                .material
                .as_ref()
                .and_then(MaterialRef::first)
                .and_then(|uuid| materials.get(uuid).cloned());
            Some(MeshAsset {
                name: None,
                primitives: vec![build_primitive(geometry, material)?],
            })
        }
        _ => None,
    };

    let children = object
        .children
        .iter()
        .map(|child| build_node(child, geometries, materials))
        .collect::<Result<_, _>>()?;

    Ok(NodeAsset {
        name: object.name.clone(),
        transform,
        mesh,
        children,
    })
}

fn build_primitive(
    geometry: &SerializedGeometry,
    material: Option<Arc<MaterialAsset>>,
) -> Result<PrimitiveAsset, DecodeError> {
    let mut attributes = PrimitiveAssetAttributes::default();
    let mut indices = None;

    if let Some(data) = &geometry.data {
        if let Some(position) = &data.attributes.position {
            if position.item_size != 3 {
                return Err(DecodeError::BadManifest(format!(
                    "position attribute has item size {}",
                    position.item_size
                )));
            }
            attributes.position = chunk_vec3(&position.array);
        }
        if let Some(normal) = &data.attributes.normal {
            if normal.item_size == 3 {
                attributes.normal = chunk_vec3(&normal.array);
            }
        }
        if let Some(uv) = &data.attributes.uv {
            if uv.item_size == 2 {
                attributes.tex_coord = vec![uv
                    .array
                    .chunks_exact(2)
                    .map(|item| item.try_into().unwrap())
                    .collect()];
            }
        }
        indices = data.index.as_ref().map(|index| index.array.clone());
    } else if let Some(vertices) = &geometry.vertices {
        attributes.position = chunk_vec3(vertices);
    }

    Ok(PrimitiveAsset {
        attributes,
        indices,
        material,
        mode: PrimitiveAssetMode::TriangleList,
    })
}
