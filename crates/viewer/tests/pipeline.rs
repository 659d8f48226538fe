use std::{
    io::{Cursor, Write},
    sync::Arc,
};

use glam::Vec3;
use serde_json::json;
use viewer::{
    asset::{bounds::scene_bounds, index::AssetId, LoadParams},
    net::{RawAsset, SourceDescriptor},
    pipeline::{LoadedModel, Pipeline, PipelineError},
};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

const EPSILON: f32 = 1e-5;

fn raw(url: &str, format_tag: Option<&str>, bytes: Vec<u8>) -> RawAsset {
    RawAsset {
        descriptor: SourceDescriptor {
            url: url.to_string(),
            content_type: None,
            format_tag: format_tag.map(str::to_string),
        },
        bytes,
    }
}

/// Triangle spanning (-1,-1,-1) .. (3,3,3); its box center is (1,1,1).
fn triangle_buffer() -> Vec<u8> {
    let positions: [f32; 9] = [-1.0, -1.0, -1.0, 1.0, 0.0, 2.0, 3.0, 3.0, 3.0];
    positions
        .iter()
        .flat_map(|value| value.to_le_bytes())
        .collect()
}

fn gltf_manifest(buffer_uri: &str) -> Vec<u8> {
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

fn glb_container() -> Vec<u8> {
    let mut manifest: serde_json::Value =
        serde_json::from_slice(&gltf_manifest("unused")).unwrap();
    manifest["buffers"] = json!([{ "byteLength": 36 }]);
    let mut json_chunk = serde_json::to_vec(&manifest).unwrap();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let bin_chunk = triangle_buffer();

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

fn data_uri_manifest() -> Vec<u8> {
    use base64::{engine::general_purpose::STANDARD, Engine};

    // Inlined buffer, so no sidecar fetch happens
    let encoded = STANDARD.encode(triangle_buffer());
    gltf_manifest(&format!("data:application/octet-stream;base64,{}", encoded))
}

fn serialized_scene() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "geometries": [{
            "uuid": "geom-1",
            "type": "BufferGeometry",
            "data": {
                "attributes": {
                    "position": {
                        "itemSize": 3,
                        "array": [-1.0, -1.0, -1.0, 1.0, 0.0, 2.0, 3.0, 3.0, 3.0]
                    }
                }
            }
        }],
        "object": {
            "type": "Scene",
            "children": [{ "type": "Mesh", "geometry": "geom-1" }]
        }
    }))
    .unwrap()
}

fn bundle_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn assert_centered(model: &LoadedModel) {
    let bounds = scene_bounds(&model.scene).expect("scene has geometry");
    assert!(!bounds.is_degenerate());
    assert!(bounds.center().distance(Vec3::ZERO) < EPSILON);
}

#[tokio::test]
async fn glb_source_loads_and_centers() {
    let pipeline = Pipeline::new(LoadParams::default());
    let model = pipeline
        .load_raw(raw("memory:model.glb", Some("GLB"), glb_container()))
        .await
        .unwrap();
    assert_centered(&model);
    assert_eq!(pipeline.store().created(), pipeline.store().revoked());
}

#[tokio::test]
async fn gltf_source_with_inline_buffer_loads() {
    let pipeline = Pipeline::new(LoadParams::default());
    let model = pipeline
        .load_raw(raw("memory:model.gltf", Some("GLTF"), data_uri_manifest()))
        .await
        .unwrap();
    assert_centered(&model);
}

#[tokio::test]
async fn json_source_loads_and_centers() {
    let pipeline = Pipeline::new(LoadParams::default());
    let model = pipeline
        .load_raw(raw("memory:tree.json", Some("JSON"), serialized_scene()))
        .await
        .unwrap();
    assert_centered(&model);
    assert_eq!(model.id, AssetId::digest_from_buffer(&serialized_scene()));
}

#[tokio::test]
async fn zip_bundle_loads_and_centers() {
    let pipeline = Pipeline::new(LoadParams::default());
    let bytes = bundle_zip(&[
        ("model.gltf", gltf_manifest("mesh.bin").as_slice()),
        ("mesh.bin", triangle_buffer().as_slice()),
    ]);
    let model = pipeline
        .load_raw(raw("memory:model.zip", Some("ZIP"), bytes))
        .await
        .unwrap();
    assert_centered(&model);
    assert_eq!(pipeline.store().created(), pipeline.store().revoked());
}

#[tokio::test]
async fn unknown_format_tag_creates_no_handles() {
    let pipeline = Pipeline::new(LoadParams::default());
    let error = pipeline
        .load_raw(raw("memory:model.obj", Some("OBJ"), vec![1, 2, 3]))
        .await
        .unwrap_err();
    assert!(matches!(error, PipelineError::UnsupportedFormat(_)));
    assert_eq!(pipeline.store().created(), 0);
}

#[tokio::test]
async fn missing_format_tag_is_rejected() {
    let pipeline = Pipeline::new(LoadParams::default());
    let error = pipeline
        .load_raw(raw("memory:mystery", None, glb_container()))
        .await
        .unwrap_err();
    assert!(matches!(error, PipelineError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn incomplete_bundle_fails_before_decode() {
    let pipeline = Pipeline::new(LoadParams::default());
    let bytes = bundle_zip(&[("model.gltf", gltf_manifest("mesh.bin").as_slice())]);
    let error = pipeline
        .load_raw(raw("memory:model.zip", Some("ZIP"), bytes))
        .await
        .unwrap_err();
    assert!(matches!(error, PipelineError::Bundle(_)));
    assert_eq!(pipeline.store().created(), 0);
}

#[tokio::test]
async fn handles_balance_across_mixed_outcomes() {
    let pipeline = Pipeline::new(LoadParams::default());

    for _ in 0..3 {
        pipeline
            .load_raw(raw("memory:model.glb", Some("GLB"), glb_container()))
            .await
            .unwrap();
        // Truncated container: decode fails after the handle was made
        pipeline
            .load_raw(raw("memory:bad.glb", Some("GLB"), vec![0; 8]))
            .await
            .unwrap_err();
        pipeline
            .load_raw(raw("memory:tree.json", Some("JSON"), serialized_scene()))
            .await
            .unwrap();
    }

    assert_eq!(pipeline.store().created(), pipeline.store().revoked());
    assert_eq!(pipeline.store().live(), 0);
}

#[tokio::test]
async fn superseded_invocation_is_discarded_before_newer_finishes() {
    let pipeline = Pipeline::new(LoadParams::default());

    let older = pipeline.begin();
    let _newer = pipeline.begin();

    // Only the superseded invocation completes; its result must still
    // be discarded because a newer one has already started.
    let older_model = Arc::new(
        pipeline
            .load_raw(raw("memory:old.json", Some("JSON"), serialized_scene()))
            .await
            .unwrap(),
    );
    assert!(!pipeline.publish(older, older_model));
    assert!(pipeline.current().is_none());
}

#[tokio::test]
async fn stale_invocation_does_not_overwrite_newer_result() {
    let pipeline = Pipeline::new(LoadParams::default());

    let older = pipeline.begin();
    let newer = pipeline.begin();

    let newer_model = Arc::new(
        pipeline
            .load_raw(raw("memory:new.json", Some("JSON"), serialized_scene()))
            .await
            .unwrap(),
    );
    let older_model = Arc::new(
        pipeline
            .load_raw(raw("memory:old.glb", Some("GLB"), glb_container()))
            .await
            .unwrap(),
    );

    assert!(pipeline.publish(newer, newer_model.clone()));
    assert!(!pipeline.publish(older, older_model));

    let current = pipeline.current().unwrap();
    assert_eq!(current.source_url, newer_model.source_url);
}
