/// Declared metadata for one source. Immutable once received; the
/// resolver decides what to do with the tag, not the fetch layer.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub url: String,
    pub content_type: Option<String>,
    pub format_tag: Option<String>,
}

/// Downloaded bytes plus their descriptor. Owned by the pipeline
/// invocation that fetched them and discarded after decode.
#[derive(Debug)]
pub struct RawAsset {
    pub descriptor: SourceDescriptor,
    pub bytes: Vec<u8>,
}

/// Resolve a relative sidecar reference (a manifest's `mesh.bin`)
/// against the URL it was served from.
pub fn sibling_url(url: &str, relative: &str) -> String {
    match url.rsplit_once('/') {
        Some((base, _)) => format!("{}/{}", base, relative),
        None => relative.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::sibling_url;

    #[test]
    fn sibling_replaces_last_segment() {
        assert_eq!(
            sibling_url("https://assets.example/models/tree.gltf", "mesh.bin"),
            "https://assets.example/models/mesh.bin"
        );
    }

    #[test]
    fn bare_locator_passes_through() {
        assert_eq!(sibling_url("tree.gltf", "mesh.bin"), "mesh.bin");
    }
}
