use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use image::ImageError;

use crate::{blob::BlobStore, scene::SceneAsset, LoadParams};

use scheme::SchemeError;

pub mod gltf;
pub mod json;
pub mod scheme;

#[inline]
fn chunk_vec3<T: Copy>(data: &[T]) -> Vec<[T; 3]> {
    data.chunks_exact(3)
        .map(|item| item.try_into().unwrap())
        .collect()
}

/// Declared source format, from the `x-format` response header or a
/// file extension. Unknown tags are rejected up front; the pipeline
/// never sniffs content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Glb,
    Gltf,
    Json,
    Zip,
}

impl SourceFormat {
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("glb") {
            Some(Self::Glb)
        } else if tag.eq_ignore_ascii_case("gltf") {
            Some(Self::Gltf)
        } else if tag.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if tag.eq_ignore_ascii_case("zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

impl Display for SourceFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Glb => write!(f, "GLB"),
            SourceFormat::Gltf => write!(f, "GLTF"),
            SourceFormat::Json => write!(f, "JSON"),
            SourceFormat::Zip => write!(f, "ZIP"),
        }
    }
}

#[derive(Debug)]
pub enum ResolveError {
    MissingFormatTag,
    UnknownFormatTag(String),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::MissingFormatTag => write!(f, "No format tag declared for source"),
            ResolveError::UnknownFormatTag(tag) => write!(f, "Unknown format tag {}", tag),
        }
    }
}

impl Error for ResolveError {}

/// How the raw bytes of a source are turned into a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Direct binary container decode (GLB).
    Binary,
    /// Text manifest whose buffers are resolved by locator (GLTF).
    Text,
    /// Generic serialized scene object (JSON).
    Generic,
    /// Unpack the archive first, then decode the extracted manifest as
    /// [`DecodeStrategy::Text`] with the extracted buffer supplied.
    Bundle,
}

/// Choose a decode strategy from the declared format tag.
pub fn resolve(tag: Option<&str>) -> Result<DecodeStrategy, ResolveError> {
    let tag = tag.ok_or(ResolveError::MissingFormatTag)?;
    let format =
        SourceFormat::from_tag(tag).ok_or_else(|| ResolveError::UnknownFormatTag(tag.into()))?;
    Ok(match format {
        SourceFormat::Glb => DecodeStrategy::Binary,
        SourceFormat::Gltf => DecodeStrategy::Text,
        SourceFormat::Json => DecodeStrategy::Generic,
        SourceFormat::Zip => DecodeStrategy::Bundle,
    })
}

/// A named sidecar buffer supplied alongside a text manifest, either
/// unpacked from a bundle or fetched next to the source.
#[derive(Debug, Clone, Copy)]
pub struct ExternalBuffer<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
}

/// Decoder input for one resolved strategy. The bundle case does not
/// appear here: unpacking reduces it to [`StrategyInput::Text`].
#[derive(Debug)]
pub enum StrategyInput<'a> {
    Binary {
        raw: &'a [u8],
    },
    Text {
        manifest: &'a [u8],
        buffers: Vec<ExternalBuffer<'a>>,
    },
    Generic {
        raw: &'a [u8],
    },
}

#[derive(Debug)]
pub enum DecodeError {
    Gltf(::gltf::Error),
    Json(serde_json::Error),
    InvalidScheme(SchemeError),
    BadManifest(String),
    UnsupportedExtension(String),
    ResourceNotFound(String),
    BadBufferMime(String, Option<String>),
    BadImage(String, ImageError),
    BadImageMime(String, String),
    ImageBufferOutOfBounds(usize, usize, usize),
    UnsupportedTextureFormat(::gltf::image::Format),
    UnsupportedPrimitiveMode(::gltf::mesh::Mode),
    NoScene,
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Gltf(error) => Display::fmt(error, f),
            DecodeError::Json(error) => Display::fmt(error, f),
            DecodeError::InvalidScheme(error) => Display::fmt(error, f),
            DecodeError::BadManifest(reason) => write!(f, "Bad manifest: {}", reason),
            DecodeError::UnsupportedExtension(extension) => {
                write!(f, "Manifest requires unsupported extension {}", extension)
            }
            DecodeError::ResourceNotFound(name) => write!(f, "Resource {} not found", name),
            DecodeError::BadBufferMime(name, mime) => {
                if let Some(mime) = mime {
                    write!(f, "Bad MIME {} for buffer {}", mime, name)
                } else {
                    write!(f, "No MIME for buffer {}", name)
                }
            }
            DecodeError::BadImage(name, error) => write!(f, "Bad image {}: {}", name, error),
            DecodeError::BadImageMime(name, mime) => {
                write!(f, "Bad MIME {} for image {}", mime, name)
            }
            DecodeError::ImageBufferOutOfBounds(index, buffer_index, buffer_length) => write!(
                f,
                "Buffer index out of bounds of image #{}: {} of {}",
                index, buffer_index, buffer_length
            ),
            DecodeError::UnsupportedTextureFormat(format) => {
                write!(f, "Unsupported texture format: {:?}", format)
            }
            DecodeError::UnsupportedPrimitiveMode(mode) => {
                write!(f, "Unsupported primitive mode: {:?}", mode)
            }
            DecodeError::NoScene => write!(f, "Document contains no scene"),
        }
    }
}

impl From<::gltf::Error> for DecodeError {
    fn from(value: ::gltf::Error) -> Self {
        Self::Gltf(value)
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<SchemeError> for DecodeError {
    fn from(value: SchemeError) -> Self {
        Self::InvalidScheme(value)
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::Gltf(error) => Some(error),
            DecodeError::Json(error) => Some(error),
            DecodeError::InvalidScheme(error) => Some(error),
            DecodeError::BadImage(_, error) => Some(error),
            _ => None,
        }
    }
}

/// Decode one source into a scene. Every temporary blob published while
/// decoding is revoked before this returns, on the error path included.
pub fn decode(
    input: StrategyInput<'_>,
    params: &LoadParams,
    store: &BlobStore,
) -> Result<SceneAsset, DecodeError> {
    match input {
        StrategyInput::Binary { raw } => gltf::load_glb(raw, params, store),
        StrategyInput::Text { manifest, buffers } => {
            gltf::load_gltf(manifest, &buffers, params, store)
        }
        StrategyInput::Generic { raw } => json::load_json(raw, store),
    }
}
