//! The fetch → resolve → decode → normalize pipeline.
//!
//! Each invocation owns its raw bytes, decode buffers and temporary
//! blob locators; there is no shared cache. Superseding an in-flight
//! load does not abort it, so results are published through a
//! generation check and a stale invocation's scene is discarded
//! instead of overwriting a newer one.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io::Cursor,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use log::{debug, info, warn};
use reqwest::Client;
use viewer_asset::{
    archive::{zip::ZipError, Archive},
    blob::BlobStore,
    bounds::Aabb,
    bundle::{self, BundleError},
    index::AssetId,
    loader::{
        self,
        gltf::manifest_buffer_uris,
        DecodeError, DecodeStrategy, ExternalBuffer, ResolveError, StrategyInput,
    },
    normalize::normalize,
    scene::SceneAsset,
    LoadParams,
};
use viewer_net::{fetch, sibling_url, FetchError, RawAsset};
use zip::ZipArchive;

#[derive(Debug)]
pub enum PipelineError {
    Network(FetchError),
    UnsupportedFormat(ResolveError),
    Bundle(BundleError<ZipError>),
    Decode(DecodeError),
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Network(error) => write!(f, "Fetch failed: {}", error),
            PipelineError::UnsupportedFormat(error) => Display::fmt(error, f),
            PipelineError::Bundle(error) => Display::fmt(error, f),
            PipelineError::Decode(error) => write!(f, "Decode failed: {}", error),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Network(error) => Some(error),
            PipelineError::UnsupportedFormat(error) => Some(error),
            PipelineError::Bundle(error) => Some(error),
            PipelineError::Decode(error) => Some(error),
        }
    }
}

impl From<FetchError> for PipelineError {
    fn from(value: FetchError) -> Self {
        Self::Network(value)
    }
}

impl From<ResolveError> for PipelineError {
    fn from(value: ResolveError) -> Self {
        Self::UnsupportedFormat(value)
    }
}

impl From<BundleError<ZipError>> for PipelineError {
    fn from(value: BundleError<ZipError>) -> Self {
        Self::Bundle(value)
    }
}

impl From<DecodeError> for PipelineError {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

/// One ready-to-render model: the normalized scene root plus its
/// post-normalization bounds.
#[derive(Debug)]
pub struct LoadedModel {
    pub id: AssetId,
    pub source_url: String,
    pub scene: SceneAsset,
    pub bounds: Option<Aabb>,
}

/// Identity of one pipeline invocation, used to discard stale results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    generation: u64,
}

pub struct Pipeline {
    client: Client,
    store: BlobStore,
    params: LoadParams,
    generation: AtomicU64,
    published: Mutex<Option<(u64, Arc<LoadedModel>)>>,
}

impl Pipeline {
    pub fn new(params: LoadParams) -> Self {
        Self {
            client: Client::new(),
            store: BlobStore::new(),
            params,
            generation: AtomicU64::new(0),
            published: Mutex::new(None),
        }
    }

    /// The blob store backing every decode of this pipeline. Exposed so
    /// callers can verify handle accounting.
    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    /// Start a new invocation, superseding every earlier one.
    pub fn begin(&self) -> Invocation {
        Invocation {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    /// Publish a finished model. The slot only accepts a result from
    /// the newest started invocation; once a newer one has begun, an
    /// older result is discarded and `false` is returned, whether or
    /// not the newer one has finished.
    pub fn publish(&self, invocation: Invocation, model: Arc<LoadedModel>) -> bool {
        let newest = self.generation.load(Ordering::SeqCst);
        if invocation.generation < newest {
            warn!(
                "discarding stale result of invocation {} (newest started is {})",
                invocation.generation, newest
            );
            return false;
        }
        let mut slot = self.published.lock().unwrap();
        *slot = Some((invocation.generation, model));
        true
    }

    /// Most recently published model, if any.
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.published
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, model)| model.clone())
    }

    /// Fetch, decode, normalize and publish one source. The returned
    /// model is the result of THIS invocation; `current()` always
    /// reflects the newest one.
    pub async fn load(&self, url: &str) -> Result<Arc<LoadedModel>, PipelineError> {
        let invocation = self.begin();
        let raw = fetch(&self.client, url).await?;
        let model = Arc::new(self.load_raw(raw).await?);
        self.publish(invocation, model.clone());
        Ok(model)
    }

    /// Decode and normalize already-fetched bytes. Does not publish.
    pub async fn load_raw(&self, raw: RawAsset) -> Result<LoadedModel, PipelineError> {
        let strategy = loader::resolve(raw.descriptor.format_tag.as_deref())?;
        debug!(
            "decoding {} ({} bytes) via {:?}",
            raw.descriptor.url,
            raw.bytes.len(),
            strategy
        );

        let mut scene = match strategy {
            DecodeStrategy::Binary => loader::decode(
                StrategyInput::Binary { raw: &raw.bytes },
                &self.params,
                &self.store,
            )?,
            DecodeStrategy::Generic => loader::decode(
                StrategyInput::Generic { raw: &raw.bytes },
                &self.params,
                &self.store,
            )?,
            DecodeStrategy::Text => {
                // Sidecar buffers live next to the manifest; fetch them
                // before decoding so the decoder sees only locators.
                let mut sidecars = Vec::new();
                for uri in manifest_buffer_uris(&raw.bytes).map_err(PipelineError::Decode)? {
                    let url = sibling_url(&raw.descriptor.url, &uri);
                    let sidecar = fetch(&self.client, &url).await?;
                    sidecars.push((uri, sidecar.bytes));
                }
                let buffers = sidecars
                    .iter()
                    .map(|(name, data)| ExternalBuffer { name, data })
                    .collect();
                loader::decode(
                    StrategyInput::Text {
                        manifest: &raw.bytes,
                        buffers,
                    },
                    &self.params,
                    &self.store,
                )?
            }
            DecodeStrategy::Bundle => {
                let mut archive: ZipArchive<_> =
                    Archive::new(Cursor::new(raw.bytes.as_slice())).map_err(BundleError::Io)?;
                let entries = bundle::extract(&mut archive, &self.params)?;
                loader::decode(
                    StrategyInput::Text {
                        manifest: &entries.manifest,
                        buffers: vec![ExternalBuffer {
                            name: &entries.buffer_name,
                            data: &entries.buffer,
                        }],
                    },
                    &self.params,
                    &self.store,
                )?
            }
        };

        let bounds = normalize(&mut scene);
        let id = AssetId::digest_from_buffer(&raw.bytes);
        info!(
            "loaded {} as {:.8}: {} root nodes, bounds {:?}",
            raw.descriptor.url,
            format!("{:x}", id),
            scene.nodes.len(),
            bounds
        );

        Ok(LoadedModel {
            id,
            source_url: raw.descriptor.url,
            scene,
            bounds,
        })
    }
}
