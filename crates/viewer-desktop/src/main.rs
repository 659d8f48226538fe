use std::{env, error::Error, fs, path::Path, process::ExitCode, sync::Arc};

use log::{error, info};
use viewer::{
    net::{RawAsset, SourceDescriptor},
    pipeline::{LoadedModel, Pipeline},
    view::{ViewState, DEFAULT_CAMERA_FOV_DEGREES, DEFAULT_CAMERA_POSITION},
};

/// Headless load harness: fetch or read a model, run it through the
/// pipeline and report what the renderer would receive.
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(source) = args.next() else {
        eprintln!("usage: viewer-desktop <url-or-path> [format-tag]");
        return ExitCode::FAILURE;
    };
    let format_override = args.next();

    let pipeline = Pipeline::new(Default::default());
    match load(&pipeline, &source, format_override.as_deref()).await {
        Ok(model) => {
            report(&model);
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!("failed to load {}: {}", source, error);
            ExitCode::FAILURE
        }
    }
}

async fn load(
    pipeline: &Pipeline,
    source: &str,
    format_override: Option<&str>,
) -> Result<Arc<LoadedModel>, Box<dyn Error>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return Ok(pipeline.load(source).await?);
    }

    // Local files carry no response headers; the format tag comes from
    // the extension or an explicit override, never from sniffing.
    let format_tag = format_override.map(str::to_string).or_else(|| {
        Path::new(source)
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_string)
    });
    let bytes = fs::read(source)?;
    let model = pipeline
        .load_raw(RawAsset {
            descriptor: SourceDescriptor {
                url: source.to_string(),
                content_type: None,
                format_tag,
            },
            bytes,
        })
        .await?;
    Ok(Arc::new(model))
}

fn report(model: &LoadedModel) {
    let view = ViewState::default().with_source(Some(model.source_url.clone()));
    info!(
        "scene {:x}: {} nodes, bounds {:?}",
        model.id,
        model.scene.node_count(),
        model.bounds
    );
    info!(
        "render setup: camera at {:?} ({} degree fov), theme {:?}, auto-rotate {}",
        DEFAULT_CAMERA_POSITION, DEFAULT_CAMERA_FOV_DEGREES, view.theme, view.auto_rotate
    );
}
