use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use log::debug;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};

use crate::source::{RawAsset, SourceDescriptor};

/// Response header carrying the declared format tag.
pub const FORMAT_HEADER: &str = "x-format";

#[derive(Debug)]
pub enum FetchError {
    Transport(reqwest::Error),
    Status(StatusCode, String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(error) => Display::fmt(error, f),
            FetchError::Status(status, url) => write!(f, "{} fetching {}", status, url),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FetchError::Transport(error) => Some(error),
            FetchError::Status(..) => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

/// GET one source. Non-success statuses are failures; nothing is
/// retried here.
pub async fn fetch(client: &Client, url: &str) -> Result<RawAsset, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status, url.to_string()));
    }

    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let content_type = header(CONTENT_TYPE.as_str());
    let format_tag = header(FORMAT_HEADER);

    let bytes = response.bytes().await?.to_vec();
    debug!(
        "fetched {}: {} bytes, content type {:?}, format tag {:?}",
        url,
        bytes.len(),
        content_type,
        format_tag
    );

    Ok(RawAsset {
        descriptor: SourceDescriptor {
            url: url.to_string(),
            content_type,
            format_tag,
        },
        bytes,
    })
}
