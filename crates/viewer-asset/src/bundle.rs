//! Bundle extraction for compressed sources.
//!
//! A bundle is an archive carrying a scene manifest plus its binary
//! buffer as separate entries. Entry naming is a contract with asset
//! producers: the first entry matching the manifest extension and the
//! first matching the buffer extension are taken; a bundle lacking
//! either is not renderable and fails closed.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use log::debug;

use crate::{
    archive::{Archive, Entry},
    LoadParams,
};

#[derive(Debug)]
pub enum BundleError<E> {
    Io(E),
    MissingManifest(String),
    MissingBuffer(String),
}

impl<E: Display> Display for BundleError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::Io(error) => Display::fmt(error, f),
            BundleError::MissingManifest(extension) => {
                write!(f, "Bundle has no .{} manifest entry", extension)
            }
            BundleError::MissingBuffer(extension) => {
                write!(f, "Bundle has no .{} buffer entry", extension)
            }
        }
    }
}

impl<E: Error + 'static> Error for BundleError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BundleError::Io(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct BundleEntries {
    pub manifest_name: String,
    pub manifest: Vec<u8>,
    pub buffer_name: String,
    pub buffer: Vec<u8>,
}

fn first_with_extension<'a>(names: &'a [String], extension: &str) -> Option<&'a String> {
    let suffix = format!(".{}", extension);
    names
        .iter()
        .find(|name| name.to_ascii_lowercase().ends_with(&suffix))
}

/// Pull the scene manifest and its binary buffer out of an archive.
///
/// Both entries are unpacked before returning so a truncated archive
/// never yields a half-populated result.
pub fn extract<T, A: Archive<T>>(
    archive: &mut A,
    params: &LoadParams,
) -> Result<BundleEntries, BundleError<A::Error>> {
    let names = archive.entry_names().map_err(BundleError::Io)?;

    let manifest_name = first_with_extension(&names, &params.manifest_extension)
        .ok_or_else(|| BundleError::MissingManifest(params.manifest_extension.clone()))?
        .clone();
    let buffer_name = first_with_extension(&names, &params.buffer_extension)
        .ok_or_else(|| BundleError::MissingBuffer(params.buffer_extension.clone()))?
        .clone();

    debug!(
        "bundle entries: manifest {}, buffer {}",
        manifest_name, buffer_name
    );

    let manifest = {
        let mut entry = archive
            .entry(&manifest_name)
            .map_err(BundleError::Io)?
            .ok_or_else(|| BundleError::MissingManifest(params.manifest_extension.clone()))?;
        entry.unpack().map_err(BundleError::Io)?
    };
    let buffer = {
        let mut entry = archive
            .entry(&buffer_name)
            .map_err(BundleError::Io)?
            .ok_or_else(|| BundleError::MissingBuffer(params.buffer_extension.clone()))?;
        entry.unpack().map_err(BundleError::Io)?
    };

    Ok(BundleEntries {
        manifest_name,
        manifest,
        buffer_name,
        buffer,
    })
}
