use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::blob::{BlobStore, BLOB_SCHEME};

#[derive(Debug)]
pub enum SchemeError {
    Unsupported,
    BadDataUri,
}

impl Display for SchemeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SchemeError::Unsupported => write!(f, "Unsupported scheme"),
            SchemeError::BadDataUri => write!(f, "Bad data URI"),
        }
    }
}

impl Error for SchemeError {}

#[derive(Debug)]
pub(crate) enum Scheme<'a> {
    // Data uri with optional mime type
    Data(Option<&'a str>, Vec<u8>),
    // Revocable in-memory blob locator
    Blob(&'a str),
    // Bare relative reference, resolvable only if it was rewritten to a
    // blob locator before parsing
    Relative(&'a str),
}

// Byte-index slicing can panic inside a multibyte character, and the
// uri comes straight from a manifest.
fn has_prefix(uri: &str, prefix: &str) -> bool {
    uri.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

impl<'a> TryFrom<&'a str> for Scheme<'a> {
    type Error = SchemeError;

    fn try_from(uri: &'a str) -> Result<Self, Self::Error> {
        if uri.contains(':') {
            if has_prefix(uri, "data:") {
                // Data URI: rfc2397
                let content = &uri[5..];
                let Some((param, value)) = content.split_once(',') else {
                    return Err(SchemeError::BadDataUri);
                };
                if let Some((mime, encoding)) = param.split_once(';') {
                    if encoding.eq_ignore_ascii_case("base64") {
                        let data = STANDARD
                            .decode(value)
                            .map_err(|_| SchemeError::BadDataUri)?;
                        Ok(Scheme::Data(Some(mime), data))
                    } else {
                        Err(SchemeError::BadDataUri)
                    }
                } else {
                    // In standard the mime should be text/plain;charset=US-ASCII,
                    // but in GLTF it doesn't make sense, so pass None here
                    // to guess actual content from the data.
                    Ok(Scheme::Data(None, Vec::from(value.as_bytes())))
                }
            } else if has_prefix(uri, BLOB_SCHEME) {
                Ok(Scheme::Blob(uri))
            } else {
                Err(SchemeError::Unsupported)
            }
        } else {
            Ok(Scheme::Relative(uri))
        }
    }
}

type SchemeData<'a> = (Option<&'a str>, Vec<u8>);

impl<'a> Scheme<'a> {
    /// Resolve the reference against the blob store. `None` means the
    /// locator names nothing the store knows about.
    pub(crate) fn load(&self, store: &BlobStore) -> Option<SchemeData<'a>> {
        match self {
            Scheme::Data(mime, data) => Some((*mime, data.clone())),
            Scheme::Blob(locator) => {
                let data = store.resolve(locator)?;
                Some((None, data.as_ref().clone()))
            }
            // Never resolvable here: a relative reference that survived
            // up to this point had no supplied buffer to rewrite it to.
            Scheme::Relative(_) => None,
        }
    }
}
