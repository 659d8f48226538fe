//! Source fetching for the viewer.
//!
//! One fetch yields one [`RawAsset`]: the downloaded bytes plus the
//! response metadata the format resolver works from. The format
//! contract is declared, never sniffed: the `x-format` header carries
//! the tag and its interpretation is left to the resolver.

pub mod fetch;
pub mod source;

pub use fetch::{fetch, FetchError, FORMAT_HEADER};
pub use source::{sibling_url, RawAsset, SourceDescriptor};
