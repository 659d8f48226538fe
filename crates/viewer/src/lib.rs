//! Model viewer orchestration.
//!
//! Ties fetching, format resolution, decoding and normalization into
//! one pipeline invocation, and carries the view state the render step
//! works from. The rendering engine itself is a collaborator: it
//! receives one scene root per successful invocation and nothing else.

pub mod pipeline;
pub mod view;

pub use viewer_asset as asset;
pub use viewer_net as net;
