//! # Onion
//!
//! Layered invocation pipelines for Rust.
//!
//! An onion is an ordered stack of layers composed into one callable. A
//! value passed in flows through every layer in the order the layers were
//! added, each layer receiving the previous one's output.
//!
//! ## Features
//!
//! - **Composable Layers**: Closures via [`map_fn`]/[`layer_fn`], or any type implementing [`Layer`]
//! - **Nesting**: An [`Onion`] is itself a layer, so onions compose
//! - **Failure Context**: Errors are wrapped once, in a [`LayerError`] naming the layer that failed and its input
//! - **Layer Metadata**: Declared with `#[onion::layer(key = value)]` or a [`MetadataRegistry`]
//! - **Tower Integration**: A frozen onion is a `tower::Service` and a `tower::Layer`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use onion::prelude::*;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("slug is empty")]
//! struct EmptySlug;
//!
//! struct RejectEmpty;
//!
//! #[onion::layer(stage = "validation")]
//! impl Layer<String> for RejectEmpty {
//!     fn invoke(&self, value: String) -> LayerResult<String> {
//!         if value.is_empty() {
//!             return Err(EmptySlug.into());
//!         }
//!         Ok(value)
//!     }
//! }
//!
//! fn main() -> Result<(), BoxError> {
//!     let slugify = onion(layers![
//!         map_fn(|s: String| s.trim().to_lowercase()),
//!         RejectEmpty,
//!         map_fn(|s: String| s.replace(' ', "-")),
//!     ]);
//!
//!     assert_eq!(slugify.peel("  Hello World ".into())?, "hello-world");
//!
//!     let err = slugify.peel("   ".into()).unwrap_err();
//!     let context = err.as_layer_error().unwrap();
//!     assert_eq!(context.input(), "");
//!     assert_eq!(context.metadata_value("stage"), Some(&"validation".into()));
//!     Ok(())
//! }
//! ```

extern crate self as onion;

pub mod config;
pub mod error;
pub mod failure;
pub mod layer;
pub mod metadata;
mod pipeline;
pub mod service;

// Re-export core types
pub use config::{ConfigError, ConfigService, OnionConfig};
pub use error::{BoxError, OnionError, OnionResult, Propagated};
pub use failure::{FailureHandler, FailureMode, LayerError};
pub use layer::{IntoLayers, Layer, LayerResult, SharedLayer, builtins, layer_fn, map_fn};
pub use metadata::{Metadata, MetadataProvider, MetadataRegistry};
pub use pipeline::{FrozenOnion, Onion, Payload, onion};
pub use service::OnionService;

// Re-export macros
pub use onion_macro::layer;

#[doc(hidden)]
pub use serde_json;

/// Prelude module for convenient imports
///
/// ```ignore
/// use onion::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::OnionConfig;
    pub use crate::error::{BoxError, OnionError, OnionResult};
    pub use crate::failure::{FailureHandler, FailureMode, LayerError};
    pub use crate::layer::builtins::*;
    pub use crate::layer::{Layer, LayerResult, SharedLayer, layer_fn, map_fn};
    pub use crate::layers;
    pub use crate::metadata::{Metadata, MetadataProvider, MetadataRegistry};
    pub use crate::pipeline::{FrozenOnion, Onion, onion};
    pub use std::sync::Arc;
}
