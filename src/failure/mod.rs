use crate::error::BoxError;
use crate::layer::SharedLayer;
use crate::metadata::{Declared, Metadata, MetadataProvider};
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;

mod handler;

pub use handler::{FailureHandler, FailureMode, HandlerFn, wrap_failure};

/// Failure context for an error raised by a layer.
///
/// Records which layer failed, the value that layer was given and the
/// layer's merged metadata. Metadata is resolved once, when the context is
/// built. A context is never wrapped a second time: when it crosses an
/// outer layer boundary it is passed on unchanged, so it always points at
/// the innermost failure.
///
/// Displays as the cause's message; the layer is available through
/// [`layer_name`](Self::layer_name).
pub struct LayerError<T> {
    layer: SharedLayer<T>,
    input: T,
    metadata: Metadata,
    cause: BoxError,
}

impl<T: 'static> LayerError<T> {
    /// Build a context using the metadata the layer declares on itself
    pub fn new(layer: SharedLayer<T>, input: T, cause: impl Into<BoxError>) -> Self {
        Self::resolve(layer, input, cause, &Declared)
    }

    /// Build a context, looking the layer's metadata up through `provider`
    pub fn resolve(
        layer: SharedLayer<T>,
        input: T,
        cause: impl Into<BoxError>,
        provider: &dyn MetadataProvider<T>,
    ) -> Self {
        let metadata = provider.resolve(layer.as_ref());
        Self {
            layer,
            input,
            metadata,
            cause: cause.into(),
        }
    }

    pub fn layer(&self) -> &SharedLayer<T> {
        &self.layer
    }

    pub fn layer_name(&self) -> &str {
        self.layer.name()
    }

    /// The value passed into the failing layer
    pub fn input(&self) -> &T {
        &self.input
    }

    pub fn into_input(self) -> T {
        self.input
    }

    /// Merged metadata of the failing layer
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// The error raised by the layer
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

impl<T: 'static> fmt::Display for LayerError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for LayerError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerError")
            .field("layer", &self.layer.name())
            .field("input", &self.input)
            .field("metadata", &self.metadata)
            .field("cause", &self.cause)
            .finish()
    }
}

impl<T: fmt::Debug + 'static> StdError for LayerError<T> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.cause)
    }
}
