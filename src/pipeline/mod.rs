use crate::config::OnionConfig;
use crate::error::{OnionError, OnionResult};
use crate::failure::FailureHandler;
use crate::layer::{IntoLayers, Layer, LayerResult, SharedLayer};
use crate::metadata::MetadataProvider;
use std::fmt;
use std::sync::Arc;

mod chain;
mod frozen;

pub use frozen::FrozenOnion;

use chain::{Chain, Policy};

/// Values that can be threaded through an onion.
///
/// Unless failure wrapping is disabled, the value is cloned before each
/// layer runs so a failure can report the input of the layer that failed.
pub trait Payload: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Payload for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// An ordered stack of layers composed into a single callable
///
/// Layers run in the order they were added: for simple transformers,
/// `onion([f, g, h]).peel(x)` computes `h(g(f(x)))`. Adding layers never
/// runs them; the composed callable is extended by wrapping, not rebuilt.
///
/// Any error a layer raises is handed to the onion's [`FailureHandler`].
/// The default handler wraps it in a [`LayerError`](crate::LayerError)
/// naming the layer, the value it was given and its metadata.
///
/// # Example
///
/// ```rust,ignore
/// use onion::prelude::*;
///
/// let greet = onion(layers![
///     map_fn(|s: String| s.trim().to_owned()),
///     map_fn(|s: String| format!("Hello, {s}!")),
/// ])
/// .append_if(shout, map_fn(|s: String| s.to_uppercase()));
///
/// assert_eq!(greet.peel("  world ".into())?, "Hello, world!");
/// ```
pub struct Onion<T> {
    layers: Vec<SharedLayer<T>>,
    chain: Chain<T>,
    policy: Policy<T>,
}

/// Create an onion from a layer or a list of layers
pub fn onion<T, M>(layers: impl IntoLayers<T, M>) -> Onion<T>
where
    T: Payload,
{
    Onion::new(layers)
}

impl<T: Payload> Onion<T> {
    /// Create an onion from a layer or a list of layers
    pub fn new<M>(layers: impl IntoLayers<T, M>) -> Self {
        Self::empty().append(layers)
    }

    /// An onion without layers; peeling it returns the input
    pub fn empty() -> Self {
        Self {
            layers: Vec::new(),
            chain: chain::identity(),
            policy: Policy::default(),
        }
    }

    /// Add layers on the outside of the onion.
    ///
    /// Layers given together run in the given order, and all of them run
    /// after every layer added earlier.
    pub fn append<M>(mut self, layers: impl IntoLayers<T, M>) -> Self {
        let layers = layers.into_layers();
        if layers.is_empty() {
            return self;
        }

        tracing::debug!(
            "Appending {} layer(s) to onion ({} already stacked)",
            layers.len(),
            self.layers.len()
        );

        self.chain = chain::stack(&layers, self.chain);
        self.layers.extend(layers);
        self
    }

    /// [`append`](Self::append) only when `condition` holds
    pub fn append_if<M>(self, condition: bool, layers: impl IntoLayers<T, M>) -> Self {
        if condition { self.append(layers) } else { self }
    }

    /// [`append`](Self::append) only when `condition` does not hold
    pub fn append_unless<M>(self, condition: bool, layers: impl IntoLayers<T, M>) -> Self {
        self.append_if(!condition, layers)
    }

    /// Run `value` through every layer
    pub fn peel(&self, value: T) -> OnionResult<T> {
        (self.chain)(value, &self.policy)
    }

    /// Peel without an explicit value; `T::default()` stands in for it
    pub fn peel_empty(&self) -> OnionResult<T>
    where
        T: Default,
    {
        self.peel(T::default())
    }

    /// Install a custom failure handler
    ///
    /// The handler receives the error, the failing layer and the value that
    /// layer was given. Whatever it returns becomes the outcome of that
    /// layer's call.
    pub fn set_failure_handler<F>(self, handler: F) -> Self
    where
        F: Fn(OnionError<T>, &SharedLayer<T>, T) -> Result<T, OnionError<T>>
            + Send
            + Sync
            + 'static,
    {
        self.with_failure_handler(FailureHandler::custom(handler))
    }

    pub fn with_failure_handler(mut self, handler: FailureHandler<T>) -> Self {
        self.policy.handler = handler;
        self
    }

    /// Let errors raised by layers reach the caller untouched
    pub fn disable_failure_wrapping(self) -> Self {
        self.with_failure_handler(FailureHandler::Passthrough)
    }

    /// Resolve failure metadata through `provider` instead of the layers'
    /// own declarations
    pub fn with_metadata_provider(mut self, provider: impl MetadataProvider<T>) -> Self {
        self.policy.provider = Arc::new(provider);
        self
    }

    pub fn configure(mut self, config: &OnionConfig) -> Self {
        tracing::debug!(
            "Configuring onion: failure_mode={}, trace_layers={}",
            config.failure_mode,
            config.trace_layers
        );
        self.policy.handler = config.failure_mode.into();
        self.policy.trace_layers = config.trace_layers;
        self
    }

    pub fn failure_handler(&self) -> &FailureHandler<T> {
        &self.policy.handler
    }

    /// The layers in execution order
    pub fn layers(&self) -> &[SharedLayer<T>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Stop appending and get a cheaply clonable, invoke-only onion
    pub fn freeze(self) -> FrozenOnion<T> {
        FrozenOnion::from(self)
    }
}

impl<T: Payload> Default for Onion<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: 'static> Clone for Onion<T> {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.clone(),
            chain: Arc::clone(&self.chain),
            policy: self.policy.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for Onion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.layers.iter().map(|layer| layer.name()).collect();
        f.debug_struct("Onion")
            .field("layers", &names)
            .field("failure_handler", &self.policy.handler)
            .field("trace_layers", &self.policy.trace_layers)
            .finish()
    }
}

impl<T: Payload> Layer<T> for Onion<T> {
    fn invoke(&self, value: T) -> LayerResult<T> {
        self.peel(value).map_err(Into::into)
    }
}
