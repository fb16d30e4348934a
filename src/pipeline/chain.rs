//! Reduction of a layer list into one nested callable.

use crate::error::OnionError;
use crate::failure::FailureHandler;
use crate::layer::SharedLayer;
use crate::metadata::{Declared, MetadataProvider};
use crate::pipeline::Payload;
use std::sync::Arc;

/// The composed callable. Failure policy is passed in at call time so the
/// chain itself never has to be rebuilt when the policy changes.
pub(crate) type Chain<T> =
    Arc<dyn Fn(T, &Policy<T>) -> Result<T, OnionError<T>> + Send + Sync>;

/// Everything a wrapped call needs to decide the outcome of a failure
pub(crate) struct Policy<T> {
    pub(crate) handler: FailureHandler<T>,
    pub(crate) provider: Arc<dyn MetadataProvider<T>>,
    pub(crate) trace_layers: bool,
}

impl<T: 'static> Default for Policy<T> {
    fn default() -> Self {
        Self {
            handler: FailureHandler::Wrap,
            provider: Arc::new(Declared),
            trace_layers: false,
        }
    }
}

impl<T: 'static> Clone for Policy<T> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            provider: Arc::clone(&self.provider),
            trace_layers: self.trace_layers,
        }
    }
}

impl<T: Payload> Policy<T> {
    /// Invoke one layer. This is the whole try-region of a wrapped call:
    /// only errors raised by `layer` itself reach the handler.
    fn call(&self, layer: &SharedLayer<T>, value: T) -> Result<T, OnionError<T>> {
        if self.trace_layers {
            let span = tracing::trace_span!("layer", name = %layer.name());
            let _entered = span.enter();
            return self.call_layer(layer, value);
        }
        self.call_layer(layer, value)
    }

    fn call_layer(&self, layer: &SharedLayer<T>, value: T) -> Result<T, OnionError<T>> {
        match &self.handler {
            // No context will be built, so there is no need to keep the input
            FailureHandler::Passthrough => layer.invoke(value).map_err(|error| {
                tracing::trace!("Failure in layer `{}` passes through unwrapped", layer.name());
                OnionError::from(error)
            }),
            handler => {
                let input = value.clone();
                layer.invoke(value).or_else(|error| {
                    handler.handle(OnionError::from(error), layer, input, self.provider.as_ref())
                })
            }
        }
    }
}

/// The empty composition
pub(crate) fn identity<T: Payload>() -> Chain<T> {
    Arc::new(|value: T, _policy: &Policy<T>| -> Result<T, OnionError<T>> { Ok(value) })
}

/// `v -> layer(inner(v))`, with `layer`'s own failures routed through the policy
pub(crate) fn wrap<T: Payload>(layer: SharedLayer<T>, inner: Chain<T>) -> Chain<T> {
    Arc::new(
        move |value: T, policy: &Policy<T>| -> Result<T, OnionError<T>> {
            let value = inner(value, policy)?;
            policy.call(&layer, value)
        },
    )
}

/// Fold `layers` onto `initial` left to right. Each layer wraps everything
/// before it, so for simple transformers `[f, g, h]` the result computes
/// `h(g(f(v)))`.
pub(crate) fn stack<T: Payload>(layers: &[SharedLayer<T>], initial: Chain<T>) -> Chain<T> {
    layers
        .iter()
        .cloned()
        .fold(initial, |inner, layer| wrap(layer, inner))
}
