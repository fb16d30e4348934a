use crate::error::OnionError;
use crate::failure::LayerError;
use crate::layer::SharedLayer;
use crate::metadata::MetadataProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumString};

/// Signature of a custom failure handler.
///
/// Called with the error, the layer that raised it and the value that layer
/// was given. Returning `Ok` substitutes a result for the failed call;
/// returning `Err` makes that error the outcome.
pub type HandlerFn<T> =
    Arc<dyn Fn(OnionError<T>, &SharedLayer<T>, T) -> Result<T, OnionError<T>> + Send + Sync>;

/// Failure policy selectable from configuration
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Wrap raw errors in a [`LayerError`]
    #[default]
    Wrap,

    /// Let errors reach the caller as they were raised
    Passthrough,
}

/// The failure handler active on an onion. There is one per onion.
pub enum FailureHandler<T> {
    /// Wrap raw errors in a [`LayerError`]; let existing contexts bubble up
    Wrap,

    /// Re-raise the original error; no context is built
    Passthrough,

    /// Caller-supplied policy
    Custom(HandlerFn<T>),
}

impl<T: 'static> FailureHandler<T> {
    pub fn custom<F>(handler: F) -> Self
    where
        F: Fn(OnionError<T>, &SharedLayer<T>, T) -> Result<T, OnionError<T>>
            + Send
            + Sync
            + 'static,
    {
        FailureHandler::Custom(Arc::new(handler))
    }

    /// The configurable mode this handler corresponds to, `None` for custom handlers
    pub fn mode(&self) -> Option<FailureMode> {
        match self {
            FailureHandler::Wrap => Some(FailureMode::Wrap),
            FailureHandler::Passthrough => Some(FailureMode::Passthrough),
            FailureHandler::Custom(_) => None,
        }
    }

    /// Decide the outcome of a failed layer call
    pub fn handle(
        &self,
        error: OnionError<T>,
        layer: &SharedLayer<T>,
        input: T,
        provider: &dyn MetadataProvider<T>,
    ) -> Result<T, OnionError<T>> {
        match self {
            FailureHandler::Wrap => wrap_failure(error, layer, input, provider),
            FailureHandler::Passthrough => Err(error),
            FailureHandler::Custom(handler) => {
                tracing::debug!(
                    "Handing failure in layer `{}` to custom handler: {}",
                    layer.name(),
                    error
                );
                handler(error, layer, input)
            }
        }
    }
}

/// The default failure policy.
///
/// A failure that already carries a context is re-raised unchanged. A raw
/// error is wrapped in a new [`LayerError`] for `layer` and `input`, with
/// metadata resolved through `provider`.
pub fn wrap_failure<T: 'static>(
    error: OnionError<T>,
    layer: &SharedLayer<T>,
    input: T,
    provider: &dyn MetadataProvider<T>,
) -> Result<T, OnionError<T>> {
    match error.into_unwrapped() {
        Ok(cause) => {
            tracing::debug!("Wrapping failure in layer `{}`: {}", layer.name(), cause);
            Err(LayerError::resolve(Arc::clone(layer), input, cause, provider).into())
        }
        Err(wrapped) => {
            tracing::trace!(
                "Failure `{}` already carries a context, bubbling through `{}`",
                wrapped,
                layer.name()
            );
            Err(wrapped)
        }
    }
}

impl<T> Default for FailureHandler<T> {
    fn default() -> Self {
        FailureHandler::Wrap
    }
}

impl<T> Clone for FailureHandler<T> {
    fn clone(&self) -> Self {
        match self {
            FailureHandler::Wrap => FailureHandler::Wrap,
            FailureHandler::Passthrough => FailureHandler::Passthrough,
            FailureHandler::Custom(handler) => FailureHandler::Custom(Arc::clone(handler)),
        }
    }
}

impl<T> From<FailureMode> for FailureHandler<T> {
    fn from(mode: FailureMode) -> Self {
        match mode {
            FailureMode::Wrap => FailureHandler::Wrap,
            FailureMode::Passthrough => FailureHandler::Passthrough,
        }
    }
}

impl<T> fmt::Debug for FailureHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureHandler::Wrap => f.write_str("Wrap"),
            FailureHandler::Passthrough => f.write_str("Passthrough"),
            FailureHandler::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::layer::{Layer, map_fn};
    use crate::metadata::Declared;
    use std::str::FromStr;

    fn layer() -> SharedLayer<i32> {
        map_fn(|n: i32| n).named("noop").shared()
    }

    #[test]
    fn test_wrap_builds_context_for_raw_errors() {
        let layer = layer();
        let outcome = wrap_failure(OnionError::raw("bad"), &layer, 5, &Declared);

        let context = outcome.unwrap_err().into_layer_error().unwrap();
        assert_eq!(*context.input(), 5);
        assert_eq!(context.layer_name(), "noop");
        assert_eq!(context.cause().to_string(), "bad");
    }

    #[test]
    fn test_wrap_does_not_double_wrap() {
        let inner = map_fn(|n: i32| n).named("inner").shared();
        let outer = layer();
        let existing: OnionError<i32> = LayerError::new(inner, 1, "bad").into();

        let outcome = wrap_failure(existing, &outer, 2, &Declared);

        let context = outcome.unwrap_err().into_layer_error().unwrap();
        assert_eq!(context.layer_name(), "inner");
        assert_eq!(*context.input(), 1);
    }

    #[test]
    fn test_wrap_keeps_context_of_other_payload() {
        let inner = map_fn(|s: String| s).named("inner").shared();
        let foreign: OnionError<String> = LayerError::new(inner, String::from("in"), "bad").into();
        let error = OnionError::<i32>::from(BoxError::from(foreign));

        let outcome = wrap_failure(error, &layer(), 2, &Declared);

        let error = outcome.unwrap_err();
        assert!(error.is_wrapped());
        assert!(error.as_layer_error().is_none());
        let context = error.propagated().unwrap().downcast_ref::<String>().unwrap();
        assert_eq!(context.layer_name(), "inner");
        assert_eq!(context.input(), "in");
    }

    #[test]
    fn test_passthrough_returns_error_untouched() {
        let layer = layer();
        let outcome = FailureHandler::Passthrough.handle(OnionError::raw("bad"), &layer, 0, &Declared);

        let error = outcome.unwrap_err();
        assert!(!error.is_wrapped());
        assert_eq!(error.to_string(), "bad");
    }

    #[test]
    fn test_custom_handler_can_substitute() {
        let handler = FailureHandler::custom(|_error, _layer: &SharedLayer<i32>, input| Ok(input * 100));
        let layer = layer();

        assert_eq!(handler.handle(OnionError::raw("bad"), &layer, 3, &Declared).unwrap(), 300);
        assert_eq!(handler.mode(), None);
        assert_eq!(format!("{:?}", handler), "Custom(..)");
    }

    #[test]
    fn test_failure_mode_parses_and_converts() {
        assert_eq!(FailureMode::from_str("wrap").unwrap(), FailureMode::Wrap);
        assert_eq!(FailureMode::from_str("PassThrough").unwrap(), FailureMode::Passthrough);
        assert!(FailureMode::from_str("swallow").is_err());
        assert_eq!(FailureMode::Passthrough.to_string(), "passthrough");

        let handler: FailureHandler<i32> = FailureMode::Passthrough.into();
        assert_eq!(handler.mode(), Some(FailureMode::Passthrough));
        assert_eq!(FailureHandler::<i32>::default().mode(), Some(FailureMode::Wrap));
    }
}
