use crate::failure::LayerError;
use crate::pipeline::Payload;
use std::error::Error as StdError;
use std::fmt;
use std::ops::Deref;

/// A type-erased error raised by a layer
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Result of peeling an onion
pub type OnionResult<T> = Result<T, OnionError<T>>;

/// The outcome of a failed peel.
///
/// By default every error raised by a layer reaches the caller as
/// [`OnionError::Layer`]. With wrapping disabled, or when a custom handler
/// raises something of its own, the error arrives as [`OnionError::Raw`].
///
/// Like `anyhow::Error`, this type does not implement [`std::error::Error`]
/// itself; it dereferences to one. Converting it into a [`BoxError`], which
/// `?` does inside a layer, keeps its failure context recognizable to every
/// onion it bubbles through, whatever their payload types.
pub enum OnionError<T> {
    /// Failure context naming the layer that failed and the value it was given
    Layer(Box<LayerError<T>>),

    /// An error that was not wrapped by this onion. It may still carry the
    /// context of a nested onion of another payload type, see
    /// [`OnionError::propagated`].
    Raw(BoxError),
}

impl<T: 'static> OnionError<T> {
    pub fn raw(error: impl Into<BoxError>) -> Self {
        OnionError::Raw(error.into())
    }

    /// Whether the error carries a failure context, its own or one raised
    /// by a nested onion
    pub fn is_wrapped(&self) -> bool {
        match self {
            OnionError::Layer(_) => true,
            OnionError::Raw(error) => error.is::<Propagated>(),
        }
    }

    pub fn as_layer_error(&self) -> Option<&LayerError<T>> {
        match self {
            OnionError::Layer(context) => Some(context),
            OnionError::Raw(_) => None,
        }
    }

    pub fn into_layer_error(self) -> Option<LayerError<T>> {
        match self {
            OnionError::Layer(context) => Some(*context),
            OnionError::Raw(_) => None,
        }
    }

    /// The failure context of a nested onion with a different payload type
    pub fn propagated(&self) -> Option<&Propagated> {
        match self {
            OnionError::Layer(_) => None,
            OnionError::Raw(error) => error.downcast_ref::<Propagated>(),
        }
    }

    /// The error originally raised by a layer, beneath any failure context
    pub fn cause(&self) -> &(dyn StdError + 'static) {
        match self {
            OnionError::Layer(context) => context.cause(),
            OnionError::Raw(error) => match error.downcast_ref::<Propagated>() {
                Some(propagated) => propagated.cause(),
                None => &**error,
            },
        }
    }

    /// Downcast the original error
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause().downcast_ref::<E>()
    }

    /// Split a failure into the raw error, or give it back when it already
    /// carries a context
    pub(crate) fn into_unwrapped(self) -> Result<BoxError, Self> {
        match self {
            OnionError::Raw(error) if !error.is::<Propagated>() => Ok(error),
            wrapped => Err(wrapped),
        }
    }
}

impl<T: 'static> From<LayerError<T>> for OnionError<T> {
    fn from(context: LayerError<T>) -> Self {
        OnionError::Layer(Box::new(context))
    }
}

/// Recovers the tag of an onion failure that crossed a layer boundary
/// boxed, e.g. one raised by a nested onion. Anything else is raw.
impl<T: Payload> From<BoxError> for OnionError<T> {
    fn from(error: BoxError) -> Self {
        let error = match error.downcast::<Propagated>() {
            Ok(propagated) => {
                return match (*propagated).downcast::<T>() {
                    Ok(context) => OnionError::Layer(Box::new(context)),
                    Err(foreign) => OnionError::Raw(Box::new(foreign)),
                };
            }
            Err(error) => error,
        };

        match error.downcast::<LayerError<T>>() {
            Ok(context) => OnionError::Layer(context),
            Err(error) => OnionError::Raw(error),
        }
    }
}

impl<T: Payload> From<OnionError<T>> for BoxError {
    fn from(error: OnionError<T>) -> Self {
        match error {
            OnionError::Layer(context) => Box::new(Propagated::new(*context)),
            OnionError::Raw(error) => error,
        }
    }
}

impl<T: Payload> Deref for OnionError<T> {
    type Target = dyn StdError + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        match self {
            OnionError::Layer(context) => &**context,
            OnionError::Raw(error) => &**error,
        }
    }
}

impl<T: Payload> AsRef<dyn StdError + Send + Sync> for OnionError<T> {
    fn as_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &**self
    }
}

impl<T: 'static> fmt::Display for OnionError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnionError::Layer(context) => fmt::Display::fmt(context, f),
            OnionError::Raw(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for OnionError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnionError::Layer(context) => f.debug_tuple("Layer").field(context).finish(),
            OnionError::Raw(error) => f.debug_tuple("Raw").field(error).finish(),
        }
    }
}

/// A failure context in transit through a layer boundary.
///
/// Holds the [`LayerError`] of some payload type behind a type-erased box.
/// Any onion receiving it re-raises it unchanged; an onion of the matching
/// payload type turns it back into [`OnionError::Layer`].
pub struct Propagated {
    context: BoxError,
}

impl Propagated {
    fn new<T: Payload>(context: LayerError<T>) -> Self {
        Self {
            context: Box::new(context),
        }
    }

    /// The carried context, if it belongs to an onion over `T`
    pub fn downcast_ref<T: Payload>(&self) -> Option<&LayerError<T>> {
        self.context.downcast_ref::<LayerError<T>>()
    }

    pub fn downcast<T: Payload>(self) -> Result<LayerError<T>, Self> {
        self.context
            .downcast::<LayerError<T>>()
            .map(|context| *context)
            .map_err(|context| Self { context })
    }

    /// The error raised by the failing layer
    pub fn cause(&self) -> &(dyn StdError + 'static) {
        self.context.source().unwrap_or(&*self.context)
    }
}

impl fmt::Display for Propagated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.context, f)
    }
}

impl fmt::Debug for Propagated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.context, f)
    }
}

impl StdError for Propagated {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.context.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Layer, map_fn};

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_boxed_onion_error_keeps_its_tag() {
        let layer = map_fn(|n: i32| n).shared();
        let wrapped: OnionError<i32> = LayerError::new(layer, 4, Boom).into();

        let boxed = BoxError::from(wrapped);
        assert!(boxed.is::<Propagated>());

        let recovered = OnionError::<i32>::from(boxed);
        assert!(recovered.is_wrapped());
        assert_eq!(recovered.as_layer_error().map(|c| *c.input()), Some(4));
        assert!(recovered.downcast_ref::<Boom>().is_some());
    }

    #[test]
    fn test_boxed_layer_error_becomes_wrapped() {
        let layer = map_fn(|n: i32| n).shared();
        let boxed: BoxError = Box::new(LayerError::new(layer, 1, Boom));

        assert!(OnionError::<i32>::from(boxed).is_wrapped());
    }

    #[test]
    fn test_context_of_other_payload_stays_wrapped() {
        let layer = map_fn(|n: i32| n).named("count").shared();
        let inner: OnionError<i32> = LayerError::new(layer, 7, Boom).into();

        let outer = OnionError::<String>::from(BoxError::from(inner));
        assert!(outer.is_wrapped());
        assert!(outer.as_layer_error().is_none());
        assert!(outer.into_unwrapped().is_err());
    }

    #[test]
    fn test_propagated_exposes_the_original_context() {
        let layer = map_fn(|n: i32| n).named("count").shared();
        let inner: OnionError<i32> = LayerError::new(layer, 7, Boom).into();
        let outer = OnionError::<String>::from(BoxError::from(inner));

        let propagated = outer.propagated().unwrap();
        let context = propagated.downcast_ref::<i32>().unwrap();
        assert_eq!(context.layer_name(), "count");
        assert_eq!(*context.input(), 7);
        assert!(propagated.downcast_ref::<String>().is_none());

        assert!(outer.downcast_ref::<Boom>().is_some());
        assert_eq!(outer.to_string(), "boom");
    }

    #[test]
    fn test_raw_error_converts_back_unchanged() {
        let boxed = BoxError::from(OnionError::<i32>::raw(Boom));
        assert!(boxed.is::<Boom>());
    }

    #[test]
    fn test_other_errors_stay_raw() {
        let error = OnionError::<i32>::from(BoxError::from(Boom));

        assert!(!error.is_wrapped());
        assert!(error.as_layer_error().is_none());
        assert!(error.propagated().is_none());
        assert!(error.downcast_ref::<Boom>().is_some());
        assert_eq!(error.to_string(), "boom");
        assert!(error.source().is_none());
    }
}
