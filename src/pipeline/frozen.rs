use crate::error::OnionResult;
use crate::layer::{Layer, LayerResult, SharedLayer};
use crate::pipeline::{Onion, Payload};
use std::fmt;
use std::sync::Arc;

/// An onion that can no longer be appended to
///
/// Cloning is cheap and every clone peels through the same layers, so a
/// frozen onion can be handed to many threads or tasks. It also serves as a
/// [`tower::Service`] and a [`tower::Layer`], see [`crate::service`].
///
/// # Example
/// ```ignore
/// let frozen = onion(layers![map_fn(|n: i32| n + 1)]).freeze();
///
/// let worker = frozen.clone();
/// std::thread::spawn(move || worker.peel(1));
/// ```
pub struct FrozenOnion<T> {
    onion: Arc<Onion<T>>,
}

impl<T: Payload> FrozenOnion<T> {
    pub fn peel(&self, value: T) -> OnionResult<T> {
        self.onion.peel(value)
    }

    pub fn peel_empty(&self) -> OnionResult<T>
    where
        T: Default,
    {
        self.onion.peel_empty()
    }

    pub fn layers(&self) -> &[SharedLayer<T>] {
        self.onion.layers()
    }

    /// An appendable copy that shares these layers
    pub fn thaw(&self) -> Onion<T> {
        Onion::clone(&self.onion)
    }
}

impl<T> Clone for FrozenOnion<T> {
    fn clone(&self) -> Self {
        Self {
            onion: Arc::clone(&self.onion),
        }
    }
}

impl<T> From<Onion<T>> for FrozenOnion<T> {
    fn from(onion: Onion<T>) -> Self {
        Self {
            onion: Arc::new(onion),
        }
    }
}

impl<T: 'static> fmt::Debug for FrozenOnion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FrozenOnion").field(&self.onion).finish()
    }
}

impl<T: Payload> Layer<T> for FrozenOnion<T> {
    fn invoke(&self, value: T) -> LayerResult<T> {
        self.onion.invoke(value)
    }
}
