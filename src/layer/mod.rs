use crate::error::BoxError;
use crate::metadata::{self, Metadata};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

pub mod builtins;

/// Result type returned by a single layer
pub type LayerResult<T> = Result<T, BoxError>;

/// A layer shared between an onion and the failures it reports
pub type SharedLayer<T> = Arc<dyn Layer<T>>;

/// The Layer trait
///
/// A layer takes one value and returns one value. Plain functions become
/// layers through [`layer_fn`] and [`map_fn`]; anything else implements the
/// trait directly. An [`Onion`](crate::Onion) is itself a layer, so onions
/// nest.
///
/// # Example
/// ```ignore
/// struct Trim;
///
/// impl Layer<String> for Trim {
///     fn invoke(&self, value: String) -> LayerResult<String> {
///         Ok(value.trim().to_owned())
///     }
/// }
/// ```
pub trait Layer<T>: Send + Sync + 'static {
    /// Transform the value
    fn invoke(&self, value: T) -> LayerResult<T>;

    /// Name used in logs and for registry lookups
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Metadata records declared on this layer, in declaration order
    ///
    /// Usually generated by the [`layer`](crate::layer) attribute.
    fn metadata(&self) -> Vec<Metadata> {
        Vec::new()
    }

    /// Move the layer behind an `Arc` so it can be stored in an onion
    fn shared(self) -> SharedLayer<T>
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

/// Conversion into the ordered list of layers taken by
/// [`Onion::append`](crate::Onion::append)
///
/// Implemented for a single layer, for an already shared layer, and for
/// anything iterable over [`SharedLayer`]s. `M` only disambiguates the
/// three cases and is always inferred.
pub trait IntoLayers<T, M> {
    fn into_layers(self) -> Vec<SharedLayer<T>>;
}

#[doc(hidden)]
pub enum One {}

#[doc(hidden)]
pub enum Shared {}

#[doc(hidden)]
pub enum Many {}

impl<T, L> IntoLayers<T, One> for L
where
    L: Layer<T>,
{
    fn into_layers(self) -> Vec<SharedLayer<T>> {
        vec![self.shared()]
    }
}

impl<T> IntoLayers<T, Shared> for SharedLayer<T> {
    fn into_layers(self) -> Vec<SharedLayer<T>> {
        vec![self]
    }
}

impl<T, I> IntoLayers<T, Many> for I
where
    I: IntoIterator<Item = SharedLayer<T>>,
{
    fn into_layers(self) -> Vec<SharedLayer<T>> {
        self.into_iter().collect()
    }
}

/// Build a `Vec<SharedLayer<T>>` from a list of layers
///
/// ```ignore
/// let onion = onion(layers![map_fn(|n: i32| n + 1), Identity, map_fn(|n: i32| n * 2)]);
/// ```
#[macro_export]
macro_rules! layers {
    () => {
        ::std::vec::Vec::<$crate::SharedLayer<_>>::new()
    };
    ($($layer:expr),+ $(,)?) => {
        ::std::vec![$($crate::Layer::shared($layer)),+]
    };
}

/// A fallible function used as a layer. Created by [`layer_fn`].
pub struct LayerFn<F, T> {
    f: F,
    name: Option<String>,
    metadata: Vec<Metadata>,
    _value: PhantomData<fn(T) -> T>,
}

/// An infallible function used as a layer. Created by [`map_fn`].
pub struct MapFn<F, T> {
    inner: LayerFn<F, T>,
}

/// Turn a fallible function into a layer
pub fn layer_fn<T, F>(f: F) -> LayerFn<F, T>
where
    F: Fn(T) -> LayerResult<T>,
{
    LayerFn {
        f,
        name: None,
        metadata: Vec::new(),
        _value: PhantomData,
    }
}

/// Turn an infallible function into a layer
pub fn map_fn<T, F>(f: F) -> MapFn<F, T>
where
    F: Fn(T) -> T,
{
    MapFn {
        inner: LayerFn {
            f,
            name: None,
            metadata: Vec::new(),
            _value: PhantomData,
        },
    }
}

impl<F, T> LayerFn<F, T> {
    /// Give the layer a readable name; closures otherwise report their type name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare one metadata record on the layer
    ///
    /// Repeated calls add further records, merged in call order.
    pub fn with_metadata<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.metadata.push(metadata::record(entries));
        self
    }
}

impl<F, T> MapFn<F, T> {
    pub fn named(self, name: impl Into<String>) -> Self {
        Self {
            inner: self.inner.named(name),
        }
    }

    pub fn with_metadata<I, K, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            inner: self.inner.with_metadata(entries),
        }
    }
}

impl<F, T> Layer<T> for LayerFn<F, T>
where
    F: Fn(T) -> LayerResult<T> + Send + Sync + 'static,
    T: 'static,
{
    fn invoke(&self, value: T) -> LayerResult<T> {
        (self.f)(value)
    }

    fn name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| std::any::type_name::<F>())
    }

    fn metadata(&self) -> Vec<Metadata> {
        self.metadata.clone()
    }
}

impl<F, T> Layer<T> for MapFn<F, T>
where
    F: Fn(T) -> T + Send + Sync + 'static,
    T: 'static,
{
    fn invoke(&self, value: T) -> LayerResult<T> {
        Ok((self.inner.f)(value))
    }

    fn name(&self) -> &str {
        self.inner
            .name
            .as_deref()
            .unwrap_or_else(|| std::any::type_name::<F>())
    }

    fn metadata(&self) -> Vec<Metadata> {
        self.inner.metadata.clone()
    }
}
