use crate::layer::{Layer, LayerResult};

/// A layer that returns its input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T: 'static> Layer<T> for Identity {
    fn invoke(&self, value: T) -> LayerResult<T> {
        Ok(value)
    }
}

/// A layer that lets an observer look at the value without changing it
pub struct Inspect<F> {
    observer: F,
}

impl<F> Inspect<F> {
    pub fn new(observer: F) -> Self {
        Self { observer }
    }
}

impl<T, F> Layer<T> for Inspect<F>
where
    T: 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    fn invoke(&self, value: T) -> LayerResult<T> {
        (self.observer)(&value);
        Ok(value)
    }
}
