//! Tower integration
//!
//! A [`FrozenOnion`] is a [`tower::Service`] that peels each request, and a
//! [`tower::Layer`] that peels each request before handing it to the inner
//! service.

use crate::error::{BoxError, OnionError};
use crate::pipeline::{FrozenOnion, Payload};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

impl<T: Payload> Service<T> for FrozenOnion<T> {
    type Response = T;
    type Error = OnionError<T>;
    type Future = Ready<Result<T, OnionError<T>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: T) -> Self::Future {
        ready(self.peel(request))
    }
}

impl<S, T> Layer<S> for FrozenOnion<T> {
    type Service = OnionService<S, T>;

    fn layer(&self, inner: S) -> Self::Service {
        OnionService {
            inner,
            onion: self.clone(),
        }
    }
}

/// Middleware produced by using a [`FrozenOnion`] as a tower layer
pub struct OnionService<S, T> {
    inner: S,
    onion: FrozenOnion<T>,
}

impl<S: Clone, T> Clone for OnionService<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            onion: self.onion.clone(),
        }
    }
}

impl<S, T> Service<T> for OnionService<S, T>
where
    T: Payload,
    S: Service<T> + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<BoxError> + Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: T) -> Self::Future {
        let request = match self.onion.peel(request) {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!("Onion rejected request before inner service: {}", error);
                let error = BoxError::from(error);
                return Box::pin(async move { Err::<S::Response, BoxError>(error) });
            }
        };

        let future = self.inner.call(request);
        Box::pin(async move {
            let response: Result<S::Response, BoxError> = future.await.map_err(Into::into);
            response
        })
    }
}
