use std::fmt::Display;
use std::pin::Pin;
use std::time::Instant;

use futures::task::{Context, Poll};
use futures::Future;
use tower::Service;
use tower_layer::Layer;
use tracing::{debug, warn};

/// Wraps a service with timing and failure logging.
#[derive(Debug, Clone)]
pub struct InstrumentedLayer {
    name: &'static str,
}

impl InstrumentedLayer {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl<S> Layer<S> for InstrumentedLayer {
    type Service = Instrumented<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Instrumented {
            inner,
            name: self.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Instrumented<S> {
    inner: S,
    name: &'static str,
}

impl<S, Req> Service<Req> for Instrumented<S>
where
    S: Service<Req>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Display + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let name = self.name;
        let start = Instant::now();
        let future = self.inner.call(req);

        Box::pin(async move {
            let result = future.await;
            let duration_us = start.elapsed().as_micros() as u64;
            match &result {
                Ok(_) => debug!("'{}' completed in {}us", name, duration_us),
                Err(e) => warn!("'{}' failed after {}us: {}", name, duration_us, e),
            }
            result
        })
    }
}
