//! Rate limiting for upstream-bound routes using the Governor crate

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    num::NonZeroU32,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

use crate::config::RateLimitConfig;
use crate::error::AppError;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>;

/// Global quota shared by every request passing through the layer
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: SharedRateLimiter,
}

impl RateLimitLayer {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst_size).unwrap_or(rps);
        let quota = Quota::per_second(rps).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: SharedRateLimiter,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        if request.uri().path() == "/health" {
            return Box::pin(self.inner.call(request));
        }

        match self.limiter.check() {
            Ok(_) => Box::pin(self.inner.call(request)),
            Err(_) => {
                warn!(path = %request.uri().path(), "Rate limit exceeded");
                Box::pin(async move { Ok(AppError::RateLimitExceeded.into_response()) })
            }
        }
    }
}
