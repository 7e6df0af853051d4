//! Middleware chain with an index-driven continuation.
//!
//! # Responsibilities
//! - Hold the ordered, immutable list of global middleware
//! - Give each middleware a `Next` cursor into the remaining chain
//! - Terminate the chain in the matched handler
//!
//! # Design Decisions
//! - Middleware runs in registration order on the way in and unwinds in
//!   reverse on the way out
//! - Returning without calling `next.run` short-circuits every later
//!   middleware and the handler
//! - The chain is shared read-only across concurrent requests

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::{BoxFuture, FutureExt};

use crate::dispatch::handler::{DispatchResult, Handler};
use crate::dispatch::request::RouteRequest;

/// A request-processing unit wrapped around the handler.
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, req: RouteRequest, next: Next<'a>) -> BoxFuture<'a, DispatchResult>;

    /// Label used when listing the chain.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Cursor into the remaining chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    cursor: usize,
    endpoint: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Start of `chain`, ending in `endpoint`.
    pub fn new(chain: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Handler) -> Self {
        Self {
            chain,
            cursor: 0,
            endpoint,
        }
    }

    /// Index of the middleware this cursor will invoke next.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Run the rest of the chain.
    pub fn run(self, req: RouteRequest) -> BoxFuture<'a, DispatchResult> {
        match self.chain.get(self.cursor) {
            Some(middleware) => middleware.handle(
                req,
                Next {
                    cursor: self.cursor + 1,
                    ..self
                },
            ),
            None => self.endpoint.call(req),
        }
    }
}

/// Ordered global middleware, frozen once the server starts.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Arc<[Arc<dyn Middleware>]>,
}

impl MiddlewareChain {
    pub fn new(layers: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            layers: layers.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|m| m.name()).collect()
    }

    /// Run the chain with `endpoint` as the terminal step.
    pub fn run<'a>(&'a self, req: RouteRequest, endpoint: &'a dyn Handler) -> BoxFuture<'a, DispatchResult> {
        Next::new(&self.layers, endpoint).run(req)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Logs method, route, status and latency around the rest of the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn handle<'a>(&'a self, req: RouteRequest, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        async move {
            let start = Instant::now();
            let method = req.method().clone();
            let path = req.path().to_string();
            let route = req.binding().pattern.to_string();

            let result = next.run(req).await;
            let latency_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(response) => tracing::info!(
                    method = %method,
                    path = %path,
                    route = %route,
                    status = response.status().as_u16(),
                    latency_ms,
                    "Request handled"
                ),
                Err(error) => tracing::warn!(
                    method = %method,
                    path = %path,
                    route = %route,
                    error = %error,
                    latency_ms,
                    "Request failed"
                ),
            }
            result
        }
        .boxed()
    }

    fn name(&self) -> &'static str {
        "request_logger"
    }
}
