//! The dispatch pipeline.
//!
//! # Responsibilities
//! - Match the request against the live table
//! - Run the validation gate for the matched binding
//! - Drive the middleware chain into the handler
//! - Turn every outcome into exactly one JSON response
//!
//! # Design Decisions
//! - Not-found and params/query failures are answered before the chain runs
//! - The live table sits behind `ArcSwap`; a request loads it once and keeps
//!   that snapshot for its whole lifetime
//! - A panicking handler or middleware is caught here and answered with 500

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Bytes;
use axum::http::{Method, Request};
use axum::response::Response;
use futures_util::FutureExt;

use crate::app::{BuildError, RouteCatalog};
use crate::dispatch::error::RouteError;
use crate::dispatch::middleware::MiddlewareChain;
use crate::dispatch::request::RouteRequest;
use crate::dispatch::response::{internal_error, not_found, validation_failed, GENERIC_ERROR_MESSAGE};
use crate::routing::matcher::{match_route, RouteMatch};
use crate::routing::table::RouteTable;
use crate::validation::gate::{ValidationGate, ValidationOutcome};
use crate::validation::query::parse_query;

/// Knobs that shape error responses.
#[derive(Debug, Clone, Default)]
pub struct DispatchSettings {
    /// Put the internal error text into 500 bodies instead of the generic message.
    pub expose_error_messages: bool,
}

/// Routes requests through table, gate, middleware and handler.
pub struct Dispatcher {
    table: Arc<ArcSwap<RouteTable>>,
    chain: MiddlewareChain,
    gate: ValidationGate,
    settings: DispatchSettings,
    catalog: Arc<RouteCatalog>,
}

impl Dispatcher {
    pub fn new(
        table: RouteTable,
        chain: MiddlewareChain,
        gate: ValidationGate,
        settings: DispatchSettings,
        catalog: Arc<RouteCatalog>,
    ) -> Self {
        Self {
            table: Arc::new(ArcSwap::from_pointee(table)),
            chain,
            gate,
            settings,
            catalog,
        }
    }

    /// Snapshot of the live table.
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Shared handle to the live table slot.
    pub fn table_handle(&self) -> Arc<ArcSwap<RouteTable>> {
        self.table.clone()
    }

    pub fn catalog(&self) -> &RouteCatalog {
        &self.catalog
    }

    pub fn middleware(&self) -> &MiddlewareChain {
        &self.chain
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Rebuild the table from the catalog and swap it in.
    ///
    /// On failure the current table stays live. Returns the new route count.
    pub fn reload(&self) -> Result<usize, BuildError> {
        let table = self.catalog.build()?;
        let routes = table.len();
        self.table.store(Arc::new(table));
        Ok(routes)
    }

    /// Match without dispatching.
    pub fn resolve(&self, method: &Method, path: &str) -> RouteMatch {
        match_route(&self.table.load(), method, path)
    }

    /// Dispatch one buffered request.
    pub async fn dispatch(&self, req: Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        let table = self.table.load_full();

        let (binding, raw_params) = match match_route(&table, &parts.method, parts.uri.path()) {
            RouteMatch::Matched { binding, raw_params } => (binding, raw_params),
            RouteMatch::MethodNotAllowed { allowed } => {
                tracing::debug!(
                    method = %parts.method,
                    path = %parts.uri.path(),
                    ?allowed,
                    "Method not registered for path"
                );
                return not_found();
            }
            RouteMatch::NotFound => {
                tracing::debug!(method = %parts.method, path = %parts.uri.path(), "No route matched");
                return not_found();
            }
        };

        let raw_query = parse_query(parts.uri.query());
        let (params, query) = match self.gate.check(&binding, &raw_params, raw_query).await {
            ValidationOutcome::Valid { params, query } => (params, query),
            ValidationOutcome::Invalid(failure) => return validation_failed(&failure),
        };

        let endpoint = binding.handler.clone();
        let request = RouteRequest::new(parts.method, parts.uri, binding, self.gate.validator().clone())
            .with_headers(parts.headers)
            .with_extensions(parts.extensions)
            .with_body(body)
            .with_params(params)
            .with_query(query);

        match AssertUnwindSafe(self.chain.run(request, endpoint.as_ref()))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => self.error_response(error),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(panic = %message, "Handler panicked");
                internal_error(self.client_message(&message))
            }
        }
    }

    fn error_response(&self, error: RouteError) -> Response {
        match error {
            RouteError::Validation(failure) => validation_failed(&failure),
            RouteError::NotFound => not_found(),
            RouteError::Internal(e) => {
                tracing::error!(error = ?e, "Request failed");
                internal_error(self.client_message(&e.to_string()))
            }
        }
    }

    fn client_message<'a>(&self, message: &'a str) -> &'a str {
        if self.settings.expose_error_messages {
            message
        } else {
            GENERIC_ERROR_MESSAGE
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.table.load().len())
            .field("middleware", &self.chain)
            .field("settings", &self.settings)
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
