//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Bytes>
//!     → pipeline.rs (match against live table)
//!         → NotFound / MethodNotAllowed → 404
//!     → ValidationGate (params, then query)
//!         → Invalid → 400
//!     → middleware.rs (global chain, registration order)
//!     → handler.rs (terminal handler)
//!     → Ok(Response) | Err(RouteError) | panic
//!     → response.rs (400 / 404 / 500 JSON bodies)
//! ```
//!
//! # Design Decisions
//! - One outer error boundary: middleware and handlers return `RouteError`
//!   and the pipeline decides the status code
//! - Handlers are resolved by name when the table is built, never per request

pub mod error;
pub mod handler;
pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod response;

pub use error::RouteError;
pub use handler::{handler_fn, DispatchResult, Handler, HandlerFuture, HandlerRegistry};
pub use middleware::{Middleware, MiddlewareChain, Next, RequestLogger};
pub use pipeline::{DispatchSettings, Dispatcher};
pub use request::RouteRequest;
