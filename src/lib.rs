//! File-system routed HTTP dispatch library.

pub mod app;
pub mod builtin;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod validation;

pub use app::{AppBuilder, BuildError};
pub use config::schema::ServerConfig;
pub use dispatch::{handler_fn, Dispatcher, Middleware, Next, RouteError, RouteRequest};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
