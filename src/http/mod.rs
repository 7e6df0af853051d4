//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http layers, request ID)
//!     → buffer body (413 past the limit)
//!     → Dispatcher::dispatch (match, validate, middleware, handler)
//!     → Send to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
