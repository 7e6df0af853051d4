//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (discovery, reload, dispatch errors)
//!     → RequestLogger middleware (method, route, status, latency)
//!     → tower-http TraceLayer spans carrying the request ID
//!
//! logging.rs installs the subscriber:
//!     → pretty (development) or JSON (production) to stdout
//! ```

pub mod logging;

pub use logging::init_logging;
