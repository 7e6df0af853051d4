//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, resolve handler root)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → AppBuilder::configure / HttpServer::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; route changes come from the handler
//!   tree, not from config reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, ResponseConfig, RoutingConfig, ServerConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ConfigIssue};
