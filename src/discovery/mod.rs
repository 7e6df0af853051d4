//! Handler tree discovery.
//!
//! # Data Flow
//! ```text
//! handler root (directory)
//!     → walker.rs (sorted recursive walk, extension filter)
//!     → module.rs (load manifest, compile schemas)
//!     → RoutePattern::from_file_path (path → pattern)
//!     → Vec<RouteBinding> (one per exported method)
//!
//! On change (hot reload enabled):
//!     reload.rs detects change
//!     → debounce
//!     → Dispatcher::reload (rescan + rebuild)
//!     → atomic swap of the live table
//! ```

pub mod module;
pub mod reload;
pub mod walker;

pub use module::{ManifestLoader, ModuleLoadError, ModuleLoader, ModuleManifest, ModuleRecord};
pub use reload::RouteWatcher;
pub use walker::{DiscoveryError, TreeWalker};
