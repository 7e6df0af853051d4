//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     file path / manual path
//!     → pattern.rs (segments: literal | param)
//!     → table.rs (dedupe, specificity order)
//!     → Freeze as immutable RouteTable
//!
//! Incoming Request (method, path)
//!     → matcher.rs (split, scan same-length candidates)
//!     → Return: Matched { binding, raw params } | MethodNotAllowed | NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment-wise comparison only)
//! - Deterministic: same registration order always yields the same table
//! - First match wins (ordered by specificity)

pub mod matcher;
pub mod pattern;
pub mod table;

pub use matcher::{match_route, RawParams, RouteMatch};
pub use pattern::{MountPath, PatternError, RoutePattern, Segment};
pub use table::{RouteBinding, RouteSource, RouteTable, TableError};
