//! Validation subsystem.
//!
//! # Data Flow
//! ```text
//! Matched binding + raw params + raw query
//!     → gate.rs (params schema, then query schema)
//!     → schema.rs (SchemaValidator: coerce, validate)
//!     → Valid { params, query } | Invalid { fieldErrors, formErrors }
//!
//! Request body (on demand, inside a handler)
//!     → RouteRequest::validated_body(schema)
//!     → schema.rs → value | RouteError::Validation
//! ```

pub mod gate;
pub mod query;
pub mod schema;

pub use gate::{ValidationGate, ValidationOutcome};
pub use query::parse_query;
pub use schema::{JsonSchemaValidator, Schema, SchemaError, SchemaValidator, ValidationFailure};
