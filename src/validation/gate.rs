//! Parameter and query validation ahead of dispatch.
//!
//! # Responsibilities
//! - Validate captured path parameters against the binding's params schema
//! - Validate decoded query values against the binding's query schema
//! - Hand the coerced values to the handler in place of the raw strings
//!
//! # Design Decisions
//! - Fail fast: params are checked first; a params failure is returned
//!   without running query validation
//! - Bindings without a schema pass raw values through unchanged
//! - Body validation is not done here; handlers request it on demand

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::routing::matcher::RawParams;
use crate::routing::table::RouteBinding;
use crate::validation::schema::{string_object, SchemaValidator, ValidationFailure};

/// Result of running the gate for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid { params: Value, query: Value },
    Invalid(ValidationFailure),
}

/// Runs a binding's optional schemas through the configured validator.
#[derive(Clone)]
pub struct ValidationGate {
    validator: Arc<dyn SchemaValidator>,
}

impl ValidationGate {
    pub fn new(validator: Arc<dyn SchemaValidator>) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &Arc<dyn SchemaValidator> {
        &self.validator
    }

    pub async fn check(
        &self,
        binding: &RouteBinding,
        raw_params: &RawParams,
        raw_query: Map<String, Value>,
    ) -> ValidationOutcome {
        let mut params = string_object(raw_params);
        if let Some(schema) = &binding.params_schema {
            match self.validator.validate(schema, params).await {
                Ok(validated) => params = validated,
                Err(failure) => {
                    tracing::debug!(route = %binding.pattern, %failure, "Path parameters rejected");
                    return ValidationOutcome::Invalid(failure);
                }
            }
        }

        let mut query = Value::Object(raw_query);
        if let Some(schema) = &binding.query_schema {
            match self.validator.validate(schema, query).await {
                Ok(validated) => query = validated,
                Err(failure) => {
                    tracing::debug!(route = %binding.pattern, %failure, "Query rejected");
                    return ValidationOutcome::Invalid(failure);
                }
            }
        }

        ValidationOutcome::Valid { params, query }
    }
}
