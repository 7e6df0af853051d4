//! Schemas and the validator capability.
//!
//! # Responsibilities
//! - Compile JSON Schema documents once, at module load time
//! - Define the `SchemaValidator` capability the router depends on
//! - Provide the default JSON Schema backed validator with string coercion
//!
//! # Design Decisions
//! - Failures are flattened to top-level field errors plus form errors
//! - Coercion only touches string input destined for integer, number,
//!   boolean or array properties; anything unparseable is left untouched so
//!   the schema reports the type error
//! - Missing properties with a `default` are filled before validation
//! - The document compiles as a whole; errors are routed to a field by the
//!   first segment of their instance path

use std::collections::BTreeMap;
use std::fmt;

use futures_util::future::{BoxFuture, FutureExt};
use jsonschema::error::ValidationErrorKind;
use serde::Serialize;
use serde_json::{Map, Value};

/// Structured description of a failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// Top-level field name → messages, in schema order per field.
    #[serde(rename = "details")]
    pub field_errors: BTreeMap<String, Vec<String>>,
    /// Errors that do not belong to a single field.
    #[serde(rename = "formErrors")]
    pub form_errors: Vec<String>,
}

impl ValidationFailure {
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut failure = Self::default();
        failure.push_field(name, message);
        failure
    }

    pub fn form(message: impl Into<String>) -> Self {
        Self {
            field_errors: BTreeMap::new(),
            form_errors: vec![message.into()],
        }
    }

    pub fn push_field(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.field_errors.entry(name.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.field_errors.is_empty() && self.form_errors.is_empty()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (field, messages) in &self.field_errors {
            write!(f, "; {field}: {}", messages.join(", "))?;
        }
        for message in &self.form_errors {
            write!(f, "; {message}")?;
        }
        Ok(())
    }
}

/// Error raised when a schema document cannot be compiled.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid schema: {0}")]
pub struct SchemaError(pub String);

/// A compiled JSON Schema document.
pub struct Schema {
    raw: Value,
    validator: jsonschema::Validator,
}

impl Schema {
    pub fn new(raw: Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::validator_for(&raw).map_err(|e| SchemaError(e.to_string()))?;
        Ok(Self { raw, validator })
    }

    /// The schema document as written.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Sub-schema for a top-level property, with local `$ref`s followed.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties()
            .and_then(|props| props.get(name))
            .map(|schema| self.resolve(schema))
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.raw.get("properties").and_then(Value::as_object)
    }

    /// Follow `#/...` references inside this document.
    fn resolve<'a>(&'a self, mut schema: &'a Value) -> &'a Value {
        for _ in 0..MAX_REF_DEPTH {
            let Some(pointer) = schema
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix('#'))
            else {
                break;
            };
            match self.raw.pointer(pointer) {
                Some(target) => schema = target,
                None => break,
            }
        }
        schema
    }
}

const MAX_REF_DEPTH: usize = 16;

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schema").field(&self.raw).finish()
    }
}

/// Capability: validate a value against a schema, producing the coerced
/// value or a structured failure.
pub trait SchemaValidator: Send + Sync + 'static {
    fn validate<'a>(
        &'a self,
        schema: &'a Schema,
        value: Value,
    ) -> BoxFuture<'a, Result<Value, ValidationFailure>>;
}

/// Default validator backed by the `jsonschema` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    pub fn validate_now(&self, schema: &Schema, value: Value) -> Result<Value, ValidationFailure> {
        let value = coerce_object(schema, value);
        let mut failure = ValidationFailure::default();

        for error in schema.validator.iter_errors(&value) {
            match (top_level_field(error.instance_path().as_str()), error.kind()) {
                (Some(field), _) => failure.push_field(field, error.to_string()),
                (None, ValidationErrorKind::Required { property }) => match property.as_str() {
                    Some(name) => failure.push_field(name, "Required"),
                    None => failure.form_errors.push(error.to_string()),
                },
                (None, _) => failure.form_errors.push(error.to_string()),
            }
        }

        if failure.is_empty() {
            Ok(value)
        } else {
            Err(failure)
        }
    }
}

/// First segment of a JSON pointer, unescaped. `None` for the root.
fn top_level_field(pointer: &str) -> Option<String> {
    let segment = pointer.strip_prefix('/')?.split('/').next()?;
    Some(segment.replace("~1", "/").replace("~0", "~"))
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate<'a>(
        &'a self,
        schema: &'a Schema,
        value: Value,
    ) -> BoxFuture<'a, Result<Value, ValidationFailure>> {
        futures_util::future::ready(self.validate_now(schema, value)).boxed()
    }
}

fn coerce_object(schema: &Schema, value: Value) -> Value {
    let Some(properties) = schema.properties() else {
        return value;
    };
    let Value::Object(mut map) = value else {
        return value;
    };
    for name in properties.keys() {
        let Some(property) = schema.property(name) else {
            continue;
        };
        match map.remove(name) {
            Some(field) => {
                map.insert(name.clone(), coerce_value(schema, property, field));
            }
            None => {
                if let Some(default) = property.get("default") {
                    map.insert(name.clone(), default.clone());
                }
            }
        }
    }
    Value::Object(map)
}

fn declared_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ => None,
    }
}

fn coerce_value(root: &Schema, schema: &Value, value: Value) -> Value {
    match (declared_type(schema), value) {
        (Some("integer"), Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(s),
        },
        (Some("number"), Value::String(s)) => parse_number(&s).unwrap_or(Value::String(s)),
        (Some("boolean"), Value::String(s)) => match s.as_str() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => Value::String(s),
        },
        (Some("array"), Value::Array(items)) => {
            let item_schema = item_schema(root, schema);
            Value::Array(items.into_iter().map(|v| coerce_value(root, item_schema, v)).collect())
        }
        (Some("array"), single @ Value::String(_)) => {
            Value::Array(vec![coerce_value(root, item_schema(root, schema), single)])
        }
        (_, value) => value,
    }
}

fn item_schema<'a>(root: &'a Schema, schema: &'a Value) -> &'a Value {
    static ANY: Value = Value::Bool(true);
    schema.get("items").map(|items| root.resolve(items)).unwrap_or(&ANY)
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(Value::from(n));
    }
    s.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// Convert raw string pairs into a JSON object.
pub fn string_object<'a, I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>(),
    )
}
