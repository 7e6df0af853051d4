//! The request view seen by middleware and handlers.
//!
//! # Responsibilities
//! - Carry the validated params and query for the matched binding
//! - Buffer the body and parse it only when a handler asks for it
//! - Offer typed views (`params_as`, `query_as`, `json`) with 400 semantics
//!
//! # Design Decisions
//! - Body validation happens here, inside the handler's own call, so its
//!   failures unwind through the middleware chain like any other error

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{Extensions, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dispatch::error::RouteError;
use crate::routing::table::RouteBinding;
use crate::validation::schema::{Schema, SchemaValidator, ValidationFailure};

pub struct RouteRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: Value,
    query: Value,
    extensions: Extensions,
    binding: Arc<RouteBinding>,
    validator: Arc<dyn SchemaValidator>,
}

impl RouteRequest {
    pub fn new(
        method: Method,
        uri: Uri,
        binding: Arc<RouteBinding>,
        validator: Arc<dyn SchemaValidator>,
    ) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Value::Object(Default::default()),
            query: Value::Object(Default::default()),
            extensions: Extensions::new(),
            binding,
            validator,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The binding that matched this request.
    pub fn binding(&self) -> &RouteBinding {
        &self.binding
    }

    /// Validated (or raw, without a schema) path parameters.
    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, RouteError> {
        serde_json::from_value(self.params.clone())
            .map_err(|e| ValidationFailure::form(format!("Invalid path parameters: {e}")).into())
    }

    /// Validated (or raw, without a schema) query values.
    pub fn query(&self) -> &Value {
        &self.query
    }

    pub fn query_value(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, RouteError> {
        serde_json::from_value(self.query.clone())
            .map_err(|e| ValidationFailure::form(format!("Invalid query: {e}")).into())
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Raw buffered body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize the body as JSON. Malformed input is a validation failure.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RouteError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ValidationFailure::form(format!("Invalid JSON body: {e}")).into())
    }

    /// Parse the body and validate it against `schema`.
    ///
    /// Returns the coerced value; failures become `RouteError::Validation`.
    pub async fn validated_body(&self, schema: &Schema) -> Result<Value, RouteError> {
        let value: Value = self.json()?;
        self.validator
            .validate(schema, value)
            .await
            .map_err(RouteError::Validation)
    }

    /// `validated_body` followed by typed deserialization.
    pub async fn validated_body_as<T: DeserializeOwned>(&self, schema: &Schema) -> Result<T, RouteError> {
        let value = self.validated_body(schema).await?;
        serde_json::from_value(value)
            .map_err(|e| ValidationFailure::form(format!("Invalid JSON body: {e}")).into())
    }
}

impl std::fmt::Debug for RouteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("route", &self.binding.pattern.to_string())
            .field("params", &self.params)
            .field("query", &self.query)
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::handler_fn;
    use crate::dispatch::response::json_response;
    use crate::routing::pattern::RoutePattern;
    use crate::validation::schema::JsonSchemaValidator;
    use axum::http::StatusCode;
    use serde::Deserialize;
    use serde_json::json;

    fn request(body: &'static str) -> RouteRequest {
        let handler = handler_fn(|_req| async { Ok(json_response(StatusCode::OK, json!({}))) });
        let binding = RouteBinding::new(Method::POST, RoutePattern::parse("/api/users").unwrap(), "create", handler);
        RouteRequest::new(
            Method::POST,
            Uri::from_static("/api/users"),
            Arc::new(binding),
            Arc::new(JsonSchemaValidator),
        )
        .with_body(body)
    }

    fn user_schema() -> Schema {
        Schema::new(json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "minLength": 1 },
                "age": { "type": "integer", "minimum": 0 }
            },
            "required": ["name"]
        }))
        .unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewUser {
        name: String,
        age: Option<i64>,
    }

    #[tokio::test]
    async fn test_validated_body_as() {
        let user: NewUser = request(r#"{"name":"ada","age":36}"#)
            .validated_body_as(&user_schema())
            .await
            .unwrap();
        assert_eq!(user, NewUser { name: "ada".into(), age: Some(36) });
    }

    #[tokio::test]
    async fn test_invalid_body_is_validation_error() {
        let err = request(r#"{"age":-3}"#).validated_body(&user_schema()).await.unwrap_err();
        match err {
            RouteError::Validation(failure) => {
                assert!(failure.field_errors.contains_key("name"));
                assert!(failure.field_errors.contains_key("age"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_is_form_error() {
        let err = request("{not json").json::<Value>().unwrap_err();
        match err {
            RouteError::Validation(failure) => assert_eq!(failure.form_errors.len(), 1),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_typed_params_and_query() {
        #[derive(Deserialize)]
        struct Params {
            id: i64,
        }
        let req = request("")
            .with_params(json!({ "id": 5 }))
            .with_query(json!({ "tag": ["a"] }));
        assert_eq!(req.params_as::<Params>().unwrap().id, 5);
        assert_eq!(req.query_value("tag"), Some(&json!(["a"])));
        assert!(req.params_as::<NewUser>().is_err());
    }
}
