//! Handlers shipped with the binary.
//!
//! `echo` reflects what the pipeline handed to the handler, which makes it
//! useful for trying out manifests and schemas. `health` is a liveness probe.

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::dispatch::handler::{handler_fn, HandlerRegistry};
use crate::dispatch::response::json_response;

pub const ECHO: &str = "echo";
pub const HEALTH: &str = "health";

/// Register the built-in handlers under their well-known names.
pub fn register_builtin(registry: &mut HandlerRegistry) {
    registry.register(
        ECHO,
        handler_fn(|req| async move {
            let body = if req.body().is_empty() {
                Value::Null
            } else {
                req.json::<Value>()?
            };
            Ok(json_response(
                StatusCode::OK,
                json!({
                    "method": req.method().as_str(),
                    "path": req.path(),
                    "route": req.binding().pattern.to_string(),
                    "params": req.params(),
                    "query": req.query(),
                    "body": body,
                }),
            ))
        }),
    );
    registry.register(
        HEALTH,
        handler_fn(|_req| async { Ok(json_response(StatusCode::OK, json!({ "status": "ok" }))) }),
    );
}
