//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use tree_router::dispatch::response::json_response;
use tree_router::dispatch::{handler_fn, Dispatcher, Handler};

/// Write `(relative path, content)` pairs under `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}

/// A throwaway handler tree.
pub fn temp_tree(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), files);
    dir
}

/// Handler answering 200 with `{"handler": tag, "params": ..., "query": ...}`.
pub fn tagged(tag: &'static str) -> Arc<dyn Handler> {
    handler_fn(move |req| async move {
        Ok(json_response(
            StatusCode::OK,
            json!({ "handler": tag, "params": req.params(), "query": req.query() }),
        ))
    })
}

pub async fn body_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Dispatch directly, bypassing the HTTP layer.
pub async fn dispatch(dispatcher: &Dispatcher, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::from(body.to_string()))
        .unwrap();
    body_json(dispatcher.dispatch(request).await).await
}

/// Send a request through a full axum router.
pub async fn send(router: axum::Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}
