//! End-to-end behaviour of the dispatch pipeline: matching, validation,
//! middleware and the JSON error contract.

use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode};
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};

use tree_router::dispatch::response::json_response;
use tree_router::dispatch::{handler_fn, DispatchResult, Dispatcher, Middleware, Next, RouteError, RouteRequest};
use tree_router::validation::Schema;
use tree_router::AppBuilder;

mod common;
use common::{dispatch, tagged, temp_tree};

const USERS_INDEX: &str = r#"
GET = "users.list"
POST = "users.create"

[querySchema]
type = "object"

[querySchema.properties.page]
type = "integer"
minimum = 1
default = 1

[querySchema.properties.tag]
type = "array"
items = { type = "string" }
"#;

const USER_BY_ID: &str = r#"
GET = "users.show"

[paramsSchema]
type = "object"
required = ["userId"]

[paramsSchema.properties.userId]
type = "integer"
minimum = 1
"#;

const COMMENTS: &str = r#"{
  "GET": "comments.list",
  "paramsSchema": {
    "type": "object",
    "properties": { "postId": { "type": "integer", "minimum": 1 } },
    "required": ["postId"]
  },
  "querySchema": {
    "type": "object",
    "properties": { "limit": { "type": "integer", "maximum": 50 } }
  }
}"#;

fn tree() -> tempfile::TempDir {
    temp_tree(&[
        ("users/index.toml", USERS_INDEX),
        ("users/[userId].toml", USER_BY_ID),
        ("users/me.toml", "GET = \"users.me\"\n"),
        ("posts/[postId]/comments/index.json", COMMENTS),
        ("fail.toml", "GET = \"fail\"\nPOST = \"boom\"\nDELETE = \"gone\"\n"),
    ])
}

fn builder(root: &std::path::Path) -> AppBuilder {
    let create = handler_fn(|req| async move {
        let schema = Schema::new(json!({
            "type": "object",
            "properties": { "name": { "type": "string", "minLength": 1 } },
            "required": ["name"]
        }))
        .map_err(RouteError::internal)?;
        let body = req.validated_body(&schema).await?;
        Ok(json_response(StatusCode::CREATED, body))
    });

    AppBuilder::new()
        .handler("users.list", tagged("users.list"))
        .handler("users.create", create)
        .handler("users.show", tagged("users.show"))
        .handler("users.me", tagged("users.me"))
        .handler("comments.list", tagged("comments.list"))
        .handler("fail", handler_fn(|_req| async { Err(RouteError::internal("database unreachable")) }))
        .handler("boom", handler_fn(explode))
        .handler("gone", handler_fn(|_req| async { Err(RouteError::NotFound) }))
        .discover(root, "/api")
}

async fn explode(_req: RouteRequest) -> DispatchResult {
    panic!("handler exploded")
}

fn dispatcher(root: &std::path::Path) -> Dispatcher {
    builder(root).build().unwrap()
}

#[tokio::test]
async fn test_unmatched_path_is_404() {
    let dir = tree();
    let d = dispatcher(dir.path());

    let (status, body) = dispatch(&d, Method::GET, "/api/nothing/here", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not Found" }));

    let (status, _) = dispatch(&d, Method::GET, "/users", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND, "discovered routes live under the mount path");
}

#[tokio::test]
async fn test_unregistered_method_is_404() {
    let dir = tree();
    let d = dispatcher(dir.path());
    let (status, body) = dispatch(&d, Method::PUT, "/api/users/3", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not Found" }));
}

#[tokio::test]
async fn test_coerced_params_reach_handler() {
    let dir = tree();
    let d = dispatcher(dir.path());
    let (status, body) = dispatch(&d, Method::GET, "/api/posts/7/comments", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handler"], "comments.list");
    assert_eq!(body["params"], json!({ "postId": 7 }));
}

#[tokio::test]
async fn test_invalid_params_are_400() {
    let dir = tree();
    let d = dispatcher(dir.path());
    let (status, body) = dispatch(&d, Method::GET, "/api/posts/-1/comments", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Failed");
    assert_eq!(body["details"]["postId"].as_array().unwrap().len(), 1);
    assert_eq!(body["formErrors"], json!([]));
}

#[tokio::test]
async fn test_params_checked_before_query() {
    let dir = tree();
    let d = dispatcher(dir.path());
    let (status, body) = dispatch(&d, Method::GET, "/api/posts/0/comments?limit=500", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("postId"));
    assert!(!details.contains_key("limit"));

    let (status, body) = dispatch(&d, Method::GET, "/api/posts/3/comments?limit=500", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["limit"].is_array());
}

#[tokio::test]
async fn test_query_defaults_and_repeated_keys() {
    let dir = tree();
    let d = dispatcher(dir.path());
    let (status, body) = dispatch(&d, Method::GET, "/api/users?tag=a&tag=b", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], json!({ "page": 1, "tag": ["a", "b"] }));

    let (status, body) = dispatch(&d, Method::GET, "/api/users?page=zero", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["page"].is_array());
}

#[tokio::test]
async fn test_literal_sibling_outranks_parameter() {
    let dir = tree();
    let d = dispatcher(dir.path());
    let (_, body) = dispatch(&d, Method::GET, "/api/users/me", "").await;
    assert_eq!(body["handler"], "users.me");
    let (_, body) = dispatch(&d, Method::GET, "/api/users/42", "").await;
    assert_eq!(body["handler"], "users.show");
    assert_eq!(body["params"], json!({ "userId": 42 }));
}

#[tokio::test]
async fn test_handler_error_is_generic_500() {
    let dir = tree();
    let d = dispatcher(dir.path());
    let (status, body) = dispatch(&d, Method::GET, "/api/fail", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Internal Server Error", "message": "An unexpected error occurred" })
    );
}

#[tokio::test]
async fn test_handler_error_message_exposed_when_enabled() {
    let dir = tree();
    let d = builder(dir.path()).expose_error_messages(true).build().unwrap();
    let (status, body) = dispatch(&d, Method::GET, "/api/fail", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "database unreachable");
}

#[tokio::test]
async fn test_panic_is_500() {
    let dir = tree();
    let d = dispatcher(dir.path());
    let (status, body) = dispatch(&d, Method::POST, "/api/fail", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal Server Error");
}

#[tokio::test]
async fn test_handler_not_found_is_404() {
    let dir = tree();
    let d = dispatcher(dir.path());
    let (status, body) = dispatch(&d, Method::DELETE, "/api/fail", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not Found" }));
}

#[tokio::test]
async fn test_body_validation() {
    let dir = tree();
    let d = dispatcher(dir.path());

    let (status, body) = dispatch(&d, Method::POST, "/api/users", r#"{"name":"ada"}"#).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "name": "ada" }));

    let (status, body) = dispatch(&d, Method::POST, "/api/users", r#"{"name":""}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["name"].is_array());

    let (status, body) = dispatch(&d, Method::POST, "/api/users", "{oops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["formErrors"].as_array().unwrap().len(), 1);
}

type Log = Arc<Mutex<Vec<String>>>;

/// Records what it sees, on the way in and on the way out.
struct Recorder(Log);

impl Middleware for Recorder {
    fn handle<'a>(&'a self, req: RouteRequest, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        async move {
            self.0.lock().unwrap().push(format!("in {} {}", req.path(), req.params()));
            let result = next.run(req).await;
            let outcome = match &result {
                Ok(response) => response.status().as_u16().to_string(),
                Err(RouteError::Validation(_)) => "validation".to_string(),
                Err(e) => e.to_string(),
            };
            self.0.lock().unwrap().push(format!("out {outcome}"));
            result
        }
        .boxed()
    }
}

/// Rejects requests without an `authorization` header.
struct RequireAuth;

impl Middleware for RequireAuth {
    fn handle<'a>(&'a self, req: RouteRequest, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        async move {
            if req.header("authorization").is_none() {
                return Ok(json_response(StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })));
            }
            next.run(req).await
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_middleware_sees_validated_params_and_errors_unwind() {
    let dir = tree();
    let log: Log = Default::default();
    let d = builder(dir.path())
        .middleware(Arc::new(Recorder(log.clone())))
        .build()
        .unwrap();

    dispatch(&d, Method::GET, "/api/users/5", "").await;
    dispatch(&d, Method::POST, "/api/users", "{}").await;
    dispatch(&d, Method::GET, "/api/fail", "").await;

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            r#"in /api/users/5 {"userId":5}"#.to_string(),
            "out 200".to_string(),
            "in /api/users {}".to_string(),
            "out validation".to_string(),
            "in /api/fail {}".to_string(),
            "out database unreachable".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_gate_failures_and_misses_bypass_middleware() {
    let dir = tree();
    let log: Log = Default::default();
    let d = builder(dir.path())
        .middleware(Arc::new(Recorder(log.clone())))
        .build()
        .unwrap();

    dispatch(&d, Method::GET, "/api/missing", "").await;
    dispatch(&d, Method::GET, "/api/users/abc", "").await;
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_short_circuit_skips_later_middleware_and_handler() {
    let dir = tree();
    let log: Log = Default::default();
    let d = builder(dir.path())
        .middleware(Arc::new(RequireAuth))
        .middleware(Arc::new(Recorder(log.clone())))
        .build()
        .unwrap();

    let (status, body) = dispatch(&d, Method::GET, "/api/users", "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_static_route_registration() {
    let d = AppBuilder::new()
        .route(Method::GET, "/status", tagged("status"))
        .route(Method::GET, "/items/:id", tagged("item"))
        .build()
        .unwrap();

    let (status, body) = dispatch(&d, Method::GET, "/status/", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handler"], "status");

    let (_, body) = dispatch(&d, Method::GET, "/items/a%20b", "").await;
    assert_eq!(body["params"], json!({ "id": "a b" }));
    assert_eq!(body["query"], Value::Object(Default::default()));
}
