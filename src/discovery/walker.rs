//! Handler tree walker.
//!
//! # Responsibilities
//! - Walk the handler root recursively in a deterministic order
//! - Load every eligible module and compile its route pattern
//! - Produce one `RouteBinding` per exported method
//!
//! # Design Decisions
//! - Pure function of the directory snapshot: the walker returns bindings and
//!   never touches a live table
//! - Entries are visited sorted by file name, so two scans of an unchanged
//!   tree yield identical bindings in identical order
//! - Fail fast: a module that cannot be loaded, a malformed path or an
//!   unknown handler aborts the whole scan

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::Method;
use walkdir::WalkDir;

use crate::discovery::module::{ManifestLoader, ModuleLoadError, ModuleLoader};
use crate::dispatch::handler::HandlerRegistry;
use crate::routing::pattern::{MountPath, PatternError, RoutePattern};
use crate::routing::table::{RouteBinding, RouteSource};

/// Errors that abort a tree walk.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("handler root {} is not a directory", .0.display())]
    MissingRoot(PathBuf),

    #[error("failed to walk handler tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    ModuleLoad(#[from] ModuleLoadError),

    #[error("invalid route path for {}: {source}", .file.display())]
    Pattern {
        file: PathBuf,
        #[source]
        source: PatternError,
    },

    #[error("{}: {method} refers to unknown handler `{handler}`", .file.display())]
    UnknownHandler {
        file: PathBuf,
        method: Method,
        handler: String,
    },
}

/// Walks a handler root and turns modules into bindings.
#[derive(Clone)]
pub struct TreeWalker {
    root: PathBuf,
    mount: MountPath,
    extensions: Vec<String>,
    loader: Arc<dyn ModuleLoader>,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>, mount: MountPath) -> Self {
        Self {
            root: root.into(),
            mount,
            extensions: vec!["toml".to_string(), "json".to_string()],
            loader: Arc::new(ManifestLoader),
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mount(&self) -> &MountPath {
        &self.mount
    }

    fn is_eligible(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }

    /// Scan the tree, resolving handler names through `registry`.
    pub fn scan(&self, registry: &HandlerRegistry) -> Result<Vec<RouteBinding>, DiscoveryError> {
        if !self.root.is_dir() {
            return Err(DiscoveryError::MissingRoot(self.root.clone()));
        }

        let mut bindings = Vec::new();
        let mut modules = 0usize;
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !self.is_eligible(entry.path()) {
                continue;
            }
            let file = entry.path();
            let record = self.loader.load(file)?;
            modules += 1;
            if record.is_support_file() {
                tracing::debug!(file = %file.display(), "Skipping support module");
                continue;
            }

            let relative = route_path(&self.root, file);
            let pattern = RoutePattern::from_file_path(&relative, &self.mount).map_err(|source| {
                DiscoveryError::Pattern {
                    file: file.to_path_buf(),
                    source,
                }
            })?;

            for (method, name) in &record.methods {
                let handler = registry.get(name).ok_or_else(|| DiscoveryError::UnknownHandler {
                    file: file.to_path_buf(),
                    method: method.clone(),
                    handler: name.clone(),
                })?;
                let mut binding = RouteBinding::new(method.clone(), pattern.clone(), name.clone(), handler)
                    .with_source(RouteSource::File(file.to_path_buf()));
                binding.params_schema = record.params_schema.clone();
                binding.query_schema = record.query_schema.clone();

                tracing::debug!(
                    method = %method,
                    pattern = %pattern,
                    handler = %name,
                    file = %file.display(),
                    "Discovered route"
                );
                bindings.push(binding);
            }
        }

        tracing::info!(
            root = %self.root.display(),
            modules,
            routes = bindings.len(),
            "Handler tree scanned"
        );
        Ok(bindings)
    }
}

impl std::fmt::Debug for TreeWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWalker")
            .field("root", &self.root)
            .field("mount", &self.mount)
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// Relative path of `file` under `root`, `/`-separated, extension stripped.
fn route_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::module::ModuleRecord;
    use crate::dispatch::handler::handler_fn;
    use crate::dispatch::response::json_response;
    use crate::routing::table::RouteTable;
    use axum::http::StatusCode;
    use std::collections::HashMap;

    fn registry(names: &[&str]) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        for name in names {
            registry.register(
                *name,
                handler_fn(|_req| async { Ok(json_response(StatusCode::OK, serde_json::json!({}))) }),
            );
        }
        registry
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn summary(bindings: &[RouteBinding]) -> Vec<String> {
        bindings
            .iter()
            .map(|b| format!("{} {} {}", b.method, b.pattern, b.handler_name))
            .collect()
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "index.toml", "GET = \"root\"\n");
        write(root, "users/index.toml", "GET = \"users.list\"\nPOST = \"users.create\"\n");
        write(
            root,
            "users/[userId].toml",
            "GET = \"users.show\"\nDELETE = \"users.delete\"\n\n[paramsSchema]\ntype = \"object\"\n",
        );
        write(root, "users/schemas.json", r#"{"querySchema": {"type": "object"}}"#);
        write(root, "users/notes.txt", "not a module");
        write(root, "posts/[postId]/comments/[commentId].json", r#"{"GET": "comments.show"}"#);
        dir
    }

    fn all_handlers() -> HandlerRegistry {
        registry(&["root", "users.list", "users.create", "users.show", "users.delete", "comments.show"])
    }

    #[test]
    fn test_scan_discovers_bindings_in_order() {
        let dir = tree();
        let walker = TreeWalker::new(dir.path(), MountPath::new("/api").unwrap());
        let bindings = walker.scan(&all_handlers()).unwrap();

        assert_eq!(
            summary(&bindings),
            vec![
                "GET /api root",
                "GET /api/posts/:postId/comments/:commentId comments.show",
                "GET /api/users/:userId users.show",
                "DELETE /api/users/:userId users.delete",
                "GET /api/users users.list",
                "POST /api/users users.create",
            ]
        );
    }

    #[test]
    fn test_schemas_attach_to_every_method() {
        let dir = tree();
        let walker = TreeWalker::new(dir.path(), MountPath::new("/api").unwrap());
        let bindings = walker.scan(&all_handlers()).unwrap();
        let with_schema: Vec<_> = bindings
            .iter()
            .filter(|b| b.params_schema.is_some())
            .map(|b| b.handler_name.as_str())
            .collect();
        assert_eq!(with_schema, vec!["users.show", "users.delete"]);
        assert!(bindings.iter().all(|b| matches!(b.source, RouteSource::File(_))));
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let dir = tree();
        let walker = TreeWalker::new(dir.path(), MountPath::new("/api").unwrap());
        write(dir.path(), "posts/index.toml", "GET = \"root\"\n\n[querySchema]\ntype = \"object\"\n");
        let first = walker.scan(&all_handlers()).unwrap();
        let second = walker.scan(&all_handlers()).unwrap();
        assert_eq!(summary(&first), summary(&second));

        let first = RouteTable::from_bindings(first).unwrap();
        let second = RouteTable::from_bindings(second).unwrap();
        let match_order = |table: &RouteTable| {
            table
                .ordered()
                .map(|b| {
                    (
                        b.method.clone(),
                        b.pattern.to_string(),
                        b.handler_name.clone(),
                        b.params_schema.is_some(),
                        b.query_schema.is_some(),
                        b.source.clone(),
                    )
                })
                .collect::<Vec<_>>()
        };
        let order = match_order(&first);
        assert_eq!(order, match_order(&second));
        assert!(order
            .iter()
            .any(|(_, pattern, _, params, _, _)| pattern == "/api/users/:userId" && *params));
        assert!(order
            .iter()
            .any(|(_, pattern, _, _, query, _)| pattern == "/api/posts" && *query));
    }

    #[test]
    fn test_broken_module_fails_the_scan() {
        let dir = tree();
        write(dir.path(), "users/broken.toml", "GET = [");
        let walker = TreeWalker::new(dir.path(), MountPath::new("/api").unwrap());
        let err = walker.scan(&all_handlers()).unwrap_err();
        assert!(matches!(err, DiscoveryError::ModuleLoad(_)));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_malformed_path_fails_the_scan() {
        let dir = tree();
        write(dir.path(), "users/[oops.toml", "GET = \"root\"\n");
        let walker = TreeWalker::new(dir.path(), MountPath::new("/api").unwrap());
        assert!(matches!(
            walker.scan(&all_handlers()),
            Err(DiscoveryError::Pattern { .. })
        ));
    }

    #[test]
    fn test_malformed_path_allowed_for_support_file() {
        let dir = tree();
        write(dir.path(), "users/[draft.toml", "[querySchema]\ntype = \"object\"\n");
        let walker = TreeWalker::new(dir.path(), MountPath::new("/api").unwrap());
        assert!(walker.scan(&all_handlers()).is_ok());
    }

    #[test]
    fn test_unknown_handler_fails_the_scan() {
        let dir = tree();
        let walker = TreeWalker::new(dir.path(), MountPath::new("/api").unwrap());
        let err = walker.scan(&registry(&["root"])).unwrap_err();
        assert!(matches!(err, DiscoveryError::UnknownHandler { .. }));
    }

    #[test]
    fn test_missing_root() {
        let walker = TreeWalker::new("/definitely/not/here", MountPath::default());
        assert!(matches!(walker.scan(&all_handlers()), Err(DiscoveryError::MissingRoot(_))));
    }

    /// Serves records from memory, keyed by file name.
    struct FakeLoader(HashMap<String, ModuleRecord>);

    impl ModuleLoader for FakeLoader {
        fn load(&self, path: &Path) -> Result<ModuleRecord, ModuleLoadError> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            Ok(self.0.get(&name).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_custom_loader_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "health.mod", "");
        write(dir.path(), "ignored.toml", "GET = \"root\"\n");

        let loader = FakeLoader(HashMap::from([(
            "health.mod".to_string(),
            ModuleRecord {
                methods: vec![(Method::GET, "root".to_string())],
                ..Default::default()
            },
        )]));
        let walker = TreeWalker::new(dir.path(), MountPath::default())
            .with_extensions(["mod"])
            .with_loader(Arc::new(loader));
        let bindings = walker.scan(&all_handlers()).unwrap();
        assert_eq!(summary(&bindings), vec!["GET /health root"]);
    }
}
