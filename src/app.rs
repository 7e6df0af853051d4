//! Application assembly.
//!
//! # Responsibilities
//! - Collect handlers, static routes, middleware and the validator
//! - Describe how to (re)build the route table as a `RouteCatalog`
//! - Freeze everything into a `Dispatcher`
//!
//! # Design Decisions
//! - Discovered routes are inserted first, static routes after them, so the
//!   order is the same on every build
//! - Static routes are absolute; the mount path only applies to the tree
//! - A static route colliding with a discovered one is a build error unless
//!   it was registered with `replace_route`
//! - Builder calls never fail; the first recorded error is returned by `build`

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;

use crate::config::schema::ServerConfig;
use crate::discovery::walker::{DiscoveryError, TreeWalker};
use crate::dispatch::handler::{Handler, HandlerRegistry};
use crate::dispatch::middleware::{Middleware, MiddlewareChain};
use crate::dispatch::pipeline::{DispatchSettings, Dispatcher};
use crate::routing::pattern::{MountPath, PatternError, RoutePattern};
use crate::routing::table::{RouteBinding, RouteTable, TableError};
use crate::validation::gate::ValidationGate;
use crate::validation::schema::{JsonSchemaValidator, SchemaValidator};

/// Errors raised while building the route table.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("invalid route `{path}`: {source}")]
    Pattern {
        path: String,
        #[source]
        source: PatternError,
    },
}

#[derive(Debug, Clone)]
struct StaticRoute {
    binding: RouteBinding,
    replace: bool,
}

/// Everything needed to rebuild the route table from scratch.
#[derive(Debug, Clone, Default)]
pub struct RouteCatalog {
    walker: Option<TreeWalker>,
    registry: HandlerRegistry,
    static_routes: Vec<StaticRoute>,
}

impl RouteCatalog {
    pub fn walker(&self) -> Option<&TreeWalker> {
        self.walker.as_ref()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Walk the tree (if any) and append static routes.
    pub fn build(&self) -> Result<RouteTable, BuildError> {
        let discovered = match &self.walker {
            Some(walker) => walker.scan(&self.registry)?,
            None => Vec::new(),
        };
        let discovered_count = discovered.len();
        let mut table = RouteTable::from_bindings(discovered)?;

        for route in &self.static_routes {
            if route.replace {
                if let Some(old) = table.replace(route.binding.clone()) {
                    tracing::info!(
                        method = %old.method,
                        pattern = %old.pattern,
                        replaced = %old.source,
                        "Static route replaces discovered route"
                    );
                }
            } else {
                table.insert(route.binding.clone())?;
            }
        }

        tracing::debug!(
            discovered = discovered_count,
            static_routes = self.static_routes.len(),
            total = table.len(),
            "Route table built"
        );
        Ok(table)
    }
}

/// Fluent builder for a `Dispatcher`.
pub struct AppBuilder {
    registry: HandlerRegistry,
    walker: Option<TreeWalker>,
    static_routes: Vec<StaticRoute>,
    middleware: Vec<Arc<dyn Middleware>>,
    validator: Arc<dyn SchemaValidator>,
    settings: DispatchSettings,
    error: Option<BuildError>,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            walker: None,
            static_routes: Vec::new(),
            middleware: Vec::new(),
            validator: Arc::new(JsonSchemaValidator),
            settings: DispatchSettings::default(),
            error: None,
        }
    }

    fn record(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Register a named handler that modules may refer to.
    pub fn handler(mut self, name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.registry.register(name, handler);
        self
    }

    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Register a static route at an absolute path (`:name` or `[name]` params).
    pub fn route(self, method: Method, path: &str, handler: Arc<dyn Handler>) -> Self {
        self.static_route(method, path, handler, false)
    }

    /// Like `route`, but takes over an existing binding for the same
    /// method and pattern instead of failing.
    pub fn replace_route(self, method: Method, path: &str, handler: Arc<dyn Handler>) -> Self {
        self.static_route(method, path, handler, true)
    }

    fn static_route(mut self, method: Method, path: &str, handler: Arc<dyn Handler>, replace: bool) -> Self {
        match RoutePattern::parse(path) {
            Ok(pattern) => {
                let name = format!("{method} {pattern}");
                self.static_routes.push(StaticRoute {
                    binding: RouteBinding::new(method, pattern, name, handler),
                    replace,
                });
            }
            Err(source) => self.record(BuildError::Pattern {
                path: path.to_string(),
                source,
            }),
        }
        self
    }

    /// Register a fully prepared binding, schemas included.
    pub fn add_route(mut self, binding: RouteBinding) -> Self {
        self.static_routes.push(StaticRoute {
            binding,
            replace: false,
        });
        self
    }

    /// Append a global middleware. Runs in registration order.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn expose_error_messages(mut self, expose: bool) -> Self {
        self.settings.expose_error_messages = expose;
        self
    }

    /// Discover routes under `root`, mounted at `mount`.
    pub fn discover(mut self, root: impl Into<PathBuf>, mount: &str) -> Self {
        match MountPath::new(mount) {
            Ok(mount) => self.walker = Some(TreeWalker::new(root, mount)),
            Err(source) => self.record(BuildError::Pattern {
                path: mount.to_string(),
                source,
            }),
        }
        self
    }

    /// Use a preconfigured walker (custom loader or extensions).
    pub fn walker(mut self, walker: TreeWalker) -> Self {
        self.walker = Some(walker);
        self
    }

    /// Apply the routing and response sections of a loaded config.
    pub fn configure(mut self, config: &ServerConfig) -> Self {
        self.settings.expose_error_messages = config.responses.expose_error_messages;
        if let Some(root) = &config.routing.handler_root {
            self = self.discover(root.clone(), &config.routing.mount_path);
            if let Some(walker) = self.walker.take() {
                self.walker = Some(walker.with_extensions(config.routing.extensions.iter().cloned()));
            }
        }
        self
    }

    /// Build the initial table and freeze the pipeline.
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let catalog = Arc::new(RouteCatalog {
            walker: self.walker,
            registry: self.registry,
            static_routes: self.static_routes,
        });
        let table = catalog.build()?;
        let chain = MiddlewareChain::new(self.middleware);

        tracing::info!(
            routes = table.len(),
            handlers = catalog.registry().len(),
            middleware = ?chain.names(),
            "Dispatcher ready"
        );

        Ok(Dispatcher::new(
            table,
            chain,
            ValidationGate::new(self.validator),
            self.settings,
            catalog,
        ))
    }
}
