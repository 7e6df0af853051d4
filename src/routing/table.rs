//! Route table storage and specificity ordering.
//!
//! # Responsibilities
//! - Own every `RouteBinding` (static and discovered) for the serving lifetime
//! - Reject duplicate `(method, pattern)` pairs unless explicitly replaced
//! - Expose bindings ordered by descending specificity
//!
//! # Design Decisions
//! - Bindings are partitioned by method; the ordered views are rebuilt lazily
//!   after the first lookup following an insertion
//! - Ties are broken by insertion order (stable sort), so a deterministic
//!   registration sequence yields a deterministic table
//! - A table is never mutated while serving; reloads build a new table

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use axum::http::Method;

use crate::dispatch::handler::Handler;
use crate::routing::pattern::RoutePattern;
use crate::validation::schema::Schema;

/// Where a binding came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteSource {
    /// Registered through the manual registration API.
    Static,
    /// Discovered from a module file during the tree walk.
    File(PathBuf),
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSource::Static => f.write_str("static"),
            RouteSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Association of a method and pattern with a handler and optional schemas.
#[derive(Clone)]
pub struct RouteBinding {
    pub method: Method,
    pub pattern: RoutePattern,
    pub handler_name: String,
    pub handler: Arc<dyn Handler>,
    pub params_schema: Option<Arc<Schema>>,
    pub query_schema: Option<Arc<Schema>>,
    pub source: RouteSource,
}

impl RouteBinding {
    pub fn new(
        method: Method,
        pattern: RoutePattern,
        handler_name: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            method,
            pattern,
            handler_name: handler_name.into(),
            handler,
            params_schema: None,
            query_schema: None,
            source: RouteSource::Static,
        }
    }

    pub fn with_params_schema(mut self, schema: Arc<Schema>) -> Self {
        self.params_schema = Some(schema);
        self
    }

    pub fn with_query_schema(mut self, schema: Arc<Schema>) -> Self {
        self.query_schema = Some(schema);
        self
    }

    pub fn with_source(mut self, source: RouteSource) -> Self {
        self.source = source;
        self
    }
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("method", &self.method)
            .field("pattern", &self.pattern.to_string())
            .field("handler", &self.handler_name)
            .field("params_schema", &self.params_schema.is_some())
            .field("query_schema", &self.query_schema.is_some())
            .field("source", &self.source)
            .finish()
    }
}

/// Errors raised while inserting into the table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("duplicate route {method} {pattern} (from {new_source}, already registered from {existing_source})")]
    DuplicateRoute {
        method: Method,
        pattern: String,
        existing_source: RouteSource,
        new_source: RouteSource,
    },
}

/// Ordered collection of route bindings.
#[derive(Default, Clone)]
pub struct RouteTable {
    /// Insertion order.
    bindings: Vec<Arc<RouteBinding>>,
    /// Method → indices into `bindings`, insertion order.
    by_method: HashMap<Method, Vec<usize>>,
    /// Indices into `bindings`, most specific first.
    ordered: OnceLock<Vec<usize>>,
    ordered_by_method: OnceLock<HashMap<Method, Vec<usize>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from bindings in registration order.
    pub fn from_bindings<I>(bindings: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = RouteBinding>,
    {
        let mut table = Self::new();
        for binding in bindings {
            table.insert(binding)?;
        }
        Ok(table)
    }

    /// Append a binding. Fails if the `(method, pattern)` pair is already taken.
    pub fn insert(&mut self, binding: RouteBinding) -> Result<(), TableError> {
        if let Some(existing) = self.position(&binding.method, &binding.pattern) {
            return Err(TableError::DuplicateRoute {
                method: binding.method,
                pattern: binding.pattern.to_string(),
                existing_source: self.bindings[existing].source.clone(),
                new_source: binding.source,
            });
        }
        self.push(binding);
        Ok(())
    }

    /// Insert or replace a binding, keeping the original registration slot
    /// when replacing. Returns the replaced binding, if any.
    pub fn replace(&mut self, binding: RouteBinding) -> Option<Arc<RouteBinding>> {
        match self.position(&binding.method, &binding.pattern) {
            Some(index) => {
                tracing::debug!(
                    method = %binding.method,
                    pattern = %binding.pattern,
                    "Replacing route binding"
                );
                let old = std::mem::replace(&mut self.bindings[index], Arc::new(binding));
                self.invalidate();
                Some(old)
            }
            None => {
                self.push(binding);
                None
            }
        }
    }

    fn push(&mut self, binding: RouteBinding) {
        let index = self.bindings.len();
        self.by_method.entry(binding.method.clone()).or_default().push(index);
        self.bindings.push(Arc::new(binding));
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.ordered = OnceLock::new();
        self.ordered_by_method = OnceLock::new();
    }

    fn position(&self, method: &Method, pattern: &RoutePattern) -> Option<usize> {
        self.by_method
            .get(method)?
            .iter()
            .copied()
            .find(|&i| self.bindings[i].pattern == *pattern)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in registration order.
    pub fn bindings(&self) -> &[Arc<RouteBinding>] {
        &self.bindings
    }

    /// All bindings, most specific first.
    pub fn ordered(&self) -> impl Iterator<Item = &Arc<RouteBinding>> {
        self.ordered_indices().iter().map(|&i| &self.bindings[i])
    }

    /// Bindings for one method, most specific first.
    pub fn ordered_for(&self, method: &Method) -> impl Iterator<Item = &Arc<RouteBinding>> {
        self.ordered_by_method
            .get_or_init(|| {
                let mut grouped: HashMap<Method, Vec<usize>> = HashMap::new();
                for &i in self.ordered_indices() {
                    grouped.entry(self.bindings[i].method.clone()).or_default().push(i);
                }
                grouped
            })
            .get(method)
            .into_iter()
            .flatten()
            .map(|&i| &self.bindings[i])
    }

    /// Methods that have at least one binding.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.by_method.keys()
    }

    fn ordered_indices(&self) -> &[usize] {
        self.ordered.get_or_init(|| {
            let mut indices: Vec<usize> = (0..self.bindings.len()).collect();
            // Stable: equal keys keep insertion order.
            indices.sort_by(|&a, &b| {
                compare_specificity(&self.bindings[a].pattern, &self.bindings[b].pattern)
            });
            indices
        })
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ordered()).finish()
    }
}

/// Orders two patterns by descending specificity.
///
/// More leading literals rank first; among patterns of the same length a
/// literal outranks a parameter at the first position where they differ.
pub fn compare_specificity(a: &RoutePattern, b: &RoutePattern) -> Ordering {
    b.literal_prefix_len()
        .cmp(&a.literal_prefix_len())
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| {
            for (x, y) in a.segments().iter().zip(b.segments()) {
                match (x.is_literal(), y.is_literal()) {
                    (true, false) => return Ordering::Less,
                    (false, true) => return Ordering::Greater,
                    _ => {}
                }
            }
            Ordering::Equal
        })
}
