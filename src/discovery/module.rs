//! Handler module records and their loader.
//!
//! # Responsibilities
//! - Read one module file into a plain `ModuleRecord`
//! - Compile the optional params/query schemas it declares
//!
//! # Design Decisions
//! - A module is a manifest (TOML or JSON) with one optional field per
//!   recognized method, each naming a registered handler
//! - Unknown keys are ignored, so lowercase `get` is not a method export
//! - A module without method exports is a support file, not an error

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::validation::schema::{Schema, SchemaError};

/// Method names a module may export, in binding order.
pub const RECOGNIZED_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "HEAD"];

/// On-disk shape of a handler module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleManifest {
    #[serde(rename = "GET")]
    pub get: Option<String>,
    #[serde(rename = "POST")]
    pub post: Option<String>,
    #[serde(rename = "PUT")]
    pub put: Option<String>,
    #[serde(rename = "PATCH")]
    pub patch: Option<String>,
    #[serde(rename = "DELETE")]
    pub delete: Option<String>,
    #[serde(rename = "OPTIONS")]
    pub options: Option<String>,
    #[serde(rename = "HEAD")]
    pub head: Option<String>,
    #[serde(rename = "paramsSchema")]
    pub params_schema: Option<Value>,
    #[serde(rename = "querySchema")]
    pub query_schema: Option<Value>,
}

impl ModuleManifest {
    /// `(method, handler name)` pairs in `RECOGNIZED_METHODS` order.
    pub fn exports(&self) -> Vec<(Method, &str)> {
        [
            (Method::GET, &self.get),
            (Method::POST, &self.post),
            (Method::PUT, &self.put),
            (Method::PATCH, &self.patch),
            (Method::DELETE, &self.delete),
            (Method::OPTIONS, &self.options),
            (Method::HEAD, &self.head),
        ]
        .into_iter()
        .filter_map(|(method, name)| name.as_deref().map(|n| (method, n)))
        .collect()
    }
}

/// A loaded module: method exports plus compiled schemas.
#[derive(Debug, Clone, Default)]
pub struct ModuleRecord {
    pub methods: Vec<(Method, String)>,
    pub params_schema: Option<Arc<Schema>>,
    pub query_schema: Option<Arc<Schema>>,
}

impl ModuleRecord {
    pub fn from_manifest(path: &Path, manifest: ModuleManifest) -> Result<Self, ModuleLoadError> {
        let methods = manifest
            .exports()
            .into_iter()
            .map(|(method, name)| (method, name.to_string()))
            .collect();
        let params_schema = compile_slot(path, "paramsSchema", manifest.params_schema)?;
        let query_schema = compile_slot(path, "querySchema", manifest.query_schema)?;
        Ok(Self {
            methods,
            params_schema,
            query_schema,
        })
    }

    /// True when the module exports no recognized method.
    pub fn is_support_file(&self) -> bool {
        self.methods.is_empty()
    }
}

fn compile_slot(
    path: &Path,
    slot: &'static str,
    raw: Option<Value>,
) -> Result<Option<Arc<Schema>>, ModuleLoadError> {
    raw.map(|value| {
        Schema::new(value).map(Arc::new).map_err(|source| ModuleLoadError::Schema {
            path: path.to_path_buf(),
            slot,
            source,
        })
    })
    .transpose()
}

/// Failure to load a single module file.
#[derive(Debug, thiserror::Error)]
pub enum ModuleLoadError {
    #[error("cannot read module {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse module {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot parse module {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("module {} declares an invalid {slot}: {source}", .path.display())]
    Schema {
        path: PathBuf,
        slot: &'static str,
        #[source]
        source: SchemaError,
    },

    #[error("no loader for module {}", .path.display())]
    UnsupportedExtension { path: PathBuf },
}

/// Turns a module file into a `ModuleRecord`.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<ModuleRecord, ModuleLoadError>;
}

/// Loads `.toml` and `.json` manifests from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

impl ModuleLoader for ManifestLoader {
    fn load(&self, path: &Path) -> Result<ModuleRecord, ModuleLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: ModuleManifest = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|source| ModuleLoadError::Toml {
                path: path.to_path_buf(),
                source,
            })?,
            Some("json") => serde_json::from_str(&content).map_err(|source| ModuleLoadError::Json {
                path: path.to_path_buf(),
                source,
            })?,
            _ => {
                return Err(ModuleLoadError::UnsupportedExtension {
                    path: path.to_path_buf(),
                })
            }
        };
        ModuleRecord::from_manifest(path, manifest)
    }
}
