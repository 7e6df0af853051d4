//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Check the mount path and handler root before discovery runs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ConfigIssue>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;
use crate::routing::pattern::MountPath;

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

impl ConfigIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ConfigIssue::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        issues.push(ConfigIssue::new("listener.max_body_bytes", "must be greater than zero"));
    }
    if config.timeouts.request_secs == 0 {
        issues.push(ConfigIssue::new("timeouts.request_secs", "must be greater than zero"));
    }

    if let Err(e) = MountPath::new(&config.routing.mount_path) {
        issues.push(ConfigIssue::new("routing.mount_path", e.to_string()));
    }
    if config.routing.extensions.is_empty() {
        issues.push(ConfigIssue::new("routing.extensions", "at least one extension is required"));
    }
    for ext in &config.routing.extensions {
        if ext.is_empty() || ext.starts_with('.') {
            issues.push(ConfigIssue::new(
                "routing.extensions",
                format!("`{ext}` must be a bare extension such as `toml`"),
            ));
        }
    }
    if let Some(root) = &config.routing.handler_root {
        if !root.is_dir() {
            issues.push(ConfigIssue::new(
                "routing.handler_root",
                format!("{} is not a directory", root.display()),
            ));
        }
    }
    if config.routing.hot_reload && config.routing.handler_root.is_none() {
        issues.push(ConfigIssue::new("routing.hot_reload", "requires routing.handler_root"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
