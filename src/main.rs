//! File-system routed HTTP server.
//!
//! # Architecture Overview
//!
//! ```text
//!     handler tree (manifests)        config (TOML)
//!              │                            │
//!              ▼                            ▼
//!     ┌─────────────────┐          ┌─────────────────┐
//!     │   discovery     │          │     config      │
//!     │ walker + loader │          │ loader + checks │
//!     └────────┬────────┘          └────────┬────────┘
//!              │ bindings                   │
//!              ▼                            ▼
//!     ┌─────────────────┐          ┌─────────────────┐
//!     │  routing table  │◀─────────│   AppBuilder    │◀── static routes,
//!     │ (specificity)   │          │                 │    middleware, handlers
//!     └────────┬────────┘          └────────┬────────┘
//!              │                            │
//!              ▼                            ▼
//!     Client ─▶ http server ─▶ Dispatcher: match → validate → middleware → handler
//!                                    │
//!                                    └─▶ 200 / 400 / 404 / 500 JSON
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use clap::Parser;
use tokio::net::TcpListener;

use tree_router::app::AppBuilder;
use tree_router::builtin::{self, register_builtin};
use tree_router::config::{load_config, ServerConfig};
use tree_router::discovery::RouteWatcher;
use tree_router::dispatch::{Dispatcher, RequestLogger};
use tree_router::http::HttpServer;
use tree_router::lifecycle::Shutdown;
use tree_router::observability::init_logging;

#[derive(Parser)]
#[command(name = "tree-router")]
#[command(about = "Serve a directory of handler manifests over HTTP", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the route table in match order and exit
    #[arg(long)]
    routes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    init_logging(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        mount_path = %config.routing.mount_path,
        handler_root = ?config.routing.handler_root,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let mut builder = AppBuilder::new();
    register_builtin(builder.registry_mut());
    let health = builder.registry_mut().get(builtin::HEALTH);
    if let Some(health) = health {
        builder = builder.route(Method::GET, "/health", health);
    }
    let dispatcher = Arc::new(
        builder
            .middleware(Arc::new(RequestLogger))
            .configure(&config)
            .build()?,
    );

    if cli.routes {
        print_routes(&dispatcher);
        return Ok(());
    }

    let _watcher = match (&config.routing.handler_root, config.routing.hot_reload) {
        (Some(root), true) => Some(
            RouteWatcher::new(root, Duration::from_millis(config.routing.reload_debounce_ms))
                .spawn(dispatcher.clone())?,
        ),
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, dispatcher);
    server.run(listener, Shutdown::new()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_routes(dispatcher: &Dispatcher) {
    let table = dispatcher.table();
    for binding in table.ordered() {
        println!(
            "{:<7} {:<40} {:<24} {}",
            binding.method.as_str(),
            binding.pattern.to_string(),
            binding.handler_name,
            binding.source
        );
    }
}
