//! Handler tree watcher for hot reload.
//!
//! # Responsibilities
//! - Watch the handler root recursively for file changes
//! - Coalesce bursts of events into a single rebuild
//! - Ask the dispatcher to rebuild and swap its table
//!
//! # Design Decisions
//! - A failed rebuild is logged and the current table stays live
//! - Requests already in flight keep the table they started with

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::dispatch::pipeline::Dispatcher;

/// Watches a handler root and triggers debounced table rebuilds.
pub struct RouteWatcher {
    root: PathBuf,
    debounce: Duration,
}

impl RouteWatcher {
    pub fn new(root: &Path, debounce: Duration) -> Self {
        Self {
            root: root.to_path_buf(),
            debounce,
        }
    }

    /// Start watching. Must be called from within a Tokio runtime.
    ///
    /// The returned watcher stops on drop; keep it alive for as long as
    /// reloads are wanted.
    pub fn spawn(self, dispatcher: Arc<Dispatcher>) -> Result<RecommendedWatcher, notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Handler tree watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        tokio::spawn(reload_loop(rx, self.debounce, dispatcher));
        tracing::info!(root = %self.root.display(), "Handler tree watcher started");
        Ok(watcher)
    }
}

async fn reload_loop(mut rx: mpsc::UnboundedReceiver<()>, debounce: Duration, dispatcher: Arc<Dispatcher>) {
    while rx.recv().await.is_some() {
        // Drain the burst until the tree has been quiet for `debounce`.
        while let Ok(Some(())) = tokio::time::timeout(debounce, rx.recv()).await {}

        tracing::info!("Handler tree change detected, rebuilding routes...");
        let target = dispatcher.clone();
        match tokio::task::spawn_blocking(move || target.reload()).await {
            Ok(Ok(routes)) => tracing::info!(routes, "Route table reloaded"),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to rebuild routes. Keeping current table.")
            }
            Err(e) => tracing::error!(error = %e, "Route rebuild task failed"),
        }
    }
}
