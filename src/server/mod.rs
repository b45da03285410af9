//! Development server: static files from the output tree plus live reload.

mod livereload;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::{middleware, routing::get, Router};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use livereload::{inject_script, ReloadEvent, ReloadHub, RELOAD_PATH};

use crate::config::ServerConfig;
use crate::error::{BuildError, Result};
use crate::watch::is_change;

pub fn create_router(output_dir: &Path, hub: ReloadHub) -> Router {
    let files = ServeDir::new(output_dir).append_index_html_on_directories(true);

    Router::new()
        .route(RELOAD_PATH, get(livereload::events))
        .fallback_service(files)
        .layer(middleware::map_response(livereload::inject_client))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(hub)
}

/// A running dev server. Dropping the handle stops it.
pub struct ServerHandle {
    addr: SocketAddr,
    hub: ReloadHub,
    serve: JoinHandle<std::io::Result<()>>,
    reload: JoinHandle<()>,
}

impl ServerHandle {
    /// The bound address; differs from the configured one when port 0 was asked for.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    pub fn stop(self) {
        drop(self);
    }

    /// Wait until the server stops serving.
    pub async fn wait(&mut self) -> Result<()> {
        match (&mut self.serve).await {
            Ok(served) => served.map_err(BuildError::Server),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(BuildError::Join(e)),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.serve.abort();
        self.reload.abort();
    }
}

/// Serve `output_dir` and reload browsers whenever anything under it changes.
/// The directory is created when missing so it can be watched.
pub async fn start_server(output_dir: PathBuf, config: ServerConfig) -> Result<ServerHandle> {
    std::fs::create_dir_all(&output_dir).map_err(|e| BuildError::io(&output_dir, e))?;
    let output_dir =
        std::fs::canonicalize(&output_dir).map_err(|e| BuildError::io(&output_dir, e))?;

    let hub = ReloadHub::new();
    let reload = watch_output(output_dir.clone(), hub.clone())?;

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .map_err(BuildError::Server)?;
    let addr = listener.local_addr().map_err(BuildError::Server)?;

    let app = create_router(&output_dir, hub.clone());
    let serve = tokio::spawn(async move { axum::serve(listener, app).await });
    tracing::info!("Serving {} at http://{}", output_dir.display(), addr);

    Ok(ServerHandle {
        addr,
        hub,
        serve,
        reload,
    })
}

// ============================================================
// Output watch
// ============================================================

/// Watch the output root recursively and its parent non-recursively.
///
/// Deleting the root drops its recursive watch, so when the parent reports the
/// root being created again the watch is re-armed. The watcher is owned by the
/// returned task; re-arming from inside the notify callback would deadlock the
/// backend thread.
fn watch_output(output_dir: PathBuf, hub: ReloadHub) -> Result<JoinHandle<()>> {
    let parent = output_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_dir.clone());

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_change(&event.kind) => {
            let _ = tx.send(event);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Output watch error: {}", e),
    })?;
    watcher.watch(&parent, RecursiveMode::NonRecursive)?;
    watcher.watch(&output_dir, RecursiveMode::Recursive)?;

    Ok(tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Some(changed) = event.paths.iter().find(|p| p.starts_with(&output_dir)) else {
                continue;
            };

            if *changed == output_dir && matches!(event.kind, EventKind::Create(_)) {
                match watcher.watch(&output_dir, RecursiveMode::Recursive) {
                    Ok(()) => tracing::debug!("Re-watching {}", output_dir.display()),
                    Err(e) => tracing::warn!("Could not re-watch {}: {}", output_dir.display(), e),
                }
            }

            let path = changed
                .strip_prefix(&output_dir)
                .ok()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_string_lossy().replace('\\', "/"));
            hub.reload(path);
        }
    }))
}
