//! Live reload over server-sent events.
//!
//! Every HTML page gets a small client script that subscribes to
//! [`RELOAD_PATH`]; a change in the output tree is broadcast to all
//! subscribers, which reload the page.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast;

/// Endpoint browsers subscribe to.
pub const RELOAD_PATH: &str = "/__livereload";

/// Largest HTML page the client script is injected into.
const MAX_HTML_BYTES: usize = 16 * 1024 * 1024;

const CLIENT_SCRIPT: &str = "<script>(function(){var s=new EventSource(\"/__livereload\");\
s.addEventListener(\"reload\",function(){location.reload()});})();</script>";

/// A reload signal. `path` is the changed output file relative to the output
/// root, when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    pub path: Option<String>,
}

/// Fan-out of reload signals to every connected browser.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Signal every subscriber; returns how many were reached.
    pub fn reload(&self, path: Option<String>) -> usize {
        tracing::debug!(path = ?path, "Reloading browsers");
        self.tx.send(ReloadEvent { path }).unwrap_or(0)
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// `GET /__livereload`
pub async fn events(
    State(hub): State<ReloadHub>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream::unfold(hub.subscribe(), |mut rx| async move {
        let reload = match rx.recv().await {
            Ok(event) => event,
            // Missed signals still mean the page is stale.
            Err(broadcast::error::RecvError::Lagged(_)) => ReloadEvent { path: None },
            Err(broadcast::error::RecvError::Closed) => return None,
        };
        let data = serde_json::to_string(&reload).unwrap_or_default();
        Some((Ok::<_, Infallible>(Event::default().event("reload").data(data)), rx))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Add the client script to successful HTML responses.
///
/// Pages larger than [`MAX_HTML_BYTES`] and bodies that are not valid UTF-8
/// are passed through untouched.
pub async fn inject_client(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if response.status() != StatusCode::OK || !is_html || too_large(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_HTML_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Could not buffer HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = match std::str::from_utf8(&bytes) {
        Ok(html) => inject_script(html),
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

fn too_large(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len > MAX_HTML_BYTES)
}

/// Insert the client script before the last `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + CLIENT_SCRIPT.len());
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            out.push_str(&html[..at]);
            out.push_str(CLIENT_SCRIPT);
            out.push_str(&html[at..]);
        }
        None => {
            out.push_str(html);
            out.push_str(CLIENT_SCRIPT);
        }
    }
    out
}
