//! Development server with live reload.
//!
//! A `tiny_http` static file server over the output tree. Preview documents
//! carry [`LIVE_RELOAD_SCRIPT`], which long-polls `/__livereload`: the first
//! request returns the current reload generation immediately, later ones
//! (`?since=<n>`) block until the generation moves past `n` or the poll
//! times out. The watch coordinator bumps the generation after every batch.
//!
//! Requests are handled on their own threads so a waiting poll never holds
//! up file requests.

use crate::watch::ReloadNotifier;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server};
use tracing::{debug, info, warn};

/// Client side of the live-reload channel, injected before `</body>`.
pub const LIVE_RELOAD_SCRIPT: &str = r#"
(function () {
  var since = null;
  function poll() {
    var url = "/__livereload" + (since === null ? "" : "?since=" + since);
    fetch(url, { cache: "no-store" })
      .then(function (r) { return r.text(); })
      .then(function (text) {
        var generation = parseInt(text, 10);
        if (since !== null && generation !== since) {
          window.location.reload();
          return;
        }
        since = generation;
        poll();
      })
      .catch(function () { setTimeout(poll, 1000); });
  }
  poll();
})();
"#;

const RELOAD_PATH: &str = "/__livereload";
const POLL_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Cannot bind port {port}: {message}")]
    Bind { port: u16, message: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Reload channel
// ============================================================================

/// Reload generation counter that long-poll requests wait on.
#[derive(Debug, Default)]
pub struct LiveReload {
    generation: Mutex<u64>,
    changed: Condvar,
}

impl LiveReload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the generation differs from `since` or `timeout` passes.
    pub fn wait(&self, since: u64, timeout: Duration) -> u64 {
        let guard = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |generation| *generation == since)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

impl ReloadNotifier for LiveReload {
    fn reload(&self) {
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        debug!(generation = *generation, "Live reload");
        self.changed.notify_all();
    }
}

// ============================================================================
// Request resolution
// ============================================================================

/// What a request path resolves to.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Reload { since: Option<u64> },
    File(PathBuf),
    NotFound,
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Map a request URL onto the output tree.
///
/// Query strings are ignored for files; directories resolve to their
/// `index.html`; paths escaping the root are not found.
pub fn route(root: &Path, url: &str) -> Route {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    if path == RELOAD_PATH {
        let since = query_param(query, "since").and_then(|v| v.parse().ok());
        return Route::Reload { since };
    }

    let relative = Path::new(path.trim_start_matches('/'));
    if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Route::NotFound;
    }
    let local = root.join(relative);
    if local.is_file() {
        return Route::File(local);
    }
    let index = local.join("index.html");
    if local.is_dir() && index.is_file() {
        return Route::File(index);
    }
    Route::NotFound
}

/// Guess MIME content type from file extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/rss+xml; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Server
// ============================================================================

pub fn bind(port: u16) -> Result<Server, ServeError> {
    Server::http(("127.0.0.1", port)).map_err(|e| ServeError::Bind {
        port,
        message: e.to_string(),
    })
}

/// Serve `root` until the server is dropped.
pub fn serve(server: Server, root: PathBuf, reload: Arc<LiveReload>) {
    if let Some(addr) = server.server_addr().to_ip() {
        info!("Serving {} at http://{}", root.display(), addr);
    }
    let root = Arc::new(root);
    for request in server.incoming_requests() {
        let root = Arc::clone(&root);
        let reload = Arc::clone(&reload);
        std::thread::spawn(move || {
            let url = request.url().to_string();
            if let Err(e) = handle_request(request, &root, &reload) {
                warn!(url = %url, error = %e, "Request failed");
            }
        });
    }
}

fn handle_request(request: Request, root: &Path, reload: &LiveReload) -> io::Result<()> {
    match route(root, request.url()) {
        Route::Reload { since } => {
            let generation = match since {
                Some(since) => reload.wait(since, POLL_TIMEOUT),
                None => reload.generation(),
            };
            respond(request, 200, "text/plain", generation.to_string().into_bytes())
        }
        Route::File(path) => {
            let body = fs::read(&path)?;
            respond(request, 200, guess_content_type(&path), body)
        }
        Route::NotFound => {
            debug!(url = request.url(), "Not found");
            respond(request, 404, "text/plain", b"404 Not Found".to_vec())
        }
    }
}

fn respond(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> io::Result<()> {
    let mut response = Response::from_data(body).with_status_code(status);
    for (name, value) in [("Content-Type", content_type), ("Cache-Control", "no-cache")] {
        if let Ok(header) = Header::from_bytes(name, value) {
            response.add_header(header);
        }
    }
    request.respond(response)
}
