//! Preview server with live reload.
//!
//! - Static file serving from the build output directory
//! - `index.html` resolution for directories
//! - Live reload: HTML responses get a small polling script; it asks
//!   [`RELOAD_ENDPOINT`] for the build generation and reloads the page when
//!   the watcher has finished a newer build
//! - Graceful shutdown on Ctrl+C
//!
//! ```text
//! ┌─────────────────┐            ┌──────────────────┐
//! │   Main Thread   │            │  Watcher Thread  │
//! │  (HTTP Server)  │            │  (File Monitor)  │
//! └────────┬────────┘            └────────┬─────────┘
//!          │ GET /__oxen/reload           │ rebuild, then
//!          ▼                              ▼ bump_generation()
//!     generation() ◄──── AtomicU64 ◄──────┘
//! ```

use crate::{
    config::{SiteConfig, cfg},
    log,
    watch::watch_for_changes_blocking,
};
use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

/// Polled by the injected script.
pub const RELOAD_ENDPOINT: &str = "/__oxen/reload";

const RELOAD_SCRIPT: &str = r#"<script>
(function () {
  var seen = null;
  setInterval(function () {
    fetch("/__oxen/reload", { cache: "no-store" })
      .then(function (r) { return r.text(); })
      .then(function (g) {
        if (seen === null) { seen = g; } else if (g !== seen) { location.reload(); }
      })
      .catch(function () {});
  }, 1000);
})();
</script>
"#;

/// Number of completed rebuilds since the server started.
static GENERATION: AtomicU64 = AtomicU64::new(0);

pub fn generation() -> u64 {
    GENERATION.load(Ordering::Acquire)
}

/// Signal connected pages that new output is available.
pub fn bump_generation() {
    GENERATION.fetch_add(1, Ordering::AcqRel);
}

// ============================================================================
// Server Entry Point
// ============================================================================

/// Start the preview server, plus the watcher when enabled.
///
/// Blocks until Ctrl+C is received.
pub fn serve_site() -> Result<()> {
    let c = cfg();
    let interface: IpAddr = c
        .serve
        .interface
        .parse()
        .with_context(|| format!("invalid [serve.interface] `{}`", c.serve.interface))?;

    let (server, addr) = try_bind_port(interface, c.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);

    if c.serve.watch {
        std::thread::spawn(move || {
            if let Err(err) = watch_for_changes_blocking() {
                log!("watch"; "{err:#}");
            }
        });
    }

    for request in server.incoming_requests() {
        // Config may be hot-reloaded by the watcher
        if let Err(e) = handle_request(request, &cfg()) {
            log!("serve"; "request error: {e:#}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

/// What a request path maps to.
#[derive(Debug, PartialEq, Eq)]
enum Target {
    Reload,
    File(std::path::PathBuf),
    NotFound,
}

/// Resolution order: reload endpoint, exact file, directory `index.html`, 404.
fn resolve_target(raw_url: &str, serve_root: &Path) -> Target {
    // Strip the query string (cache-busting URLs like "style.css?t=123")
    // before decoding, so an encoded `%3F` stays part of the name
    let raw_path = raw_url.split('?').next().unwrap_or(raw_url);
    let Ok(decoded) = urlencoding::decode(raw_path) else {
        return Target::NotFound;
    };
    let path = decoded.as_ref();
    if path == RELOAD_ENDPOINT {
        return Target::Reload;
    }

    let request_path = Path::new(path.trim_matches('/'));
    if request_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Target::NotFound;
    }

    let local_path = serve_root.join(request_path);
    if local_path.is_file() {
        return Target::File(local_path);
    }
    let index = local_path.join("index.html");
    if local_path.is_dir() && index.is_file() {
        return Target::File(index);
    }
    Target::NotFound
}

fn handle_request(request: Request, config: &SiteConfig) -> Result<()> {
    match resolve_target(request.url(), &config.build.output) {
        Target::Reload => respond(request, generation().to_string().into_bytes(), "text/plain"),
        Target::File(path) => serve_file(request, &path),
        Target::NotFound => serve_not_found(request),
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

fn content_type(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value).map_err(|()| anyhow!("invalid header value `{value}`"))
}

fn respond(request: Request, body: Vec<u8>, mime: &str) -> Result<()> {
    let response = Response::from_data(body).with_header(content_type(mime)?);
    request.respond(response)?;
    Ok(())
}

/// Serve a file with appropriate content type; HTML gets the reload script.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mime = guess_content_type(path);

    let body = if mime.starts_with("text/html") {
        inject_reload_script(&String::from_utf8_lossy(&content)).into_bytes()
    } else {
        content
    };
    respond(request, body, mime)
}

/// Insert the reload script before `</body>`, or append it.
fn inject_reload_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => format!("{}{RELOAD_SCRIPT}{}", &html[..pos], &html[pos..]),
        None => format!("{html}{RELOAD_SCRIPT}"),
    }
}

fn serve_not_found(request: Request) -> Result<()> {
    let body = "404 Not Found";
    let response = Response::new(
        StatusCode(404),
        vec![content_type("text/plain")?],
        Cursor::new(body),
        Some(body.len()),
        None,
    );
    request.respond(response)?;
    Ok(())
}

/// Guess MIME content type from file extension.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",

        Some("pdf") => "application/pdf",
        Some("txt" | "org") => "text/plain; charset=utf-8",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_inject_before_body_close() {
        let html = inject_reload_script("<html><body><p>x</p></body></html>");
        let script = html.find("<script>").unwrap();
        assert!(script < html.find("</body>").unwrap());
        assert!(html.contains(RELOAD_ENDPOINT));
    }

    #[test]
    fn test_inject_without_body() {
        let html = inject_reload_script("<p>fragment</p>");
        assert!(html.starts_with("<p>fragment</p><script>"));
    }

    #[test]
    fn test_resolve_target() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("notes/my dir")).unwrap();
        fs::write(root.join("index.html"), "i").unwrap();
        fs::write(root.join("notes/a.html"), "a").unwrap();
        fs::write(root.join("notes/my dir/index.html"), "d").unwrap();

        assert_eq!(resolve_target("/__oxen/reload", root), Target::Reload);
        assert_eq!(resolve_target("/", root), Target::File(root.join("index.html")));
        assert_eq!(
            resolve_target("/notes/a.html?t=1", root),
            Target::File(root.join("notes/a.html"))
        );
        assert_eq!(
            resolve_target("/notes/my%20dir/", root),
            Target::File(root.join("notes/my dir/index.html"))
        );
        assert_eq!(resolve_target("/notes/", root), Target::NotFound);
        assert_eq!(resolve_target("/__oxen/reload?t=5", root), Target::Reload);
        assert_eq!(resolve_target("/../etc/passwd", root), Target::NotFound);
    }

    #[test]
    fn test_resolve_target_encoded_reserved_chars() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("why?.html"), "q").unwrap();
        fs::write(root.join("tag-c#.html"), "c").unwrap();

        assert_eq!(
            resolve_target("/why%3F.html?t=1", root),
            Target::File(root.join("why?.html"))
        );
        assert_eq!(resolve_target("/tag-c%23.html", root), Target::File(root.join("tag-c#.html")));
        assert_eq!(resolve_target("/why?.html", root), Target::NotFound);
    }

    #[test]
    fn test_generation_bumps() {
        let before = generation();
        bump_generation();
        assert!(generation() > before);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("a.css")), "text/css; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("a.bin")), "application/octet-stream");
    }
}
