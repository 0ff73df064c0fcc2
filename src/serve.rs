//! Local server with on-demand generation and revalidation.
//!
//! Serves the output directory over HTTP. Recipe routes get the incremental
//! treatment:
//!
//! - `/recipes/{slug}` with a generated page: the page is served as-is, then
//!   regenerated if it is older than the revalidation interval. The next
//!   request sees the refreshed page (stale-while-revalidate).
//! - `/recipes/{slug}` without a page: generated on the spot, then served.
//!   A slug with no matching entry gets the loading placeholder, and nothing
//!   is written for it.
//!
//! Requests are handled one at a time. [`respond`] does all the work short
//! of the socket, so every route can be exercised without binding a port.

use crate::config::SiteConfig;
use crate::content::{ContentError, ContentSource};
use crate::generate;
use crate::ledger::{self, Ledger};
use crate::paths::{self, Fallback};
use percent_encoding::percent_decode_str;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Where a request URL leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A recipe page, by slug.
    Recipe(String),
    /// An existing file under the output directory.
    File(PathBuf),
    NotFound,
}

/// Map a request URL to a route. Pure apart from existence checks.
///
/// The path is percent-decoded after the query string is dropped; a path
/// that does not decode to UTF-8 is not found.
pub fn route_request(url: &str, output_dir: &Path) -> Route {
    let raw = url.split(['?', '#']).next().unwrap_or_default();
    let Ok(path) = percent_decode_str(raw).decode_utf8() else {
        return Route::NotFound;
    };
    let trimmed = path.trim_matches('/');

    if let Some(rest) = trimmed.strip_prefix("recipes/") {
        let slug = rest
            .strip_suffix("/index.html")
            .unwrap_or(rest)
            .trim_end_matches('/');
        if !slug.is_empty() && !slug.contains('/') && slug != "_fallback.html" {
            return Route::Recipe(slug.to_string());
        }
    }

    let relative = Path::new(trimmed);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Route::NotFound;
    }

    let mut candidate = output_dir.join(relative);
    if candidate.is_dir() {
        candidate = candidate.join("index.html");
    }
    if candidate.is_file() {
        Route::File(candidate)
    } else {
        Route::NotFound
    }
}

/// `Content-Type` for a served file.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// A response, minus the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into().into_bytes(),
        }
    }

    fn not_found() -> Self {
        Self::text(404, "404 Not Found")
    }

    fn file(path: &Path) -> Self {
        match fs::read(path) {
            Ok(body) => Self {
                status: 200,
                content_type: content_type(path),
                body,
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read file");
                Self::text(500, "500 Internal Server Error")
            }
        }
    }
}

/// Serve `output_dir` on `port` until the process is stopped.
pub fn serve(
    source: &dyn ContentSource,
    config: &SiteConfig,
    output_dir: &Path,
    port: u16,
) -> Result<(), ServeError> {
    let paths = paths::enumerate_paths(source, &config.contentful)?;
    fs::create_dir_all(output_dir)?;
    generate::write_fallback(output_dir, config)?;

    let addr = format!("127.0.0.1:{port}");
    let server = Server::http(&addr).map_err(|e| ServeError::Bind {
        addr: addr.clone(),
        message: e.to_string(),
    })?;
    info!(%addr, known = paths.slugs.len(), "serving");
    println!("Serving {} on http://{addr}", output_dir.display());

    for request in server.incoming_requests() {
        let url = request.url().to_string();
        let reply = respond(request.method(), &url, source, config, output_dir, paths.fallback);
        if let Err(e) = send(request, reply) {
            warn!(%url, error = %e, "request failed");
        }
    }
    Ok(())
}

/// Answer one request against the output directory.
///
/// Recipe routes may generate or regenerate pages as a side effect. An
/// existing page is read before it is revalidated, so the reply carries the
/// previous version.
pub fn respond(
    method: &Method,
    url: &str,
    source: &dyn ContentSource,
    config: &SiteConfig,
    output_dir: &Path,
    fallback: Fallback,
) -> Reply {
    let mut reply = match method {
        Method::Get | Method::Head => respond_route(url, source, config, output_dir, fallback),
        _ => Reply::text(405, "405 Method Not Allowed"),
    };
    if *method == Method::Head {
        reply.body.clear();
    }
    reply
}

fn respond_route(
    url: &str,
    source: &dyn ContentSource,
    config: &SiteConfig,
    output_dir: &Path,
    fallback: Fallback,
) -> Reply {
    let slug = match route_request(url, output_dir) {
        Route::File(path) => return Reply::file(&path),
        Route::NotFound => return Reply::not_found(),
        Route::Recipe(slug) => slug,
    };
    if generate::validate_slug(&slug).is_err() {
        return Reply::not_found();
    }

    let page = generate::page_path(output_dir, &slug);
    if page.is_file() {
        let reply = Reply::file(&page);
        revalidate_if_stale(source, config, output_dir, &slug);
        return reply;
    }
    if fallback == Fallback::NotFound {
        return Reply::not_found();
    }

    match generate::generate_slug(source, config, output_dir, &slug) {
        Ok(Some(generated)) => {
            info!(slug = %generated.slug, "generated on demand");
            Reply::file(&page)
        }
        Ok(None) => {
            debug!(%slug, "no entry, serving placeholder");
            Reply::file(&generate::fallback_path(output_dir))
        }
        Err(e) => {
            warn!(error = %e, "on-demand generation failed");
            Reply::text(502, format!("502 Bad Gateway\n\n{e}\n"))
        }
    }
}

fn revalidate_if_stale(source: &dyn ContentSource, config: &SiteConfig, output_dir: &Path, slug: &str) {
    let ledger = Ledger::load(output_dir);
    if !ledger.is_stale(slug, ledger::unix_now(), config.revalidate.interval()) {
        return;
    }
    match generate::generate_slug(source, config, output_dir, slug) {
        Ok(Some(page)) => info!(slug, status = ?page.status, "revalidated"),
        Ok(None) => debug!(slug, "nothing to revalidate"),
        Err(e) => warn!(slug, error = %e, "revalidation failed, keeping previous page"),
    }
}

fn send(request: Request, reply: Reply) -> std::io::Result<()> {
    let mut response = Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
    if let Ok(header) = Header::from_bytes("Content-Type", reply.content_type) {
        response = response.with_header(header);
    }
    request.respond(response)
}
