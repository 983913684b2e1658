#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::io::Cursor;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
#[cfg(not(target_arch = "wasm32"))]
use tiny_http::{Header, Response, Server, StatusCode};
#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::EnvFilter;

/// Development file server for the browser client and its wasm bundle.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
struct Opts {
    /// Address to serve HTTP on
    #[arg(long, env = "BLOCKDROP_HTTP", default_value = "127.0.0.1:8080")]
    addr: String,
    /// Directory holding index.html and the built pkg/
    #[arg(long, default_value = "web")]
    root: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = Opts::parse();
    let root = fs::canonicalize(&opts.root)
        .map_err(|e| anyhow::anyhow!("web directory {} not usable: {}", opts.root.display(), e))?;

    let server = Server::http(&opts.addr).map_err(|e| anyhow::anyhow!("bind {}: {}", opts.addr, e))?;
    tracing::info!("serving {} on http://{}", root.display(), opts.addr);

    for request in server.incoming_requests() {
        let url = request.url().to_string();
        let method = request.method().to_string();
        let file = resolve(&root, url.split('?').next().unwrap_or("/"))
            .and_then(|p| fs::File::open(&p).ok().map(|f| (p, f)));
        let status = match file {
            Some((path, file)) => {
                let mut resp = Response::from_file(file);
                if let Ok(h) = Header::from_bytes("Content-Type", content_type_for(&path).as_bytes()) {
                    resp.add_header(h);
                }
                let _ = request.respond(resp);
                200
            }
            None => {
                let _ = request.respond(not_found_response());
                404
            }
        };
        tracing::debug!(%method, %url, status, "request");
    }
    Ok(())
}

/// Maps a URL path into `root`, refusing anything that escapes it.
#[cfg(not(target_arch = "wasm32"))]
fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let rel = url.trim_start_matches('/');
    let full = root.join(if rel.is_empty() { "index.html" } else { rel });
    let path = if full.is_dir() { full.join("index.html") } else { full };
    let path = fs::canonicalize(path).ok()?;
    path.starts_with(root).then_some(path)
}

#[cfg(not(target_arch = "wasm32"))]
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "json" => "application/json",
        "png" => "image/png",
        "mp3" => "audio/mpeg",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn not_found_response() -> Response<Cursor<Vec<u8>>> {
    Response::from_string("Not Found").with_status_code(StatusCode(404))
}
