// Connection handling module
// Accepts TCP connections and serves each one on its own task

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::Incoming;
use hyper::header::{self, HeaderMap};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, Version};
use hyper_util::rt::{TokioIo, TokioTimer};

use crate::config::Config;
use crate::handler::RequestHandler;
use crate::http::Body;
use crate::logger::{self, AccessLogEntry};

/// Connection-level settings derived from the configuration once at startup
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub keep_alive: bool,
    pub header_read_timeout: Option<Duration>,
    pub max_connections: Option<usize>,
    pub access_log: bool,
    pub access_log_format: String,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        let perf = &config.performance;
        Self {
            keep_alive: perf.keep_alive,
            header_read_timeout: (perf.header_read_timeout > 0)
                .then(|| Duration::from_secs(perf.header_read_timeout)),
            max_connections: perf
                .max_connections
                .map(|max| usize::try_from(max).unwrap_or(usize::MAX)),
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format.clone(),
        }
    }
}

/// Everything a connection task needs, shared read-only across tasks
#[derive(Debug)]
pub struct ServerContext {
    pub handler: RequestHandler,
    pub settings: ConnectionSettings,
}

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `ctx` - Shared handler and connection settings
/// * `conn_counter` - Active connection counter
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    ctx: &Arc<ServerContext>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = ctx.settings.max_connections {
        if prev_count >= max_conn {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(stream, peer_addr, Arc::clone(ctx), Arc::clone(conn_counter));
}

/// Serve a single connection in a spawned task.
///
/// Failures (client disconnects, body read errors after the head was sent)
/// end only this connection. The counter is decremented when it finishes.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    ctx: Arc<ServerContext>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(ctx.settings.keep_alive);
        if let Some(timeout) = ctx.settings.header_read_timeout {
            builder.timer(TokioTimer::new()).header_read_timeout(timeout);
        }

        let service_ctx = Arc::clone(&ctx);
        let service = service_fn(move |req| {
            let ctx = Arc::clone(&service_ctx);
            async move { Ok::<_, Infallible>(respond(&ctx, req, peer_addr).await) }
        });

        if let Err(err) = builder.serve_connection(io, service).await {
            logger::log_connection_error(&peer_addr, &err);
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Run the handler for one request and write its access log line
async fn respond(ctx: &ServerContext, req: Request<Incoming>, peer_addr: SocketAddr) -> Response<Body> {
    let started = Instant::now();

    // GET bodies are never read
    let (parts, _body) = req.into_parts();
    let req = Request::from_parts(parts, ());

    let response = ctx.handler.handle(&req).await;

    if ctx.settings.access_log {
        let entry = build_access_entry(&req, &response, peer_addr, started);
        logger::log_access(&entry, &ctx.settings.access_log_format);
    }

    response
}

fn build_access_entry<B>(
    req: &Request<()>,
    response: &Response<B>,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = header_value(response.headers(), &header::CONTENT_LENGTH)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.range = header_value(req.headers(), &header::RANGE).map(ToString::to_string);
    entry.referer = header_value(req.headers(), &header::REFERER).map(ToString::to_string);
    entry.user_agent = header_value(req.headers(), &header::USER_AGENT).map(ToString::to_string);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

fn header_value<'a>(headers: &'a HeaderMap, name: &header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
