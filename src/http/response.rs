//! HTTP response building module
//!
//! `build_file_response` decides the status, headers and body window for a
//! file; `ResponseDescriptor::into_response` then opens the file and turns the
//! decision into a streaming hyper response. Canned responses for the other
//! status codes live here too.

use crate::http::body::{Body, FileWindow};
use crate::http::range::{RangeParseResult, RangeSpec};
use crate::http::resource::Resource;
use crate::logger;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Response, StatusCode};
use std::io;
use tokio::fs::File;

/// Where the response body comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    None,
    FullFile,
    ByteWindow { start: u64, end: u64 },
    Html(String),
}

/// Complete description of a response before any I/O happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodySource,
}

impl ResponseDescriptor {
    fn new(status: StatusCode, body: BodySource) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    fn header(mut self, name: header::HeaderName, value: impl ToString) -> Self {
        match HeaderValue::from_str(&value.to_string()) {
            Ok(v) => {
                self.headers.insert(name, v);
            }
            Err(e) => logger::log_error(&format!("Invalid value for header {name}: {e}")),
        }
        self
    }

    /// Header value as a string, for inspection
    pub fn header_str(&self, name: &header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Materialize the descriptor into a response, opening the resource for file bodies.
    ///
    /// The body length always comes from the stat-ed size, never from a
    /// second look at the file. Errors here happen before any byte is sent
    /// and should become a 500.
    pub async fn into_response(self, resource: &Resource) -> io::Result<Response<Body>> {
        let body = match self.body {
            BodySource::None => Body::empty(),
            BodySource::Html(html) => Body::full(html),
            BodySource::FullFile => {
                let file = File::open(&resource.path).await?;
                Body::File(FileWindow::new(file, 0, resource.size).await?)
            }
            BodySource::ByteWindow { start, end } => {
                let file = File::open(&resource.path).await?;
                Body::File(FileWindow::new(file, start, end - start + 1).await?)
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        Ok(response)
    }
}

/// Decide the response for a file resource given the parsed Range header
///
/// # Examples
/// ```
/// use byteserve::http::range::{RangeParseResult, RangeSpec};
/// use byteserve::http::resource::Resource;
/// use byteserve::http::response::{build_file_response, BodySource};
/// use hyper::StatusCode;
///
/// let resource = Resource {
///     path: "clip.mp4".into(),
///     size: 1000,
///     is_dir: false,
///     mime_type: Some("video/mp4"),
/// };
/// let desc = build_file_response(
///     &resource,
///     RangeParseResult::Valid(RangeSpec { start: 10, end: 19 }),
/// );
/// assert_eq!(desc.status, StatusCode::PARTIAL_CONTENT);
/// assert_eq!(desc.body, BodySource::ByteWindow { start: 10, end: 19 });
/// ```
pub fn build_file_response(resource: &Resource, range: RangeParseResult) -> ResponseDescriptor {
    let size = resource.size;
    match range {
        RangeParseResult::None => ResponseDescriptor::new(StatusCode::OK, BodySource::FullFile)
            .header(header::CONTENT_TYPE, resource.content_type())
            .header(header::CONTENT_LENGTH, size)
            .header(header::ACCEPT_RANGES, "bytes"),
        RangeParseResult::Valid(RangeSpec { start, end }) => ResponseDescriptor::new(
            StatusCode::PARTIAL_CONTENT,
            BodySource::ByteWindow { start, end },
        )
        .header(header::CONTENT_TYPE, resource.content_type())
        .header(header::CONTENT_LENGTH, end - start + 1)
        .header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{size}"))
        .header(header::ACCEPT_RANGES, "bytes"),
        RangeParseResult::NotSatisfiable => {
            ResponseDescriptor::new(StatusCode::RANGE_NOT_SATISFIABLE, BodySource::None)
                .header(header::CONTENT_RANGE, format!("bytes */{size}"))
                .header(header::CONTENT_LENGTH, 0)
        }
    }
}

/// Describe the directory listing response for a rendered document
pub fn build_listing_response(html: String) -> ResponseDescriptor {
    let len = html.len();
    ResponseDescriptor::new(StatusCode::OK, BodySource::Html(html))
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::CONTENT_LENGTH, len)
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Body> {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Body> {
    let mut response = build_text_response(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed");
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET"));
    response
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Body> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
}

/// Build 301 redirect response
pub fn build_redirect_response(target: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(header::LOCATION, target)
        .header(header::CONTENT_LENGTH, 0)
        .body(Body::empty())
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            fallback(StatusCode::MOVED_PERMANENTLY)
        })
}

/// Build plain text response with the given status
fn build_text_response(status: StatusCode, text: &'static str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_LENGTH, text.len())
        .body(Body::full(text))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            fallback(status)
        })
}

fn fallback(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
