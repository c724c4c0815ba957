//! Request handler module
//!
//! Turns one GET request into a response: resolve the path, stat it, then
//! either list the directory or serve the file with Range support.

use crate::config::ServeConfig;
use crate::http::{
    self, directory_url, listing, parse_range_header, response, Body, PathResolver, Resource,
    ServeError,
};
use crate::logger;
use hyper::header;
use hyper::{Method, Request, Response};
use std::path::{Path, PathBuf};

/// Per-process request handler, shared by every connection.
///
/// Holds only immutable configuration, so one instance serves concurrent
/// requests without coordination.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    paths: PathResolver,
    /// Canonical root, used to reject symlinks that lead outside it
    canonical_root: Option<PathBuf>,
    directory_listing: bool,
    redirect_directories: bool,
}

impl RequestHandler {
    pub fn new(config: &ServeConfig) -> Self {
        let canonical_root = if config.follow_symlinks {
            None
        } else {
            match config.root.canonicalize() {
                Ok(root) => Some(root),
                Err(e) => {
                    logger::log_warning(&format!(
                        "Root directory '{}' not accessible: {e}",
                        config.root.display()
                    ));
                    Some(config.root.clone())
                }
            }
        };

        Self {
            paths: PathResolver::new(config.root.clone()),
            canonical_root,
            directory_listing: config.directory_listing,
            redirect_directories: config.redirect_directories,
        }
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Main entry point for HTTP request handling
    ///
    /// Never fails: every error is turned into a response with the matching
    /// status code.
    pub async fn handle<B>(&self, req: &Request<B>) -> Response<Body> {
        if req.method() != Method::GET {
            logger::log_warning(&format!("Method not allowed: {}", req.method()));
            return http::build_405_response();
        }

        let range_header = req
            .headers()
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok());

        match self.serve(req.uri().path(), range_header).await {
            Ok(resp) => resp,
            Err(ServeError::NotFound) => http::build_404_response(),
            Err(ServeError::Io(e)) => {
                logger::log_error(&format!("Failed to serve '{}': {e}", req.uri().path()));
                http::build_500_response()
            }
        }
    }

    async fn serve(
        &self,
        url_path: &str,
        range_header: Option<&str>,
    ) -> Result<Response<Body>, ServeError> {
        let Some(segments) = PathResolver::segments(url_path) else {
            logger::log_warning(&format!("Path traversal attempt blocked: {url_path}"));
            return Err(ServeError::NotFound);
        };
        let path = self.paths.join(&segments);

        let resource = Resource::stat(&path).await.map_err(ServeError::from_stat)?;
        self.check_within_root(url_path, &path).await?;

        if resource.is_dir {
            return self.serve_directory(url_path, &segments, &resource).await;
        }

        let range = parse_range_header(range_header, resource.size);
        let descriptor = response::build_file_response(&resource, range);
        Ok(descriptor.into_response(&resource).await?)
    }

    async fn serve_directory(
        &self,
        url_path: &str,
        segments: &[String],
        resource: &Resource,
    ) -> Result<Response<Body>, ServeError> {
        if !self.directory_listing {
            return Err(ServeError::NotFound);
        }

        if self.redirect_directories && !url_path.ends_with('/') {
            return Ok(http::build_redirect_response(&directory_url(segments)));
        }

        let entries = listing::read_entries(&resource.path).await?;
        let descriptor = response::build_listing_response(listing::render_listing(&entries));
        Ok(descriptor.into_response(resource).await?)
    }

    /// Reject paths whose real location (after symlinks) is outside the root
    async fn check_within_root(&self, url_path: &str, path: &Path) -> Result<(), ServeError> {
        let Some(root) = &self.canonical_root else {
            return Ok(());
        };

        let real = tokio::fs::canonicalize(path)
            .await
            .map_err(ServeError::from_stat)?;
        if real.starts_with(root) {
            Ok(())
        } else {
            logger::log_warning(&format!(
                "Symlink escape blocked: {url_path} -> {}",
                real.display()
            ));
            Err(ServeError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::StatusCode;
    use tempfile::TempDir;

    /// Bytes `0..999`, each offset's value modulo 256
    fn numbered_bytes() -> Vec<u8> {
        (0..1000u32).map(|i| (i % 256) as u8).collect()
    }

    struct Fixture {
        _dir: TempDir,
        handler: RequestHandler,
        data: Vec<u8>,
    }

    fn fixture_with(configure: impl FnOnce(&mut ServeConfig)) -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        let data = numbered_bytes();
        std::fs::write(root.join("data.bin"), &data).unwrap();
        std::fs::write(root.join("a.txt"), b"hello").unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::fs::write(root.join("sub").join("clip.mp4"), b"video").unwrap();
        std::fs::write(dir.path().join("outside.txt"), b"secret").unwrap();

        let mut config = ServeConfig {
            root,
            ..ServeConfig::default()
        };
        configure(&mut config);

        Fixture {
            handler: RequestHandler::new(&config),
            _dir: dir,
            data,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(|_| {})
    }

    fn get(path: &str, range: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(r) = range {
            builder = builder.header(header::RANGE, r);
        }
        builder.body(()).unwrap()
    }

    fn header_str<'a>(resp: &'a Response<Body>, name: header::HeaderName) -> Option<&'a str> {
        resp.headers().get(name).and_then(|v| v.to_str().ok())
    }

    async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
        resp.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_full_content() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/data.bin", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header_str(&resp, header::CONTENT_LENGTH), Some("1000"));
        assert_eq!(header_str(&resp, header::ACCEPT_RANGES), Some("bytes"));
        assert_eq!(body_bytes(resp).await, fx.data);
    }

    #[tokio::test]
    async fn test_explicit_range() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/data.bin", Some("bytes=10-19"))).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            header_str(&resp, header::CONTENT_RANGE),
            Some("bytes 10-19/1000")
        );
        assert_eq!(header_str(&resp, header::CONTENT_LENGTH), Some("10"));
        assert_eq!(body_bytes(resp).await, &fx.data[10..=19]);
    }

    #[tokio::test]
    async fn test_open_range() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/data.bin", Some("bytes=990-"))).await;
        assert_eq!(
            header_str(&resp, header::CONTENT_RANGE),
            Some("bytes 990-999/1000")
        );
        assert_eq!(header_str(&resp, header::CONTENT_LENGTH), Some("10"));
        assert_eq!(body_bytes(resp).await, &fx.data[990..]);
    }

    #[tokio::test]
    async fn test_suffix_range() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/data.bin", Some("bytes=-5"))).await;
        assert_eq!(
            header_str(&resp, header::CONTENT_RANGE),
            Some("bytes 995-999/1000")
        );
        assert_eq!(header_str(&resp, header::CONTENT_LENGTH), Some("5"));
        assert_eq!(body_bytes(resp).await, &fx.data[995..]);
    }

    #[tokio::test]
    async fn test_unsatisfiable_range() {
        let fx = fixture();
        let resp = fx
            .handler
            .handle(&get("/data.bin", Some("bytes=2000-3000")))
            .await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(header_str(&resp, header::CONTENT_RANGE), Some("bytes */1000"));
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_range_serves_full_content() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/data.bin", Some("bytes=oops"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await.len(), 1000);
    }

    #[tokio::test]
    async fn test_mime_type() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/sub/clip.mp4", None)).await;
        assert_eq!(header_str(&resp, header::CONTENT_TYPE), Some("video/mp4"));
        let resp = fx.handler.handle(&get("/data.bin", None)).await;
        assert_eq!(
            header_str(&resp, header::CONTENT_TYPE),
            Some("application/octet-stream")
        );
    }

    #[tokio::test]
    async fn test_missing_file() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/nope.txt", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = fx.handler.handle(&get("/a.txt/child", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let fx = fixture();
        for path in ["/../outside.txt", "/sub/../../outside.txt", "/%2e%2e/outside.txt"] {
            let resp = fx.handler.handle(&get(path, None)).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "path {path}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_rejected() {
        let fx = fixture();
        let root = fx.handler.root().to_path_buf();
        std::os::unix::fs::symlink(root.join("../outside.txt"), root.join("link.txt")).unwrap();

        let resp = fx.handler.handle(&get("/link.txt", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_followed_when_enabled() {
        let fx = fixture_with(|c| c.follow_symlinks = true);
        let root = fx.handler.root().to_path_buf();
        std::os::unix::fs::symlink(root.join("../outside.txt"), root.join("link.txt")).unwrap();

        let resp = fx.handler.handle(&get("/link.txt", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await, b"secret");
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(header_str(&resp, header::CONTENT_TYPE)
            .unwrap()
            .starts_with("text/html"));

        let html = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(html.contains(r#"<a href="a.txt">a.txt</a>"#));
        assert!(html.contains(r#"<a href="sub/">sub/</a>"#));
        assert!(html.starts_with("<html><body><ul>"));
        assert!(html.ends_with("</ul></body></html>"));
    }

    #[tokio::test]
    async fn test_directory_redirects_to_slash() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/sub", None)).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(header_str(&resp, header::LOCATION), Some("/sub/"));

        let resp = fx.handler.handle(&get("/sub/", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_directory_redirect_stays_on_host() {
        let fx = fixture();
        for (path, location) in [
            ("//evil.example/..", "/"),
            ("//evil.example/%2e%2e", "/"),
            ("//evil.example/../sub", "/sub/"),
            ("/sub/.", "/sub/"),
        ] {
            let resp = fx.handler.handle(&get(path, None)).await;
            assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY, "path {path}");
            assert_eq!(header_str(&resp, header::LOCATION), Some(location), "path {path}");
        }
    }

    #[tokio::test]
    async fn test_directory_listing_disabled() {
        let fx = fixture_with(|c| c.directory_listing = false);
        let resp = fx.handler.handle(&get("/sub/", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = fx.handler.handle(&get("/sub/clip.mp4", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_directory_ignores_range() {
        let fx = fixture();
        let resp = fx.handler.handle(&get("/", Some("bytes=0-1"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_get_rejected() {
        let fx = fixture();
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let req = Request::builder()
                .method(method.clone())
                .uri("/a.txt")
                .body(())
                .unwrap();
            let resp = fx.handler.handle(&req).await;
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(header_str(&resp, header::ALLOW), Some("GET"));
        }
    }

    #[tokio::test]
    async fn test_repeated_requests_identical() {
        let fx = fixture();
        let mut seen = Vec::new();
        for _ in 0..3 {
            let resp = fx.handler.handle(&get("/data.bin", Some("bytes=100-199"))).await;
            let status = resp.status();
            let headers = resp.headers().clone();
            seen.push((status, headers, body_bytes(resp).await));
        }
        assert!(seen.windows(2).all(|w| w[0] == w[1]));

        let first = fx.handler.handle(&get("/", None)).await;
        let second = fx.handler.handle(&get("/", None)).await;
        assert_eq!(body_bytes(first).await, body_bytes(second).await);
    }
}
