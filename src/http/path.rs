//! URL path to filesystem path resolution
//!
//! Maps a request path onto the served root directory. Resolution is purely
//! lexical: the result is never checked for existence here.

use std::path::{Component, Path, PathBuf};

/// Resolves request paths beneath a fixed root directory
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a URL path (already stripped of its query) under the root.
    ///
    /// The path is percent-decoded, `.` segments are dropped and `..` pops the
    /// previous segment. Returns `None` when a `..` would climb above the
    /// root, when decoding fails, or when a segment is not a plain file name
    /// (drive prefixes, embedded separators, NUL bytes).
    ///
    /// # Examples
    /// ```
    /// use byteserve::http::path::PathResolver;
    /// use std::path::Path;
    ///
    /// let resolver = PathResolver::new("/srv/media");
    /// assert_eq!(
    ///     resolver.resolve("/movies/a%20b.mp4"),
    ///     Some(Path::new("/srv/media/movies/a b.mp4").to_path_buf())
    /// );
    /// assert_eq!(resolver.resolve("/../etc/passwd"), None);
    /// ```
    pub fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        Self::segments(url_path).map(|segments| self.join(&segments))
    }

    /// Normalized, percent-decoded segments of `url_path`, as used by
    /// [`resolve`](Self::resolve).
    pub fn segments(url_path: &str) -> Option<Vec<String>> {
        let decoded = urlencoding::decode(url_path).ok()?;

        let mut segments: Vec<String> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop()?;
                }
                name => {
                    if !is_plain_segment(name) {
                        return None;
                    }
                    segments.push(name.to_string());
                }
            }
        }
        Some(segments)
    }

    /// Filesystem path of normalized segments under the root
    pub fn join(&self, segments: &[String]) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(segments);
        path
    }
}

/// Canonical URL of the directory named by `segments`, with a trailing slash.
///
/// Always a single-slash absolute path on this host.
///
/// # Examples
/// ```
/// use byteserve::http::path::directory_url;
///
/// assert_eq!(directory_url(&[]), "/");
/// assert_eq!(directory_url(&["a b".to_string(), "c".to_string()]), "/a%20b/c/");
/// ```
pub fn directory_url(segments: &[String]) -> String {
    let mut url = String::from("/");
    for segment in segments {
        url.push_str(&urlencoding::encode(segment));
        url.push('/');
    }
    url
}

/// A segment must be exactly one normal path component
fn is_plain_segment(name: &str) -> bool {
    if name.contains('\0') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
