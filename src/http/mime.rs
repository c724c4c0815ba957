//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

use std::path::Path;

/// Content-Type used when the extension is missing or unknown
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Get MIME Content-Type based on the extension of `path`
///
/// # Examples
/// ```
/// use byteserve::http::mime::get_content_type;
/// use std::path::Path;
///
/// assert_eq!(get_content_type(Path::new("movie.mp4")), "video/mp4");
/// assert_eq!(get_content_type(Path::new("blob")), "application/octet-stream");
/// ```
pub fn get_content_type(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(get_content_type(Path::new("index.html")), "text/html");
        assert_eq!(get_content_type(Path::new("style.css")), "text/css");
        assert_eq!(get_content_type(Path::new("data.json")), "application/json");
        assert_eq!(get_content_type(Path::new("a/b/logo.png")), "image/png");
        assert_eq!(get_content_type(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(get_content_type(Path::new("song.mp3")), "audio/mpeg");
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(get_content_type(Path::new("CLIP.MP4")), "video/mp4");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Path::new("file.xyzzy")), FALLBACK_CONTENT_TYPE);
        assert_eq!(get_content_type(Path::new("Makefile")), FALLBACK_CONTENT_TYPE);
    }
}
