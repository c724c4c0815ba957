//! Per-request view of a resolved filesystem entry

use crate::http::mime;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A stat-ed filesystem entry, created once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: PathBuf,
    pub size: u64,
    pub is_dir: bool,
    /// Present only for files
    pub mime_type: Option<&'static str>,
}

impl Resource {
    /// Stat `path` (following symlinks) and derive the MIME type for files
    pub async fn stat(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path).await?;
        let is_dir = metadata.is_dir();

        Ok(Self {
            path: path.to_path_buf(),
            size: if is_dir { 0 } else { metadata.len() },
            is_dir,
            mime_type: (!is_dir).then(|| mime::get_content_type(path)),
        })
    }

    /// Content-Type to advertise for the resource
    pub fn content_type(&self) -> &'static str {
        self.mime_type.unwrap_or(mime::FALLBACK_CONTENT_TYPE)
    }
}
