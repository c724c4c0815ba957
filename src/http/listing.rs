//! Directory listing rendering
//!
//! Produces the minimal HTML index served for directory requests.

use std::fmt::Write as _;
use std::io;
use std::path::Path;
use tokio::fs;

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirectoryEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Read the immediate children of `dir`, sorted by name.
///
/// Sorting keeps repeated listings of an unchanged directory identical.
/// Entries whose type cannot be determined are listed as files. Names that
/// are not valid UTF-8 cannot be requested by URL and are left out.
pub async fn read_entries(dir: &Path) -> io::Result<Vec<DirectoryEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let is_dir = entry
            .file_type()
            .await
            .is_ok_and(|file_type| file_type.is_dir());
        entries.push(DirectoryEntry {
            name,
            is_dir,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Render the listing document for `entries`.
///
/// Each entry becomes `<li><a href="NAME">NAME</a></li>`; directories carry a
/// trailing `/` in both the link and its text. The `href` is percent-encoded
/// and the text is HTML-escaped.
///
/// # Examples
/// ```
/// use byteserve::http::listing::{render_listing, DirectoryEntry};
///
/// let html = render_listing(&[DirectoryEntry::file("a.txt"), DirectoryEntry::dir("sub")]);
/// assert_eq!(
///     html,
///     r#"<html><body><ul><li><a href="a.txt">a.txt</a></li><li><a href="sub/">sub/</a></li></ul></body></html>"#
/// );
/// ```
pub fn render_listing(entries: &[DirectoryEntry]) -> String {
    let mut html = String::from("<html><body><ul>");

    for entry in entries {
        let slash = if entry.is_dir { "/" } else { "" };
        let _ = write!(
            html,
            r#"<li><a href="{}{slash}">{}{slash}</a></li>"#,
            urlencoding::encode(&entry.name),
            escape_html(&entry.name),
        );
    }

    html.push_str("</ul></body></html>");
    html
}

/// Escape text for inclusion in HTML element content or attribute values
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
