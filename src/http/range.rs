//! HTTP Range request parsing module
//!
//! Single-range `bytes` unit parsing for seekable downloads, following RFC 7233.
//! Every successful parse yields a closed interval validated against the
//! resource size, so callers never see an out-of-bounds window.

/// Validated byte range, both bounds inclusive.
///
/// Always satisfies `start <= end < size` for the size it was parsed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    /// First byte offset
    pub start: u64,
    /// Last byte offset (inclusive)
    pub end: u64,
}

// A validated range always covers at least one byte
#[allow(clippy::len_without_is_empty)]
impl RangeSpec {
    /// Number of bytes covered by the range
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Range header parse result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeParseResult {
    /// No Range header, or one that does not follow the grammar (serve full content)
    None,
    /// Valid range request
    Valid(RangeSpec),
    /// Range cannot be satisfied against the resource size - should return 416
    NotSatisfiable,
}

/// Parse HTTP Range header (single range only, bytes unit)
///
/// Supported formats:
/// - `bytes=start-end` - Specific range, `end` clamped to the last byte
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes, clamped to the whole resource
///
/// When several comma-separated ranges are given only the first is evaluated.
///
/// # Examples
/// ```
/// use byteserve::http::range::{parse_range_header, RangeParseResult, RangeSpec};
///
/// let result = parse_range_header(Some("bytes=10-19"), 1000);
/// assert_eq!(result, RangeParseResult::Valid(RangeSpec { start: 10, end: 19 }));
///
/// assert_eq!(parse_range_header(None, 1000), RangeParseResult::None);
/// assert_eq!(
///     parse_range_header(Some("bytes=2000-3000"), 1000),
///     RangeParseResult::NotSatisfiable
/// );
/// ```
pub fn parse_range_header(range_header: Option<&str>, size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };

    let Some(spec) = header.trim().strip_prefix("bytes=") else {
        return RangeParseResult::None; // Not bytes unit, ignore
    };

    // Multi-range responses are not produced; honor the first range only
    let first = spec.split(',').next().unwrap_or_default();

    let Some((start_str, end_str)) = first.split_once('-') else {
        return RangeParseResult::None;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        return parse_suffix_range(end_str, size);
    }

    parse_standard_range(start_str, end_str, size)
}

/// Parse suffix range (e.g., "-500")
fn parse_suffix_range(suffix_str: &str, size: u64) -> RangeParseResult {
    let Ok(suffix) = suffix_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    if suffix == 0 || size == 0 {
        return RangeParseResult::NotSatisfiable;
    }

    // Suffix larger than the resource covers the whole resource
    RangeParseResult::Valid(RangeSpec {
        start: size.saturating_sub(suffix),
        end: size - 1,
    })
}

/// Parse standard range (e.g., "0-99" or "100-")
fn parse_standard_range(start_str: &str, end_str: &str, size: u64) -> RangeParseResult {
    let Ok(start) = start_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    let end = if end_str.is_empty() {
        None
    } else {
        let Ok(e) = end_str.parse::<u64>() else {
            return RangeParseResult::None;
        };
        Some(e)
    };

    if start >= size {
        return RangeParseResult::NotSatisfiable;
    }

    let last = size - 1;
    match end {
        Some(e) if start > e => RangeParseResult::NotSatisfiable,
        Some(e) => RangeParseResult::Valid(RangeSpec {
            start,
            end: e.min(last),
        }),
        None => RangeParseResult::Valid(RangeSpec { start, end: last }),
    }
}
