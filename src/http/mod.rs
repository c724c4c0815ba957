//! HTTP protocol layer module
//!
//! Path resolution, MIME detection, Range parsing, response building and
//! directory listings. Nothing here knows about sockets or configuration.

pub mod body;
pub mod error;
pub mod listing;
pub mod mime;
pub mod path;
pub mod range;
pub mod resource;
pub mod response;

// Re-export commonly used types
pub use body::Body;
pub use error::ServeError;
pub use path::{directory_url, PathResolver};
pub use range::{parse_range_header, RangeParseResult, RangeSpec};
pub use resource::Resource;
pub use response::{
    build_404_response, build_405_response, build_500_response, build_redirect_response,
    ResponseDescriptor,
};
