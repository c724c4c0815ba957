//! Static file server with HTTP byte-range support.
//!
//! Serves a directory tree over HTTP/1.1. Files honor single `Range`
//! requests so media players can seek, and directories render a minimal
//! HTML listing.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use crate::config::Config;
pub use crate::handler::RequestHandler;
pub use crate::server::{Server, ShutdownHandle};
