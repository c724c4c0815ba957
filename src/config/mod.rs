// Configuration module entry point
// Layers defaults, an optional TOML file, environment variables and
// command-line overrides into one immutable `Config`

mod types;

use std::net::SocketAddr;
use std::path::PathBuf;

// Re-export public types
pub use types::{Config, LoggingConfig, PerformanceConfig, ServeConfig, ServerConfig};

/// Config file looked up (any supported extension) when none is given
pub const DEFAULT_CONFIG_NAME: &str = "byteserve";

/// Values given on the command line, applied last
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub root: Option<PathBuf>,
    pub directory_listing: Option<bool>,
}

impl Config {
    /// Load configuration from the given file (optional when not specified),
    /// `BYTESERVE_*` environment variables and command-line overrides
    pub fn load_from(
        config_path: Option<&str>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, config::ConfigError> {
        let file = match config_path {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = config::Config::builder()
            .set_default("server.host", types::DEFAULT_HOST)?
            .set_default("server.port", types::DEFAULT_PORT)?
            .set_default("serve.root", types::DEFAULT_ROOT)?
            .set_default("serve.directory_listing", true)?
            .set_default("serve.redirect_directories", true)?
            .set_default("serve.follow_symlinks", false)?
            .set_default("logging.level", types::DEFAULT_LOG_LEVEL)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", types::DEFAULT_ACCESS_LOG_FORMAT)?
            .set_default("performance.keep_alive", true)?
            .set_default(
                "performance.header_read_timeout",
                types::DEFAULT_HEADER_READ_TIMEOUT,
            )?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("BYTESERVE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.host", overrides.host.clone())?
            .set_override_option("server.port", overrides.port)?
            .set_override_option(
                "serve.root",
                overrides
                    .root
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("serve.directory_listing", overrides.directory_listing)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
