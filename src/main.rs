use byteserve::config::{self, ConfigOverrides};
use byteserve::logger;
use byteserve::server::{signal, Server};
use clap::Parser;
use std::path::PathBuf;

/// Serve a directory over HTTP with byte-range support
#[derive(Debug, Parser)]
#[command(name = "byteserve", version, about)]
struct Cli {
    /// Directory to serve
    root: Option<PathBuf>,

    /// Configuration file (TOML); defaults to ./byteserve.toml when present
    #[arg(short, long)]
    config: Option<String>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Answer 404 for directories instead of listing them
    #[arg(long)]
    no_listing: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            root: self.root.clone(),
            directory_listing: self.no_listing.then_some(false),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = config::Config::load_from(cli.config.as_deref(), &cli.overrides())?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    if !cfg.serve.root.is_dir() {
        return Err(format!("Root '{}' is not a directory", cfg.serve.root.display()).into());
    }

    let server = Server::bind(&cfg)?;
    signal::start_signal_handler(server.shutdown_handle())?;

    logger::log_server_start(&server.local_addr(), &cfg);
    server.run().await?;
    Ok(())
}
