// Server module entry point
// Binds the listener and runs the accept loop until stopped

pub mod connection;
pub mod listener;
pub mod signal;

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::Config;
use crate::handler::RequestHandler;
use crate::logger;
use connection::{accept_connection, ConnectionSettings, ServerContext};

pub use listener::create_reusable_listener;

/// Stops a running [`Server`]; cheap to clone and usable from any task
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting connections.
    ///
    /// Takes effect even when called before `run` starts waiting.
    pub fn stop(&self) {
        self.notify.notify_one();
    }
}

/// A bound file server
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    ctx: Arc<ServerContext>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
}

impl Server {
    /// Bind the configured address and prepare the request handler.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: &Config) -> io::Result<Self> {
        let addr = config
            .get_socket_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = create_reusable_listener(addr)?;
        let local_addr = listener.local_addr()?;

        let ctx = ServerContext {
            handler: RequestHandler::new(&config.serve),
            settings: ConnectionSettings::from_config(config),
        };

        Ok(Self {
            listener,
            local_addr,
            ctx: Arc::new(ctx),
            active_connections: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Address actually bound (resolves port 0)
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            notify: Arc::clone(&self.shutdown),
        }
    }

    /// Connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// Accept connections until the shutdown handle fires.
    ///
    /// Connections already accepted keep running to completion on their own
    /// tasks after this returns.
    pub async fn run(self) -> io::Result<()> {
        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            accept_connection(
                                stream,
                                peer_addr,
                                &self.ctx,
                                &self.active_connections,
                            );
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    }
                }

                () = self.shutdown.notified() => {
                    logger::log_server_stop(&self.local_addr);
                    break;
                }
            }
        }

        let remaining = self.active_connections();
        if remaining > 0 {
            logger::log_info(&format!("{remaining} connection(s) still finishing"));
        }
        Ok(())
    }
}
