//! TCP listener shared by the submission and retrieval servers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::Result;

/// Accepts TCP connections and hands each one to its own task.
///
/// There is no connection limit; every accepted peer gets an independent
/// tokio task and nothing is shared between them except what the handler
/// closure captures.
pub struct Listener {
    name: &'static str,
    listener: TcpListener,
}

impl Listener {
    /// Bind to `host:port`. Port 0 lets the OS pick one.
    pub async fn bind(name: &'static str, host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        info!("{} server listening on {}", name, local_addr);

        Ok(Self { name, listener })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await?;
        debug!("{}: accepted connection from {}", self.name, addr);
        Ok((stream, addr))
    }

    /// Run the accept loop forever, spawning `handler` for each connection.
    ///
    /// A failed accept is logged and does not stop the loop. The stream is
    /// owned by the handler's future and is closed when that future ends,
    /// however it ends.
    pub async fn run<F, Fut>(self, handler: F) -> Result<()>
    where
        F: Fn(TcpStream, SocketAddr) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);

        loop {
            match self.accept().await {
                Ok((stream, addr)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        handler(stream, addr).await;
                    });
                }
                Err(e) => {
                    error!("{}: failed to accept connection: {}", self.name, e);
                    // Avoid spinning when the process is out of descriptors.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }
}
