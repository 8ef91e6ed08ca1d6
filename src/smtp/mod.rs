//! Submission server.
//!
//! A sending peer connects, optionally names itself and the envelope, sends
//! `DATA` and a dot-terminated body, and the message is appended to the
//! shared mail store.

mod command;
mod reply;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{info, warn};

pub use command::SmtpCommand;
pub use reply::{ReplyCode, SmtpReply};
pub use session::{SmtpSession, SmtpState};

use crate::config::SmtpConfig;
use crate::server::{Connection, Listener};
use crate::store::MailStore;
use crate::Result;

/// Listening submission server.
pub struct SmtpServer {
    listener: Listener,
    store: Arc<MailStore>,
    hostname: Arc<str>,
}

impl SmtpServer {
    /// Bind the listening socket described by `config`.
    pub async fn bind(config: &SmtpConfig, store: Arc<MailStore>) -> Result<Self> {
        let listener = Listener::bind("SMTP", &config.host, config.port).await?;
        Ok(Self {
            listener,
            store,
            hostname: Arc::from(config.hostname.as_str()),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<()> {
        let Self {
            listener,
            store,
            hostname,
        } = self;

        listener
            .run(move |stream, addr| {
                let store = store.clone();
                let hostname = hostname.clone();
                async move { handle_connection(stream, addr, store, &hostname).await }
            })
            .await
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    store: Arc<MailStore>,
    hostname: &str,
) {
    let session = SmtpSession::new(store, hostname);
    let id = session.id();
    info!("SMTP session {} connected from {}", id, addr);

    let mut conn = Connection::new(stream);
    if let Err(e) = session.run(&mut conn).await {
        warn!("SMTP session {} ended abnormally: {}", id, e);
    }

    info!("SMTP session {} closed", id);
}
