//! Retrieval server.
//!
//! A reading peer logs in with `USER`/`PASS`, then lists and retrieves the
//! messages addressed to it. Retrieval never modifies the store.

mod command;
mod reply;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{info, warn};

pub use command::Pop3Command;
pub use reply::Pop3Reply;
pub use session::{Pop3Session, Pop3State};

use crate::config::Pop3Config;
use crate::server::{Connection, Listener};
use crate::store::{CredentialStore, MailStore};
use crate::Result;

/// Listening retrieval server.
pub struct Pop3Server {
    listener: Listener,
    credentials: Arc<CredentialStore>,
    mail: Arc<MailStore>,
}

impl Pop3Server {
    /// Bind the listening socket described by `config`.
    pub async fn bind(
        config: &Pop3Config,
        credentials: Arc<CredentialStore>,
        mail: Arc<MailStore>,
    ) -> Result<Self> {
        let listener = Listener::bind("POP3", &config.host, config.port).await?;
        Ok(Self {
            listener,
            credentials,
            mail,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<()> {
        let Self {
            listener,
            credentials,
            mail,
        } = self;

        listener
            .run(move |stream, addr| {
                let credentials = credentials.clone();
                let mail = mail.clone();
                async move { handle_connection(stream, addr, credentials, mail).await }
            })
            .await
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    credentials: Arc<CredentialStore>,
    mail: Arc<MailStore>,
) {
    let session = Pop3Session::new(credentials, mail);
    let id = session.id();
    info!("POP3 session {} connected from {}", id, addr);

    let mut conn = Connection::new(stream);
    if let Err(e) = session.run(&mut conn).await {
        warn!("POP3 session {} ended abnormally: {}", id, e);
    }

    info!("POP3 session {} closed", id);
}
