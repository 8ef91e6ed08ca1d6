//! Both servers over one pair of stores.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::pop3::Pop3Server;
use crate::smtp::SmtpServer;
use crate::store::{CredentialStore, MailStore};
use crate::Result;

/// The submission and retrieval servers, bound and ready to run.
///
/// Both share the same `MailStore`, so a message accepted on the submission
/// port is visible to the next `LIST` on the retrieval port.
pub struct MailDaemon {
    smtp: SmtpServer,
    pop3: Pop3Server,
    credentials: Arc<CredentialStore>,
    mail: Arc<MailStore>,
}

impl MailDaemon {
    /// Validate `config`, load both logs, and bind both listeners.
    pub async fn bind(config: &Config) -> Result<Self> {
        config.validate()?;

        let credentials = Arc::new(CredentialStore::load(&config.storage.users_file).await?);
        let mail = Arc::new(MailStore::open(&config.storage.mail_file).await?);

        let smtp = SmtpServer::bind(&config.smtp, mail.clone()).await?;
        let pop3 = Pop3Server::bind(&config.pop3, credentials.clone(), mail.clone()).await?;

        Ok(Self {
            smtp,
            pop3,
            credentials,
            mail,
        })
    }

    pub fn smtp_addr(&self) -> std::io::Result<SocketAddr> {
        self.smtp.local_addr()
    }

    pub fn pop3_addr(&self) -> std::io::Result<SocketAddr> {
        self.pop3.local_addr()
    }

    pub fn credentials(&self) -> Arc<CredentialStore> {
        self.credentials.clone()
    }

    pub fn mail(&self) -> Arc<MailStore> {
        self.mail.clone()
    }

    /// Run both accept loops until one of them fails.
    pub async fn run(self) -> Result<()> {
        info!(
            "Mail daemon running (SMTP {:?}, POP3 {:?})",
            self.smtp.local_addr().ok(),
            self.pop3.local_addr().ok()
        );
        tokio::try_join!(self.smtp.run(), self.pop3.run())?;
        Ok(())
    }
}
