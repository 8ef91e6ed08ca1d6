//! minimail - a minimal mail system
//!
//! A submission server and a retrieval server sharing one durable message
//! log and one account log, plus a client for talking to both.

pub mod bridge;
pub mod config;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod pop3;
pub mod server;
pub mod smtp;
pub mod store;

pub use bridge::{BridgeClient, MessageSummary, RetrievedMessage};
pub use config::Config;
pub use daemon::MailDaemon;
pub use error::{MailError, Result};
pub use pop3::{Pop3Command, Pop3Reply, Pop3Server, Pop3Session, Pop3State};
pub use smtp::{ReplyCode, SmtpCommand, SmtpReply, SmtpServer, SmtpSession, SmtpState};
pub use store::{Account, CredentialStore, MailStore, Message};
