//! Per-connection submission state machine.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::command::SmtpCommand;
use super::reply::SmtpReply;
use crate::server::Connection;
use crate::store::{body_from_lines, MailStore, Message};
use crate::Result;

/// Submission session state.
///
/// Ordering is not enforced: every command is accepted from every open
/// state, so `DATA` without `MAIL FROM` or `RCPT TO` stores a message with
/// the missing envelope fields unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpState {
    /// Greeting sent, nothing received yet.
    #[default]
    Greeted,
    /// `HELO` received, or the last message was committed.
    Ready,
    HaveSender,
    HaveRecipient,
    /// Collecting body lines until a lone `.`.
    ReceivingBody,
    Closed,
}

/// One submission peer.
pub struct SmtpSession {
    id: Uuid,
    state: SmtpState,
    sender: Option<String>,
    recipient: Option<String>,
    body: Vec<String>,
    store: Arc<MailStore>,
    hostname: String,
}

impl SmtpSession {
    pub fn new(store: Arc<MailStore>, hostname: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SmtpState::Greeted,
            sender: None,
            recipient: None,
            body: Vec::new(),
            store,
            hostname: hostname.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    /// The 220 line sent on connect.
    pub fn greeting(&self) -> SmtpReply {
        SmtpReply::greeting(&self.hostname)
    }

    fn set_state(&mut self, state: SmtpState) {
        if self.state != state {
            debug!(
                "SMTP session {} state changed: {:?} -> {:?}",
                self.id, self.state, state
            );
        }
        self.state = state;
    }

    fn reset_envelope(&mut self) {
        self.sender = None;
        self.recipient = None;
        self.body.clear();
    }

    /// Feed one received line (terminator already removed).
    ///
    /// Returns the reply to send, or `None` while a body is being collected.
    pub async fn handle_line(&mut self, line: &str) -> Option<SmtpReply> {
        match self.state {
            SmtpState::Closed => None,
            SmtpState::ReceivingBody => self.handle_body_line(line).await,
            _ => {
                let command = SmtpCommand::parse(line);
                debug!("SMTP session {} received command: {:?}", self.id, command);
                Some(self.handle_command(command))
            }
        }
    }

    fn handle_command(&mut self, command: SmtpCommand) -> SmtpReply {
        match command {
            SmtpCommand::Helo(name) => {
                self.reset_envelope();
                self.set_state(SmtpState::Ready);
                SmtpReply::hello(&name)
            }
            SmtpCommand::MailFrom(sender) => {
                debug!("SMTP session {} sender: {:?}", self.id, sender);
                self.sender = sender;
                self.set_state(SmtpState::HaveSender);
                SmtpReply::ok()
            }
            SmtpCommand::RcptTo(recipient) => {
                debug!("SMTP session {} recipient: {:?}", self.id, recipient);
                self.recipient = recipient;
                self.set_state(SmtpState::HaveRecipient);
                SmtpReply::ok()
            }
            SmtpCommand::Data => {
                self.body.clear();
                self.set_state(SmtpState::ReceivingBody);
                SmtpReply::start_mail_input()
            }
            SmtpCommand::Quit => {
                self.set_state(SmtpState::Closed);
                SmtpReply::goodbye()
            }
            SmtpCommand::Unknown(line) => {
                warn!(
                    "SMTP session {} unrecognized command: {:?}",
                    self.id, line
                );
                SmtpReply::unrecognized()
            }
        }
    }

    async fn handle_body_line(&mut self, line: &str) -> Option<SmtpReply> {
        if line == "." {
            return Some(self.commit().await);
        }
        let line = if line.starts_with("..") {
            &line[1..]
        } else {
            line
        };
        self.body.push(line.to_string());
        None
    }

    async fn commit(&mut self) -> SmtpReply {
        let body = body_from_lines(self.body.drain(..));
        let message = Message::new(self.sender.take(), self.recipient.take(), body);
        let (sender, recipient, size) = (
            message.sender.clone(),
            message.recipient.clone(),
            message.size(),
        );
        self.set_state(SmtpState::Ready);

        match self.store.append(message).await {
            Ok(()) => {
                info!(
                    "SMTP session {} accepted message from {:?} to {:?} ({} bytes)",
                    self.id, sender, recipient, size
                );
                SmtpReply::accepted()
            }
            Err(e) => {
                error!(
                    "SMTP session {} failed to store message: {}",
                    self.id, e
                );
                SmtpReply::aborted()
            }
        }
    }

    /// Drive the session over `conn` until `QUIT` or disconnect.
    ///
    /// Transport errors are returned; a body cut off by a disconnect is
    /// discarded without touching the store.
    pub async fn run<S>(mut self, conn: &mut Connection<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        conn.write_line(&self.greeting().to_string()).await?;

        while self.state != SmtpState::Closed {
            let Some(line) = conn.read_line().await? else {
                if self.state == SmtpState::ReceivingBody {
                    warn!(
                        "SMTP session {} disconnected mid-body, discarding {} lines",
                        self.id,
                        self.body.len()
                    );
                } else {
                    info!("SMTP session {} peer disconnected", self.id);
                }
                return Ok(());
            };

            if let Some(reply) = self.handle_line(&line).await {
                conn.write_line(&reply.to_string()).await?;
            }
        }

        Ok(())
    }
}
