//! Per-connection retrieval state machine.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::command::Pop3Command;
use super::reply::Pop3Reply;
use crate::server::Connection;
use crate::store::{CredentialStore, MailStore, Message};
use crate::Result;

/// Retrieval session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pop3State {
    /// Not logged in. `user` is the candidate named by the last good `USER`.
    Unauthenticated { user: Option<String> },
    Authenticated { user: String },
    Closed,
}

impl Default for Pop3State {
    fn default() -> Self {
        Self::Unauthenticated { user: None }
    }
}

/// One retrieving peer.
pub struct Pop3Session {
    id: Uuid,
    state: Pop3State,
    credentials: Arc<CredentialStore>,
    mail: Arc<MailStore>,
}

impl Pop3Session {
    pub fn new(credentials: Arc<CredentialStore>, mail: Arc<MailStore>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Pop3State::default(),
            credentials,
            mail,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &Pop3State {
        &self.state
    }

    /// The address this session is logged in as.
    pub fn authenticated_user(&self) -> Option<&str> {
        match &self.state {
            Pop3State::Authenticated { user } => Some(user),
            _ => None,
        }
    }

    pub fn greeting(&self) -> Pop3Reply {
        Pop3Reply::ok("POP3 server ready")
    }

    fn set_state(&mut self, state: Pop3State) {
        debug!(
            "POP3 session {} state changed: {:?} -> {:?}",
            self.id, self.state, state
        );
        self.state = state;
    }

    /// Feed one received line. Returns `None` once the session is closed.
    pub async fn handle_line(&mut self, line: &str) -> Option<Pop3Reply> {
        if self.state == Pop3State::Closed {
            return None;
        }
        let command = Pop3Command::parse(line);
        debug!(
            "POP3 session {} received command: {}",
            self.id,
            command.redacted()
        );
        Some(self.handle_command(command).await)
    }

    async fn handle_command(&mut self, command: Pop3Command) -> Pop3Reply {
        match command {
            Pop3Command::User(address) => self.user(address).await,
            Pop3Command::Pass(secret) => self.pass(&secret).await,
            Pop3Command::List => match self.authenticated_user() {
                Some(user) => self.list(user).await,
                None => Pop3Reply::unrecognized(),
            },
            Pop3Command::Retr(number) => match self.authenticated_user() {
                Some(user) => self.retr(user, number).await,
                None => Pop3Reply::unrecognized(),
            },
            Pop3Command::Quit => {
                self.set_state(Pop3State::Closed);
                Pop3Reply::ok("Goodbye")
            }
            Pop3Command::Unknown(line) => {
                warn!(
                    "POP3 session {} unrecognized command: {:?}",
                    self.id, line
                );
                Pop3Reply::unrecognized()
            }
        }
    }

    async fn user(&mut self, address: String) -> Pop3Reply {
        if self.authenticated_user().is_some() {
            return Pop3Reply::err("Already authenticated");
        }
        if self.credentials.contains(&address).await {
            self.set_state(Pop3State::Unauthenticated {
                user: Some(address),
            });
            Pop3Reply::ok("User accepted")
        } else {
            info!("POP3 session {} unknown user {:?}", self.id, address);
            self.set_state(Pop3State::Unauthenticated { user: None });
            Pop3Reply::err("User not found")
        }
    }

    async fn pass(&mut self, secret: &str) -> Pop3Reply {
        let user = match &self.state {
            Pop3State::Authenticated { .. } => return Pop3Reply::err("Already authenticated"),
            Pop3State::Unauthenticated { user: Some(user) } => user.clone(),
            _ => return Pop3Reply::err("Send USER first"),
        };

        if self.credentials.verify(&user, secret).await {
            info!("POP3 session {} authenticated as {}", self.id, user);
            self.set_state(Pop3State::Authenticated { user });
            Pop3Reply::ok("Password accepted")
        } else {
            info!("POP3 session {} bad password for {}", self.id, user);
            Pop3Reply::err("Invalid password")
        }
    }

    async fn maildrop(&self, user: &str) -> std::result::Result<Vec<Message>, Pop3Reply> {
        self.mail.for_recipient(user).await.map_err(|e| {
            error!("POP3 session {} failed to read maildrop: {}", self.id, e);
            Pop3Reply::err("Unable to read maildrop")
        })
    }

    async fn list(&self, user: &str) -> Pop3Reply {
        let messages = match self.maildrop(user).await {
            Ok(messages) => messages,
            Err(reply) => return reply,
        };

        let lines = messages
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{} {}", i + 1, m.size()))
            .collect();
        Pop3Reply::multiline(format!("{} messages", messages.len()), lines)
    }

    async fn retr(&self, user: &str, number: Option<usize>) -> Pop3Reply {
        let Some(number) = number else {
            return Pop3Reply::no_such_message();
        };
        let messages = match self.maildrop(user).await {
            Ok(messages) => messages,
            Err(reply) => return reply,
        };
        let Some(message) = number.checked_sub(1).and_then(|i| messages.get(i)) else {
            return Pop3Reply::no_such_message();
        };

        let mut lines = Vec::with_capacity(message.body_lines().count() + 1);
        lines.push(format!("Date: {}", message.date()));
        lines.extend(message.body_lines().map(str::to_string));
        Pop3Reply::multiline(format!("{} octets", message.size()), lines)
    }

    /// Drive the session over `conn` until `QUIT` or disconnect.
    pub async fn run<S>(mut self, conn: &mut Connection<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        conn.write_raw(&self.greeting().render()).await?;

        while self.state != Pop3State::Closed {
            let Some(line) = conn.read_line().await? else {
                info!("POP3 session {} peer disconnected", self.id);
                return Ok(());
            };

            if let Some(reply) = self.handle_line(&line).await {
                conn.write_raw(&reply.render()).await?;
            }
        }

        Ok(())
    }
}
