//! Client side of both protocols.
//!
//! `BridgeClient` opens a fresh connection for every call, performs one
//! exchange, and says `QUIT`. It is what a web front end would sit on, and
//! what the integration tests drive the servers with.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::{MailError, Result};
use crate::server::Connection;

/// Name announced in `HELO`.
const CLIENT_NAME: &str = "localhost";

/// One entry of a maildrop listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// 1-based message number.
    pub id: usize,
    /// Body size in octets.
    pub size: usize,
}

/// A retrieved message: the `Date:` line followed by the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedMessage {
    pub id: usize,
    pub content: String,
}

/// Talks to a running submission server and retrieval server.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    smtp_addr: SocketAddr,
    pop3_addr: SocketAddr,
}

impl BridgeClient {
    pub fn new(smtp_addr: SocketAddr, pop3_addr: SocketAddr) -> Self {
        Self {
            smtp_addr,
            pop3_addr,
        }
    }

    /// Submit `content` for `recipient` without naming a sender.
    pub async fn submit(&self, recipient: &str, content: &str) -> Result<()> {
        self.submit_from(None, recipient, content).await
    }

    /// Submit `content` for `recipient`, optionally with `MAIL FROM`.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Protocol` if the server refuses any step,
    /// including the final acceptance of the body.
    pub async fn submit_from(
        &self,
        sender: Option<&str>,
        recipient: &str,
        content: &str,
    ) -> Result<()> {
        debug!("Connecting to SMTP server at {}", self.smtp_addr);
        let stream = TcpStream::connect(self.smtp_addr).await?;
        let mut conn = Connection::new(stream);

        expect_smtp(&mut conn, "220").await?;
        smtp_command(&mut conn, &format!("HELO {CLIENT_NAME}"), "250").await?;
        if let Some(sender) = sender {
            smtp_command(&mut conn, &format!("MAIL FROM: {sender}"), "250").await?;
        }
        smtp_command(&mut conn, &format!("RCPT TO: {recipient}"), "250").await?;
        smtp_command(&mut conn, "DATA", "354").await?;

        for line in content.lines() {
            if line.starts_with('.') {
                conn.write_line(&format!(".{line}")).await?;
            } else {
                conn.write_line(line).await?;
            }
        }
        let result = smtp_command(&mut conn, ".", "250").await;

        quit(&mut conn).await;
        result?;

        info!("Submitted message for {}", recipient);
        Ok(())
    }

    /// List the maildrop of `address`.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Auth` when the login is refused.
    pub async fn list(&self, address: &str, secret: &str) -> Result<Vec<MessageSummary>> {
        let mut conn = self.login(address, secret).await?;

        conn.write_line("LIST").await?;
        let status = read_reply(&mut conn).await?;
        if !status.starts_with("+OK") {
            quit(&mut conn).await;
            return Err(MailError::Protocol(status));
        }

        let lines = read_multiline(&mut conn).await?;
        quit(&mut conn).await;

        lines.iter().map(|line| parse_summary(line)).collect()
    }

    /// Retrieve message `id` from the maildrop of `address`.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Auth` when the login is refused and
    /// `MailError::NotFound` when no such message exists.
    pub async fn retrieve(&self, address: &str, secret: &str, id: usize) -> Result<RetrievedMessage> {
        let mut conn = self.login(address, secret).await?;

        conn.write_line(&format!("RETR {id}")).await?;
        let status = read_reply(&mut conn).await?;
        if !status.starts_with("+OK") {
            quit(&mut conn).await;
            return Err(MailError::NotFound(format!("message {id}")));
        }

        let lines = read_multiline(&mut conn).await?;
        quit(&mut conn).await;

        Ok(RetrievedMessage {
            id,
            content: lines.join("\n").trim().to_string(),
        })
    }

    async fn login(&self, address: &str, secret: &str) -> Result<Connection<TcpStream>> {
        debug!("Connecting to POP3 server at {}", self.pop3_addr);
        let stream = TcpStream::connect(self.pop3_addr).await?;
        let mut conn = Connection::new(stream);

        let greeting = read_reply(&mut conn).await?;
        if !greeting.starts_with("+OK") {
            return Err(MailError::Protocol(greeting));
        }

        conn.write_line(&format!("USER {address}")).await?;
        if !read_reply(&mut conn).await?.starts_with("+OK") {
            quit(&mut conn).await;
            return Err(MailError::Auth("User not found.".to_string()));
        }

        conn.write_line(&format!("PASS {secret}")).await?;
        if !read_reply(&mut conn).await?.starts_with("+OK") {
            quit(&mut conn).await;
            return Err(MailError::Auth("Invalid password.".to_string()));
        }

        Ok(conn)
    }
}

async fn read_reply<S>(conn: &mut Connection<S>) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.read_line()
        .await?
        .ok_or_else(|| MailError::Protocol("connection closed by server".to_string()))
}

async fn expect_smtp<S>(conn: &mut Connection<S>, code: &str) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let reply = read_reply(conn).await?;
    if reply.starts_with(code) {
        Ok(reply)
    } else {
        Err(MailError::Protocol(reply))
    }
}

async fn smtp_command<S>(conn: &mut Connection<S>, line: &str, code: &str) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.write_line(line).await?;
    let reply = expect_smtp(conn, code).await?;
    debug!("Response to {:?}: {}", line, reply);
    Ok(reply)
}

/// Read dot-terminated lines, removing the stuffing dot.
async fn read_multiline<S>(conn: &mut Connection<S>) -> Result<Vec<String>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let line = read_reply(conn).await?;
        if line == "." {
            return Ok(lines);
        }
        match line.strip_prefix('.') {
            Some(rest) => lines.push(rest.to_string()),
            None => lines.push(line),
        }
    }
}

/// Best effort; the exchange already succeeded or failed by now.
async fn quit<S>(conn: &mut Connection<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = conn.write_line("QUIT").await {
        warn!("Failed to send QUIT: {}", e);
        return;
    }
    let _ = conn.read_line().await;
}

fn parse_summary(line: &str) -> Result<MessageSummary> {
    let mut parts = line.split_whitespace();
    let parsed = match (parts.next(), parts.next()) {
        (Some(id), Some(size)) => id.parse().ok().zip(size.parse().ok()),
        _ => None,
    };
    parsed
        .map(|(id, size)| MessageSummary { id, size })
        .ok_or_else(|| MailError::Protocol(format!("malformed listing line: {line:?}")))
}
