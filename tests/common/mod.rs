//! Test helpers for integration tests.
//!
//! Provides TestServer, TestClient, and helper functions for driving both
//! servers over real sockets.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use minimail::server::Connection;
use minimail::{BridgeClient, Config, CredentialStore, MailDaemon, MailStore};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Line-oriented test client for either server.
pub struct TestClient {
    conn: Connection<TcpStream>,
}

impl TestClient {
    /// Connect to the server at the given address.
    pub async fn connect(addr: SocketAddr) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            conn: Connection::new(stream),
        })
    }

    /// Send one line; CRLF is appended.
    pub async fn send_line(&mut self, line: &str) -> Result<(), std::io::Error> {
        self.conn.write_line(line).await
    }

    /// Send bytes exactly as given.
    pub async fn send_raw(&mut self, data: &str) -> Result<(), std::io::Error> {
        self.conn.write_raw(data).await
    }

    /// Receive one line, `None` on EOF.
    pub async fn recv_line(&mut self) -> Result<Option<String>, std::io::Error> {
        match timeout(DEFAULT_TIMEOUT, self.conn.read_line()).await {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "timed out waiting for a line",
            )),
        }
    }

    /// Receive one line and assert it starts with `prefix`.
    pub async fn expect(&mut self, prefix: &str) -> String {
        let line = self
            .recv_line()
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("connection closed while expecting {prefix:?}"));
        assert!(
            line.starts_with(prefix),
            "expected {prefix:?}, got {line:?}"
        );
        line
    }

    /// Send `line` and return the single-line reply.
    pub async fn command(&mut self, line: &str) -> String {
        self.send_line(line).await.unwrap();
        self.recv_line()
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("connection closed after {line:?}"))
    }

    /// Receive lines up to and excluding the `.` terminator, as sent.
    pub async fn recv_multiline(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self
                .recv_line()
                .await
                .unwrap()
                .expect("connection closed inside a multi-line reply");
            if line == "." {
                return lines;
            }
            lines.push(line);
        }
    }

    /// Log in on a retrieval connection that has just been greeted.
    pub async fn pop3_login(&mut self, address: &str, secret: &str) {
        self.expect("+OK").await;
        assert!(self.command(&format!("USER {address}")).await.starts_with("+OK"));
        assert!(self.command(&format!("PASS {secret}")).await.starts_with("+OK"));
    }
}

/// Both servers running on ephemeral ports over temporary logs.
pub struct TestServer {
    smtp_addr: SocketAddr,
    pop3_addr: SocketAddr,
    credentials: Arc<CredentialStore>,
    mail: Arc<MailStore>,
    dir: TempDir,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start with no accounts.
    pub async fn new() -> Self {
        Self::with_accounts(&[]).await
    }

    /// Start with the given `(address, secret)` accounts.
    pub async fn with_accounts(accounts: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let users: String = accounts
            .iter()
            .map(|(address, secret)| format!("{address} {secret}\n"))
            .collect();
        std::fs::write(dir.path().join("users.txt"), users).unwrap();

        let config = test_config(&dir);
        let daemon = MailDaemon::bind(&config).await.unwrap();
        let smtp_addr = daemon.smtp_addr().unwrap();
        let pop3_addr = daemon.pop3_addr().unwrap();
        let credentials = daemon.credentials();
        let mail = daemon.mail();

        let handle = tokio::spawn(async move {
            if let Err(e) = daemon.run().await {
                eprintln!("test daemon stopped: {e}");
            }
        });

        Self {
            smtp_addr,
            pop3_addr,
            credentials,
            mail,
            dir,
            handle,
        }
    }

    pub fn smtp_addr(&self) -> SocketAddr {
        self.smtp_addr
    }

    pub fn pop3_addr(&self) -> SocketAddr {
        self.pop3_addr
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn mail(&self) -> &MailStore {
        &self.mail
    }

    pub fn mail_path(&self) -> PathBuf {
        self.dir.path().join("emails.txt")
    }

    pub fn users_path(&self) -> PathBuf {
        self.dir.path().join("users.txt")
    }

    pub fn bridge(&self) -> BridgeClient {
        BridgeClient::new(self.smtp_addr, self.pop3_addr)
    }

    pub async fn smtp_client(&self) -> TestClient {
        TestClient::connect(self.smtp_addr).await.unwrap()
    }

    pub async fn pop3_client(&self) -> TestClient {
        TestClient::connect(self.pop3_addr).await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Configuration for a daemon on loopback ephemeral ports with logs in `dir`.
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.smtp.host = "127.0.0.1".to_string();
    config.smtp.port = 0;
    config.smtp.hostname = "mx.test".to_string();
    config.pop3.host = "127.0.0.1".to_string();
    config.pop3.port = 0;
    config.storage.users_file = dir.path().join("users.txt").display().to_string();
    config.storage.mail_file = dir.path().join("emails.txt").display().to_string();
    config.logging.file = String::new();
    config
}
