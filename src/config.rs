//! Configuration module for minimail.

use serde::Deserialize;
use std::path::Path;

use crate::{MailError, Result};

/// Submission (SMTP) server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Name announced in the 220 greeting.
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_smtp_port() -> u16 {
    2525
}

fn default_hostname() -> String {
    "localhost".to_string()
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_smtp_port(),
            hostname: default_hostname(),
        }
    }
}

/// Retrieval (POP3) server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Pop3Config {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_pop3_port")]
    pub port: u16,
}

fn default_pop3_port() -> u16 {
    1110
}

impl Default for Pop3Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_pop3_port(),
        }
    }
}

/// Durable storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the account log (one `address secret` pair per line).
    #[serde(default = "default_users_file")]
    pub users_file: String,
    /// Path to the append-only message log.
    #[serde(default = "default_mail_file")]
    pub mail_file: String,
}

fn default_users_file() -> String {
    "users.txt".to_string()
}

fn default_mail_file() -> String {
    "emails.txt".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            users_file: default_users_file(),
            mail_file: default_mail_file(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty means console only.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/minimail.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Submission server configuration.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Retrieval server configuration.
    #[serde(default)]
    pub pop3: Pop3Config,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(MailError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| MailError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `MINIMAIL_SMTP_PORT`: submission listening port
    /// - `MINIMAIL_POP3_PORT`: retrieval listening port
    /// - `MINIMAIL_USERS_FILE`: account log path
    /// - `MINIMAIL_MAIL_FILE`: message log path
    ///
    /// Empty or unparsable values leave the configuration unchanged.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env_port("MINIMAIL_SMTP_PORT") {
            self.smtp.port = port;
        }
        if let Some(port) = env_port("MINIMAIL_POP3_PORT") {
            self.pop3.port = port;
        }
        if let Some(path) = env_non_empty("MINIMAIL_USERS_FILE") {
            self.storage.users_file = path;
        }
        if let Some(path) = env_non_empty("MINIMAIL_MAIL_FILE") {
            self.storage.mail_file = path;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - Both servers would bind the same non-ephemeral address
    /// - A storage path is empty
    pub fn validate(&self) -> Result<()> {
        if self.smtp.port != 0 && self.smtp.port == self.pop3.port && self.smtp.host == self.pop3.host
        {
            return Err(MailError::Config(format!(
                "smtp and pop3 cannot both listen on {}:{}",
                self.smtp.host, self.smtp.port
            )));
        }
        if self.storage.users_file.trim().is_empty() {
            return Err(MailError::Config("storage.users_file is empty".to_string()));
        }
        if self.storage.mail_file.trim().is_empty() {
            return Err(MailError::Config("storage.mail_file is empty".to_string()));
        }
        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_port(key: &str) -> Option<u16> {
    env_non_empty(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.smtp.host, "0.0.0.0");
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.smtp.hostname, "localhost");

        assert_eq!(config.pop3.host, "0.0.0.0");
        assert_eq!(config.pop3.port, 1110);

        assert_eq!(config.storage.users_file, "users.txt");
        assert_eq!(config.storage.mail_file, "emails.txt");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/minimail.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[smtp]
host = "127.0.0.1"
port = 2626
hostname = "mail.example"

[pop3]
host = "127.0.0.1"
port = 1111

[storage]
users_file = "data/accounts.txt"
mail_file = "data/spool.txt"

[logging]
level = "debug"
file = ""
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.smtp.host, "127.0.0.1");
        assert_eq!(config.smtp.port, 2626);
        assert_eq!(config.smtp.hostname, "mail.example");
        assert_eq!(config.pop3.port, 1111);
        assert_eq!(config.storage.users_file, "data/accounts.txt");
        assert_eq!(config.storage.mail_file, "data/spool.txt");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file.is_empty());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[pop3]
port = 9110
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.pop3.port, 9110);
        assert_eq!(config.pop3.host, "0.0.0.0");
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.storage.mail_file, "emails.txt");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.pop3.port, 1110);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(MailError::Validation(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Validation error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");

        assert!(matches!(result, Err(MailError::Io(_))));
    }

    #[test]
    fn test_apply_env_overrides() {
        std::env::set_var("MINIMAIL_POP3_PORT", "1995");
        std::env::set_var("MINIMAIL_MAIL_FILE", "");
        std::env::set_var("MINIMAIL_SMTP_PORT", "not-a-port");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.pop3.port, 1995);
        assert_eq!(config.storage.mail_file, "emails.txt");
        assert_eq!(config.smtp.port, 2525);

        std::env::remove_var("MINIMAIL_POP3_PORT");
        std::env::remove_var("MINIMAIL_MAIL_FILE");
        std::env::remove_var("MINIMAIL_SMTP_PORT");
    }

    #[test]
    fn test_validate_default() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_port_clash() {
        let mut config = Config::default();
        config.pop3.port = config.smtp.port;

        let result = config.validate();
        assert!(matches!(result, Err(MailError::Config(_))));
    }

    #[test]
    fn test_validate_ephemeral_ports_do_not_clash() {
        let mut config = Config::default();
        config.smtp.port = 0;
        config.pop3.port = 0;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_storage_path() {
        let mut config = Config::default();
        config.storage.users_file = "  ".to_string();

        let result = config.validate();
        assert!(result.is_err());
        if let Err(MailError::Config(msg)) = result {
            assert!(msg.contains("users_file"));
        }
    }
}
