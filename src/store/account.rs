//! Registered accounts and the credential store.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{MailError, Result};

/// A registered account. The secret is compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: String,
    pub secret: String,
}

impl Account {
    /// Build an account, rejecting values the account log cannot represent.
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let secret = secret.into();
        validate_field("address", &address)?;
        validate_field("secret", &secret)?;
        Ok(Self { address, secret })
    }

    /// Parse one account log line: exactly two whitespace-separated fields.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let address = fields.next()?;
        let secret = fields.next()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            address: address.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Render as an account log line, newline included.
    pub fn to_line(&self) -> String {
        format!("{} {}\n", self.address, self.secret)
    }
}

fn validate_field(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(MailError::Validation(format!("{name} must not be empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(MailError::Validation(format!(
            "{name} must not contain whitespace"
        )));
    }
    Ok(())
}

/// Address to secret mapping, loaded once at start-up and only ever appended to.
pub struct CredentialStore {
    path: PathBuf,
    accounts: RwLock<HashMap<String, String>>,
}

impl CredentialStore {
    /// Load accounts from `path`. A missing file is an empty store.
    ///
    /// Blank lines are ignored; malformed lines are skipped with a warning.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No account file at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => return Err(MailError::storage(&path, e)),
        };

        let mut accounts = HashMap::new();
        for (index, line) in String::from_utf8_lossy(&raw).lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let Some(account) = Account::parse_line(line) else {
                warn!(
                    "Skipping malformed line {} in {}: {:?}",
                    index + 1,
                    path.display(),
                    line
                );
                continue;
            };
            debug!("Loaded user: {}", account.address);
            if accounts
                .insert(account.address.clone(), account.secret)
                .is_some()
            {
                warn!(
                    "Duplicate account {} on line {} of {}, later entry wins",
                    account.address,
                    index + 1,
                    path.display()
                );
            }
        }

        info!("Loaded {} accounts from {}", accounts.len(), path.display());
        Ok(Self {
            path,
            accounts: RwLock::new(accounts),
        })
    }

    /// Path of the account log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Secret registered for `address`, if any.
    pub async fn lookup(&self, address: &str) -> Option<String> {
        self.accounts.read().await.get(address).cloned()
    }

    /// Whether `address` is registered.
    pub async fn contains(&self, address: &str) -> bool {
        self.accounts.read().await.contains_key(address)
    }

    /// Whether `secret` matches the one registered for `address` exactly.
    pub async fn verify(&self, address: &str, secret: &str) -> bool {
        self.accounts
            .read()
            .await
            .get(address)
            .is_some_and(|stored| stored == secret)
    }

    /// Number of registered accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Whether no account is registered.
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    /// Register a new account by appending one line to the account log.
    ///
    /// The line is flushed and synced before the account becomes visible to
    /// `lookup`. Existing accounts cannot be replaced.
    pub async fn append(&self, address: &str, secret: &str) -> Result<Account> {
        let account = Account::new(address, secret)?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.address) {
            return Err(MailError::Validation(format!(
                "account {} already exists",
                account.address
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MailError::storage(parent, e))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MailError::storage(&self.path, e))?;
        file.write_all(account.to_line().as_bytes())
            .await
            .map_err(|e| MailError::storage(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| MailError::storage(&self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| MailError::storage(&self.path, e))?;

        accounts.insert(account.address.clone(), account.secret.clone());
        info!("Saved user: {}", account.address);
        Ok(account)
    }
}
