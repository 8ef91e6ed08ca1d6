//! Append-only mail store shared by every connection.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::log;
use super::message::Message;
use crate::{MailError, Result};

/// The mail store.
///
/// The file at `path` is authoritative. The in-memory sequence is rebuilt from
/// it on every read, and every read or write holds the same mutex for its
/// whole duration, so no reader ever sees half of an append.
pub struct MailStore {
    path: PathBuf,
    messages: Mutex<Vec<Message>>,
}

impl MailStore {
    /// Open the store at `path`, creating its parent directory if needed, and
    /// load whatever is already there.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MailError::storage(parent, e))?;
            }
        }

        let store = Self {
            path,
            messages: Mutex::new(Vec::new()),
        };
        let count = store.reload().await?.len();
        info!("Loaded {} messages from {}", count, store.path.display());

        Ok(store)
    }

    /// Path of the durable log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append a message.
    ///
    /// The block is written, flushed and synced before this returns. If the
    /// write fails part-way the file is truncated back to its previous length
    /// so the next append does not merge with a torn block.
    pub async fn append(&self, message: Message) -> Result<()> {
        let mut messages = self.messages.lock().await;

        let block = log::encode(&message);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MailError::storage(&self.path, e))?;
        let previous_len = file
            .metadata()
            .await
            .map_err(|e| MailError::storage(&self.path, e))?
            .len();

        let written = async {
            file.write_all(block.as_bytes()).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;

        if let Err(e) = written {
            error!("Failed to append to {}: {}", self.path.display(), e);
            if let Err(truncate_err) = file.set_len(previous_len).await {
                error!(
                    "Failed to roll back {} to {} bytes: {}",
                    self.path.display(),
                    previous_len,
                    truncate_err
                );
            }
            return Err(MailError::storage(&self.path, e));
        }

        debug!(
            "Appended message for {:?} ({} bytes) to {}",
            message.recipient,
            message.size(),
            self.path.display()
        );
        messages.push(message);
        Ok(())
    }

    /// Rebuild the in-memory sequence from the log and return a copy of it.
    pub async fn reload(&self) -> Result<Vec<Message>> {
        let mut messages = self.messages.lock().await;
        messages.clear();

        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(MailError::storage(&self.path, e)),
        };
        *messages = log::parse(&String::from_utf8_lossy(&raw));

        Ok(messages.clone())
    }

    /// Messages addressed to exactly `address`, oldest first.
    ///
    /// Position `i` in the result is message number `i + 1` for listing and
    /// retrieval.
    pub async fn for_recipient(&self, address: &str) -> Result<Vec<Message>> {
        let messages = self.reload().await?;
        Ok(messages
            .into_iter()
            .filter(|m| m.is_addressed_to(address))
            .collect())
    }
}
