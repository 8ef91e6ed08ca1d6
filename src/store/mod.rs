//! Persistent state shared by both protocol servers.
//!
//! - `account` -- registered accounts (address and secret)
//! - `mailbox` -- the append-only mail store
//! - `log` -- on-disk format of the mail store
//! - `message` -- the message model

mod account;
pub mod log;
mod mailbox;
mod message;

pub use account::{Account, CredentialStore};
pub use mailbox::MailStore;
pub use message::{body_from_lines, Message, DATE_FORMAT, UNKNOWN_DATE};
