//! Connection plumbing shared by both protocol servers.
//!
//! This module provides the TCP listener that dispatches one task per
//! connection, and the line-oriented connection wrapper the protocol
//! sessions read from and write to.

mod connection;
mod listener;

pub use connection::Connection;
pub use listener::Listener;
