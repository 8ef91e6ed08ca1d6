//! Durable message log format.
//!
//! Each message is one block:
//!
//! ```text
//! From: a@x
//! To: b@x
//! Date: 2024-03-01 09:05:00
//!
//! Hello
//! ---
//! ```
//!
//! Lines end with a bare LF. Body lines are stored without their CRLF and
//! any other byte, a stray CR included, is kept as is. A body line made of
//! zero or more `>` followed by `---` is written with one extra `>`, so no
//! body line can close a block.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use tracing::warn;

use super::message::{Message, DATE_FORMAT};

/// Line that terminates a message block.
pub const SENTINEL: &str = "---";

const FROM: &str = "From:";
const TO: &str = "To:";
const DATE: &str = "Date:";

fn looks_like_sentinel(line: &str) -> bool {
    line.trim_start_matches('>') == SENTINEL
}

fn escape_line(line: &str) -> Cow<'_, str> {
    if looks_like_sentinel(line) {
        Cow::Owned(format!(">{line}"))
    } else {
        Cow::Borrowed(line)
    }
}

fn unescape_line(line: &str) -> &str {
    match line.strip_prefix('>') {
        Some(rest) if looks_like_sentinel(line) => rest,
        _ => line,
    }
}

/// Encode one message as a log block, including the trailing sentinel.
pub fn encode(message: &Message) -> String {
    let mut block = String::with_capacity(message.body.len() + 64);
    block.push_str(&format!("{FROM} {}\n", message.sender.as_deref().unwrap_or("")));
    block.push_str(&format!("{TO} {}\n", message.recipient.as_deref().unwrap_or("")));
    if let Some(dt) = message.received_at {
        block.push_str(&format!("{DATE} {}\n", dt.format(DATE_FORMAT)));
    }
    block.push('\n');
    for line in message.body_lines() {
        block.push_str(&escape_line(line));
        block.push('\n');
    }
    block.push_str(SENTINEL);
    block.push('\n');
    block
}

/// Message under construction while parsing.
#[derive(Default)]
struct Pending {
    sender: Option<String>,
    recipient: Option<String>,
    received_at: Option<NaiveDateTime>,
    body: String,
    in_body: bool,
    started: bool,
}

impl Pending {
    fn finish(self) -> Message {
        Message {
            sender: self.sender,
            recipient: self.recipient,
            body: self.body,
            received_at: self.received_at,
        }
    }
}

fn header_value(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    match NaiveDateTime::parse_from_str(value, DATE_FORMAT) {
        Ok(dt) => Some(dt),
        Err(_) => {
            if !value.is_empty() {
                warn!("Unparsable Date header {:?} in mail log", value);
            }
            None
        }
    }
}

/// Parse a whole log into messages, oldest first.
///
/// Tolerant: a missing or unparsable date becomes `None`, a block without a
/// blank separator starts its body at the first non-header line, and a
/// trailing block with no sentinel is dropped.
///
/// Lines are split on LF only, the same boundary `encode` writes, so a body
/// line ending in CR is never mistaken for the sentinel.
pub fn parse(content: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut current = Pending::default();

    for line in content.split_terminator('\n') {
        if line == SENTINEL {
            messages.push(std::mem::take(&mut current).finish());
            continue;
        }
        current.started = true;

        if !current.in_body {
            if let Some(value) = line.strip_prefix(FROM) {
                current.sender = header_value(value);
                continue;
            }
            if let Some(value) = line.strip_prefix(TO) {
                current.recipient = header_value(value);
                continue;
            }
            if let Some(value) = line.strip_prefix(DATE) {
                current.received_at = parse_date(value);
                continue;
            }
            current.in_body = true;
            if line.is_empty() {
                continue;
            }
            if line == "\r" {
                warn!("Header separator ends in CR in mail log");
                continue;
            }
        }

        current.body.push_str(unescape_line(line));
        current.body.push_str("\r\n");
    }

    if current.started {
        warn!("Dropping incomplete trailing block in mail log");
    }

    messages
}
