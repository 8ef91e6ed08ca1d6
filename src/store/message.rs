//! Message model shared by the submission and retrieval sides.

use chrono::{Local, NaiveDateTime, Timelike};

/// Format of the `Date:` header, in server local time.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rendered in place of a date when a stored message has none.
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// A delivered message.
///
/// Messages are never mutated once delivered. The body is kept in wire form:
/// every line terminated by CRLF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Envelope sender, if the peer gave one.
    pub sender: Option<String>,
    /// Envelope recipient, if the peer gave one.
    pub recipient: Option<String>,
    /// Raw body text.
    pub body: String,
    /// When the message was accepted. `None` when the log had no usable date.
    pub received_at: Option<NaiveDateTime>,
}

impl Message {
    /// Create a message stamped with the current local time.
    ///
    /// The timestamp is truncated to whole seconds so that a message read back
    /// from the log compares equal to the one that was appended.
    pub fn new(sender: Option<String>, recipient: Option<String>, body: impl Into<String>) -> Self {
        let now = Local::now().naive_local();
        Self {
            sender,
            recipient,
            body: body.into(),
            received_at: Some(now.with_nanosecond(0).unwrap_or(now)),
        }
    }

    /// Size for listing purposes: byte length of the body.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Exact recipient match.
    pub fn is_addressed_to(&self, address: &str) -> bool {
        self.recipient.as_deref() == Some(address)
    }

    /// Value of the `Date:` header.
    pub fn date(&self) -> String {
        match self.received_at {
            Some(dt) => dt.format(DATE_FORMAT).to_string(),
            None => UNKNOWN_DATE.to_string(),
        }
    }

    /// Body lines without their CRLF terminators.
    ///
    /// Only a full CRLF ends a line; a lone CR stays part of the line.
    pub fn body_lines(&self) -> impl Iterator<Item = &str> {
        self.body.split_terminator("\r\n")
    }
}

/// Join lines into a wire-form body, terminating each with CRLF.
pub fn body_from_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut body = String::new();
    for line in lines {
        body.push_str(line.as_ref());
        body.push_str("\r\n");
    }
    body
}
