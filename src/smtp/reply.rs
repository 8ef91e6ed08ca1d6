//! Submission reply codes and reply lines.

use std::fmt;

/// The subset of RFC 5321 reply codes this server emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum ReplyCode {
    ServiceReady = 220,
    ServiceClosing = 221,
    Ok = 250,
    StartMailInput = 354,
    ActionAborted = 451,
    CommandUnrecognized = 500,
}

impl ReplyCode {
    /// Numeric value.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// One reply line: code and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: ReplyCode,
    pub text: String,
}

impl SmtpReply {
    pub fn new(code: ReplyCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn greeting(hostname: &str) -> Self {
        Self::new(
            ReplyCode::ServiceReady,
            format!("{hostname} Welcome to SMTP server"),
        )
    }

    pub fn hello(name: &str) -> Self {
        if name.is_empty() {
            Self::new(ReplyCode::Ok, "Hello")
        } else {
            Self::new(ReplyCode::Ok, format!("Hello {name}"))
        }
    }

    pub fn ok() -> Self {
        Self::new(ReplyCode::Ok, "OK")
    }

    pub fn start_mail_input() -> Self {
        Self::new(
            ReplyCode::StartMailInput,
            "End data with <CR><LF>.<CR><LF>",
        )
    }

    pub fn accepted() -> Self {
        Self::new(ReplyCode::Ok, "Message accepted")
    }

    pub fn aborted() -> Self {
        Self::new(
            ReplyCode::ActionAborted,
            "Requested action aborted: local error in processing",
        )
    }

    pub fn goodbye() -> Self {
        Self::new(ReplyCode::ServiceClosing, "Goodbye")
    }

    pub fn unrecognized() -> Self {
        Self::new(ReplyCode::CommandUnrecognized, "Command not recognized")
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code.as_u16(), self.text)
    }
}
