//! Retrieval replies: `+OK` / `-ERR` status lines with optional dot-terminated bodies.

/// One retrieval reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pop3Reply {
    positive: bool,
    text: String,
    lines: Option<Vec<String>>,
}

impl Pop3Reply {
    /// Single-line positive reply.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            positive: true,
            text: text.into(),
            lines: None,
        }
    }

    /// Single-line negative reply.
    pub fn err(text: impl Into<String>) -> Self {
        Self {
            positive: false,
            text: text.into(),
            lines: None,
        }
    }

    /// Positive reply followed by `lines` and the `.` terminator.
    pub fn multiline(text: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            positive: true,
            text: text.into(),
            lines: Some(lines),
        }
    }

    pub fn unrecognized() -> Self {
        Self::err("Command not recognized")
    }

    pub fn no_such_message() -> Self {
        Self::err("No such message")
    }

    pub fn is_positive(&self) -> bool {
        self.positive
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> Option<&[String]> {
        self.lines.as_deref()
    }

    /// Wire form, CRLF line endings included.
    ///
    /// Body lines starting with `.` get an extra `.` so that none of them can
    /// be mistaken for the terminator.
    pub fn render(&self) -> String {
        let status = if self.positive { "+OK" } else { "-ERR" };
        let mut out = format!("{status} {}\r\n", self.text);
        if let Some(lines) = &self.lines {
            for line in lines {
                if line.starts_with('.') {
                    out.push('.');
                }
                out.push_str(line);
                out.push_str("\r\n");
            }
            out.push_str(".\r\n");
        }
        out
    }
}
