//! Retrieval command parsing.

/// A parsed retrieval command.
///
/// The keyword is the first whitespace-delimited token, compared
/// case-sensitively. The `USER` and `PASS` argument is everything after the
/// single separator following the keyword, so extra inner spacing becomes
/// part of the value and never matches a stored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pop3Command {
    User(String),
    Pass(String),
    List,
    /// Message number, `None` when the argument is missing or not a number.
    Retr(Option<usize>),
    Quit,
    Unknown(String),
}

impl Pop3Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (keyword, raw_arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let arg = raw_arg.trim();

        match keyword {
            "USER" => Self::User(raw_arg.to_string()),
            "PASS" => Self::Pass(raw_arg.to_string()),
            "LIST" if arg.is_empty() => Self::List,
            "RETR" => Self::Retr(arg.parse().ok()),
            "QUIT" if arg.is_empty() => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }

    /// Loggable form. Secrets are masked.
    pub fn redacted(&self) -> String {
        match self {
            Self::Pass(_) => "Pass(***)".to_string(),
            other => format!("{other:?}"),
        }
    }
}
