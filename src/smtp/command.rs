//! Submission command parsing.

/// A parsed submission command.
///
/// Keywords are matched case-sensitively as prefixes of the trimmed line,
/// so `HELOworld` is a `HELO`. Only `QUIT` must stand alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    Helo(String),
    MailFrom(Option<String>),
    RcptTo(Option<String>),
    Data,
    Quit,
    Unknown(String),
}

impl SmtpCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("HELO") {
            return Self::Helo(rest.trim().to_string());
        }
        if let Some(rest) = line.strip_prefix("MAIL FROM") {
            return Self::MailFrom(parse_address(rest));
        }
        if let Some(rest) = line.strip_prefix("RCPT TO") {
            return Self::RcptTo(parse_address(rest));
        }
        if line.starts_with("DATA") {
            return Self::Data;
        }
        if line == "QUIT" {
            return Self::Quit;
        }
        Self::Unknown(line.to_string())
    }
}

/// Extract the address from the text after `MAIL FROM` / `RCPT TO`.
///
/// Accepts `:<a@x>`, `: a@x` and ` a@x`. Empty means unset.
fn parse_address(arg: &str) -> Option<String> {
    let arg = arg.trim();
    let arg = arg.strip_prefix(':').unwrap_or(arg).trim();
    let arg = arg
        .strip_prefix('<')
        .and_then(|a| a.strip_suffix('>'))
        .unwrap_or(arg)
        .trim();

    if arg.is_empty() {
        None
    } else {
        Some(arg.to_string())
    }
}
